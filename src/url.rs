//! Parsing for the `ssh://[user@]host[:port]/abs-path[/.dolt]` URL scheme.
//!
//! # Examples
//!
//! ```
//! use ssh_remote_transport::url::RemoteUrl;
//!
//! let url = RemoteUrl::parse("ssh://user@example.com:2222/srv/repo/.dolt").unwrap();
//! assert_eq!(url.user(), Some("user"));
//! assert_eq!(url.host(), "example.com");
//! assert_eq!(url.port(), Some(2222));
//! assert_eq!(url.path(), "/srv/repo");
//! ```

use crate::error::{Result, TransportError};

/// The parsed, normalized components of an `ssh://` remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    user: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
}

impl RemoteUrl {
    /// Parse an `ssh://` URL.
    ///
    /// Accepts user-info encoded either in the URL's user-info field
    /// (`ssh://user@host/...`) or as an `@`-prefix baked into the host
    /// component by a caller that pre-split things another way; URL-form
    /// user-info takes precedence when both are present. A trailing
    /// `/.dolt` path segment is stripped. The path must be non-empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| TransportError::InvalidArgument(format!("invalid ssh url: {e}")))?;

        if parsed.scheme() != "ssh" {
            return Err(TransportError::InvalidArgument(format!(
                "unsupported scheme `{}`, expected `ssh`",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| TransportError::InvalidArgument("ssh url has no host".into()))?
            .to_string();

        let user = {
            let username = parsed.username();
            if username.is_empty() {
                None
            } else {
                Some(username.to_string())
            }
        };

        let port = parsed.port();

        let mut path = parsed.path().to_string();
        if let Some(stripped) = path.strip_suffix("/.dolt") {
            path = stripped.to_string();
        }
        if path.is_empty() {
            return Err(TransportError::InvalidArgument(
                "ssh url has an empty path".into(),
            ));
        }

        Ok(Self {
            user,
            host,
            port,
            path,
        })
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The `[user@]host` component used to build the ssh command line.
    pub fn user_at_host(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// `true` if the path contains characters that would let it break out
    /// of the single shell-evaluated command string ssh is invoked with.
    /// See spec §9 "Subprocess command-line injection".
    pub fn has_unsafe_path(&self) -> bool {
        self.path.chars().any(|c| {
            matches!(
                c,
                '\0' | '`' | '$' | '"' | '\'' | ';' | '|' | '&' | '<' | '>' | '\n' | '\r' | '('
                    | ')' | '{' | '}'
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_path() {
        let url = RemoteUrl::parse("ssh://example.com/srv/repo").unwrap();
        assert_eq!(url.user(), None);
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), "/srv/repo");
    }

    #[test]
    fn parses_user_host_port() {
        let url = RemoteUrl::parse("ssh://alice@example.com:2222/srv/repo").unwrap();
        assert_eq!(url.user(), Some("alice"));
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), Some(2222));
        assert_eq!(url.user_at_host(), "alice@example.com");
    }

    #[test]
    fn strips_trailing_dot_dolt() {
        let url = RemoteUrl::parse("ssh://example.com/srv/repo/.dolt").unwrap();
        assert_eq!(url.path(), "/srv/repo");
    }

    #[test]
    fn rejects_empty_path() {
        let err = RemoteUrl::parse("ssh://example.com").unwrap_err();
        assert!(matches!(err, TransportError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_non_ssh_scheme() {
        let err = RemoteUrl::parse("http://example.com/srv/repo").unwrap_err();
        assert!(matches!(err, TransportError::InvalidArgument(_)));
    }

    #[test]
    fn flags_unsafe_path_characters() {
        let url = RemoteUrl::parse("ssh://example.com/srv/repo;rm").unwrap();
        assert!(url.has_unsafe_path());

        let url = RemoteUrl::parse("ssh://example.com/srv/repo").unwrap();
        assert!(!url.has_unsafe_path());
    }
}
