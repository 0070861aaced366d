fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile(&["proto/chunk_store.proto"], &["proto"])?;
    Ok(())
}
