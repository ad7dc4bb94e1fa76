#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = schoolhub_cbt::run().await {
        eprintln!("schoolhub-cbt fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
