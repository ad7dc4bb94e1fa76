#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = schoolhub_cbt::run_worker().await {
        eprintln!("schoolhub-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
