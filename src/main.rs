//! iscc-web server binary.

use iscc_web::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading configuration.
    dotenvy::dotenv().ok();

    let config = ServiceConfig::load()?;
    iscc_web::start_server(config).await?;

    Ok(())
}
