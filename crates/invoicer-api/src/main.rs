use invoicer_api::setup;
use invoicer_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    let workers = setup::services::start_background_workers(&config, &state)?;

    setup::server::start_server(&config, router, workers).await?;

    Ok(())
}
