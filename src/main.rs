use join_flow::config::AppConfig;
use join_flow::startup;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    startup::init_tracing(&config.server);

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Join service failed");
        std::process::exit(1);
    }
}
