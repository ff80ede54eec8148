use college_advisor_agent::{api::start_server, AdvisorAgent, AdvisorConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AdvisorConfig::from_env()?;

    info!("College Advisor Agent - API Server");
    info!("Port: {}", config.port);
    info!("Model: {}", config.model);

    let agent = Arc::new(AdvisorAgent::from_config(&config)?);

    info!(
        threshold = agent.confidence_threshold(),
        "Advisor agent initialized"
    );

    start_server(agent, config.port).await?;

    Ok(())
}
