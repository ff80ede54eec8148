use college_advisor_agent::{AdvisorAgent, AdvisorConfig, AdvisorResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = AdvisorConfig::from_env()?;
    let agent = AdvisorAgent::from_config(&config)?;

    info!(model = %config.model, "College advisor ready");
    println!("College Advisor (type 'exit' to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        match agent.advise(input).await {
            Ok(advice) => {
                let advice = advice.unwrap_or_else(AdvisorResponse::not_understood);
                println!("\nAdvisor: {}", advice);
            }
            Err(e) => {
                error!("Advisor failed: {}", e);
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}
