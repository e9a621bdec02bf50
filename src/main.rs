use anyhow::Result;
use clap::Parser;
use deptheon::logging::init_logging;
use deptheon::{Agent, Config};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Run the Deptheon agent on a single prompt
#[derive(Debug, Parser)]
#[command(name = "deptheon", version, about)]
struct Args {
    /// Input prompt for the agent; read from stdin when omitted
    #[arg(long)]
    prompt: Option<String>,
}

async fn read_prompt() -> Result<String> {
    eprint!("Enter your prompt: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = Config::from_env()?;
    init_logging(&config.log_level);

    let (progress_tx, mut progress_rx) = mpsc::channel::<String>(64);
    let progress_printer = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            eprintln!("{}", update);
        }
    });

    let mut agent = Agent::new(config)?.with_progress_sender(progress_tx);

    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => read_prompt().await?,
    };

    if prompt.trim().is_empty() {
        warn!("Empty prompt provided.");
    } else {
        warn!("Processing your request...");
        tokio::select! {
            result = agent.run(&prompt) => match result {
                Ok(summary) => {
                    println!("{}", summary);
                    info!("Request processing completed.");
                }
                Err(e) => error!("Request failed: {:#}", e),
            },
            _ = tokio::signal::ctrl_c() => warn!("Operation interrupted."),
        }
    }

    agent.cleanup().await;
    drop(agent);
    let _ = progress_printer.await;

    Ok(())
}
