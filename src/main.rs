//! Earlywarn - Main Entry Point
//!
//! Student academic risk scoring with CLI and server modes.

use clap::Parser;
use earlywarn::cli::{cmd_demo, cmd_inspect, cmd_predict, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "earlywarn=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            model,
            schema,
        } => {
            cmd_serve(&host, port, &model, &schema).await?;
        }
        Commands::Predict {
            model,
            schema,
            g1,
            absences,
            studytime,
            image_out,
        } => {
            cmd_predict(&model, &schema, g1, absences, studytime, image_out.as_deref())?;
        }
        Commands::Inspect { model, schema } => {
            cmd_inspect(&model, &schema)?;
        }
        Commands::Demo { out } => {
            cmd_demo(&out)?;
        }
    }

    Ok(())
}
