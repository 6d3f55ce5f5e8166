use anyhow::Result;
use clap::Parser;
use komon_agent::gov_doc_parser;
use komon_cli::commands::{run_analyze, run_cases, run_tools};
use komon_cli::console::run_console;
use komon_cli::{Cli, Commands, KomonConfig, init_telemetry};
use komon_eval::{ResultStore, TestCaseDriver};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded config from: {}", path.display());
    }

    let cli = Cli::parse();
    init_telemetry("komon", "info");
    let config = KomonConfig::from_cli(&cli);
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Tools => {
            let registry = config.load_registry()?;
            run_tools(&registry, &mut stdout)?;
        }
        Commands::Run { cases, single, results, seed } => {
            let model = Arc::new(config.gemini_model()?);
            let registry = config.load_registry()?;
            let mut driver = TestCaseDriver::new(model, registry, ResultStore::new(results))?;
            if let Some(seed) = seed {
                driver = driver.with_seed(seed);
            }
            run_cases(&driver, cases, single, &mut stdout).await?;
        }
        Commands::Analyze { input, output, sample_size, seed } => {
            run_analyze(&input, output, sample_size, seed, &mut stdout)?;
        }
        Commands::Chat { user_id } => {
            let model = Arc::new(config.gemini_model()?);
            let registry = config.load_registry()?;
            let agent = gov_doc_parser(model, registry)?;
            run_console(Arc::new(agent), user_id).await?;
        }
    }

    Ok(())
}
