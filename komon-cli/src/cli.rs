use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "komon")]
#[command(about = "Client lookup tools, agent test driver and result analysis", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Client list: a text file with one name per line, or a JSON array
    #[arg(long, env = "KOMON_COMPANIES", default_value = "data/companies.txt", global = true)]
    pub companies: PathBuf,

    /// Gemini model name
    #[arg(
        long,
        env = "KOMON_MODEL",
        default_value = komon_model::gemini::DEFAULT_GEMINI_MODEL,
        global = true
    )]
    pub model: String,

    /// Gemini API key (GEMINI_API_KEY is also accepted)
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Override the Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exercise both tools directly and print the root agent's wiring
    Tools,

    /// Drive the agent end to end and append one CSV row per test case
    Run {
        /// Number of cases after the initial single case
        #[arg(short, long, default_value_t = 2)]
        cases: u64,

        /// Run only the single case
        #[arg(long)]
        single: bool,

        /// Results file to append to
        #[arg(long, env = "KOMON_RESULTS", default_value = "test_results.csv")]
        results: PathBuf,

        /// Seed for client and confirmation choices
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sample step-2 rows from a results file and report name agreement
    Analyze {
        /// Results file to read
        #[arg(short, long, env = "KOMON_RESULTS", default_value = "test_results.csv")]
        input: PathBuf,

        /// Where to write the sample (default: sampled_results.csv beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows to sample
        #[arg(short = 'n', long, default_value_t = komon_eval::DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,

        /// Seed for the sample
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Talk to the root agent interactively
    Chat {
        /// User ID for the session
        #[arg(short, long, default_value = "console_user")]
        user_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["komon", "run"]).unwrap();
        match cli.command {
            Commands::Run { cases, single, seed, .. } => {
                assert_eq!(cases, 2);
                assert!(!single);
                assert!(seed.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "komon", "analyze", "--input", "r.csv", "-n", "10", "--seed", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { input, output, sample_size, seed } => {
                assert_eq!(input, PathBuf::from("r.csv"));
                assert!(output.is_none());
                assert_eq!(sample_size, 10);
                assert_eq!(seed, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
