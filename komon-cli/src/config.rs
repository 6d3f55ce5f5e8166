use crate::cli::Cli;
use anyhow::{Context, Result};
use komon_model::{GeminiConfig, GeminiModel};
use komon_tool::ClientRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings shared by every subcommand, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct KomonConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub companies: PathBuf,
    pub base_url: Option<String>,
}

impl KomonConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let api_key = cli
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());

        Self {
            api_key,
            model: cli.model.clone(),
            companies: cli.companies.clone(),
            base_url: cli.base_url.clone().filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("GOOGLE_API_KEY or GEMINI_API_KEY environment variable not set")
    }

    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let mut config = GeminiConfig::new(self.require_api_key()?, &self.model);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    pub fn gemini_model(&self) -> Result<GeminiModel> {
        Ok(GeminiModel::new(self.gemini_config()?)?)
    }

    pub fn load_registry(&self) -> Result<Arc<ClientRegistry>> {
        let registry = ClientRegistry::load(&self.companies)?;
        Ok(Arc::new(registry))
    }
}
