use std::path::PathBuf;

use arkres_config::{Config, ConfigCli};
use arkres_consts::consts;
use clap::Parser;
use miette::IntoDiagnostic;

/// Where the configuration comes from.
#[derive(Parser, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to the configuration file, `arkres.toml` in the working directory
    /// is used when it exists.
    #[arg(long, env = "ARKRES_CONFIG", help_heading = consts::CLAP_CONFIG_OPTIONS)]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub config_cli: ConfigCli,
}

impl ConfigArgs {
    /// Loads the configuration file with the command line layered on top.
    pub fn load(&self) -> miette::Result<Config> {
        Config::load(self.config.as_deref(), &self.config_cli).into_diagnostic()
    }
}
