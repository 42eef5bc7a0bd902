use std::{env, io::IsTerminal};

use arkres_consts::consts;
use arkres_progress::global_multi_progress;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indicatif::ProgressDrawTarget;
use miette::IntoDiagnostic;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{asset::AssetBackend, util::IndicatifWriter};

pub mod cli_config;
pub mod download;
pub mod extract;
pub mod sync;
pub mod unpack;
pub mod version;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "
arkres - incrementally mirror the resource bundles of the game servers and extract their assets.

Blobs are stored content addressed below the data root and are never fetched twice, bundles
and assets are only rebuilt when their source changed.

Basic Usage:
    Mirror and extract everything:
    $ arkres sync

    Only look at the japanese server, only game data:
    $ arkres sync --server jp --include ^gamedata
"
)]
#[clap(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// The verbosity level
    /// (-v for debug, -vv for trace, -q for warnings only, -qq for errors only)
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Whether the log needs to be colored.
    #[clap(long, default_value = "auto", global = true, env = "ARKRES_COLOR", help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    color: ColorOutput,

    /// Hide all progress bars
    #[clap(long, default_value = "false", global = true, env = "ARKRES_NO_PROGRESS", help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    no_progress: bool,
}

#[derive(Parser, Debug)]
pub enum Command {
    #[clap(visible_alias = "s")]
    Sync(sync::Args),
    Version(version::Args),
    Download(download::Args),
    Unpack(unpack::Args),
    Extract(extract::Args),
}

/// Runs the command line without an asset decoder, assets are not extracted.
pub async fn execute() -> miette::Result<()> {
    execute_with_backend(None).await
}

/// Runs the command line, extracting assets with `backend` when given.
pub async fn execute_with_backend(backend: Option<AssetBackend>) -> miette::Result<()> {
    let args = Args::parse();
    let use_colors = use_color_output(&args);

    // Set up the default miette handler based on whether we want colors or not.
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::default()
                .color(use_colors)
                .build(),
        )
    }))?;

    // Honor FORCE_COLOR and NO_COLOR environment variables.
    // Those take precedence over the CLI flag and ARKRES_COLOR
    let use_colors = match env::var("FORCE_COLOR") {
        Ok(_) => true,
        Err(_) => match env::var("NO_COLOR") {
            Ok(_) => false,
            Err(_) => use_colors,
        },
    };

    console::set_colors_enabled(use_colors);
    console::set_colors_enabled_stderr(use_colors);

    if args.no_progress {
        global_multi_progress().set_draw_target(ProgressDrawTarget::hidden());
    }

    let (low_level_filter, level_filter) = match args.verbose.log_level_filter() {
        clap_verbosity_flag::LevelFilter::Off => (LevelFilter::OFF, LevelFilter::OFF),
        clap_verbosity_flag::LevelFilter::Error => (LevelFilter::ERROR, LevelFilter::ERROR),
        clap_verbosity_flag::LevelFilter::Warn => (LevelFilter::WARN, LevelFilter::WARN),
        clap_verbosity_flag::LevelFilter::Info => (LevelFilter::WARN, LevelFilter::INFO),
        clap_verbosity_flag::LevelFilter::Debug => (LevelFilter::INFO, LevelFilter::DEBUG),
        clap_verbosity_flag::LevelFilter::Trace => (LevelFilter::TRACE, LevelFilter::TRACE),
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(low_level_filter.into())
        .from_env()
        .into_diagnostic()?
        .add_directive(format!("arkres={level_filter}").parse().into_diagnostic()?)
        .add_directive(
            format!("arkres_config={level_filter}")
                .parse()
                .into_diagnostic()?,
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(use_colors)
        .with_writer(IndicatifWriter::new(global_multi_progress()))
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    execute_command(args.command, backend).await
}

/// Execute the actual command
pub async fn execute_command(
    command: Command,
    backend: Option<AssetBackend>,
) -> miette::Result<()> {
    match command {
        Command::Sync(cmd) => sync::execute(cmd, backend).await,
        Command::Version(cmd) => version::execute(cmd).await,
        Command::Download(cmd) => download::execute(cmd).await,
        Command::Unpack(cmd) => unpack::execute(cmd).await,
        Command::Extract(cmd) => extract::execute(cmd, backend).await,
    }
}

/// Whether to use colored log format.
/// Option `Auto` enables color output only if the logging is done to a terminal
/// and  `NO_COLOR` environment variable is not set.
#[derive(clap::ValueEnum, Debug, Clone, Default)]
pub enum ColorOutput {
    Always,
    Never,

    #[default]
    Auto,
}

/// Returns true if the output is considered to be a terminal.
fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Returns true if the log outputs should be colored or not.
fn use_color_output(args: &Args) -> bool {
    match args.color {
        ColorOutput::Always => true,
        ColorOutput::Never => false,
        ColorOutput::Auto => std::env::var_os("NO_COLOR").is_none() && is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_with_overrides() {
        let args = Args::try_parse_from([
            "arkres",
            "sync",
            "--server",
            "jp",
            "--include",
            "^gamedata",
            "--exclude",
            "story",
            "--no-progress",
        ])
        .unwrap();
        assert!(args.no_progress);
        let Command::Sync(sync) = args.command else {
            panic!("expected the sync command");
        };
        let config = sync.config.load().unwrap();
        assert_eq!(config.servers(), vec!["jp"]);
        let settings = config.server_settings("jp");
        assert_eq!(settings.include, vec!["^gamedata"]);
        assert_eq!(settings.exclude, vec!["story"]);
    }
}
