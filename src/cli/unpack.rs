use clap::Parser;

use super::cli_config::ConfigArgs;
use crate::resource::ResourceSync;

/// Only unpack the stored blobs of the current version into the bundle tree.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: Args) -> miette::Result<()> {
    let config = args.config.load()?;
    let sync = ResourceSync::new(config)?;
    for server in sync.config().servers() {
        let version = sync.resolve_version(server).await?;
        let report = sync.extract_files(server, &version).await?;
        tracing::info!(
            "Unpacked {} files for {server}, {} up to date",
            report.written,
            report.skipped
        );
    }
    Ok(())
}
