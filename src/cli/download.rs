use clap::Parser;

use super::cli_config::ConfigArgs;
use crate::resource::ResourceSync;

/// Only fetch the missing blobs of the current version.
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
        let fetched = sync.download_files(server, &version).await?;
        tracing::info!("Fetched {fetched} blobs for {server}");
    }
    Ok(())
}
