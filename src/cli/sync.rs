use clap::Parser;

use super::cli_config::ConfigArgs;
use crate::{asset::AssetBackend, resource::ResourceSync};

/// Download, unpack and extract the resources of every configured server.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: Args, backend: Option<AssetBackend>) -> miette::Result<()> {
    let config = args.config.load()?;
    let sync = ResourceSync::new(config)?.with_backend(backend);
    sync.sync().await?;
    Ok(())
}
