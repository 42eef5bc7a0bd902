use clap::Parser;

use super::cli_config::ConfigArgs;
use crate::{asset::AssetBackend, resource::ResourceSync};

/// Only extract assets from the bundle tree that is already on disk.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: Args, backend: Option<AssetBackend>) -> miette::Result<()> {
    let config = args.config.load()?;
    let sync = ResourceSync::new(config)?.with_backend(backend);
    for server in sync.config().servers() {
        sync.extract_assets(server).await?;
    }
    Ok(())
}
