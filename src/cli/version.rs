use arkres_consts::consts;
use clap::Parser;

use super::cli_config::ConfigArgs;
use crate::resource::ResourceSync;

/// Print the latest resource version of every configured server.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: Args) -> miette::Result<()> {
    let config = args.config.load()?;
    let sync = ResourceSync::new(config)?;
    for server in sync.config().servers() {
        let version = arkres_progress::await_in_progress(
            format!("fetching the version of {server}"),
            |_| sync.latest_version(server),
        )
        .await?;
        println!(
            "{}: {}",
            consts::SERVER_STYLE.apply_to(server),
            consts::VERSION_STYLE.apply_to(version)
        );
    }
    Ok(())
}
