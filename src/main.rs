use clap::Parser;
use color_eyre::Result;
use livetrack_obs::{
    init_errors,
    logging,
    run,
    Args,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    logging::log_init(args.verbose)?;

    run(args).await
}
