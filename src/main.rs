use anyhow::Result;
use clap::Parser;

use dishwatch::config::{Args, Settings};
use dishwatch::{app, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;

    logging::init(&settings.log_level)?;

    app::run(settings).await
}
