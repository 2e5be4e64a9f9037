//! hostwatch — TCP host reachability monitor CLI

use anyhow::Result;

use hostwatch::log_error;

#[tokio::main]
async fn main() -> Result<()> {
    hostwatch::logging::init_logging()?;

    if let Err(err) = hostwatch::app::run(std::env::args().skip(1)).await {
        log_error!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}
