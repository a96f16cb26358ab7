mod cli;
pub mod config;
mod logging;
mod monitor;
mod notification;
mod reset;
mod scheduler;
mod snapshot;
mod units;
mod wizard;

use std::io;

use log::info;

pub use cli::Cli;
pub use config::Config;
pub use logging::init_logging;
pub use monitor::{Monitor, TickOutcome};
pub use notification::{Dispatch, Email, Message};
pub use reset::{Delivery, ResetOutcome};
pub use scheduler::Scheduler;
pub use snapshot::Snapshot;
pub use units::Interval;
pub use wizard::generate;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.get_config_path();
    if cli.generate {
        generate(io::stdin().lock(), io::stdout(), &config_path)?;
        return Ok(());
    }

    let config = Config::load_from(&config_path)?;
    info!(
        "log_mailer {} watching {:?} every {}",
        env!("CARGO_PKG_VERSION"),
        config.log_path,
        config.interval
    );

    let monitor = Monitor::new(&config, Email::new(&config)?);
    Scheduler::new(config.interval).run(|| {
        monitor.tick();
    });
    Ok(())
}
