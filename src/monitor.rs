use log::{debug, error, info};

use crate::{
    config::Config,
    notification::{Dispatch, Message},
    reset::{self, Delivery, ResetOutcome},
    snapshot::Snapshot,
};

/// What happened during one tick
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TickOutcome {
    /// Log file had nothing in it, nothing was sent
    Empty,
    ReadFailed,
    SendFailed,
    Sent { reset: ResetOutcome },
    /// Sent, but emptying the log file failed
    ResetFailed,
}

/// Watches the configured log file and mails its contents
pub struct Monitor<'a, D> {
    config: &'a Config,
    dispatcher: D,
}

impl<'a, D: Dispatch> Monitor<'a, D> {
    pub fn new(config: &'a Config, dispatcher: D) -> Self {
        Self { config, dispatcher }
    }

    /// Runs the pipeline once. Errors are logged and never escape the tick.
    pub fn tick(&self) -> TickOutcome {
        let log_path = &self.config.log_path;
        debug!("Checking {log_path:?}");

        let bytes = match Snapshot::read(log_path) {
            Ok(Snapshot::Content(bytes)) => bytes,
            Ok(Snapshot::Empty) => {
                info!("Log file is empty.");
                return TickOutcome::Empty;
            }
            Err(e) => {
                error!("{e:?}");
                return TickOutcome::ReadFailed;
            }
        };

        let message = Message::compose(self.config, &bytes);
        let delivery = match self.dispatcher.send(&message) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                error!("{e:?}");
                Delivery::Failed
            }
        };

        match reset::apply(self.config.reset, delivery, log_path) {
            Ok(_) if delivery == Delivery::Failed => TickOutcome::SendFailed,
            Ok(reset) => TickOutcome::Sent { reset },
            Err(e) => {
                error!("{e:?}");
                TickOutcome::ResetFailed
            }
        }
    }
}
