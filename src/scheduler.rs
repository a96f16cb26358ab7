use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::Interval;

/// Runs a pipeline once immediately and then once per interval, never concurrently
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval: interval.into(),
        }
    }

    /// Blocks forever
    pub fn run<F: FnMut()>(&self, pipeline: F) {
        let (_tx, rx) = mpsc::channel();
        self.run_until(&rx, pipeline);
    }

    /// Runs until a message arrives on `shutdown` or its sender is dropped.
    ///
    /// The signal is only noticed while waiting, a running pipeline is always finished first.
    /// The schedule starts once the first execution has finished.
    /// Returns the number of times the pipeline was executed.
    pub fn run_until<F: FnMut()>(&self, shutdown: &Receiver<()>, mut pipeline: F) -> usize {
        // (start of the grid, due time of the execution that just ran)
        let mut schedule: Option<(Instant, Instant)> = None;
        let mut count = 0;
        loop {
            count += 1;
            debug!("Tick {count} starting");
            pipeline();

            let now = Instant::now();
            let (start, due) = schedule.unwrap_or((now, now));
            let next = next_due(start, self.interval, due, now);
            if next <= now {
                warn!("Tick {count} took longer than the interval of {:?}", self.interval);
            }
            schedule = Some((start, next));
            match shutdown.recv_timeout(next.saturating_duration_since(now)) {
                Err(RecvTimeoutError::Timeout) => (),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Scheduler stopping after {count} ticks");
                    return count;
                }
            }
        }
    }
}

/// When the execution after the one due at `due` should start.
///
/// Normally one interval later. If that point already passed while the pipeline ran, the most
/// recent point of the grid `start + k * interval` is returned so the next run starts immediately
/// and later runs stay on the grid. Elapsed grid points are not replayed.
fn next_due(start: Instant, interval: Duration, due: Instant, now: Instant) -> Instant {
    let candidate = due + interval;
    if candidate > now {
        return candidate;
    }
    let step = interval.as_nanos();
    let elapsed = now.saturating_duration_since(start).as_nanos();
    start + Duration::from_nanos((elapsed / step * step) as u64)
}
