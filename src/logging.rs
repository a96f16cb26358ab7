// Based on https://github.com/estk/log4rs/pull/295

use anyhow::Context;
use log::LevelFilter;
use log4rs::Handle;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{
                roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
            },
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

const FILE_PATH: &str = "log/log_mailer.log";
const ARCHIVE_PATTERN: &str = "log/log_mailer_{}.log";
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} - {m}\n";

/// Logs to stderr at `level` and to a rolling file in `log/`
pub fn init_logging(level: LevelFilter) -> anyhow::Result<Handle> {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();

    let trigger = SizeTrigger::new(2_097_152); // 2mb (2 * 1024 * 1024)
    let roller = FixedWindowRoller::builder()
        .build(ARCHIVE_PATTERN, 10) // Max 10 archive files
        .context("Failed to create FixedWindowRoller")?;
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
    let log_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(FILE_PATH, Box::new(policy))
        .with_context(|| format!("Failed to open log file {FILE_PATH:?}"))?;

    let config = Config::builder()
        .appender(Appender::builder().build("log_file", Box::new(log_file)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(
            Root::builder()
                .appender("log_file")
                .appender("stderr")
                .build(level),
        )
        .context("Failed to configure logging")?;

    // Handle can be used to change the level at runtime
    let handle = log4rs::init_config(config).context("Failed to init_config")?;

    Ok(handle)
}
