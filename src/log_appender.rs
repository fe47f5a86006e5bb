use crate::config::LoggingConfig;
use anyhow::{anyhow, Context, Result};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::{
    roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::fs;

const LOG_FILE_NAME: &str = "onedrive-storage.log";

pub fn build_logging_config(settings: &LoggingConfig) -> Result<Config> {
    let logs_dir = settings.log_dir.join("logs");

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{h({l})} {d(%Y-%m-%d %H:%M:%S)} {M} - {m}{n}",
        )))
        .build();

    // Fixed window roller: keep gzip archives next to the active log
    let archive_pattern = logs_dir.join("onedrive-storage.{}.log.gz");
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(
            archive_pattern
                .to_str()
                .ok_or_else(|| anyhow!("Log directory is not valid UTF-8"))?,
            settings.archive_count,
        )?;

    let trigger = SizeTrigger::new(settings.max_file_size);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {M}::{m}{n}")))
        .build(logs_dir.join(LOG_FILE_NAME), Box::new(policy))
        .context("Failed to create rolling log file")?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(settings.level),
        )?;
    Ok(config)
}

/// Install console and rolling file logging for the whole process
pub fn setup_logging(settings: &LoggingConfig) -> Result<()> {
    fs::create_dir_all(settings.log_dir.join("logs"))?;
    let config = build_logging_config(settings)?;
    log4rs::init_config(config)?;
    Ok(())
}
