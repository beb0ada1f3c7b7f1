//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

//! Prints log messages but also extracts station events and writes them to a file

use std::{path::Path, sync::Mutex};

use anyhow::Context;
use log::{Level, LevelFilter, Metadata, Record};

use link_event_writer::{EventFileWriter, EVENT_INDICATOR_CHAR};

const LOG_COLOR_CODE_DEFAULT: &str = "\x1B[0m";
const LOG_COLOR_CODE_RED: &str = "\x1B[1;31m";
const LOG_COLOR_CODE_GREEN: &str = "\x1B[1;32m";
const LOG_COLOR_CODE_YELLOW: &str = "\x1B[1;33m";
const LOG_COLOR_CODE_BLUE: &str = "\x1B[1;34m";

pub struct SimLogger {
    max_level: LevelFilter,
    event_writer: Option<Mutex<EventFileWriter>>,
}

impl SimLogger {
    /// Events are written to `event_file_path` if given
    pub fn new(max_level: LevelFilter, event_file_path: Option<&Path>) -> anyhow::Result<Self> {
        let event_writer = event_file_path
            .map(|path| {
                EventFileWriter::create(path)
                    .with_context(|| format!("could not create event file {}", path.display()))
            })
            .transpose()?;
        Ok(Self {
            max_level,
            event_writer: event_writer.map(Mutex::new),
        })
    }
}

impl log::Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = match record.level() {
            Level::Error => LOG_COLOR_CODE_RED,
            Level::Warn => LOG_COLOR_CODE_YELLOW,
            Level::Info => LOG_COLOR_CODE_GREEN,
            Level::Debug => LOG_COLOR_CODE_BLUE,
            Level::Trace => "",
        };

        let msg = record.args().to_string();

        if msg.starts_with(EVENT_INDICATOR_CHAR) {
            if let Some(Ok(mut writer)) = self.event_writer.as_ref().map(Mutex::lock) {
                if let Err(e) = writer.write_event(&msg) {
                    eprintln!("could not write event: {e}");
                }
            }
        }

        println!(
            "[{}] {}{}{}",
            record.target(),
            color,
            msg,
            LOG_COLOR_CODE_DEFAULT
        );
    }

    fn flush(&self) {
        if let Some(Ok(mut writer)) = self.event_writer.as_ref().map(Mutex::lock) {
            if let Err(e) = writer.flush() {
                eprintln!("could not flush events: {e}");
            }
        }
    }
}

/// Install the logger, events are written to `event_file_path` if given
pub fn init(max_level: LevelFilter, event_file_path: Option<&Path>) -> anyhow::Result<()> {
    let logger = Box::new(SimLogger::new(max_level, event_file_path)?);
    log::set_logger(Box::leak(logger)).map_err(|e| anyhow::anyhow!("{e}"))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_event_writer::{parse_event, FILE_HEADER};
    use log::Log;

    fn emit(logger: &SimLogger, level: Level, args: std::fmt::Arguments) {
        logger.log(&Record::builder().args(args).level(level).target("sim").build());
    }

    #[test]
    fn events_end_up_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let logger = SimLogger::new(LevelFilter::Info, Some(path.as_path())).unwrap();

        emit(&logger, Level::Info, format_args!("$100;7;scan;{{\"found\":2,\"dropped\":0}}"));
        emit(&logger, Level::Warn, format_args!("7: scan did not complete"));
        // filtered by level
        emit(&logger, Level::Debug, format_args!("$200;7;state;\"Idle\""));
        logger.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(FILE_HEADER));
        let event = lines.next().and_then(parse_event).unwrap();
        assert_eq!((event.uptime, event.node_id, event.kind), (100, 7, "scan"));
        let content: serde_json::Value = serde_json::from_str(event.content).unwrap();
        assert_eq!(content["found"], 2);
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("events.csv");
        assert!(SimLogger::new(LevelFilter::Info, Some(path.as_path())).is_err());
    }
}
