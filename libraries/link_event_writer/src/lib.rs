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

//! Collects the parseable event lines of the station log into a CSV file

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

pub const EVENT_INDICATOR_CHAR: char = '$';

pub const FILE_HEADER: &str = "uptime;node_id;kind;content";

pub struct EventFileWriter<W: Write = BufWriter<File>> {
    out: W,
}

impl EventFileWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> EventFileWriter<W> {
    /// Writes the header right away
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{FILE_HEADER}")?;
        Ok(Self { out })
    }

    /// Write `line` if it is an event, returns whether it was one
    pub fn write_event(&mut self, line: &str) -> io::Result<bool> {
        match line.strip_prefix(EVENT_INDICATOR_CHAR) {
            Some(event) => {
                writeln!(self.out, "{event}")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// One row of the event file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord<'a> {
    pub uptime: u64,
    pub node_id: u32,
    pub kind: &'a str,
    /// JSON
    pub content: &'a str,
}

/// Parse a row of the event file, with or without indicator
pub fn parse_event(line: &str) -> Option<EventRecord<'_>> {
    let line = line.strip_prefix(EVENT_INDICATOR_CHAR).unwrap_or(line);
    let mut fields = line.splitn(4, ';');
    Some(EventRecord {
        uptime: fields.next()?.parse().ok()?,
        node_id: fields.next()?.parse().ok()?,
        kind: fields.next()?,
        content: fields.next()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn only_events_written() {
        let mut out = Vec::new();
        let mut writer = EventFileWriter::new(&mut out).unwrap();
        assert!(writer
            .write_event("$1200;873;state;\"Scanning\"")
            .unwrap());
        assert!(!writer.write_event("873: scan did not complete").unwrap());
        drop(writer);
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "uptime;node_id;kind;content\n1200;873;state;\"Scanning\"\n");
    }

    #[test]
    fn parse() {
        let record = parse_event("$50;7;link;{\"phase\":\"handshake\",\"peer\":9,\"link\":1}").unwrap();
        assert_eq!(record.uptime, 50);
        assert_eq!(record.node_id, 7);
        assert_eq!(record.kind, "link");
        assert_eq!(record.content, "{\"phase\":\"handshake\",\"peer\":9,\"link\":1}");

        // content may contain the separator
        let record = parse_event("0;1;event;a;b").unwrap();
        assert_eq!(record.content, "a;b");

        assert_eq!(parse_event("uptime;node_id;kind;content"), None);
        assert_eq!(parse_event("5;6;reset"), None);
    }

    #[test]
    fn file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let mut writer = EventFileWriter::create(&path).unwrap();
        writer.write_event("$10;1;reset;{\"manual\":false}").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(FILE_HEADER));
        let record = lines.next().and_then(parse_event).unwrap();
        assert_eq!(record.kind, "reset");
        assert_eq!(lines.next(), None);
    }
}
