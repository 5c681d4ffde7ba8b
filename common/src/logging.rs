// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Logger construction shared by the backends and the test harness.

use std::fs::OpenOptions;
use std::io;
use std::str::FromStr;

use slog::Drain;

/// How log records are rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// Bunyan-style JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Ok(LogFormat::Text),
            "json" | "bunyan" => Ok(LogFormat::Json),
            x => Err(format!("invalid log format: {x}")),
        }
    }
}

fn async_root(
    drain: Box<dyn Drain<Ok = (), Err = slog::Never> + Send>,
) -> slog::Logger {
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!())
}

/// Build a logger writing to stdout, or to `log_file` if one is given.
pub fn build_logger(
    format: LogFormat,
    log_file: Option<&str>,
) -> io::Result<slog::Logger> {
    let drain: Box<dyn Drain<Ok = (), Err = slog::Never> + Send> =
        match (format, log_file) {
            (LogFormat::Text, None) => {
                let decorator = slog_term::TermDecorator::new().build();
                Box::new(
                    slog_term::FullFormat::new(decorator).build().fuse(),
                )
            }
            (LogFormat::Text, Some(path)) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                let decorator = slog_term::PlainDecorator::new(file);
                Box::new(
                    slog_term::FullFormat::new(decorator).build().fuse(),
                )
            }
            (LogFormat::Json, None) => Box::new(
                slog_bunyan::with_name("fabric", io::stdout())
                    .build()
                    .fuse(),
            ),
            (LogFormat::Json, Some(path)) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Box::new(slog_bunyan::with_name("fabric", file).build().fuse())
            }
        };

    Ok(async_root(drain))
}

/// Build a logger suitable for use inside the test runner, where output
/// must go through the capturable per-test stdout.
pub fn test_logger() -> slog::Logger {
    let decorator = slog_term::PlainDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!())
}
