// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Recorded measurement replay (one JSON `FrameMeasurement` per line)

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};
use super::{FrameMeasurement, MeasurementSource};

pub struct ReplaySource<R> {
    name: String,
    reader: R,
    line: usize,
    buf: String,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        debug!("Replaying measurements from {:?}", path);
        Ok(Self::from_reader(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Lines consumed so far
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead + Send> MeasurementSource for ReplaySource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Option<Result<FrameMeasurement>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(PipelineError::Io(e))),
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            return Some(
                serde_json::from_str(text)
                    .map_err(|source| PipelineError::Parse { line: self.line, source }),
            );
        }
    }
}
