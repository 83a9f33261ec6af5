// src/trace.rs
//
// JSON-lines I/O at the application boundary.
//
// Input: one record per frame with the detector boxes and pose landmarks
// produced upstream. Output: one JSON object per line (frame results,
// pipeline events).

use crate::detection::Detection;
use crate::pose::{Landmark, PoseLandmarks};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct TraceRecord {
    pub frame_idx: u64,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl TraceRecord {
    pub fn pose(&self) -> Result<Option<PoseLandmarks>> {
        self.landmarks
            .as_ref()
            .map(|pts| PoseLandmarks::new(pts.clone()))
            .transpose()
            .with_context(|| format!("frame {}", self.frame_idx))
    }
}

pub struct TraceReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open trace {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }

            let line_no = self.line_no;
            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("Malformed trace record on line {}", line_no)),
            );
        }
    }
}

pub struct JsonlWriter<W: Write> {
    out: W,
    written: usize,
}

impl JsonlWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.out, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
