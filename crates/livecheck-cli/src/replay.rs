//! `livecheck replay` — runs a recorded event log through the challenge.

use anyhow::{Context, Result};
use livecheck_core::{
    parse_event, CaptureRequest, CaptureTrigger, Event, EvaluatorConfig, LivenessEvaluator,
    LivenessSnapshot, ProtocolError,
};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read event log: {0}")]
    Io(#[from] io::Error),
}

#[derive(Default)]
struct CaptureLog {
    requests: Vec<CaptureRequest>,
}

impl CaptureTrigger for CaptureLog {
    fn trigger(&mut self, request: CaptureRequest) {
        self.requests.push(request);
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub frames: usize,
    pub skipped: usize,
    pub captures: Vec<CaptureRequest>,
    pub snapshot: LivenessSnapshot,
}

/// Apply every event in `reader` to a fresh evaluator.
///
/// Malformed lines are logged and counted as skipped.
pub fn replay<R: BufRead>(reader: R, config: EvaluatorConfig) -> Result<ReplayReport, ReplayError> {
    let mut evaluator = LivenessEvaluator::new(config, CaptureLog::default());
    let mut events = 0;
    let mut frames = 0;
    let mut skipped = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let event = match parse_event(i + 1, &line) {
            Ok(event) => event,
            Err(ProtocolError::Blank) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "skipping event");
                skipped += 1;
                continue;
            }
        };
        events += 1;
        match event {
            Event::Start => {
                evaluator.start_capture();
            }
            Event::Frame { faces } => {
                frames += 1;
                let outcome = evaluator.on_frame(&faces);
                tracing::debug!(line = i + 1, ?outcome, "frame replayed");
            }
            // Only the final state is reported.
            Event::Snapshot => {}
        }
    }

    let snapshot = evaluator.snapshot();
    Ok(ReplayReport {
        events,
        frames,
        skipped,
        captures: evaluator.trigger().requests.clone(),
        snapshot,
    })
}

/// Run the replay command and print the report as pretty JSON.
pub fn run(file: Option<PathBuf>, config: EvaluatorConfig) -> Result<()> {
    let report = match file {
        Some(path) => {
            let f = fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            replay(BufReader::new(f), config)?
        }
        None => replay(io::stdin().lock(), config)?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
