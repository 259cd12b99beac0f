use std::sync::Arc;

use anyhow::{Context, Result};
use livecheck_core::{encode, parse_event, Event, Notification, ProtocolError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod capture;
mod config;
mod engine;

use crate::config::Config;
use crate::engine::EngineHandle;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "livecheckd starting");

    let (engine, captures) = engine::spawn_engine(config.evaluator(), config.channel_capacity)
        .context("failed to start engine")?;
    let dispatcher =
        capture::spawn_dispatcher(captures, config.capture_delay(), Arc::new(capture::StdoutSink));

    if config.auto_start {
        engine.start_capture().await?;
    }

    tracing::info!("livecheckd ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut line_no = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read event stream")? else {
                    tracing::info!("event stream closed");
                    break;
                };
                line_no += 1;
                match parse_event(line_no, &line) {
                    Ok(event) => handle_event(&engine, event).await?,
                    Err(ProtocolError::Blank) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping event"),
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    // Dropping the last handle stops the engine thread, which closes the
    // capture channel and lets the dispatcher drain.
    drop(engine);
    dispatcher.await.context("capture dispatcher panicked")?;
    tracing::info!("livecheckd shutting down");

    Ok(())
}

async fn handle_event(engine: &EngineHandle, event: Event) -> Result<()> {
    match event {
        Event::Start => {
            engine.start_capture().await?;
        }
        Event::Frame { faces } => {
            let outcome = engine.frame(faces).await?;
            tracing::debug!(?outcome, "frame handled");
        }
        Event::Snapshot => {
            let snapshot = engine.snapshot().await?;
            println!("{}", encode(&Notification::Snapshot(snapshot))?);
        }
    }
    Ok(())
}
