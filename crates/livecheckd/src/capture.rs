use std::sync::Arc;
use std::time::Duration;

use livecheck_core::{encode, CaptureRequest, Notification};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Host side of the "capture now" notification.
pub trait CaptureSink: Send + Sync + 'static {
    fn capture(&self, request: CaptureRequest);
}

/// Writes each capture request as a JSON line on stdout for the camera host.
pub struct StdoutSink;

impl CaptureSink for StdoutSink {
    fn capture(&self, request: CaptureRequest) {
        match encode(&Notification::Capture(request)) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to encode capture request"),
        }
    }
}

/// Drain capture requests from the engine, handing each to `sink` on its own
/// task after `delay`.
///
/// The engine never waits for a capture. The returned task finishes once the
/// request channel closes and every in-flight capture has been delivered.
pub fn spawn_dispatcher(
    mut rx: mpsc::UnboundedReceiver<CaptureRequest>,
    delay: Duration,
    sink: Arc<dyn CaptureSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut in_flight = JoinSet::new();
        while let Some(request) = rx.recv().await {
            let sink = Arc::clone(&sink);
            in_flight.spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::info!(session = %request.session_id, face_id = request.face_id, "capture dispatched");
                sink.capture(request);
            });
        }
        while let Some(res) = in_flight.join_next().await {
            if let Err(e) = res {
                tracing::error!(error = %e, "capture task failed");
            }
        }
    })
}
