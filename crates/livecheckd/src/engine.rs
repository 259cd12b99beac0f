use livecheck_core::{
    CaptureRequest, CaptureTrigger, EvaluatorConfig, FaceObservation, FrameOutcome,
    LivenessEvaluator, LivenessSnapshot,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from the event reader to the engine thread.
enum EngineRequest {
    StartCapture {
        reply: oneshot::Sender<Uuid>,
    },
    Frame {
        faces: Vec<FaceObservation>,
        reply: oneshot::Sender<FrameOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<LivenessSnapshot>,
    },
}

/// Forwards capture requests off the engine thread.
struct ChannelTrigger {
    tx: mpsc::UnboundedSender<CaptureRequest>,
}

impl CaptureTrigger for ChannelTrigger {
    fn trigger(&mut self, request: CaptureRequest) {
        if self.tx.send(request).is_err() {
            tracing::warn!("capture dispatcher gone, dropping capture request");
        }
    }
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Begin a new liveness session. Returns the session id.
    pub async fn start_capture(&self) -> Result<Uuid, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineRequest::StartCapture { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Evaluate one detector frame.
    pub async fn frame(&self, faces: Vec<FaceObservation>) -> Result<FrameOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineRequest::Frame {
            faces,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn snapshot(&self) -> Result<LivenessSnapshot, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineRequest::Snapshot { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    async fn send(&self, req: EngineRequest) -> Result<(), EngineError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the evaluator on a dedicated OS thread.
///
/// Requests are handled one at a time, each to completion. Capture requests
/// come out of the returned receiver; the thread exits once every
/// [`EngineHandle`] is dropped, which in turn closes that receiver.
pub fn spawn_engine(
    config: EvaluatorConfig,
    capacity: usize,
) -> Result<(EngineHandle, mpsc::UnboundedReceiver<CaptureRequest>), EngineError> {
    let (capture_tx, capture_rx) = mpsc::unbounded_channel();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(capacity.max(1));

    let mut evaluator = LivenessEvaluator::new(config, ChannelTrigger { tx: capture_tx });

    std::thread::Builder::new()
        .name("livecheck-engine".into())
        .spawn(move || {
            tracing::info!(
                smile_threshold = config.smile_threshold,
                policy = ?config.session_policy,
                "engine thread started"
            );
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::StartCapture { reply } => {
                        let _ = reply.send(evaluator.start_capture());
                    }
                    EngineRequest::Frame { faces, reply } => {
                        let _ = reply.send(evaluator.on_frame(&faces));
                    }
                    EngineRequest::Snapshot { reply } => {
                        let _ = reply.send(evaluator.snapshot());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok((EngineHandle { tx }, capture_rx))
}
