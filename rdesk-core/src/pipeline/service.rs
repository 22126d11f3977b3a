//! Capture → resize → encode pipeline.
//!
//! Three stages, joined by two latest-wins slots:
//!
//! ```text
//!  capture thread ──put──► [captured] ──take──► resize task
//!                                                   │ put
//!                                                   ▼
//!  get() ◄──take── [output] ◄──put── encode task ◄──take── [resized]
//! ```
//!
//! The capture stage never waits for downstream; frames that nobody
//! picked up are overwritten. It also counts capture attempts, failed
//! ones included, that no `get()` has claimed, and stops the whole
//! pipeline once that count passes `idle_frame_limit`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::pipeline::capture::{CaptureBackend, ScreenCapturer};
use crate::pipeline::encoder::{DEFAULT_JPEG_QUALITY, FrameEncoder};
use crate::pipeline::resize::{DEFAULT_TARGET_HEIGHT, scale_to_height};
use crate::pipeline::slot::LatestSlot;
use crate::pipeline::types::{EncodedFrame, RawScreenFrame, ResizedFrame};

/// Unclaimed captures tolerated before the pipeline stops itself.
pub const DEFAULT_IDLE_FRAME_LIMIT: u32 = 100;

// ── PipelineConfig ───────────────────────────────────────────────

/// Configuration for [`CapturePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output height in pixels; width follows the aspect ratio.
    pub target_height: u32,
    /// JPEG quality (1..=100).
    pub jpeg_quality: u8,
    /// Captures without an intervening `get()` before idle shutdown.
    pub idle_frame_limit: u32,
    /// Upper bound on the capture rate; `0` captures back to back.
    pub max_fps: u32,
    /// How long `destroy` waits for stages before aborting them.
    pub destroy_grace: Duration,
    /// Back-off after a failed capture.
    pub capture_retry: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            idle_frame_limit: DEFAULT_IDLE_FRAME_LIMIT,
            max_fps: 30,
            destroy_grace: Duration::from_millis(500),
            capture_retry: Duration::from_millis(50),
        }
    }
}

impl PipelineConfig {
    fn frame_interval(&self) -> Option<Duration> {
        (self.max_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.max_fps)))
    }
}

// ── Stage handles ────────────────────────────────────────────────

/// One started generation of the pipeline.
struct Stages {
    cancel: CancellationToken,
    capture: JoinHandle<()>,
    resize: JoinHandle<()>,
    encode: JoinHandle<()>,
}

/// Everything the capture thread needs.
struct CaptureStage {
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    idle_frames: Arc<AtomicU32>,
    captured: Arc<LatestSlot<RawScreenFrame>>,
    idle_frame_limit: u32,
    frame_interval: Option<Duration>,
    retry: Duration,
}

// ── CapturePipeline ──────────────────────────────────────────────

/// Keeps a fresh, compressed screenshot ready for retrieval.
///
/// # Lifetime
///
/// [`start`](Self::start) spawns the stages (idempotent while running).
/// The pipeline stops on its own after `idle_frame_limit` unclaimed
/// captures, or explicitly through [`destroy`](Self::destroy). A
/// stopped pipeline can be started again.
pub struct CapturePipeline {
    backend: Arc<dyn CaptureBackend>,
    config: PipelineConfig,
    running: Arc<AtomicBool>,
    idle_frames: Arc<AtomicU32>,
    output: Arc<LatestSlot<EncodedFrame>>,
    stages: Mutex<Option<Stages>>,
}

impl CapturePipeline {
    /// Create a pipeline over `backend` with default configuration.
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self::with_config(backend, PipelineConfig::default())
    }

    /// Create a pipeline with explicit configuration.
    pub fn with_config(backend: Arc<dyn CaptureBackend>, config: PipelineConfig) -> Self {
        Self {
            backend,
            config,
            running: Arc::new(AtomicBool::new(false)),
            idle_frames: Arc::new(AtomicU32::new(0)),
            output: Arc::new(LatestSlot::new()),
            stages: Mutex::new(None),
        }
    }

    /// Start the three stages unless already running.
    ///
    /// The capture backend is opened on the capture thread; if that
    /// fails the pipeline stays stopped and [`RemoteError::Capture`]
    /// (or whatever the backend reported) is returned.
    pub async fn start(&self) -> Result<(), RemoteError> {
        let mut stages = self.stages.lock().await;
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A generation that stopped itself may still be winding down.
        if let Some(previous) = stages.take() {
            previous.cancel.cancel();
        }

        self.idle_frames.store(0, Ordering::SeqCst);
        self.output.clear();
        self.running.store(true, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let captured = Arc::new(LatestSlot::new());
        let resized = Arc::new(LatestSlot::new());

        let (ready_tx, ready_rx) = oneshot::channel();
        let capture = tokio::task::spawn_blocking({
            let backend = Arc::clone(&self.backend);
            let stage = CaptureStage {
                cancel: cancel.clone(),
                running: Arc::clone(&self.running),
                idle_frames: Arc::clone(&self.idle_frames),
                captured: Arc::clone(&captured),
                idle_frame_limit: self.config.idle_frame_limit,
                frame_interval: self.config.frame_interval(),
                retry: self.config.capture_retry,
            };
            move || capture_stage(backend.as_ref(), stage, ready_tx)
        });

        let opened = ready_rx.await.unwrap_or_else(|_| {
            Err(RemoteError::Capture("capture stage exited during start".into()))
        });
        if let Err(e) = opened {
            self.running.store(false, Ordering::SeqCst);
            cancel.cancel();
            warn!("capture pipeline failed to start: {e}");
            return Err(e);
        }

        let resize = tokio::spawn(resize_stage(
            captured,
            Arc::clone(&resized),
            self.config.target_height,
            cancel.clone(),
        ));
        let encode = tokio::spawn(encode_stage(
            resized,
            Arc::clone(&self.output),
            FrameEncoder::new(self.config.jpeg_quality),
            cancel.clone(),
        ));

        *stages = Some(Stages {
            cancel,
            capture,
            resize,
            encode,
        });
        info!(
            target_height = self.config.target_height,
            "capture pipeline started"
        );
        Ok(())
    }

    /// Take the most recent encoded frame, leaving the holder empty.
    ///
    /// Also resets the idle counter. Returns `None` if no new frame was
    /// produced since the last call.
    pub fn get(&self) -> Option<Vec<u8>> {
        self.get_frame().map(|frame| frame.data)
    }

    /// Like [`get`](Self::get), but keeps the frame metadata.
    pub fn get_frame(&self) -> Option<EncodedFrame> {
        self.idle_frames.store(0, Ordering::SeqCst);
        self.output.try_take()
    }

    /// Whether the stages are running.
    pub fn is_started(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Captures taken since the last `get()`.
    pub fn unclaimed_captures(&self) -> u32 {
        self.idle_frames.load(Ordering::SeqCst)
    }

    /// Stop every stage and release pipeline resources.
    ///
    /// Stages get `destroy_grace` to finish; async stages still alive
    /// after that are aborted. Safe to call repeatedly.
    pub async fn destroy(&self) {
        // Held to the end so a concurrent `start` runs wholly before or
        // wholly after.
        let mut slot = self.stages.lock().await;
        self.running.store(false, Ordering::SeqCst);
        let Some(stages) = slot.take() else {
            return;
        };

        let Stages {
            cancel,
            capture,
            resize,
            encode,
        } = stages;
        cancel.cancel();

        let resize_abort = resize.abort_handle();
        let encode_abort = encode.abort_handle();
        let joined = tokio::time::timeout(self.config.destroy_grace, async {
            let _ = capture.await;
            let _ = resize.await;
            let _ = encode.await;
        })
        .await;

        if joined.is_err() {
            warn!(
                "pipeline stages still running after {:?}; aborting",
                self.config.destroy_grace
            );
            resize_abort.abort();
            encode_abort.abort();
        }

        self.output.clear();
        info!("capture pipeline destroyed");
    }
}

// ── Stages ───────────────────────────────────────────────────────

/// Capture loop. Runs on a blocking-pool thread so the opened grabber
/// never has to cross threads.
fn capture_stage(
    backend: &dyn CaptureBackend,
    stage: CaptureStage,
    ready: oneshot::Sender<Result<(), RemoteError>>,
) {
    let mut capturer: Box<dyn ScreenCapturer> = match backend.open() {
        Ok(capturer) => {
            let _ = ready.send(Ok(()));
            capturer
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    debug!("capture stage started");

    while !stage.cancel.is_cancelled() {
        let loop_start = Instant::now();

        let delivered = match capturer.capture() {
            Ok(Some(frame)) => {
                stage.captured.put(frame);
                true
            }
            // No new frame within the grabber's wait; ask again.
            Ok(None) => continue,
            Err(e) => {
                warn!("screen capture failed: {e}");
                std::thread::sleep(stage.retry);
                false
            }
        };

        let unclaimed = stage.idle_frames.fetch_add(1, Ordering::SeqCst) + 1;
        if unclaimed > stage.idle_frame_limit {
            info!(unclaimed, "no screenshot requested recently; stopping pipeline");
            stage.running.store(false, Ordering::SeqCst);
            stage.cancel.cancel();
            break;
        }

        if delivered {
            if let Some(interval) = stage.frame_interval {
                pace(loop_start, interval);
            }
        }
    }

    debug!("capture stage finished");
}

async fn resize_stage(
    captured: Arc<LatestSlot<RawScreenFrame>>,
    resized: Arc<LatestSlot<ResizedFrame>>,
    target_height: u32,
    cancel: CancellationToken,
) {
    debug!("resize stage started");

    while let Some(frame) = captured.take_or_cancel(&cancel).await {
        let scaled =
            tokio::task::spawn_blocking(move || scale_to_height(&frame, target_height)).await;

        match scaled {
            Ok(Ok(frame)) => {
                resized.put(frame);
            }
            Ok(Err(e)) => warn!("resize failed: {e}"),
            Err(e) => {
                warn!("resize worker failed: {e}");
                break;
            }
        }
    }

    debug!("resize stage finished");
}

async fn encode_stage(
    resized: Arc<LatestSlot<ResizedFrame>>,
    output: Arc<LatestSlot<EncodedFrame>>,
    encoder: FrameEncoder,
    cancel: CancellationToken,
) {
    debug!(quality = encoder.quality(), "encode stage started");
    let mut frame_number: u64 = 0;

    while let Some(frame) = resized.take_or_cancel(&cancel).await {
        let number = frame_number;
        let encoded =
            tokio::task::spawn_blocking(move || encoder.encode(&frame, number)).await;

        match encoded {
            Ok(Ok(frame)) => {
                output.put(frame);
                frame_number += 1;
            }
            Ok(Err(e)) => warn!("encode failed: {e}"),
            Err(e) => {
                warn!("encode worker failed: {e}");
                break;
            }
        }
    }

    debug!(frames = frame_number, "encode stage finished");
}

/// Sleep for the remainder of the frame interval.
fn pace(loop_start: Instant, interval: Duration) {
    let elapsed = loop_start.elapsed();
    if elapsed < interval {
        std::thread::sleep(interval - elapsed);
    }
}

// ── Tests ────────────────────────────────────────────────────────
