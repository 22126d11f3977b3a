//! Integration tests: full controller sessions against the public
//! service API, with a scripted screen and on-disk uploads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use bytes::Bytes;
use rdesk_core::{
    Actuators, CaptureBackend, PixelFormat, RawScreenFrame, RemoteControlService, RemoteError,
    Request, Response, ScreenCapturer, ServiceConfig, SessionHooks, Token, VolumeActuator,
};

const PASSWORD: u16 = 1357;

// ── Fakes ────────────────────────────────────────────────────────

#[derive(Default)]
struct Hooks {
    connected: AtomicUsize,
    disconnected: AtomicUsize,
}

impl SessionHooks for Hooks {
    fn verify_password(&self, candidate: u16) -> bool {
        candidate == PASSWORD
    }

    fn client_connected(&self) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn client_disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

/// Emits a fresh frame every time it is asked, up to `budget` frames.
struct SteadyScreen {
    budget: usize,
}

struct SteadyCapturer {
    remaining: usize,
}

impl CaptureBackend for SteadyScreen {
    fn open(&self) -> Result<Box<dyn ScreenCapturer>, RemoteError> {
        Ok(Box::new(SteadyCapturer {
            remaining: self.budget,
        }))
    }
}

impl ScreenCapturer for SteadyCapturer {
    fn capture(&mut self) -> Result<Option<RawScreenFrame>, RemoteError> {
        std::thread::sleep(Duration::from_millis(5));
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RawScreenFrame::packed(
            160,
            90,
            PixelFormat::Bgra8,
            vec![0x7F; 160 * 90 * 4],
        )))
    }
}

/// Frames are pushed by the test.
struct ManualScreen {
    frames: Mutex<Option<mpsc::Receiver<RawScreenFrame>>>,
}

struct ManualCapturer(mpsc::Receiver<RawScreenFrame>);

impl CaptureBackend for ManualScreen {
    fn open(&self) -> Result<Box<dyn ScreenCapturer>, RemoteError> {
        let rx = self
            .frames
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RemoteError::Capture("screen already opened".into()))?;
        Ok(Box::new(ManualCapturer(rx)))
    }
}

impl ScreenCapturer for ManualCapturer {
    fn capture(&mut self) -> Result<Option<RawScreenFrame>, RemoteError> {
        match self.0.recv_timeout(Duration::from_millis(10)) {
            Ok(frame) => Ok(Some(frame)),
            Err(_) => Ok(None),
        }
    }
}

#[derive(Default)]
struct Speaker {
    level: Mutex<f32>,
}

impl VolumeActuator for Speaker {
    fn change_volume(&self, delta: f32) -> Result<(), RemoteError> {
        let mut level = self.level.lock().unwrap();
        *level = rdesk_core::apply_volume_delta(*level, delta);
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

struct Fixture {
    service: Arc<RemoteControlService>,
    hooks: Arc<Hooks>,
    media: std::path::PathBuf,
    _tmp: tempfile::TempDir,
}

fn fixture(capture: Arc<dyn CaptureBackend>, actuators: Actuators) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let media = tmp.path().join("Media");
    let hooks = Arc::new(Hooks::default());

    let mut config = ServiceConfig {
        media_dir: media.clone(),
        ..Default::default()
    };
    config.pipeline.target_height = 45;
    config.pipeline.max_fps = 0;

    let service = Arc::new(RemoteControlService::new(
        config,
        Arc::clone(&hooks) as Arc<dyn SessionHooks>,
        capture,
        actuators,
    ));
    Fixture {
        service,
        hooks,
        media,
        _tmp: tmp,
    }
}

async fn screenshot_within(svc: &RemoteControlService, token: Token) -> Option<Vec<u8>> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(jpeg) = svc.get_screenshot(token).await {
                return jpeg;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .ok()
}

// ── Session lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn full_controller_session() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 1_000 }), Actuators::default());
    let svc = &fx.service;

    let token = svc.connect(PASSWORD);
    assert!(!token.is_sentinel());
    assert!(token.raw() > 0);
    assert_eq!(fx.hooks.connected.load(Ordering::SeqCst), 1);

    // Screen: first call starts the pipeline, a JPEG follows.
    let jpeg = screenshot_within(svc, token).await.expect("no screenshot");
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    assert!(svc.pipeline().is_started());

    // Upload: two chunks and an end marker.
    assert!(svc.send_file(token, "a.bin", Some(Bytes::from_static(b"hello "))).await);
    assert!(svc.send_file(token, "a.bin", Some(Bytes::from_static(b"world"))).await);
    assert!(svc.send_file(token, "a.bin", None).await);
    let written = tokio::fs::read(fx.media.join("a.bin")).await.unwrap();
    assert_eq!(written, b"hello world");

    assert!(svc.ping(token));
    assert!(svc.disconnect(token));
    assert_eq!(fx.hooks.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(svc.get_screenshot(token).await, None);

    svc.close().await;
    assert!(!svc.pipeline().is_started());
}

#[tokio::test]
async fn reconnect_issues_a_new_token() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());
    let svc = &fx.service;

    let first = svc.connect(PASSWORD);
    assert!(svc.disconnect(first));
    let second = svc.connect(PASSWORD);

    assert!(!second.is_sentinel());
    assert_ne!(first, second);
    assert!(!svc.session().validate(first));
    assert!(svc.session().validate(second));
}

#[tokio::test]
async fn disconnect_accepts_any_non_sentinel_token() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());
    let svc = &fx.service;

    let token = svc.connect(PASSWORD);
    assert!(!svc.disconnect(Token::SENTINEL));
    assert!(svc.session().validate(token));

    // A token that was never issued still ends the live session.
    let other = Token::from_raw(if token.raw() == 1 { 2 } else { 1 });
    assert!(svc.disconnect(other));
    assert!(!svc.session().is_connected());
}

#[tokio::test]
async fn abandoned_upload_is_never_written() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());
    let svc = &fx.service;

    let token = svc.connect(PASSWORD);
    assert!(svc.send_file(token, "b.bin", Some(Bytes::from_static(b"partial"))).await);
    assert!(svc.disconnect(token));

    let token = svc.connect(PASSWORD);
    assert!(svc.send_file(token, "b.bin", None).await);
    // Only the end marker survived the reconnect: the file is empty.
    let written = tokio::fs::read(fx.media.join("b.bin")).await.unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn concurrent_connects_admit_exactly_one() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let svc = Arc::clone(&fx.service);
            tokio::spawn(async move { svc.connect(PASSWORD) })
        })
        .collect();

    let mut admitted = 0;
    for attempt in attempts {
        if !attempt.await.unwrap().is_sentinel() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(fx.hooks.connected.load(Ordering::SeqCst), 1);
}

// ── Heartbeat ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn silent_controller_is_dropped() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());
    let svc = &fx.service;

    let token = svc.connect(PASSWORD);
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(!svc.session().is_connected());
    assert!(!svc.ping(token));
    assert_eq!(fx.hooks.disconnected.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn pinging_controller_stays_connected() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), Actuators::default());
    let svc = &fx.service;

    let token = svc.connect(PASSWORD);
    for _ in 0..20 {
        assert!(svc.ping(token));
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    assert!(svc.session().validate(token));
}

// ── Screen ───────────────────────────────────────────────────────

#[tokio::test]
async fn each_frame_is_delivered_once() {
    let (tx, rx) = mpsc::channel();
    let screen = ManualScreen {
        frames: Mutex::new(Some(rx)),
    };
    let fx = fixture(Arc::new(screen), Actuators::default());
    let svc = &fx.service;
    let token = svc.connect(PASSWORD);

    // Starts the pipeline; nothing captured yet.
    assert_eq!(svc.get_screenshot(token).await, None);

    tx.send(RawScreenFrame::packed(
        320,
        180,
        PixelFormat::Rgb8,
        vec![0x20; 320 * 180 * 3],
    ))
    .unwrap();
    let jpeg = screenshot_within(svc, token).await.expect("no screenshot");
    assert!(!jpeg.is_empty());

    assert_eq!(svc.get_screenshot(token).await, None);
    svc.close().await;
}

#[tokio::test]
async fn unwatched_pipeline_stops_and_restarts_on_demand() {
    let fx = fixture(Arc::new(SteadyScreen { budget: 150 }), Actuators::default());
    let svc = &fx.service;
    let token = svc.connect(PASSWORD);

    let _ = svc.get_screenshot(token).await;
    tokio::time::timeout(Duration::from_secs(10), async {
        while svc.pipeline().is_started() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline kept running without consumers");

    svc.close().await;
}

// ── Dispatch ─────────────────────────────────────────────────────

#[tokio::test]
async fn dispatch_over_the_wire_format() {
    let speaker = Arc::new(Speaker::default());
    let actuators = Actuators {
        volume: Arc::clone(&speaker) as Arc<dyn VolumeActuator>,
        ..Default::default()
    };
    let fx = fixture(Arc::new(SteadyScreen { budget: 0 }), actuators);
    let svc = &fx.service;

    let call = |request: Request| {
        let bytes = request.to_bytes().unwrap();
        async move {
            let request = Request::from_bytes(&bytes).unwrap();
            let response = svc.dispatch(request).await;
            Response::from_bytes(&response.to_bytes().unwrap()).unwrap()
        }
    };

    let Response::Token(token) = call(Request::Connect { password: PASSWORD }).await else {
        panic!("connect must answer with a token");
    };
    assert!(!token.is_sentinel());

    assert_eq!(
        call(Request::ChangeVolume { token, delta: 0.75 }).await,
        Response::Done
    );
    assert_eq!(
        call(Request::ChangeVolume { token, delta: 0.5 }).await,
        Response::Done
    );
    assert_eq!(*speaker.level.lock().unwrap(), 1.0);

    assert_eq!(
        call(Request::SendFile {
            token,
            file_name: "../escape.bin".into(),
            chunk: Some(vec![1]),
        })
        .await,
        Response::Success(false)
    );
    assert_eq!(
        call(Request::Shutdown {
            token: Token::SENTINEL
        })
        .await,
        Response::Success(false)
    );
    assert_eq!(
        call(Request::Disconnect { token }).await,
        Response::Success(true)
    );
}
