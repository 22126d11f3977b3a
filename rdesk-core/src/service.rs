//! Remote-control orchestrator.
//!
//! [`RemoteControlService`] is the single object the transport talks
//! to. It checks the session token on every privileged call and routes
//! the call to the session manager, the capture pipeline, the file
//! store or one of the host actuators.
//!
//! Nothing fails across this boundary: rejected tokens and lower-level
//! faults are logged and reported as the sentinel token, `false`, or an
//! empty screenshot.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::actuator::{InputActuator, PowerActuator, Unsupported, VolumeActuator};
use crate::error::RemoteError;
use crate::files::{ChunkedFileStore, DEFAULT_MEDIA_DIR};
use crate::pipeline::{CaptureBackend, CapturePipeline, PipelineConfig};
use crate::protocol::{Request, Response};
use crate::session::{SessionConfig, SessionHooks, SessionManager, Token};

// ── ServiceConfig ────────────────────────────────────────────────

/// Configuration for [`RemoteControlService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub session: SessionConfig,
    pub pipeline: PipelineConfig,
    /// Where completed uploads are written.
    pub media_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            pipeline: PipelineConfig::default(),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
        }
    }
}

/// Host collaborators the service forwards to.
#[derive(Clone)]
pub struct Actuators {
    pub input: Arc<dyn InputActuator>,
    pub volume: Arc<dyn VolumeActuator>,
    pub power: Arc<dyn PowerActuator>,
}

impl Default for Actuators {
    fn default() -> Self {
        Self {
            input: Arc::new(Unsupported),
            volume: Arc::new(Unsupported),
            power: Arc::new(Unsupported),
        }
    }
}

// ── RemoteControlService ─────────────────────────────────────────

/// Validates tokens and routes calls to the engine components.
///
/// Owned by the host and shared with the transport through an `Arc`;
/// there is no global instance.
pub struct RemoteControlService {
    session: SessionManager,
    pipeline: CapturePipeline,
    files: Arc<ChunkedFileStore>,
    actuators: Actuators,
}

impl RemoteControlService {
    /// Wire up the engine from its collaborators.
    pub fn new(
        config: ServiceConfig,
        hooks: Arc<dyn SessionHooks>,
        capture: Arc<dyn CaptureBackend>,
        actuators: Actuators,
    ) -> Self {
        let files = Arc::new(ChunkedFileStore::new(config.media_dir));
        let session = SessionManager::with_config(hooks, Arc::clone(&files), config.session);
        let pipeline = CapturePipeline::with_config(capture, config.pipeline);

        Self {
            session,
            pipeline,
            files,
            actuators,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub fn files(&self) -> &ChunkedFileStore {
        &self.files
    }

    /// `true` if `token` is the live session; logs the rejection
    /// otherwise.
    fn authorize(&self, op: &str, token: Token) -> bool {
        if self.session.validate(token) {
            true
        } else {
            warn!(%token, "{op}: invalid token received");
            false
        }
    }

    // ── Session ─────────────────────────────────────────────────

    /// Attach a controller. Returns the sentinel on failure.
    pub fn connect(&self, password: u16) -> Token {
        match self.session.connect(password) {
            Ok(token) => token,
            Err(e) => {
                debug!("connect: {e}");
                Token::SENTINEL
            }
        }
    }

    /// Detach the controller.
    pub fn disconnect(&self, token: Token) -> bool {
        match self.session.disconnect(token) {
            Ok(()) => true,
            Err(e) => {
                warn!("disconnect: {e}");
                false
            }
        }
    }

    /// Confirm the controller is still there.
    pub fn ping(&self, token: Token) -> bool {
        match self.session.ping(token) {
            Ok(()) => {
                debug!("ping received");
                true
            }
            Err(_) => {
                warn!(%token, "ping: invalid token received");
                false
            }
        }
    }

    // ── Screen ──────────────────────────────────────────────────

    /// Latest compressed screenshot, starting the pipeline on first use.
    ///
    /// `None` if the token is rejected, the pipeline cannot start, or no
    /// new frame has been produced since the last call.
    pub async fn get_screenshot(&self, token: Token) -> Option<Vec<u8>> {
        if !self.authorize("getScreenShot", token) {
            return None;
        }

        if !self.pipeline.is_started() {
            if let Err(e) = self.pipeline.start().await {
                error!("getScreenShot: {e}");
                return None;
            }
        }

        self.pipeline.get()
    }

    // ── Input and volume ────────────────────────────────────────

    pub fn key_press(&self, token: Token, key_code: i32) {
        if self.authorize("keyPress", token) {
            debug!(key_code, "keyPress");
            report("keyPress", self.actuators.input.key_press(key_code));
        }
    }

    pub fn key_release(&self, token: Token, key_code: i32) {
        if self.authorize("keyRelease", token) {
            debug!(key_code, "keyRelease");
            report("keyRelease", self.actuators.input.key_release(key_code));
        }
    }

    pub fn mouse_press(&self, token: Token, button: i32) {
        if self.authorize("mousePress", token) {
            debug!(button, "mousePress");
            report("mousePress", self.actuators.input.mouse_press(button));
        }
    }

    pub fn mouse_release(&self, token: Token, button: i32) {
        if self.authorize("mouseRelease", token) {
            debug!(button, "mouseRelease");
            report("mouseRelease", self.actuators.input.mouse_release(button));
        }
    }

    /// See [`InputActuator::mouse_move`] for the coordinate convention.
    pub fn mouse_move(&self, token: Token, x: f32, y: f32, absolute: bool) {
        if self.authorize("mouseMove", token) {
            debug!(x, y, absolute, "mouseMove");
            report("mouseMove", self.actuators.input.mouse_move(x, y, absolute));
        }
    }

    pub fn mouse_scroll(&self, token: Token, direction: i16) {
        if self.authorize("mouseScroll", token) {
            debug!(direction, "mouseScroll");
            report("mouseScroll", self.actuators.input.mouse_scroll(direction));
        }
    }

    pub fn change_volume(&self, token: Token, delta: f32) {
        if self.authorize("changeVolume", token) {
            debug!(delta, "changeVolume");
            report("changeVolume", self.actuators.volume.change_volume(delta));
        }
    }

    // ── Files ───────────────────────────────────────────────────

    /// Store one chunk of `file_name`; `None` completes the upload.
    pub async fn send_file(&self, token: Token, file_name: &str, chunk: Option<Bytes>) -> bool {
        if !self.authorize("sendFile", token) {
            return false;
        }

        debug!(file_name, end = chunk.is_none(), "sendFile: chunk received");
        match self.files.add(file_name, chunk).await {
            Ok(()) => true,
            Err(e) => {
                error!(file_name, "sendFile: {e}");
                false
            }
        }
    }

    // ── Power ───────────────────────────────────────────────────

    pub async fn shutdown(&self, token: Token) -> bool {
        if !self.authorize("shutdown", token) {
            return false;
        }
        info!("shutdown requested");
        report("shutdown", self.actuators.power.shutdown().await)
    }

    pub async fn restart(&self, token: Token) -> bool {
        if !self.authorize("restart", token) {
            return false;
        }
        info!("restart requested");
        report("restart", self.actuators.power.restart().await)
    }

    // ── Dispatch ────────────────────────────────────────────────

    /// Run one decoded call and shape its result.
    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Connect { password } => Response::Token(self.connect(password)),
            Request::Disconnect { token } => Response::Success(self.disconnect(token)),
            Request::GetScreenShot { token } => {
                Response::Screenshot(self.get_screenshot(token).await)
            }
            Request::KeyPress { token, key_code } => {
                self.key_press(token, key_code);
                Response::Done
            }
            Request::KeyRelease { token, key_code } => {
                self.key_release(token, key_code);
                Response::Done
            }
            Request::MousePress { token, button } => {
                self.mouse_press(token, button);
                Response::Done
            }
            Request::MouseRelease { token, button } => {
                self.mouse_release(token, button);
                Response::Done
            }
            Request::MouseMove {
                token,
                x,
                y,
                absolute,
            } => {
                self.mouse_move(token, x, y, absolute);
                Response::Done
            }
            Request::MouseScroll { token, direction } => {
                self.mouse_scroll(token, direction);
                Response::Done
            }
            Request::ChangeVolume { token, delta } => {
                self.change_volume(token, delta);
                Response::Done
            }
            Request::SendFile {
                token,
                file_name,
                chunk,
            } => Response::Success(
                self.send_file(token, &file_name, chunk.map(Bytes::from))
                    .await,
            ),
            Request::Ping { token } => Response::Success(self.ping(token)),
            Request::Shutdown { token } => Response::Success(self.shutdown(token).await),
            Request::Restart { token } => Response::Success(self.restart(token).await),
        }
    }

    /// Tear everything down: stop the pipeline and drop the session.
    pub async fn close(&self) {
        self.pipeline.destroy().await;
        self.session.close();
        info!("remote control service closed");
    }
}

/// Log an actuator failure; `true` on success.
fn report(op: &str, result: Result<(), RemoteError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("{op}: {e}");
            false
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoCapture;
    use crate::session::StaticPassword;
    use std::sync::Mutex;

    const PASSWORD: u16 = 2468;

    #[derive(Default)]
    struct RecordingInput {
        events: Mutex<Vec<String>>,
    }

    impl RecordingInput {
        fn push(&self, event: String) -> Result<(), RemoteError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl InputActuator for RecordingInput {
        fn key_press(&self, key_code: i32) -> Result<(), RemoteError> {
            self.push(format!("key_press {key_code}"))
        }

        fn key_release(&self, key_code: i32) -> Result<(), RemoteError> {
            self.push(format!("key_release {key_code}"))
        }

        fn mouse_press(&self, button: i32) -> Result<(), RemoteError> {
            self.push(format!("mouse_press {button}"))
        }

        fn mouse_release(&self, button: i32) -> Result<(), RemoteError> {
            self.push(format!("mouse_release {button}"))
        }

        fn mouse_move(&self, x: f32, y: f32, absolute: bool) -> Result<(), RemoteError> {
            self.push(format!("mouse_move {x} {y} {absolute}"))
        }

        fn mouse_scroll(&self, direction: i16) -> Result<(), RemoteError> {
            self.push(format!("mouse_scroll {direction}"))
        }
    }

    fn service(dir: &std::path::Path, input: Arc<RecordingInput>) -> RemoteControlService {
        let config = ServiceConfig {
            media_dir: dir.join("Media"),
            ..Default::default()
        };
        let actuators = Actuators {
            input,
            ..Default::default()
        };
        RemoteControlService::new(
            config,
            Arc::new(StaticPassword(PASSWORD)),
            Arc::new(NoCapture),
            actuators,
        )
    }

    #[tokio::test]
    async fn input_is_forwarded_only_with_live_token() {
        let tmp = tempfile::tempdir().unwrap();
        let input = Arc::new(RecordingInput::default());
        let svc = service(tmp.path(), Arc::clone(&input));

        let token = svc.connect(PASSWORD);
        assert!(!token.is_sentinel());

        svc.key_press(Token::from_raw(token.raw().wrapping_add(1)), 65);
        svc.mouse_press(Token::SENTINEL, 1024);
        assert!(input.events().is_empty());

        svc.key_press(token, 65);
        svc.key_release(token, 65);
        svc.mouse_move(token, 0.5, 0.25, true);
        svc.mouse_scroll(token, -1);
        assert_eq!(
            input.events(),
            vec![
                "key_press 65",
                "key_release 65",
                "mouse_move 0.5 0.25 true",
                "mouse_scroll -1",
            ]
        );
    }

    #[tokio::test]
    async fn failed_connect_returns_sentinel() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());

        assert!(svc.connect(PASSWORD + 1).is_sentinel());
        let token = svc.connect(PASSWORD);
        assert!(svc.connect(PASSWORD).is_sentinel());
        assert_eq!(svc.session().active_token(), Some(token));
    }

    #[tokio::test]
    async fn screenshot_without_capture_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());
        let token = svc.connect(PASSWORD);

        assert_eq!(svc.get_screenshot(token).await, None);
        assert!(!svc.pipeline().is_started());
    }

    #[tokio::test]
    async fn rejected_token_skips_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());
        let token = svc.connect(PASSWORD);

        let stale = Token::from_raw(token.raw().wrapping_add(1));
        assert!(!svc.send_file(stale, "a.bin", Some(Bytes::from_static(b"x"))).await);
        assert_eq!(svc.files().pending_count(), 0);

        assert!(svc.send_file(token, "a.bin", Some(Bytes::from_static(b"x"))).await);
        assert_eq!(svc.files().pending_count(), 1);
    }

    #[tokio::test]
    async fn actuator_failures_become_false() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());
        let token = svc.connect(PASSWORD);

        // Default power actuator is `Unsupported`.
        assert!(!svc.shutdown(token).await);
        assert!(!svc.restart(Token::SENTINEL).await);
        // Volume failure is logged, not surfaced.
        svc.change_volume(token, 0.1);
        assert!(svc.session().is_connected());
    }

    #[tokio::test]
    async fn dispatch_shapes_responses() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());

        let Response::Token(token) = svc.dispatch(Request::Connect { password: PASSWORD }).await
        else {
            panic!("connect must answer with a token");
        };
        assert_eq!(
            svc.dispatch(Request::Ping { token }).await,
            Response::Success(true)
        );
        assert_eq!(
            svc.dispatch(Request::KeyPress { token, key_code: 10 }).await,
            Response::Done
        );
        assert_eq!(
            svc.dispatch(Request::Disconnect { token }).await,
            Response::Success(true)
        );
        assert_eq!(
            svc.dispatch(Request::Ping { token }).await,
            Response::Success(false)
        );
    }

    #[tokio::test]
    async fn close_ends_the_session() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::default());
        let token = svc.connect(PASSWORD);

        svc.close().await;
        assert!(!svc.session().validate(token));
        assert!(!svc.pipeline().is_started());
    }
}
