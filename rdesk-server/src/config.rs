//! Configuration for the remote-control server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rdesk_core::{PipelineConfig, ServiceConfig, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Session and authentication.
    pub session: SessionSettings,
    /// Screen streaming.
    pub screen: ScreenConfig,
    /// Upload storage.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the control listener on.
    pub bind_address: String,
    /// Ports tried in order; the first free one is used.
    pub ports: Vec<u16>,
    /// Largest accepted request frame in bytes.
    pub max_frame_bytes: usize,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Connection password; `0` generates a 4-digit one at start-up.
    pub password: u16,
    /// Heartbeat window in seconds.
    pub heartbeat_secs: u64,
    /// Require the live token on disconnect.
    pub strict_disconnect: bool,
}

/// Screen streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Output height in pixels.
    pub target_height: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Unclaimed captures before the pipeline stops itself.
    pub idle_frame_limit: u32,
    /// Capture rate cap; 0 = unlimited.
    pub max_fps: u32,
    /// Grace period for stopping the pipeline, in milliseconds.
    pub destroy_grace_ms: u64,
    /// Monitor index to capture (0 = primary).
    pub monitor_index: u32,
}

/// Upload storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory completed uploads are written to.
    pub media_dir: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            ports: vec![40000, 40001, 40002, 40003],
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            password: 0,
            heartbeat_secs: 5,
            strict_disconnect: false,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            target_height: pipeline.target_height,
            jpeg_quality: pipeline.jpeg_quality,
            idle_frame_limit: pipeline.idle_frame_limit,
            max_fps: pipeline.max_fps,
            destroy_grace_ms: pipeline.destroy_grace.as_millis() as u64,
            monitor_index: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from(rdesk_core::files::DEFAULT_MEDIA_DIR),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Session settings for the core.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat_window: Duration::from_secs(self.session.heartbeat_secs.max(1)),
            strict_disconnect: self.session.strict_disconnect,
        }
    }

    /// Pipeline settings for the core.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            target_height: self.screen.target_height.max(1),
            jpeg_quality: self.screen.jpeg_quality.clamp(1, 100),
            idle_frame_limit: self.screen.idle_frame_limit,
            max_fps: self.screen.max_fps,
            destroy_grace: Duration::from_millis(self.screen.destroy_grace_ms),
            ..PipelineConfig::default()
        }
    }

    /// Everything [`rdesk_core::RemoteControlService`] needs.
    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig {
            session: self.to_session_config(),
            pipeline: self.to_pipeline_config(),
            media_dir: self.storage.media_dir.clone(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ServerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("ports"));
        assert!(text.contains("target_height"));
        assert!(text.contains("media_dir"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ServerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ServerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.ports, vec![40000, 40001, 40002, 40003]);
        assert_eq!(parsed.screen.target_height, 720);
        assert_eq!(parsed.screen.idle_frame_limit, 100);
        assert_eq!(parsed.session.heartbeat_secs, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed: ServerConfig = toml::from_str(
            r#"
            [session]
            password = 4321

            [screen]
            jpeg_quality = 60
            "#,
        )
        .unwrap();
        assert_eq!(parsed.session.password, 4321);
        assert!(!parsed.session.strict_disconnect);
        assert_eq!(parsed.screen.jpeg_quality, 60);
        assert_eq!(parsed.screen.destroy_grace_ms, 500);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn conversions_clamp() {
        let mut cfg = ServerConfig::default();
        cfg.screen.jpeg_quality = 0;
        cfg.screen.target_height = 0;
        cfg.session.heartbeat_secs = 0;

        let svc = cfg.to_service_config();
        assert_eq!(svc.pipeline.jpeg_quality, 1);
        assert_eq!(svc.pipeline.target_height, 1);
        assert_eq!(svc.session.heartbeat_window, Duration::from_secs(1));
        assert_eq!(svc.pipeline.destroy_grace, Duration::from_millis(500));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ServerConfig::load(&tmp.path().join("absent.toml"));
        assert_eq!(cfg.network.bind_address, "0.0.0.0");

        let path = tmp.path().join("rdesk-server.toml");
        ServerConfig::write_default(&path).unwrap();
        let cfg = ServerConfig::load(&path);
        assert_eq!(cfg.storage.media_dir, PathBuf::from("Media"));
    }
}
