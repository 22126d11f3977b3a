//! # rdesk-server: remote control server
//!
//! Lets one controller at a time watch the screen, drive keyboard and
//! mouse, change the volume, upload files and power the machine off.
//!
//! The engine lives in `rdesk-core`; this crate adds configuration,
//! the TCP front end, session hooks and the host backends (DXGI
//! capture, `SendInput`, endpoint volume on Windows).

pub mod config;
pub mod hooks;
pub mod platform;
pub mod service;
