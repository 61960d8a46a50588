pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

pub use app::{App, Command};
pub use config::Config;
pub use core::{ApiClient, ClientError, Session, SessionEvent, SessionState, UnlockGate, VideoInfo};
