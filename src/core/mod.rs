pub mod api;
pub mod countdown;
pub mod downloader;
pub mod error;
pub mod gate;
pub mod metadata;
pub mod opener;
pub mod session;

pub use api::ApiClient;
pub use countdown::Countdown;
pub use downloader::{DirectorySink, Downloader, FileSink, Progress};
pub use error::{ClientError, ClientResult};
pub use gate::{GateState, UnlockGate};
pub use metadata::{AudioFormat, VideoFormat, VideoInfo};
pub use opener::{LinkOpener, LogOpener, SystemOpener};
pub use session::{DownloadStage, DownloadStatus, DownloadTarget, RequestState, Session, SessionEvent, SessionState};
