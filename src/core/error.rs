use thiserror::Error;

/// Every failure a user action can end in. The `Display` output is the
/// message shown to the user; none of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend could not be reached.
    #[error("{0}")]
    Request(String),

    /// The backend answered with an error payload or a non-success status.
    #[error("{0}")]
    Application(String),

    /// Saving the downloaded file failed.
    #[error("Could not save file: {0}")]
    Io(String),
}

pub const EMPTY_URL_MESSAGE: &str = "Please enter a valid YouTube URL.";
pub const INFO_FAILED_MESSAGE: &str = "Failed to fetch video information.";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Download failed on the server.";
pub const UNREACHABLE_MESSAGE: &str = "Could not reach the download service.";

impl ClientError {
    pub fn empty_url() -> Self {
        Self::Validation(EMPTY_URL_MESSAGE.to_string())
    }

    /// Transport errors are logged in full but surfaced generically.
    pub fn transport(err: reqwest::Error) -> Self {
        tracing::warn!("request to backend failed: {}", err);
        Self::Request(UNREACHABLE_MESSAGE.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
