use crate::config::{Config, DownloadContract};
use crate::core::error::{ClientError, ClientResult, DOWNLOAD_FAILED_MESSAGE, INFO_FAILED_MESSAGE};
use crate::core::metadata::{ErrorBody, InfoResponse, VideoInfo};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// HTTP client for the downloader backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    contract: DownloadContract,
    lookup_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct InfoRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum ProcessRequest<'a> {
    UrlAndTitle {
        url: &'a str,
        quality: &'a str,
        title: &'a str,
    },
    VideoId {
        video_id: &'a str,
        quality: &'a str,
    },
}

impl ApiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(config.timeout))
            .read_timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            base: config.api_url()?,
            contract: config.download_contract,
            lookup_timeout: Duration::from_secs(config.timeout),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Request(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Fetches metadata for `url`. Blank input fails without touching the network.
    pub async fn get_info(&self, url: &str) -> ClientResult<VideoInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ClientError::empty_url());
        }

        let endpoint = self.endpoint("api/get-info")?;
        info!("Fetching video info for {}", url);
        let response = self
            .client
            .post(endpoint)
            .timeout(self.lookup_timeout)
            .json(&InfoRequest { url })
            .send()
            .await
            .map_err(ClientError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::transport)?;
        debug!("get-info answered {} ({} bytes)", status, body.len());

        match serde_json::from_slice::<InfoResponse>(&body) {
            Ok(InfoResponse::Failure { error }) => Err(ClientError::Application(error)),
            Ok(InfoResponse::Info(info)) if status.is_success() => Ok(info),
            _ => Err(ClientError::Application(INFO_FAILED_MESSAGE.to_string())),
        }
    }

    pub(crate) fn process_request<'a>(
        &self,
        source_url: &'a str,
        info: &'a VideoInfo,
        quality: &'a str,
    ) -> ClientResult<ProcessRequest<'a>> {
        match self.contract {
            DownloadContract::UrlAndTitle => Ok(ProcessRequest::UrlAndTitle {
                url: source_url,
                quality,
                title: &info.title,
            }),
            DownloadContract::VideoId => {
                let video_id = info.video_id.as_deref().ok_or_else(|| {
                    ClientError::Application("The server did not return a video id.".to_string())
                })?;
                Ok(ProcessRequest::VideoId { video_id, quality })
            }
        }
    }

    /// Asks the backend to prepare `quality` and returns the response whose
    /// body is the file.
    pub async fn process_download(
        &self,
        source_url: &str,
        info: &VideoInfo,
        quality: &str,
    ) -> ClientResult<reqwest::Response> {
        let payload = self.process_request(source_url, info, quality)?;
        let endpoint = self.endpoint("api/process-download")?;
        info!("Requesting {} download of \"{}\"", quality, info.title);

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(ClientError::transport)?;

        ensure_success(response).await
    }
}

/// Passes successful responses through; turns anything else into the
/// server's `error` message or the generic download failure.
pub(crate) async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| DOWNLOAD_FAILED_MESSAGE.to_string());
    tracing::warn!("download request failed with HTTP {}: {}", status, message);
    Err(ClientError::Application(message))
}
