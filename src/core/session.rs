//! All state of one downloader session, changed only through [`Session::apply`].
//!
//! Every submission gets a new generation. Events produced on behalf of an
//! older submission (late responses, queued countdown ticks, progress of a
//! download started before the reset) carry that older generation and are
//! dropped.

use crate::core::downloader::Progress;
use crate::core::error::ClientError;
use crate::core::gate::UnlockGate;
use crate::core::metadata::VideoInfo;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestState {
    Idle,
    Loading { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DownloadTarget {
    /// Raw resolution as sent to the backend, e.g. `1920x1080`.
    Video { quality: String },
    /// Index into `VideoInfo::audio_formats`.
    Audio { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadStage {
    Requesting,
    Transferring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadStatus {
    pub target: DownloadTarget,
    pub stage: DownloadStage,
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub generation: u64,
    pub source_url: Option<String>,
    pub request: RequestState,
    pub info: Option<VideoInfo>,
    pub gate: UnlockGate,
    pub download: Option<DownloadStatus>,
    pub error: Option<String>,
    pub last_saved: Option<PathBuf>,
}

impl SessionState {
    fn new(gate: UnlockGate) -> Self {
        Self {
            generation: 0,
            source_url: None,
            request: RequestState::Idle,
            info: None,
            gate,
            download: None,
            error: None,
            last_saved: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.request, RequestState::Loading { .. })
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading()
    }

    pub fn can_unlock(&self) -> bool {
        self.info.is_some() && self.gate.next_step().is_some()
    }

    /// Download actions are only offered once the gate is open.
    pub fn can_download(&self) -> bool {
        self.info.is_some() && self.gate.is_unlocked() && self.download.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Submitted { generation: u64, url: String },
    ValidationFailed { generation: u64, error: ClientError },
    InfoLoaded { generation: u64, info: VideoInfo },
    InfoFailed { generation: u64, error: ClientError },
    Unlock { step: u32 },
    /// One countdown second for `step`; ticks for any other step are dropped.
    Tick { generation: u64, step: u32 },
    DownloadStarted { generation: u64, target: DownloadTarget },
    DownloadProgress { generation: u64, progress: Progress },
    DownloadFinished { generation: u64, path: PathBuf },
    DownloadFailed { generation: u64, error: ClientError },
    /// A command that could not be carried out; only the message changes.
    Rejected { error: ClientError },
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    next_generation: u64,
}

impl Session {
    pub fn new(unlock_steps: u32, countdown_secs: u32) -> Self {
        Self {
            state: SessionState::new(UnlockGate::new(unlock_steps, countdown_secs)),
            next_generation: 1,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Reserves the generation for the next `Submitted`/`ValidationFailed`.
    pub fn begin_submit(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn reset_for(&mut self, generation: u64) {
        let state = &mut self.state;
        state.generation = generation;
        state.source_url = None;
        state.request = RequestState::Idle;
        state.info = None;
        state.gate.reset();
        state.download = None;
        state.error = None;
        state.last_saved = None;
    }

    /// Applies one event and reports whether anything changed.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let current = self.state.generation;
        match event {
            SessionEvent::Submitted { generation, url } => {
                if generation <= current {
                    return false;
                }
                self.reset_for(generation);
                self.state.source_url = Some(url);
                self.state.request = RequestState::Loading { generation };
                true
            }
            SessionEvent::ValidationFailed { generation, error } => {
                if generation <= current {
                    return false;
                }
                self.reset_for(generation);
                self.state.error = Some(error.to_string());
                true
            }
            SessionEvent::InfoLoaded { generation, info } => {
                if self.state.request != (RequestState::Loading { generation }) {
                    debug!("dropping stale info for generation {}", generation);
                    return false;
                }
                self.state.request = RequestState::Idle;
                self.state.info = Some(info);
                self.state.error = None;
                self.state.gate.reset();
                self.state.download = None;
                true
            }
            SessionEvent::InfoFailed { generation, error } => {
                if self.state.request != (RequestState::Loading { generation }) {
                    debug!("dropping stale info failure for generation {}", generation);
                    return false;
                }
                self.state.request = RequestState::Idle;
                self.state.error = Some(error.to_string());
                true
            }
            SessionEvent::Unlock { step } => self.state.info.is_some() && self.state.gate.trigger(step),
            SessionEvent::Tick { generation, step } => {
                generation == current && self.state.gate.counting_step() == Some(step) && self.state.gate.tick()
            }
            SessionEvent::DownloadStarted { generation, target } => {
                if generation != current || !self.state.can_download() {
                    return false;
                }
                self.state.error = None;
                self.state.download = Some(DownloadStatus {
                    target,
                    stage: DownloadStage::Requesting,
                    progress: None,
                });
                true
            }
            SessionEvent::DownloadProgress { generation, progress } => {
                if generation != current {
                    return false;
                }
                let Some(download) = self.state.download.as_mut() else {
                    return false;
                };
                download.stage = DownloadStage::Transferring;
                // Never move backwards
                download.progress = match (download.progress, progress.percent) {
                    (Some(old), Some(new)) => Some(old.max(new)),
                    (old, new) => new.or(old),
                };
                true
            }
            SessionEvent::DownloadFinished { generation, path } => {
                if generation != current || self.state.download.take().is_none() {
                    return false;
                }
                self.state.last_saved = Some(path);
                true
            }
            SessionEvent::DownloadFailed { generation, error } => {
                if generation != current || self.state.download.take().is_none() {
                    return false;
                }
                self.state.error = Some(error.to_string());
                true
            }
            SessionEvent::Rejected { error } => {
                self.state.error = Some(error.to_string());
                true
            }
        }
    }
}
