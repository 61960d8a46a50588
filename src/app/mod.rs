//! Event loop tying user commands, backend calls and the countdown to one
//! [`Session`]. The loop is the only writer of session state; spawned tasks
//! just do IO and report back through a channel.

use crate::config::Config;
use crate::core::{
    ApiClient, ClientError, Countdown, DirectorySink, DownloadTarget, Downloader, FileSink,
    LinkOpener, Session, SessionEvent, SessionState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    /// Trigger whichever unlock step is due next.
    Unlock,
    /// Resolution (`1920x1080`) or label (`1080p`).
    DownloadVideo(String),
    DownloadAudio(usize),
    Quit,
}

pub struct App {
    ad_link: String,
    api: ApiClient,
    downloader: Arc<Downloader>,
    opener: Arc<dyn LinkOpener>,
    session: Session,
    countdown: Option<Countdown>,
    /// The download in flight, aborted when its submission is superseded.
    download: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshots: watch::Sender<SessionState>,
}

impl App {
    pub fn new(config: &Config, api: ApiClient, opener: Arc<dyn LinkOpener>, sink: Arc<dyn FileSink>) -> Self {
        let session = Session::new(config.unlock_steps, config.countdown_secs);
        let (snapshots, _) = watch::channel(session.state().clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let downloader = Arc::new(Downloader::new(api.clone(), config.transfer_mode, sink));

        Self {
            ad_link: config.ad_link.clone(),
            api,
            downloader,
            opener,
            session,
            countdown: None,
            download: None,
            events_tx,
            events_rx,
            snapshots,
        }
    }

    /// Convenience constructor saving into `config.output_dir`.
    pub fn from_config(config: &Config, opener: Arc<dyn LinkOpener>) -> anyhow::Result<Self> {
        let api = ApiClient::new(config)?;
        let sink = Arc::new(DirectorySink::new(config.output_dir.clone()));
        Ok(Self::new(config, api, opener, sink))
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// Runs until `Command::Quit` or until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.stop_countdown();
        self.abort_download();
        info!("Session closed");
        Ok(())
    }

    pub fn handle_command(&mut self, command: Command) {
        debug!("command: {:?}", command);
        match command {
            Command::Submit(url) => self.submit(url),
            Command::Unlock => self.unlock(),
            Command::DownloadVideo(quality) => self.download_video(&quality),
            Command::DownloadAudio(index) => self.download_audio(index),
            Command::Quit => {
                self.stop_countdown();
                self.abort_download();
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        let is_tick = matches!(event, SessionEvent::Tick { .. });
        let changed = self.session.apply(event);
        if is_tick && !self.session.state().gate.is_counting() {
            self.stop_countdown();
        }
        if changed {
            self.publish();
        }
    }

    fn apply(&mut self, event: SessionEvent) -> bool {
        let changed = self.session.apply(event);
        if changed {
            self.publish();
        }
        changed
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.state().clone());
    }

    fn stop_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    fn abort_download(&mut self) {
        if let Some(task) = self.download.take() {
            if !task.is_finished() {
                info!("Cancelling download of the previous video");
            }
            task.abort();
        }
    }

    fn submit(&mut self, url: String) {
        if !self.session.state().can_submit() {
            warn!("ignoring submit while a lookup is in flight");
            return;
        }

        self.stop_countdown();
        self.abort_download();
        let generation = self.session.begin_submit();
        let url = url.trim().to_string();
        if url.is_empty() {
            self.apply(SessionEvent::ValidationFailed {
                generation,
                error: ClientError::empty_url(),
            });
            return;
        }

        self.apply(SessionEvent::Submitted {
            generation,
            url: url.clone(),
        });

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match api.get_info(&url).await {
                Ok(info) => SessionEvent::InfoLoaded { generation, info },
                Err(error) => SessionEvent::InfoFailed { generation, error },
            };
            let _ = tx.send(event);
        });
    }

    fn unlock(&mut self) {
        let state = self.session.state();
        let Some(step) = state.gate.next_step().filter(|_| state.can_unlock()) else {
            debug!("nothing to unlock right now");
            return;
        };
        if !self.apply(SessionEvent::Unlock { step }) {
            return;
        }

        info!("Unlock step {} started", step);
        self.opener.open(&self.ad_link);

        self.stop_countdown();
        if self.session.state().gate.is_counting() {
            let tx = self.events_tx.clone();
            let generation = self.session.generation();
            self.countdown = Some(Countdown::start(TICK_PERIOD, move || {
                let _ = tx.send(SessionEvent::Tick { generation, step });
            }));
        }
    }

    fn download_video(&mut self, quality: &str) {
        let state = self.session.state();
        if !state.can_download() {
            warn!("download requested before the gate opened or while busy");
            return;
        }
        let (Some(info), Some(source_url)) = (state.info.clone(), state.source_url.clone()) else {
            return;
        };
        let Some(format) = info.find_video_format(quality) else {
            self.apply(SessionEvent::Rejected {
                error: ClientError::Validation(format!("No {} format for this video.", quality)),
            });
            return;
        };

        let resolution = format.resolution.clone();
        let generation = self.session.generation();
        if !self.apply(SessionEvent::DownloadStarted {
            generation,
            target: DownloadTarget::Video {
                quality: resolution.clone(),
            },
        }) {
            return;
        }

        let downloader = self.downloader.clone();
        let tx = self.events_tx.clone();
        self.download = Some(tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = downloader
                .download_video(&source_url, &info, &resolution, move |progress| {
                    let _ = progress_tx.send(SessionEvent::DownloadProgress { generation, progress });
                })
                .await;
            let _ = tx.send(finished(generation, result));
        }));
    }

    fn download_audio(&mut self, index: usize) {
        let state = self.session.state();
        if !state.can_download() {
            warn!("download requested before the gate opened or while busy");
            return;
        }
        let Some(format) = state.info.as_ref().and_then(|info| info.audio_formats.get(index)).cloned() else {
            self.apply(SessionEvent::Rejected {
                error: ClientError::Validation(format!("No audio format #{}.", index)),
            });
            return;
        };

        let generation = self.session.generation();
        if !self.apply(SessionEvent::DownloadStarted {
            generation,
            target: DownloadTarget::Audio { index },
        }) {
            return;
        }

        let downloader = self.downloader.clone();
        let tx = self.events_tx.clone();
        self.download = Some(tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = downloader
                .download_audio(&format, move |progress| {
                    let _ = progress_tx.send(SessionEvent::DownloadProgress { generation, progress });
                })
                .await;
            let _ = tx.send(finished(generation, result));
        }));
    }
}

fn finished(generation: u64, result: crate::core::ClientResult<std::path::PathBuf>) -> SessionEvent {
    match result {
        Ok(path) => SessionEvent::DownloadFinished { generation, path },
        Err(error) => SessionEvent::DownloadFailed { generation, error },
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_countdown();
        self.abort_download();
    }
}
