use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Opens a link somewhere the user can see it. Fire-and-forget: the
/// outcome is never inspected.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str);
}

/// Hands the link to the desktop's default browser.
pub struct SystemOpener;

impl SystemOpener {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) {
        let spawned = Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();

        match spawned {
            Ok(mut child) => {
                debug!("opened {} in browser", url);
                // Reap the opener in the background
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => warn!("could not open {}: {}", url, e),
        }
    }
}

/// Only logs the link; for headless use.
pub struct LogOpener;

impl LinkOpener for LogOpener {
    fn open(&self, url: &str) {
        info!("Sponsor link: {}", url);
    }
}
