use crate::app::{App, Command};
use crate::config::{Config, DownloadContract, TransferMode};
use crate::core::{LinkOpener, LogOpener, SystemOpener};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub mod render;

const HELP: &str = "\
Commands:
  <url> | go <url>   fetch video information
  unlock             run the next unlock step
  video <quality>    download a video format (e.g. 1080p or 1920x1080)
  audio <n>          download audio format number n
  help               show this help
  quit               exit";

#[derive(Parser)]
#[command(name = "ytv")]
#[command(about = "Fetch, unlock and download videos through a ytv backend")]
#[command(version)]
pub struct Cli {
    /// Video URL to look up right away
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Config file (TOML)
    #[arg(short, long, default_value = "ytv.toml")]
    pub config: PathBuf,

    /// Backend base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of unlock steps
    #[arg(long)]
    pub steps: Option<u32>,

    /// Seconds to wait after each unlock step
    #[arg(long)]
    pub countdown: Option<u32>,

    /// Request body shape for processed downloads
    #[arg(long, value_enum)]
    pub contract: Option<DownloadContract>,

    /// Buffer whole files or stream them with progress
    #[arg(long, value_enum)]
    pub mode: Option<TransferMode>,

    /// Print the sponsor link instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses one line of user input. `None` for blank lines.
pub fn parse_command(line: &str) -> Option<std::result::Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "go" | "get" => Ok(Command::Submit(rest.to_string())),
        "unlock" | "u" => Ok(Command::Unlock),
        "video" | "v" if !rest.is_empty() => Ok(Command::DownloadVideo(rest.to_string())),
        "video" | "v" => Err("usage: video <quality>".to_string()),
        "audio" | "a" => rest
            .parse()
            .map(Command::DownloadAudio)
            .map_err(|_| "usage: audio <n>".to_string()),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        "help" | "?" => Err(HELP.to_string()),
        _ if word.contains("://") => Ok(Command::Submit(line.to_string())),
        _ => Err(format!("unknown command `{}`, type `help`", word)),
    };
    Some(command)
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(Some(self.config.as_path()))?;
        if let Some(api_url) = &self.api_url {
            config.api_base = api_url.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(steps) = self.steps {
            config.unlock_steps = steps;
        }
        if let Some(countdown) = self.countdown {
            config.countdown_secs = countdown;
        }
        if let Some(contract) = self.contract {
            config.download_contract = contract;
        }
        if let Some(mode) = self.mode {
            config.transfer_mode = mode;
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        tracing::debug!("config: {:?}", config);

        let opener: Arc<dyn LinkOpener> = if self.no_browser {
            Arc::new(LogOpener)
        } else {
            Arc::new(SystemOpener)
        };
        let app = App::from_config(&config, opener)?;

        // Printer: follows the session and reports what changed
        let mut snapshots = app.subscribe();
        let printer = tokio::spawn(async move {
            let mut prev = snapshots.borrow_and_update().clone();
            while snapshots.changed().await.is_ok() {
                let next = snapshots.borrow_and_update().clone();
                for line in render::describe_changes(&prev, &next) {
                    println!("{}", line);
                }
                prev = next;
            }
        });

        let (tx, rx) = mpsc::channel(16);
        let session = tokio::spawn(app.run(rx));

        println!("Backend: {}", config.api_base);
        println!("Saving to: {}", config.output_dir.display());
        println!("{}", HELP);
        if let Some(url) = &self.url {
            tx.send(Command::Submit(url.clone())).await?;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_command(&line) {
                None => continue,
                Some(Ok(Command::Quit)) => break,
                Some(Ok(command)) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Some(Err(message)) => println!("{}", message),
            }
        }

        let _ = tx.send(Command::Quit).await;
        drop(tx);
        session.await??;
        printer.await?;
        Ok(())
    }
}
