use crate::core::{DownloadStage, DownloadTarget, GateState, SessionState, VideoInfo};

pub fn render_info(info: &VideoInfo) -> String {
    let mut out = format!("Title: {}\n", info.title);
    if !info.thumbnail.is_empty() {
        out.push_str(&format!("Thumbnail: {}\n", info.thumbnail));
    }

    out.push_str("Video (MP4):\n");
    let formats = info.sorted_video_formats();
    if formats.is_empty() {
        out.push_str("  No video formats found.\n");
    }
    for format in formats {
        out.push_str(&format!("  {:>6}  ({})\n", format.label(), format.resolution));
    }

    out.push_str("Audio only:\n");
    if info.audio_formats.is_empty() {
        out.push_str("  No audio-only formats found.\n");
    }
    for (index, format) in info.audio_formats.iter().enumerate() {
        match &format.filesize_str {
            Some(size) => out.push_str(&format!("  [{}] {} ~{}\n", index, format.label(), size)),
            None => out.push_str(&format!("  [{}] {}\n", index, format.label())),
        }
    }
    out
}

pub fn describe_gate(gate: GateState, steps: u32) -> String {
    match gate {
        GateState::Idle => format!("Locked: type `unlock` to start step 1 of {}.", steps),
        GateState::Counting { step, remaining } => {
            format!("Unlocking step {} of {}... {}s", step, steps, remaining)
        }
        GateState::ReadyForNext { step } => {
            format!("Step {} done. Type `unlock` for step {} of {}.", step - 1, step, steps)
        }
        GateState::Unlocked => {
            "Unlocked: `video <quality>` or `audio <n>` to download.".to_string()
        }
    }
}

fn describe_target(target: &DownloadTarget) -> String {
    match target {
        DownloadTarget::Video { quality } => format!("video {}", quality),
        DownloadTarget::Audio { index } => format!("audio #{}", index),
    }
}

/// Lines worth printing when the session moves from `prev` to `next`.
pub fn describe_changes(prev: &SessionState, next: &SessionState) -> Vec<String> {
    let mut lines = Vec::new();

    if next.is_loading() && !prev.is_loading() {
        lines.push("Fetching video information...".to_string());
    }

    if let Some(error) = &next.error {
        if prev.error.as_ref() != Some(error) || prev.generation != next.generation {
            lines.push(format!("Error: {}", error));
        }
    }

    if let Some(info) = &next.info {
        if prev.info.as_ref() != Some(info) {
            lines.push(render_info(info).trim_end().to_string());
        }
    }

    if next.info.is_some() && (prev.gate.state() != next.gate.state() || prev.info.is_none()) {
        lines.push(describe_gate(next.gate.state(), next.gate.steps()));
    }

    match (&prev.download, &next.download) {
        (None, Some(download)) => {
            lines.push(format!("Preparing {}...", describe_target(&download.target)));
        }
        (Some(before), Some(after)) if before != after => {
            if after.stage == DownloadStage::Transferring {
                match after.progress {
                    Some(percent) if before.progress != Some(percent) => {
                        lines.push(format!("Downloading... {}%", percent))
                    }
                    None if before.stage == DownloadStage::Requesting => {
                        lines.push("Downloading...".to_string())
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }

    if let Some(path) = &next.last_saved {
        if prev.last_saved.as_ref() != Some(path) {
            lines.push(format!("Saved to {}", path.display()));
        }
    }

    lines
}
