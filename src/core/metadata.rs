use serde::{Deserialize, Serialize};

/// Metadata returned by `/api/get-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video_formats: Vec<VideoFormat>,
    #[serde(default)]
    pub audio_formats: Vec<AudioFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub resolution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub quality: String,
    pub ext: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize_str: Option<String>,
}

impl VideoFormat {
    /// Height part of a `WIDTHxHEIGHT` resolution.
    pub fn height(&self) -> Option<u32> {
        self.resolution.split_once('x')?.1.trim().parse().ok()
    }

    pub fn label(&self) -> String {
        match self.height() {
            Some(height) => format!("{}p", height),
            None => self.resolution.clone(),
        }
    }
}

impl AudioFormat {
    pub fn label(&self) -> String {
        format!("{} ({})", self.quality, self.ext.to_uppercase())
    }
}

impl VideoInfo {
    /// Video formats, tallest first. Unparsable resolutions sort last.
    pub fn sorted_video_formats(&self) -> Vec<&VideoFormat> {
        let mut formats: Vec<&VideoFormat> = self.video_formats.iter().collect();
        formats.sort_by(|a, b| b.height().cmp(&a.height()));
        formats
    }

    /// Looks up a video format by either its raw resolution or its `720p` label.
    pub fn find_video_format(&self, quality: &str) -> Option<&VideoFormat> {
        self.video_formats
            .iter()
            .find(|f| f.resolution == quality || f.label().eq_ignore_ascii_case(quality))
    }
}

/// Raw body of `/api/get-info`: either metadata or an `error` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum InfoResponse {
    Failure { error: String },
    Info(VideoInfo),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}
