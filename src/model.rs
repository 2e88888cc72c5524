use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a download record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DownloadId(Uuid);

impl DownloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Requested output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// Video file (MP4)
    #[default]
    Video,
    /// Audio only (MP3)
    Audio,
}

impl DownloadFormat {
    /// Label shown in the format picker and on cards
    pub fn label(self) -> &'static str {
        match self {
            DownloadFormat::Video => "MP4",
            DownloadFormat::Audio => "MP3",
        }
    }
}

/// Represents the current state of a download
///
/// The result location and the error message live inside their variants, so a
/// record can never carry both, nor one of them under the wrong status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Waiting for the preparation endpoint
    Processing,
    /// Prepared; the file can be fetched from `location`
    Ready { location: String },
    /// The preparation request failed
    Error { message: String },
    /// Cancelled by the user while processing
    Cancelled,
}

impl DownloadStatus {
    pub fn is_processing(&self) -> bool {
        matches!(self, DownloadStatus::Processing)
    }
}

/// One tracked download attempt and its current outcome
#[derive(Clone, Debug)]
pub struct DownloadRecord {
    id: DownloadId,
    source_url: String,
    title: String,
    format: DownloadFormat,
    pub(crate) status: DownloadStatus,
}

impl DownloadRecord {
    pub(crate) fn new(source_url: String, title: String, format: DownloadFormat) -> Self {
        Self {
            id: DownloadId::new(),
            source_url,
            title,
            format,
            status: DownloadStatus::Processing,
        }
    }

    pub fn id(&self) -> DownloadId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> DownloadFormat {
        self.format
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    /// Where the prepared file lives; only set while ready
    pub fn result_location(&self) -> Option<&str> {
        match &self.status {
            DownloadStatus::Ready { location } => Some(location),
            _ => None,
        }
    }

    /// Why preparation failed; only set while errored
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            DownloadStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}
