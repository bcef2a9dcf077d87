//! Download filenames derived from video titles.

/// Used when the fetcher reports an empty title.
pub const FALLBACK_NAME: &str = "download";

/// Temp suffix of the untrimmed audio a segment is cut from.
pub const FULL_AUDIO_SUFFIX: &str = "_full.mp3";

/// What a request produces. Decides temp-file suffixes, attachment names, and
/// content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Segment,
}

impl MediaKind {
    /// Suffix appended to the job id for the file that gets delivered.
    pub fn temp_suffix(&self) -> &'static str {
        match self {
            MediaKind::Video => ".mp4",
            MediaKind::Audio => ".mp3",
            MediaKind::Segment => "_segment.mp3",
        }
    }

    /// Suffix appended to the sanitized title for the attachment.
    pub fn attachment_suffix(&self) -> &'static str {
        self.temp_suffix()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Audio | MediaKind::Segment => "audio/mpeg",
        }
    }
}

/// Replace every character other than ASCII letters, digits, `_`,
/// whitespace, `.` and `-` with `_`.
pub fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Attachment filename for `title`. Whitespace other than a plain space is
/// flattened to a space so the name fits in a header value.
pub fn attachment_name(title: &str, kind: MediaKind) -> String {
    let base: String = sanitize(title.trim())
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let base = if base.is_empty() { FALLBACK_NAME } else { base.as_str() };
    format!("{}{}", base, kind.attachment_suffix())
}
