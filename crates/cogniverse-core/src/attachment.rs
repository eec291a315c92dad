//! File and voice-recording attachments.
//!
//! Attachments are stored inline in the conversation as `data:` URIs so a
//! session stays self-contained when persisted or exported.

use crate::error::Result;
use crate::session::Message;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use std::path::Path;

/// Mime type recorded for voice messages.
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Prompt used when asking the model about a file without further instructions.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Please analyze this file.";

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// A file the user attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Wraps in-memory bytes, guessing the mime type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Reads a file from disk. Access denial surfaces as a permission error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.bytes)
    }

    /// The conversation record for this attachment.
    pub fn to_message(&self) -> Message {
        Message::file(self.data_uri(), self.file_name.clone())
    }

    /// Text sent to the model when asking about this file.
    ///
    /// Text files are inlined; images and other files are referenced by name.
    pub fn analysis_prompt(&self, prompt: &str) -> String {
        if self.is_text() {
            let text = String::from_utf8_lossy(&self.bytes);
            format!("{prompt}\n\nFile content:\n{text}")
        } else if self.is_image() {
            format!("{prompt}\n\n[Image uploaded: {}]", self.file_name)
        } else {
            format!(
                "{prompt}\n\n[File uploaded: {} ({})]",
                self.file_name,
                format_file_size(self.size())
            )
        }
    }
}

/// The conversation record for a finished voice recording.
pub fn audio_message(recording: &[u8]) -> Message {
    Message::audio(data_uri(AUDIO_MIME_TYPE, recording))
}

fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(bytes))
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut scaled = bytes as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageKind, Sender};
    use tempfile::TempDir;

    #[test]
    fn file_sizes_format_like_the_library_view() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn attachment_becomes_a_file_message() {
        let attachment = Attachment::new("notes.txt", b"hi".to_vec());
        assert_eq!(attachment.mime_type, "text/plain");

        let msg = attachment.to_message();
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.kind, MessageKind::File);
        assert_eq!(msg.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(msg.content, "data:text/plain;base64,aGk=");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let attachment = Attachment::new("blob.zzzunknown", vec![1, 2, 3]);
        assert_eq!(attachment.mime_type, "application/octet-stream");
    }

    #[test]
    fn analysis_prompt_depends_on_file_type() {
        let text = Attachment::new("todo.txt", b"buy milk".to_vec());
        assert_eq!(
            text.analysis_prompt(DEFAULT_ANALYSIS_PROMPT),
            "Please analyze this file.\n\nFile content:\nbuy milk"
        );

        let image = Attachment::new("cat.png", vec![0; 10]);
        assert_eq!(
            image.analysis_prompt("What is this?"),
            "What is this?\n\n[Image uploaded: cat.png]"
        );

        let other = Attachment::new("data.zzzunknown", vec![0; 1536]);
        assert_eq!(
            other.analysis_prompt("Summarize"),
            "Summarize\n\n[File uploaded: data.zzzunknown (1.5 KB)]"
        );
    }

    #[test]
    fn audio_recordings_are_mpeg_data_uris() {
        let msg = audio_message(&[0xff, 0xfb]);
        assert_eq!(msg.kind, MessageKind::Audio);
        assert!(msg.content.starts_with("data:audio/mpeg;base64,"));
        assert_eq!(msg.file_name, None);
    }

    #[test]
    fn reads_attachment_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "quarterly numbers").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.file_name, "report.txt");
        assert_eq!(attachment.size(), 17);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Attachment::from_path(&dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, crate::error::CogniverseError::Io { .. }));
    }
}
