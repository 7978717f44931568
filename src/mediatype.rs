//! Supported media types and magic-byte sniffing.
//!
//! Classification uses leading bytes only (the `infer` crate), never the
//! declared content type or file extension: uploads are admitted by what
//! they are, not by what they claim to be.

use std::collections::BTreeMap;

/// Broad content kind of a supported media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }
}

/// A media type the service admits for fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedType {
    pub mime: &'static str,
    pub extension: &'static str,
    pub kind: MediaKind,
}

/// Everything the service will fingerprint. All entries are detectable
/// from magic bytes within the gate's sniff window.
pub const SUPPORTED: &[SupportedType] = &[
    SupportedType { mime: "image/png", extension: "png", kind: MediaKind::Image },
    SupportedType { mime: "image/jpeg", extension: "jpg", kind: MediaKind::Image },
    SupportedType { mime: "image/gif", extension: "gif", kind: MediaKind::Image },
    SupportedType { mime: "image/webp", extension: "webp", kind: MediaKind::Image },
    SupportedType { mime: "audio/mpeg", extension: "mp3", kind: MediaKind::Audio },
    SupportedType { mime: "audio/x-wav", extension: "wav", kind: MediaKind::Audio },
    SupportedType { mime: "audio/x-flac", extension: "flac", kind: MediaKind::Audio },
    SupportedType { mime: "audio/ogg", extension: "ogg", kind: MediaKind::Audio },
    SupportedType { mime: "video/mp4", extension: "mp4", kind: MediaKind::Video },
    SupportedType { mime: "video/webm", extension: "webm", kind: MediaKind::Video },
    SupportedType { mime: "video/x-matroska", extension: "mkv", kind: MediaKind::Video },
    SupportedType { mime: "video/x-msvideo", extension: "avi", kind: MediaKind::Video },
    SupportedType { mime: "video/quicktime", extension: "mov", kind: MediaKind::Video },
    SupportedType { mime: "application/pdf", extension: "pdf", kind: MediaKind::Document },
    SupportedType { mime: "application/epub+zip", extension: "epub", kind: MediaKind::Document },
    SupportedType {
        mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        extension: "docx",
        kind: MediaKind::Document,
    },
];

/// Classify `head` and return the matching supported type, if any.
///
/// Inputs shorter than a signature's minimum magic length simply fail to
/// match; they are never an error.
pub fn sniff(head: &[u8]) -> Option<&'static SupportedType> {
    let detected = infer::get(head)?;
    SUPPORTED.iter().find(|s| s.mime == detected.mime_type())
}

/// Raw magic-byte classification, including types the service does not
/// admit. Used to name the offending type in rejections.
pub fn detect_mime(head: &[u8]) -> Option<&'static str> {
    infer::get(head).map(|kind| kind.mime_type())
}

/// Look up the canonical extension for a supported mime string.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.split(';').next().unwrap_or(mime).trim();
    SUPPORTED
        .iter()
        .find(|s| s.mime == mime)
        .map(|s| s.extension)
}

/// Supported mime strings grouped by kind, for the configuration echo.
pub fn supported_by_kind() -> BTreeMap<&'static str, Vec<&'static str>> {
    let mut grouped: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
    for supported in SUPPORTED {
        grouped
            .entry(supported.kind.as_str())
            .or_default()
            .push(supported.mime);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_supported_types_from_minimal_magic() {
        // Shortest prefixes the signatures need.
        let cases: &[(&[u8], &str)] = &[
            (b"\x89PNG\r\n\x1a\n", "image/png"),
            (b"\xFF\xD8\xFF\xE0", "image/jpeg"),
            (b"GIF89a", "image/gif"),
            (b"%PDF-1.7", "application/pdf"),
            (b"RIFF\x24\x00\x00\x00WAVE", "audio/x-wav"),
            (b"fLaC\x00\x00\x00\x22", "audio/x-flac"),
            (b"OggS\x00\x02", "audio/ogg"),
            (b"ID3\x03\x00\x00\x00", "audio/mpeg"),
            (b"\x1A\x45\xDF\xA3\x93\x42\x82\x88matroska", "video/x-matroska"),
            (b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00", "video/mp4"),
        ];
        for (head, mime) in cases {
            let sniffed = sniff(head).unwrap_or_else(|| panic!("{mime} not sniffed"));
            assert_eq!(sniffed.mime, *mime);
        }
    }

    #[test]
    fn short_or_unknown_input_is_unsupported_not_a_panic() {
        assert!(sniff(b"").is_none());
        assert!(sniff(b"\xFF").is_none());
        assert!(sniff(b"hello world, plain text").is_none());
    }

    #[test]
    fn detected_but_unsupported_types_are_named() {
        // Plain zip archives are recognizable but not admitted.
        let zip = b"PK\x03\x04\x14\x00\x00\x00";
        assert!(sniff(zip).is_none());
        assert_eq!(detect_mime(zip), Some("application/zip"));
    }

    #[test]
    fn extension_lookup_handles_parameters() {
        assert_eq!(extension_for_mime("image/png"), Some("png"));
        assert_eq!(extension_for_mime("video/mp4; charset=binary"), Some("mp4"));
        assert_eq!(extension_for_mime("application/octet-stream"), None);
    }

    #[test]
    fn grouping_covers_all_kinds() {
        let grouped = supported_by_kind();
        assert!(grouped["image"].contains(&"image/png"));
        assert!(grouped["audio"].contains(&"audio/mpeg"));
        assert!(grouped["video"].contains(&"video/mp4"));
        assert!(grouped["document"].contains(&"application/pdf"));
        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, SUPPORTED.len());
    }
}
