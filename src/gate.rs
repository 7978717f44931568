//! Upload admission: sniff before transfer.
//!
//! The gate reads a bounded leading window of an inbound byte stream,
//! classifies it by magic bytes, and rejects unsupported content before
//! any further transfer happens. Only after admission does it create the
//! destination file and stream the remainder to disk in bounded chunks,
//! so a rejected upload costs one sniff window and leaves nothing behind.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::mediatype::{self, SupportedType};

/// Leading bytes buffered for classification.
pub const SNIFF_LEN: usize = 4096;

/// Write granularity when streaming the payload to disk.
pub const CHUNK_LEN: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Content rejected before transfer; carries the detected type.
    #[error("unsupported media type: {0}")]
    Unsupported(String),

    #[error("upload stream failed: {0}")]
    Stream(String),

    #[error("upload io: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a successful admission.
#[derive(Debug)]
pub struct Admitted {
    pub media: &'static SupportedType,
    pub bytes_written: u64,
}

/// Per-request scratch space for a file submission.
///
/// The directory and everything in it are removed when the session drops,
/// on every exit path: success, rejection, or computation failure.
#[derive(Debug)]
pub struct UploadSession {
    dir: tempfile::TempDir,
}

impl UploadSession {
    /// Create a fresh session directory under `parent`.
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination path for the uploaded file inside this session.
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }
}

/// Admit and persist an upload.
///
/// Buffers up to [`SNIFF_LEN`] bytes, classifies them, and either rejects
/// with [`GateError::Unsupported`] (naming the detected type, or `unknown`)
/// without reading further, or streams the whole payload to `dest` through
/// a [`CHUNK_LEN`]-sized writer.
pub async fn admit_stream<S, E>(stream: S, dest: &Path) -> Result<Admitted, GateError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    pin_mut!(stream);

    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
    let mut ended = false;
    while head.len() < SNIFF_LEN {
        match stream.next().await {
            Some(chunk) => {
                let chunk = chunk.map_err(|err| GateError::Stream(err.to_string()))?;
                head.extend_from_slice(&chunk);
            }
            None => {
                ended = true;
                break;
            }
        }
    }

    let media = match mediatype::sniff(&head) {
        Some(media) => media,
        None => {
            let detected = mediatype::detect_mime(&head).unwrap_or("unknown");
            return Err(GateError::Unsupported(detected.to_string()));
        }
    };

    let file = tokio::fs::File::create(dest).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_LEN, file);
    writer.write_all(&head).await?;
    let mut bytes_written = head.len() as u64;

    if !ended {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| GateError::Stream(err.to_string()))?;
            writer.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
    }
    writer.flush().await?;

    Ok(Admitted {
        media,
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[tokio::test]
    async fn admits_png_and_writes_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("upload.png");
        let admitted = admit_stream(
            chunks(vec![b"\x89PNG\r\n\x1a\n", b"first chunk ", b"second chunk"]),
            &dest,
        )
        .await
        .unwrap();

        assert_eq!(admitted.media.mime, "image/png");
        let written = std::fs::read(&dest).unwrap();
        assert_eq!(&written[..8], b"\x89PNG\r\n\x1a\n");
        assert!(written.ends_with(b"second chunk"));
        assert_eq!(admitted.bytes_written, written.len() as u64);
    }

    #[tokio::test]
    async fn admits_input_as_small_as_the_magic() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tiny.jpg");
        let admitted = admit_stream(chunks(vec![b"\xFF\xD8\xFF\xE1"]), &dest)
            .await
            .unwrap();
        assert_eq!(admitted.media.mime, "image/jpeg");
        assert_eq!(admitted.bytes_written, 4);
    }

    #[tokio::test]
    async fn rejects_unknown_bytes_without_creating_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("rejected.bin");
        let err = admit_stream(chunks(vec![b"\x00\x01"]), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Unsupported(ref t) if t == "unknown"));
        assert!(!dest.exists(), "rejected upload left a file behind");
    }

    #[tokio::test]
    async fn rejection_names_the_detected_type() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("archive.zip");
        let err = admit_stream(chunks(vec![b"PK\x03\x04\x14\x00\x00\x00"]), &dest)
            .await
            .unwrap_err();
        assert!(
            matches!(err, GateError::Unsupported(ref t) if t == "application/zip"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn empty_stream_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty");
        let err = admit_stream(chunks(vec![]), &dest).await.unwrap_err();
        assert!(matches!(err, GateError::Unsupported(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn session_directory_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let session = UploadSession::create_in(parent.path()).unwrap();
        let session_path = session.path().to_path_buf();
        std::fs::write(session.file_path("leftover.png"), b"\x89PNG\r\n\x1a\n").unwrap();
        assert!(session_path.is_dir());
        drop(session);
        assert!(!session_path.exists(), "session survived drop");
    }
}
