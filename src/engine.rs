//! Fingerprint computation seam.
//!
//! The orchestration layer treats fingerprinting as an opaque collaborator
//! behind [`FingerprintEngine`]: hand it a local file plus optional
//! metadata, get back an opaque JSON record or an error. The built-in
//! [`HashEngine`] is a deterministic standalone backend (blake3 content
//! digest plus a metadata digest); a full ISCC codec plugs in behind the
//! same trait without touching the task machinery.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Value, json};

use crate::mediatype;

/// The opaque fingerprint record returned to callers and persisted into
/// task results.
pub type FingerprintResult = Value;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The input content cannot be fingerprinted (wrong or unrecognized
    /// content despite an admitted container, empty file, ...).
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// The computation itself failed.
    #[error("fingerprint computation failed: {0}")]
    Computation(String),
}

/// Computes a fingerprint for a local file.
///
/// Implementations run on dedicated pool workers and are free to block.
pub trait FingerprintEngine: Send + Sync + 'static {
    fn compute_fingerprint(
        &self,
        path: &Path,
        title: &str,
        extra: &str,
    ) -> Result<FingerprintResult, EngineError>;
}

/// Maximum characters kept of `title`/`extra` after whitespace collapse.
const META_TRIM_CHARS: usize = 128;

/// Built-in deterministic engine.
///
/// Hashes the file content in 1 MiB reads, classifies it by magic bytes,
/// and emits a compact record. Same file and metadata always produce the
/// same record.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEngine;

impl FingerprintEngine for HashEngine {
    fn compute_fingerprint(
        &self,
        path: &Path,
        title: &str,
        extra: &str,
    ) -> Result<FingerprintResult, EngineError> {
        let mut file = File::open(path)
            .map_err(|err| EngineError::Computation(format!("open {}: {err}", path.display())))?;

        let mut hasher = blake3::Hasher::new();
        let mut head: Vec<u8> = Vec::with_capacity(crate::gate::SNIFF_LEN);
        let mut buf = vec![0u8; crate::gate::CHUNK_LEN];
        let mut filesize: u64 = 0;
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|err| EngineError::Computation(format!("read: {err}")))?;
            if n == 0 {
                break;
            }
            if head.len() < crate::gate::SNIFF_LEN {
                let want = crate::gate::SNIFF_LEN - head.len();
                head.extend_from_slice(&buf[..n.min(want)]);
            }
            hasher.update(&buf[..n]);
            filesize += n as u64;
        }

        if filesize == 0 {
            return Err(EngineError::Unsupported("empty file".to_string()));
        }
        let media = mediatype::sniff(&head).ok_or_else(|| {
            EngineError::Unsupported(
                mediatype::detect_mime(&head)
                    .unwrap_or("unrecognized content")
                    .to_string(),
            )
        })?;

        let title_trimmed = trim_meta(title);
        let extra_trimmed = trim_meta(extra);
        let content_hash = hasher.finalize().to_hex().to_string();
        let metahash = blake3::hash(format!("{title_trimmed}\u{1f}{extra_trimmed}").as_bytes())
            .to_hex()
            .to_string();

        let mut record = json!({
            "fingerprint": content_hash,
            "mediatype": media.mime,
            "kind": media.kind.as_str(),
            "filesize": filesize,
            "metahash": metahash,
        });
        if !title_trimmed.is_empty() {
            record["title"] = json!(title_trimmed);
        }
        if !extra_trimmed.is_empty() {
            record["extra"] = json!(extra_trimmed);
        }
        Ok(record)
    }
}

/// Collapse runs of whitespace and cap the length, the normalization the
/// metadata digest is computed over.
fn trim_meta(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(META_TRIM_CHARS).collect()
}
