use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Identifier of one run, `<timestamp>_<hash>`. Generated once and reused for
/// every path the run writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionId {
    pub timestamp: String,
    pub hash: String,
}

impl SessionId {
    pub fn new(url: &str) -> Self {
        Self::at(url, Local::now())
    }

    pub fn at(url: &str, now: DateTime<Local>) -> Self {
        let digest = Sha256::digest(format!("{}_{}", url, now.to_rfc3339()).as_bytes());
        let hash: String = digest
            .iter()
            .take(4)
            .map(|byte| format!("{:02x}", byte))
            .collect();
        Self {
            timestamp: now.format("%Y%m%d_%H%M%S").to_string(),
            hash,
        }
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.timestamp, self.hash)
    }
}

/// Where a run stores its raw page images and its assembled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub items_dir: PathBuf,
    pub document_path: PathBuf,
}

impl OutputArtifact {
    pub fn new(session: &SessionId, images_root: &Path, documents_root: &Path) -> Self {
        let name = session.name();
        Self {
            items_dir: images_root.join(&name),
            document_path: documents_root.join(format!("{}.pdf", name)),
        }
    }
}

/// Prepend `https://` unless the URL already names an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
