//! JSON export of the current document.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::logging::log_export;
use crate::model::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    Full,
    Filtered,
}

impl ExportScope {
    /// Filtered when the trimmed query is non-empty.
    pub fn for_query(query: &str) -> Self {
        if query.trim().is_empty() {
            ExportScope::Full
        } else {
            ExportScope::Filtered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportScope::Full => "full",
            ExportScope::Filtered => "filtered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub file_name: String,
    pub scope: ExportScope,
    pub bytes: usize,
    pub sha256: String,
}

/// `history_{prefix}_{full|filtered}.json`
pub fn file_name(prefix: &str, scope: ExportScope) -> String {
    format!("history_{}_{}.json", prefix, scope.as_str())
}

/// Pretty-printed JSON with two-space indentation.
pub fn to_json(doc: &Document) -> Result<String> {
    serde_json::to_string_pretty(doc).context("serialize document")
}

pub fn from_json(text: &str) -> Result<Document> {
    serde_json::from_str(text).context("parse exported document")
}

/// Write `doc` into `dir`. The file handle does not outlive this call.
pub fn write_export(dir: &Path, prefix: &str, scope: ExportScope, doc: &Document) -> Result<ExportReceipt> {
    let json = to_json(doc)?;
    create_dir_all(dir).with_context(|| format!("create export dir {}", dir.display()))?;
    let name = file_name(prefix, scope);
    let path = dir.join(&name);
    {
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(json.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .with_context(|| format!("write {}", path.display()))?;
    }
    let receipt = ExportReceipt {
        path,
        file_name: name,
        scope,
        bytes: json.len() + 1,
        sha256: hex::encode(Sha256::digest(format!("{}\n", json).as_bytes())),
    };
    log_export(&receipt.path.display().to_string(), scope.as_str(), receipt.bytes, &receipt.sha256);
    Ok(receipt)
}
