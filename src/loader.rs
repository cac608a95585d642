//! Sequential loading of numbered JSON files into one `Document`.
//!
//! Files are named `{prefix}{i}.json` for `i` in `1..=total` and fetched one
//! after another. The first failing file aborts the whole load.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::adapter::{InputShape, ShapeError, ShapeKind};
use crate::logging::{log_file_fetched, v_str, ProfileScope};
use crate::model::Document;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data source '{prefix}' has no files to load")]
    NoFiles { prefix: String },

    #[error("{file}: request failed (status {status})")]
    Status { file: String, status: u16 },

    #[error("{file}: transport error: {source}")]
    Transport {
        file: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{file}: not found in {dir}")]
    Missing { file: String, dir: String },

    #[error("{file}: read failed: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: cannot build request URL: {source}")]
    Url {
        file: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{file}: invalid JSON: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: unexpected data structure: {source}")]
    Shape {
        file: String,
        #[source]
        source: ShapeError,
    },

    #[error("{file}: {found} data cannot be merged with {expected} data from earlier files")]
    MixedShapes {
        file: String,
        expected: ShapeKind,
        found: ShapeKind,
    },
}

impl LoadError {
    /// The file the load failed on, when the failure is tied to one.
    pub fn file(&self) -> Option<&str> {
        match self {
            LoadError::NoFiles { .. } => None,
            LoadError::Status { file, .. }
            | LoadError::Transport { file, .. }
            | LoadError::Missing { file, .. }
            | LoadError::Io { file, .. }
            | LoadError::Url { file, .. }
            | LoadError::Json { file, .. }
            | LoadError::Shape { file, .. }
            | LoadError::MixedShapes { file, .. } => Some(file),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            LoadError::Status { status, .. } => Some(*status),
            LoadError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for fetch failures, false for content that arrived but was unusable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LoadError::Status { .. }
                | LoadError::Transport { .. }
                | LoadError::Missing { .. }
                | LoadError::Io { .. }
                | LoadError::Url { .. }
        )
    }
}

// =============================================================================
// Data sources
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSource {
    pub prefix: String,
    pub total: u32,
}

impl DataSource {
    pub const NO_PREFIX: &'static str = "no";
    pub const MO_PREFIX: &'static str = "mo";

    pub fn new(prefix: impl Into<String>, total: u32) -> Self {
        Self {
            prefix: prefix.into(),
            total,
        }
    }

    /// Nine-file "no" dataset.
    pub fn no() -> Self {
        Self::new(Self::NO_PREFIX, 9)
    }

    /// Single-file "mo" dataset.
    pub fn mo() -> Self {
        Self::new(Self::MO_PREFIX, 1)
    }

    /// Preset for a known prefix; unknown prefixes default to a single file.
    pub fn preset(prefix: &str) -> Self {
        match prefix {
            Self::NO_PREFIX => Self::no(),
            Self::MO_PREFIX => Self::mo(),
            other => Self::new(other, 1),
        }
    }

    /// The other preset: "no" switches to "mo", anything else to "no".
    pub fn toggled(&self) -> Self {
        if self.prefix == Self::NO_PREFIX {
            Self::mo()
        } else {
            Self::no()
        }
    }

    pub fn file_names(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.total).map(move |i| format!("{}{}.json", self.prefix, i))
    }

    pub fn label(&self) -> String {
        format!("{} ({} files)", self.prefix.to_uppercase(), self.total)
    }
}

// =============================================================================
// Fetchers
// =============================================================================

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>, LoadError>;

    /// Where files come from, for logs and status lines.
    fn describe(&self) -> String;
}

/// Relative GETs against a base URL.
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>, LoadError> {
        let url = self.base.join(file).map_err(|source| LoadError::Url {
            file: file.to_string(),
            source,
        })?;
        let transport = |source| LoadError::Transport {
            file: file.to_string(),
            source,
        };
        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                file: file.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(transport)?;
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Reads files from a local directory.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Fetch for DirFetcher {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>, LoadError> {
        match tokio::fs::read(self.root.join(file)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LoadError::Missing {
                file: file.to_string(),
                dir: self.root.display().to_string(),
            }),
            Err(source) => Err(LoadError::Io {
                file: file.to_string(),
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

// =============================================================================
// Loading
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigest {
    pub name: String,
    pub bytes: usize,
    pub sha256: String,
}

impl FileDigest {
    pub fn of(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            bytes: content.len(),
            sha256: hex::encode(Sha256::digest(content)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: DataSource,
    pub shape: ShapeKind,
    pub files: Vec<FileDigest>,
    pub regions: usize,
    pub periods: usize,
    pub entities: usize,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub document: Document,
    pub report: LoadReport,
}

/// Fetch every file of `source` in order and merge them into one document.
pub async fn load<F>(fetcher: &F, source: &DataSource) -> Result<Loaded, LoadError>
where
    F: Fetch + ?Sized,
{
    let _scope = ProfileScope::with_context("load", &[("prefix", v_str(&source.prefix))]);
    let mut merged: Option<InputShape> = None;
    let mut files = Vec::with_capacity(source.total as usize);

    for file in source.file_names() {
        let bytes = fetcher.fetch(&file).await?;
        let digest = FileDigest::of(&file, &bytes);
        let value: Value = serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
            file: file.clone(),
            source,
        })?;
        let shape = InputShape::detect(value).map_err(|source| LoadError::Shape {
            file: file.clone(),
            source,
        })?;
        log_file_fetched(&file, digest.bytes, shape.kind().as_str(), &digest.sha256);

        match merged.as_mut() {
            None => merged = Some(shape),
            Some(acc) => {
                let found = shape.kind();
                if !acc.absorb(shape) {
                    return Err(LoadError::MixedShapes {
                        file,
                        expected: acc.kind(),
                        found,
                    });
                }
            }
        }
        files.push(digest);
    }

    let merged = merged.ok_or_else(|| LoadError::NoFiles {
        prefix: source.prefix.clone(),
    })?;
    let shape = merged.kind();
    let document = merged.into_document();
    let report = LoadReport {
        source: source.clone(),
        shape,
        files,
        regions: document.regions.len(),
        periods: document.period_count(),
        entities: document.entity_count(),
    };
    Ok(Loaded { document, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher that records request order.
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new(files: &[(&str, Value)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string().into_bytes()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn with_raw(mut self, name: &str, raw: &str) -> Self {
            self.files.insert(name.to_string(), raw.as_bytes().to_vec());
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for MapFetcher {
        async fn fetch(&self, file: &str) -> Result<Vec<u8>, LoadError> {
            self.requested.lock().unwrap().push(file.to_string());
            self.files.get(file).cloned().ok_or_else(|| LoadError::Status {
                file: file.to_string(),
                status: 404,
            })
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn structured(id: &str, entity: &str) -> Value {
        json!({"history_structured_list": {"regions": [{
            "region_id": id,
            "region_name": format!("Region {}", id),
            "periods": [{"upper_level": "現在", "middle_level_entities": [{"name": entity}]}]
        }]}})
    }

    #[test]
    fn test_file_names_and_presets() {
        let names: Vec<String> = DataSource::no().file_names().collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "no1.json");
        assert_eq!(names[8], "no9.json");
        assert_eq!(DataSource::mo().file_names().collect::<Vec<_>>(), vec!["mo1.json"]);
        assert_eq!(DataSource::no().toggled(), DataSource::mo());
        assert_eq!(DataSource::mo().toggled(), DataSource::no());
        assert_eq!(DataSource::preset("no"), DataSource::no());
        assert_eq!(DataSource::preset("xx"), DataSource::new("xx", 1));
    }

    #[tokio::test]
    async fn test_concatenates_in_file_order() {
        let fetcher = MapFetcher::new(&[
            ("no1.json", structured("1", "A")),
            ("no2.json", structured("2", "B")),
            ("no3.json", structured("3", "C")),
        ]);
        let loaded = load(&fetcher, &DataSource::new("no", 3)).await.unwrap();
        let names: Vec<String> = loaded.document.entities().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(fetcher.requested(), vec!["no1.json", "no2.json", "no3.json"]);
        assert_eq!(loaded.report.shape, ShapeKind::Structured);
        assert_eq!(loaded.report.regions, 3);
        assert_eq!(loaded.report.entities, 3);
        assert_eq!(loaded.report.files.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_shape_aborts_without_fetching_further() {
        let fetcher = MapFetcher::new(&[
            ("no1.json", structured("1", "A")),
            ("no2.json", json!({"unexpected": true})),
            ("no3.json", structured("3", "C")),
        ]);
        let err = load(&fetcher, &DataSource::new("no", 3)).await.unwrap_err();
        assert!(matches!(err, LoadError::Shape { .. }));
        assert_eq!(err.file(), Some("no2.json"));
        assert!(!err.is_transport());
        assert_eq!(fetcher.requested(), vec!["no1.json", "no2.json"]);
    }

    #[tokio::test]
    async fn test_missing_file_reports_status() {
        let fetcher = MapFetcher::new(&[("mo1.json", structured("1", "A"))]);
        let err = load(&fetcher, &DataSource::new("mo", 2)).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.file(), Some("mo2.json"));
        assert!(err.is_transport());
        assert!(err.to_string().contains("mo2.json"));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let fetcher = MapFetcher::new(&[]).with_raw("mo1.json", "{not json");
        let err = load(&fetcher, &DataSource::mo()).await.unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[tokio::test]
    async fn test_category_files_are_adapted() {
        let fetcher = MapFetcher::new(&[
            ("mo1.json", json!([{"category_name": "Cities", "list": [{"name": "Sapporo", "capital": "Chuo"}]}])),
            ("mo2.json", json!({"category_name": "Towns", "list": [{"name": "Otaru"}]})),
        ]);
        let loaded = load(&fetcher, &DataSource::new("mo", 2)).await.unwrap();
        assert_eq!(loaded.report.shape, ShapeKind::Categories);
        let doc = loaded.document;
        assert_eq!(doc.regions.len(), 1);
        let labels: Vec<&str> = doc.regions[0].periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Cities", "Towns"]);
        assert_eq!(doc.regions[0].periods[0].entities[0].tags, vec!["Chuo"]);
    }

    #[tokio::test]
    async fn test_mixed_shapes_abort() {
        let fetcher = MapFetcher::new(&[
            ("no1.json", structured("1", "A")),
            ("no2.json", json!([{"category_name": "Cities", "list": []}])),
        ]);
        let err = load(&fetcher, &DataSource::new("no", 2)).await.unwrap_err();
        match err {
            LoadError::MixedShapes { file, expected, found } => {
                assert_eq!(file, "no2.json");
                assert_eq!(expected, ShapeKind::Structured);
                assert_eq!(found, ShapeKind::Categories);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_total_is_rejected() {
        let fetcher = MapFetcher::new(&[]);
        let err = load(&fetcher, &DataSource::new("no", 0)).await.unwrap_err();
        assert!(matches!(err, LoadError::NoFiles { .. }));
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn test_digest_matches_content() {
        let d = FileDigest::of("a.json", b"abc");
        assert_eq!(d.bytes, 3);
        assert_eq!(
            d.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_http_base_gets_trailing_slash() {
        let f = HttpFetcher::new("http://127.0.0.1:8000/data").unwrap();
        assert_eq!(f.describe(), "http://127.0.0.1:8000/data/");
    }
}
