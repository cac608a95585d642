use std::path::PathBuf;

use crate::filter::SearchMode;
use crate::loader::{DataSource, DirFetcher, Fetch, HttpFetcher};
use crate::wiki;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL the numbered files are fetched from.
    pub data_base_url: String,
    /// Local directory; takes precedence over `data_base_url` when set.
    pub data_dir: Option<PathBuf>,
    pub source: DataSource,
    pub wiki_host: String,
    pub search_mode: SearchMode,
    pub show_tags: bool,
    pub export_dir: PathBuf,
    pub viewer_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_base_url: "http://127.0.0.1:8000/".to_string(),
            data_dir: None,
            source: DataSource::no(),
            wiki_host: wiki::DEFAULT_HOST.to_string(),
            search_mode: SearchMode::And,
            show_tags: true,
            export_dir: PathBuf::from("."),
            viewer_port: 8765,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        let prefix = std::env::var("DATA_PREFIX").unwrap_or_else(|_| d.source.prefix.clone());
        let preset = DataSource::preset(&prefix);
        let total = std::env::var("DATA_TOTAL").ok().and_then(|v| v.parse().ok()).unwrap_or(preset.total);
        Self {
            data_base_url: std::env::var("DATA_BASE_URL").unwrap_or(d.data_base_url),
            data_dir: std::env::var("DATA_DIR").ok().map(PathBuf::from),
            source: DataSource::new(prefix, total),
            wiki_host: std::env::var("WIKI_HOST").unwrap_or(d.wiki_host),
            search_mode: std::env::var("SEARCH_MODE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.search_mode),
            show_tags: std::env::var("SHOW_TAGS").map(|v| parse_flag(&v)).unwrap_or(d.show_tags),
            export_dir: std::env::var("EXPORT_DIR").map(PathBuf::from).unwrap_or(d.export_dir),
            viewer_port: std::env::var("VIEWER_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.viewer_port),
        }
    }

    /// Tag visibility for one request: an explicit flag wins over `show_tags`.
    pub fn tags_visible(&self, flag: Option<bool>) -> bool {
        flag.unwrap_or(self.show_tags)
    }

    /// Directory fetcher when `data_dir` is set, HTTP otherwise.
    pub fn fetcher(&self) -> anyhow::Result<Box<dyn Fetch>> {
        match &self.data_dir {
            Some(dir) => Ok(Box::new(DirFetcher::new(dir.clone()))),
            None => Ok(Box::new(HttpFetcher::new(&self.data_base_url)?)),
        }
    }
}

fn parse_flag(v: &str) -> bool {
    !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.source, DataSource::no());
        assert_eq!(cfg.wiki_host, "ja.wikipedia.org");
        assert_eq!(cfg.search_mode, SearchMode::And);
        assert!(cfg.show_tags);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(" FALSE "));
    }

    #[test]
    fn test_tags_flag_overrides_config() {
        let shown = Config::default();
        assert!(shown.tags_visible(None));
        assert!(!shown.tags_visible(Some(false)));

        let hidden = Config {
            show_tags: false,
            ..Config::default()
        };
        assert!(!hidden.tags_visible(None));
        assert!(hidden.tags_visible(Some(true)));
    }

    #[test]
    fn test_fetcher_prefers_data_dir() {
        let cfg = Config {
            data_dir: Some(PathBuf::from("/srv/history")),
            ..Config::default()
        };
        assert_eq!(cfg.fetcher().unwrap().describe(), "/srv/history");
        assert_eq!(Config::default().fetcher().unwrap().describe(), "http://127.0.0.1:8000/");
    }
}
