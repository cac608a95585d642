//! Structured logging.
//!
//! Every record is one JSON line on stderr (stdout carries command output).
//! When `LOG_DIR` is set, records are also appended to `LOG_DIR/events.jsonl`.
//! `LOG_LEVEL` sets the minimum level, `LOG_DOMAINS` a comma-separated
//! allow-list of domains.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Load,    // File fetches, shape validation, aggregation
    Filter,  // Keyword searches
    Export,  // Written export files
    Session, // Store generations, source switches
    Viewer,  // HTTP viewer requests
    System,  // Startup, shutdown
    Profile, // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Load => "load",
            Domain::Filter => "filter",
            Domain::Export => "export",
            Domain::Session => "session",
            Domain::Viewer => "viewer",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sequence counter and file sink
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static FILE_SINK: OnceLock<Option<Mutex<BufWriter<std::fs::File>>>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

fn file_sink() -> Option<&'static Mutex<BufWriter<std::fs::File>>> {
    FILE_SINK
        .get_or_init(|| {
            let dir = PathBuf::from(std::env::var("LOG_DIR").ok()?);
            if let Err(err) = create_dir_all(&dir) {
                eprintln!("[log] failed to create log dir {}: {}", dir.display(), err);
                return None;
            }
            match OpenOptions::new().create(true).append(true).open(dir.join("events.jsonl")) {
                Ok(f) => Some(Mutex::new(BufWriter::new(f))),
                Err(err) => {
                    eprintln!("[log] failed to open events log: {}", err);
                    None
                }
            }
        })
        .as_ref()
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = format_record(level, domain, event, fields);
    eprintln!("{}", line);
    if let Some(sink) = file_sink() {
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

fn format_record(level: Level, domain: Domain, event: &str, mut fields: Map<String, Value>) -> String {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_load_started(prefix: &str, total: u32, generation: u64) {
    log(
        Level::Info,
        Domain::Load,
        "load_started",
        obj(&[
            ("prefix", v_str(prefix)),
            ("total", json!(total)),
            ("generation", json!(generation)),
        ]),
    );
}

pub fn log_file_fetched(file: &str, bytes: usize, shape: &str, sha256: &str) {
    log(
        Level::Debug,
        Domain::Load,
        "file_fetched",
        obj(&[
            ("file", v_str(file)),
            ("bytes", json!(bytes)),
            ("shape", v_str(shape)),
            ("sha256", v_str(sha256)),
        ]),
    );
}

pub fn log_load_complete(prefix: &str, generation: u64, regions: usize, entities: usize, committed: bool) {
    log(
        Level::Info,
        Domain::Load,
        "load_complete",
        obj(&[
            ("prefix", v_str(prefix)),
            ("generation", json!(generation)),
            ("regions", json!(regions)),
            ("entities", json!(entities)),
            ("committed", Value::Bool(committed)),
        ]),
    );
}

pub fn log_load_failed(prefix: &str, generation: u64, file: Option<&str>, error: &str) {
    log(
        Level::Error,
        Domain::Load,
        "load_failed",
        obj(&[
            ("prefix", v_str(prefix)),
            ("generation", json!(generation)),
            ("file", file.map(v_str).unwrap_or(Value::Null)),
            ("msg", v_str(error)),
        ]),
    );
}

pub fn log_filter(query: &str, mode: &str, matched: usize, total: usize) {
    log(
        Level::Debug,
        Domain::Filter,
        "filter",
        obj(&[
            ("query", v_str(query)),
            ("mode", v_str(mode)),
            ("matched", json!(matched)),
            ("total", json!(total)),
        ]),
    );
}

pub fn log_export(path: &str, scope: &str, bytes: usize, sha256: &str) {
    log(
        Level::Info,
        Domain::Export,
        "export_written",
        obj(&[
            ("path", v_str(path)),
            ("scope", v_str(scope)),
            ("bytes", json!(bytes)),
            ("sha256", v_str(sha256)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_record_layout() {
        let line = format_record(
            Level::Warn,
            Domain::Load,
            "load_failed",
            obj(&[("msg", v_str("no2.json missing")), ("file", v_str("no2.json"))]),
        );
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["lvl"], "WARN");
        assert_eq!(v["component"], "load");
        assert_eq!(v["event"], "load_failed");
        assert_eq!(v["msg"], "no2.json missing");
        assert_eq!(v["data"]["file"], "no2.json");
        assert!(v["data"].get("msg").is_none());
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
