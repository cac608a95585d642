//! Minimal HTTP viewer over a `Session`.
//!
//! Endpoints:
//!   GET /               - HTML page (`?q=&mode=&tags=`)
//!   GET /api/document   - filtered document as JSON
//!   GET /api/download   - same, as an attachment named after the export scope
//!   GET /api/switch     - toggle the data source, reload, redirect to /
//!   GET /api/health     - health check

use anyhow::Result;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use url::form_urlencoded;
use url::Url;

use crate::export::{self, ExportScope};
use crate::filter::SearchMode;
use crate::loader::Fetch;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::render::{self, escape};
use crate::session::{SearchOutcome, Session};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
.region-card{border:1px solid #495057;margin:1em 0}\
.region-header{background:#6c757d;color:#fff;padding:.4em}\
.period-section{padding:.4em 1em}\
.period-upper{border-left:4px solid;padding-left:.5em;font-weight:bold}\
.status-current{color:#dc3545;border-color:#dc3545}\
.status-proposed{color:#ffc107;border-color:#ffc107}\
.status-historical{color:#17a2b8;border-color:#17a2b8}\
.entity-tag{background:#6c757d;color:#fff;border-radius:3px;padding:0 .3em;margin-left:.3em;font-size:.8em;text-decoration:none}\
.tag-current{background:#28a745}\
.error-message{color:#dc3545}";

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: &'static str,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    fn new(status: &'static str, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body,
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn json_error(status: &'static str, msg: &str) -> Self {
        Self::new(status, "application/json", serde_json::json!({ "error": msg }).to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Params {
    query: String,
    mode: SearchMode,
    tags: bool,
}

pub struct Viewer<'a> {
    session: Session,
    fetcher: Box<dyn Fetch>,
    runtime: &'a Runtime,
}

impl<'a> Viewer<'a> {
    pub fn new(session: Session, fetcher: Box<dyn Fetch>, runtime: &'a Runtime) -> Self {
        Self {
            session,
            fetcher,
            runtime,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Load the active source; failures are kept in the session for display.
    pub fn reload(&mut self) {
        let _ = self.runtime.block_on(self.session.reload(self.fetcher.as_ref()));
    }

    fn params(&self, url: &Url) -> Params {
        let cfg = self.session.config();
        let mut params = Params {
            query: String::new(),
            mode: cfg.search_mode,
            tags: cfg.show_tags,
        };
        if url.query().is_some() {
            params.tags = false;
        }
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "q" => params.query = v.trim().to_string(),
                "mode" => params.mode = v.parse().unwrap_or(cfg.search_mode),
                "tags" => params.tags = true,
                _ => {}
            }
        }
        params
    }

    /// Answer one GET request target such as `/api/document?q=tokyo`.
    pub fn route(&mut self, target: &str) -> Response {
        let url = match Url::parse("http://viewer.local").and_then(|base| base.join(target)) {
            Ok(url) => url,
            Err(_) => return Response::new("400 BAD REQUEST", "text/plain", "Bad Request".to_string()),
        };
        let params = self.params(&url);
        match url.path() {
            "/" => Response::new("200 OK", "text/html; charset=utf-8", self.page(&params)),
            "/api/health" => Response::new("200 OK", "application/json", r#"{"status":"ok"}"#.to_string()),
            "/api/document" => match self.session.search(&params.query, params.mode) {
                Ok(outcome) => match export::to_json(&outcome.document) {
                    Ok(body) => Response::new("200 OK", "application/json", body),
                    Err(e) => Response::json_error("500 INTERNAL SERVER ERROR", &e.to_string()),
                },
                Err(e) => Response::json_error("503 SERVICE UNAVAILABLE", &e.to_string()),
            },
            "/api/download" => match self.session.search(&params.query, params.mode) {
                Ok(outcome) => match export::to_json(&outcome.document) {
                    Ok(body) => {
                        let name = export::file_name(&self.session.source().prefix, outcome.scope);
                        Response::new("200 OK", "application/json", body)
                            .with_header("Content-Disposition", format!("attachment; filename=\"{}\"", name))
                    }
                    Err(e) => Response::json_error("500 INTERNAL SERVER ERROR", &e.to_string()),
                },
                Err(e) => Response::json_error("503 SERVICE UNAVAILABLE", &e.to_string()),
            },
            "/api/switch" => {
                self.session.switch_source();
                self.reload();
                Response::new("303 SEE OTHER", "text/plain", String::new()).with_header("Location", "/")
            }
            _ => Response::new("404 NOT FOUND", "text/plain", "Not Found".to_string()),
        }
    }

    fn page(&self, params: &Params) -> String {
        let source = self.session.source();
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>History list</title>");
        html.push_str(&format!("<style>{}</style></head><body>\n", STYLE));
        html.push_str(&format!(
            "<form method=\"get\" action=\"/\">\
             <input type=\"text\" name=\"q\" value=\"{}\">\
             <label><input type=\"radio\" name=\"mode\" value=\"AND\"{}> AND</label>\
             <label><input type=\"radio\" name=\"mode\" value=\"OR\"{}> OR</label>\
             <label><input type=\"checkbox\" name=\"tags\"{}> tags</label>\
             <button type=\"submit\">Search</button></form>\n",
            escape(&params.query),
            checked(params.mode == SearchMode::And),
            checked(params.mode == SearchMode::Or),
            checked(params.tags),
        ));
        html.push_str(&format!(
            "<p><a href=\"/api/switch\">Current data: {}</a></p>\n",
            escape(&source.label())
        ));
        html.push_str(&format!("<p class=\"status-message\">{}</p>\n", escape(&self.session.status())));

        match self.session.search(&params.query, params.mode) {
            Ok(outcome) => {
                html.push_str(&self.links(params, &outcome));
                let tree = render::render(&outcome.document, params.tags, &self.session.config().wiki_host);
                html.push_str(&tree.to_html());
            }
            Err(e) => {
                html.push_str(&format!("<div class=\"error-message\">{}</div>\n", escape(&e.to_string())));
            }
        }
        html.push_str("</body></html>\n");
        html
    }

    fn links(&self, params: &Params, outcome: &SearchOutcome) -> String {
        let mut out = String::new();
        if let (Some(term), Some(url)) = (&outcome.search_term, &outcome.search_url) {
            out.push_str(&format!(
                "<p><a href=\"{}\" target=\"_blank\" rel=\"noopener\">Search Wikipedia for \"{}\"</a></p>\n",
                escape(url),
                escape(term)
            ));
        }
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &params.query)
            .append_pair("mode", params.mode.as_str())
            .finish();
        let label = match outcome.scope {
            ExportScope::Full => format!("Download full data ({})", self.session.source().label()),
            ExportScope::Filtered => "Download search results".to_string(),
        };
        out.push_str(&format!(
            "<p><a href=\"/api/download?{}\">{}</a></p>\n",
            escape(&query),
            escape(&label)
        ));
        out
    }

    /// Serve requests one at a time on 127.0.0.1:`port`.
    pub fn serve(mut self, port: u16) -> Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        log(
            Level::Info,
            Domain::Viewer,
            "listening",
            obj(&[("addr", v_str(&format!("http://127.0.0.1:{}", port)))]),
        );
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Err(err) = self.handle(stream) {
                log(
                    Level::Warn,
                    Domain::Viewer,
                    "connection_failed",
                    obj(&[("msg", v_str(&err.to_string()))]),
                );
            }
        }
        Ok(())
    }

    fn handle(&mut self, mut stream: TcpStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut request = String::new();
        reader.read_line(&mut request)?;
        // drain headers
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 && line.trim_end() != "" {
            line.clear();
        }

        let mut parts = request.split_whitespace();
        let response = match (parts.next(), parts.next()) {
            (Some("GET"), Some(target)) => self.route(target),
            (Some(_), Some(_)) => Response::new("405 METHOD NOT ALLOWED", "text/plain", "Method Not Allowed".to_string()),
            _ => Response::new("400 BAD REQUEST", "text/plain", "Bad Request".to_string()),
        };
        log(
            Level::Debug,
            Domain::Viewer,
            "request",
            obj(&[("line", v_str(request.trim_end())), ("status", v_str(response.status))]),
        );

        let mut head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            response.status,
            response.content_type,
            response.body.len()
        );
        for (name, value) in &response.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");
        stream.write_all(head.as_bytes())?;
        stream.write_all(response.body.as_bytes())?;
        stream.flush()?;
        Ok(())
    }
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}
