//! histlist: load, search, render and export the history dataset.
//!
//! Usage:
//!   histlist load
//!   histlist search "Tokyo (東京)" --mode or --tags
//!   histlist export tokyo --out exports/
//!   histlist html tokyo --no-tags > tokyo.html
//!   histlist serve --port 8765

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use histlist::config::Config;
use histlist::filter::SearchMode;
use histlist::loader::DataSource;
use histlist::logging::{log, obj, v_str, Domain, Level};
use histlist::session::Session;
use histlist::viewer::Viewer;

#[derive(Parser, Debug)]
#[command(name = "histlist")]
#[command(about = "Search and export the regions/periods/entities history dataset")]
struct Args {
    /// Data source preset: "no" (9 files) or "mo" (1 file)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Override the number of files to fetch
    #[arg(long, global = true)]
    total: Option<u32>,

    /// Read files from a local directory instead of DATA_BASE_URL
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL the numbered files are fetched from
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every file and print the load report
    Load,
    /// Filter by keywords and print the result
    Search {
        query: String,
        #[arg(long)]
        mode: Option<SearchMode>,
        #[command(flatten)]
        tags: TagFlags,
    },
    /// Write the full or filtered dataset as JSON
    Export {
        #[arg(default_value = "")]
        query: String,
        #[arg(long)]
        mode: Option<SearchMode>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the (filtered) dataset as nested HTML lists
    Html {
        #[arg(default_value = "")]
        query: String,
        #[arg(long)]
        mode: Option<SearchMode>,
        #[command(flatten)]
        tags: TagFlags,
    },
    /// Serve the HTML viewer
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(clap::Args, Debug)]
struct TagFlags {
    /// Show tags next to entity names
    #[arg(long, conflicts_with = "no_tags")]
    tags: bool,
    /// Hide tags
    #[arg(long)]
    no_tags: bool,
}

impl TagFlags {
    /// `None` when neither flag is given, so SHOW_TAGS decides.
    fn choice(&self) -> Option<bool> {
        match (self.tags, self.no_tags) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

fn config_from(args: &Args) -> Config {
    let mut cfg = Config::from_env();
    if let Some(prefix) = &args.source {
        cfg.source = DataSource::preset(prefix);
    }
    if let Some(total) = args.total {
        cfg.source.total = total;
    }
    if let Some(dir) = &args.data_dir {
        cfg.data_dir = Some(dir.clone());
    }
    if let Some(url) = &args.base_url {
        cfg.data_base_url = url.clone();
    }
    cfg
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config_from(&args);
    let runtime = Runtime::new().context("start tokio runtime")?;
    let fetcher = cfg.fetcher()?;
    let mut session = Session::new(cfg.clone());

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("source", v_str(&session.source().label())),
            ("from", v_str(&fetcher.describe())),
        ]),
    );

    if let Command::Serve { port } = args.command {
        let mut viewer = Viewer::new(session, fetcher, &runtime);
        viewer.reload();
        return viewer.serve(port.unwrap_or(cfg.viewer_port));
    }

    let report = runtime
        .block_on(session.reload(fetcher.as_ref()))
        .with_context(|| format!("loading {} from {}", session.source().label(), fetcher.describe()))?;

    match args.command {
        Command::Load => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Search { query, mode, tags } => {
            let mode = mode.unwrap_or(cfg.search_mode);
            let tree = session.render(&query, mode, cfg.tags_visible(tags.choice()))?;
            print!("{}", tree.to_text());
            let outcome = session.search(&query, mode)?;
            if let (Some(term), Some(url)) = (&outcome.search_term, &outcome.search_url) {
                println!();
                println!("Wikipedia \"{}\": {}", term, url);
            }
        }
        Command::Export { query, mode, out } => {
            let dir = out.unwrap_or_else(|| cfg.export_dir.clone());
            let receipt = session.export(&dir, &query, mode.unwrap_or(cfg.search_mode))?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Html { query, mode, tags } => {
            let tree = session.render(&query, mode.unwrap_or(cfg.search_mode), cfg.tags_visible(tags.choice()))?;
            print!("{}", tree.to_html());
        }
        Command::Serve { .. } => unreachable!("handled above"),
    }
    Ok(())
}
