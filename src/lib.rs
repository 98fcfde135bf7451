//! `face-console`: filter, selection and cursor-pagination engine for a
//! face recognition admin console, plus the `facectl` command line.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod filters;
pub mod model;
pub mod pagination;
pub mod route;
pub mod scroll;
pub mod selection;
pub mod source;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::LabelCatalog;
use crate::config::ConsoleConfig;
use crate::engine::{ConsoleMsg, Driver, FaceConsole};
use crate::filters::{DatePreset, DateRange, FilterSet, FilterValue, LABEL_IDS, TokenSet};
use crate::model::FaceId;
use crate::pagination::QueryKey;
use crate::source::{FaceSource, HttpFaceSource};

#[derive(Parser, Debug)]
#[command(
    name = "facectl",
    version,
    about = "Browse and label faces on a recognition service"
)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/face-console/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, overriding the config file
    #[arg(long, global = true, env = config::API_URL_ENV)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List faces, newest first
    Faces {
        /// Only faces carrying one of these labels (comma-separated)
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,

        /// Preset capture-time range
        #[arg(long, value_enum, conflicts_with_all = ["after", "before"])]
        preset: Option<DatePreset>,

        /// Only faces captured at or after this Unix time
        #[arg(long)]
        after: Option<i64>,

        /// Only faces captured before this Unix time
        #[arg(long)]
        before: Option<i64>,

        /// Maximum number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage labels
    Labels {
        #[command(subcommand)]
        action: LabelsCommand,
    },
    /// Give a face a label
    Assign { face: String, label: String },
    /// Delete a face
    DeleteFace { face: String },
    /// Start or stop face capture
    Capture {
        #[command(subcommand)]
        action: CaptureCommand,
    },
    /// Retrain the recognition model
    Retrain,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LabelsCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Add { text: String },
    Rename { from: String, to: String },
    Delete { text: String },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CaptureCommand {
    Start,
    Stop,
}

/// One output row of `facectl faces`.
#[derive(Debug, Serialize)]
struct FaceRow<'a> {
    id: &'a str,
    label: &'a str,
    capture_time: i64,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load_from(path),
        None => ConsoleConfig::load(),
    }
    .context("loading configuration")?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
        config.validate().context("--api-url")?;
    }
    Ok(config)
}

pub fn run(cli: Cli, config: &ConsoleConfig) -> Result<()> {
    let source = HttpFaceSource::new(&config.api_url, config.timeout())
        .with_context(|| format!("connecting to {}", config.api_url))?;
    info!(api = %source.base(), "using recognition service");
    run_with_source(cli.command, config, &source)
}

/// Execute `command` against any source. Split out so it can run offline.
pub fn run_with_source<S: FaceSource>(
    command: Commands,
    config: &ConsoleConfig,
    source: S,
) -> Result<()> {
    match command {
        Commands::Faces {
            labels,
            preset,
            after,
            before,
            pages,
            json,
        } => {
            let range = match preset {
                Some(preset) => preset.range(),
                None => DateRange::new(after, before),
            };
            let filters = label_filter(&source, &labels)?;
            let console = FaceConsole::new(
                "/faces",
                QueryKey::new(filters, range),
                config.page_limit,
            );
            let mut driver = Driver::new(console, source);
            driver.dispatch(ConsoleMsg::Init);
            driver.load_pages(pages.max(1));

            let console = driver.console();
            if let Some(err) = console.pagination().last_error() {
                bail!("fetching faces: {err}");
            }
            print_faces(console, json)?;
        }
        Commands::Labels { action } => run_labels(action, &source)?,
        Commands::Assign { face, label } => {
            let catalog = LabelCatalog::new(source.fetch_labels()?);
            let Some(id) = catalog.id_for(&label) else {
                bail!("no label named {label:?}");
            };
            source.update_face_label(&FaceId::new(face.as_str()), id)?;
            println!("{face} -> {label}");
        }
        Commands::DeleteFace { face } => {
            source.delete_face(&FaceId::new(face.as_str()))?;
            println!("deleted {face}");
        }
        Commands::Capture { action } => {
            match action {
                CaptureCommand::Start => source.start_capture()?,
                CaptureCommand::Stop => source.stop_capture()?,
            }
            println!("ok");
        }
        Commands::Retrain => {
            source.force_retrain()?;
            println!("retrain requested");
        }
    }
    Ok(())
}

/// Build the label filter for `--labels`. An empty list, or one naming
/// every label, is `all`.
fn label_filter<S: FaceSource>(source: &S, texts: &[String]) -> Result<FilterSet> {
    let mut filters = FilterSet::new();
    if texts.is_empty() {
        return Ok(filters);
    }
    let catalog = LabelCatalog::new(source.fetch_labels().context("loading labels")?);
    let mut tokens = Vec::with_capacity(texts.len());
    for text in texts {
        match catalog.id_for(text.trim()) {
            Some(id) => tokens.push(id.to_string()),
            None => bail!("no label named {text:?}"),
        }
    }
    if let Some(set) = TokenSet::new(tokens) {
        filters.set(LABEL_IDS, FilterValue::Only(set));
        filters.sanitize(LABEL_IDS, &catalog.universe());
    }
    Ok(filters)
}

fn print_faces(console: &FaceConsole, json: bool) -> Result<()> {
    let rows: Vec<FaceRow<'_>> = console
        .faces()
        .map(|face| FaceRow {
            id: face.id.as_str(),
            label: console.face_label_text(face),
            capture_time: face.capture_time,
        })
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in &rows {
        let when = DateTime::from_timestamp(row.capture_time, 0)
            .map(|t| {
                t.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| row.capture_time.to_string());
        println!("{when}  {:<20} {}", row.label, row.id);
    }
    let pagination = console.pagination();
    eprintln!(
        "{} faces{}",
        rows.len(),
        if pagination.is_done() { "" } else { " (more available)" }
    );
    Ok(())
}

fn run_labels<S: FaceSource>(action: LabelsCommand, source: &S) -> Result<()> {
    let catalog = LabelCatalog::new(source.fetch_labels().context("loading labels")?);
    let resolve = |text: &str| {
        catalog
            .id_for(text)
            .with_context(|| format!("no label named {text:?}"))
    };
    match action {
        LabelsCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.labels())?);
            } else {
                for label in catalog.labels() {
                    println!("{:>4}  {}", label.id.0, label.text);
                }
            }
        }
        LabelsCommand::Add { text } => {
            let text = text.trim();
            if text.is_empty() {
                bail!("label text must not be empty");
            }
            source.create_label(text)?;
            println!("added {text}");
        }
        LabelsCommand::Rename { from, to } => {
            source.rename_label(resolve(&from)?, to.trim())?;
            println!("{from} -> {to}");
        }
        LabelsCommand::Delete { text } => {
            source.delete_label(resolve(&text)?)?;
            println!("deleted {text}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Face, Label, LabelId};
    use crate::source::MemoryFaceSource;

    fn source() -> MemoryFaceSource {
        MemoryFaceSource::new(
            vec![Label::new(1, "alice"), Label::new(2, "bob")],
            vec![Face {
                id: FaceId::new("f1"),
                label_id: None,
                capture_time: 1_700_000_000,
            }],
        )
    }

    #[test]
    fn cli_parses_faces_flags() {
        let cli = Cli::try_parse_from([
            "facectl", "faces", "--labels", "alice,bob", "--pages", "3", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Faces {
                labels,
                pages,
                json,
                ..
            } => {
                assert_eq!(labels, vec!["alice", "bob"]);
                assert_eq!(pages, 3);
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preset_conflicts_with_explicit_bounds() {
        assert!(
            Cli::try_parse_from(["facectl", "faces", "--preset", "today", "--after", "5"]).is_err()
        );
        assert!(Cli::try_parse_from(["facectl", "faces", "--preset", "last-7-days"]).is_ok());
    }

    #[test]
    fn label_filter_resolves_texts() {
        let filters = label_filter(&source(), &["bob".to_string()]).unwrap();
        assert_eq!(filters.get(LABEL_IDS).to_wire(), "2");
        let every = label_filter(&source(), &["alice".into(), "bob".into()]).unwrap();
        assert!(every.get(LABEL_IDS).is_all());
        assert!(label_filter(&source(), &["nobody".into()]).is_err());
    }

    #[test]
    fn assign_and_labels_commands_hit_source() {
        let source = source();
        let config = ConsoleConfig::default();
        run_with_source(
            Commands::Assign {
                face: "f1".into(),
                label: "bob".into(),
            },
            &config,
            &source,
        )
        .unwrap();
        assert_eq!(
            source.face(&FaceId::new("f1")).unwrap().label_id,
            Some(LabelId(2))
        );

        run_with_source(
            Commands::Labels {
                action: LabelsCommand::Rename {
                    from: "bob".into(),
                    to: "robert".into(),
                },
            },
            &config,
            &source,
        )
        .unwrap();
        assert!(source.labels().iter().any(|l| l.text == "robert"));
    }

    #[test]
    fn faces_command_runs_offline() {
        let source = source();
        run_with_source(
            Commands::Faces {
                labels: vec![],
                preset: None,
                after: None,
                before: None,
                pages: 2,
                json: true,
            },
            &ConsoleConfig::default(),
            &source,
        )
        .unwrap();
        assert_eq!(source.page_fetches(), 1);
    }
}
