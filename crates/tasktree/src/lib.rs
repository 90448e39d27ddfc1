//! `tt` - evaluate and manage smart folder rules from the command line.
//!
//! Every command works on a JSON [`Snapshot`](tasktree_model::Snapshot)
//! given with `--store`. Only `migrate` writes it back.
//!
//! ```text
//! tt validate rule.json
//! tt --store ws.json preview rule.json --user <uuid>
//! tt --store ws.json --now 2024-06-15T12:00:00Z evaluate --user <uuid> --rule-id <uuid>
//! tt --store ws.json folder <uuid> --user <uuid> --limit 20
//! tt --store ws.json --format yaml rules --user <uuid> --public
//! ```
//!
//! Output goes to stdout as JSON or YAML; logs go to stderr, filtered by
//! `RUST_LOG` or raised with `-v`.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tasktree_model::{MemoryStore, NodeId, RuleData, RuleId, UserId};
use tasktree_rules::{
    validate_json, Clock, EngineConfig, EngineError, FixedClock, OrderBy, Page, RuleLibrary,
    RuleSource, RulesEngine, SystemClock,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tt", version, about = "Evaluate smart folder rules over a tasktree snapshot")]
pub struct Cli {
    /// JSON snapshot holding nodes, tags and rules
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// YAML engine configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Evaluate as of this instant (RFC 3339) instead of now
    #[arg(long, global = true, value_name = "INSTANT")]
    pub now: Option<DateTime<Utc>>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Result order as field[:asc|desc]; repeat for tie-breakers
    #[arg(long = "order", global = true, value_name = "ORDER")]
    pub order: Vec<OrderBy>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a rule body without evaluating it
    Validate {
        /// Rule body as JSON
        path: PathBuf,
    },

    /// Evaluate an unsaved rule body, keeping the first few matches
    Preview {
        /// Rule body as JSON
        path: PathBuf,
        #[arg(long)]
        user: UserId,
        /// Defaults to the configured preview limit
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Evaluate a stored rule or a rule body file
    Evaluate(EvaluateArgs),

    /// Evaluate a smart folder
    Folder {
        id: NodeId,
        #[arg(long)]
        user: UserId,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List rules visible to a user
    Rules {
        #[arg(long)]
        user: UserId,
        /// Include other users' public rules
        #[arg(long)]
        public: bool,
        /// Include system rules
        #[arg(long)]
        system: bool,
    },

    /// Move smart folders from inline rules to rule entities and save the store
    Migrate {
        #[arg(long)]
        user: UserId,
        /// Only this folder; all of the user's legacy folders otherwise
        #[arg(long)]
        folder: Option<NodeId>,
    },
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub user: UserId,
    #[command(flatten)]
    pub rule: RuleArg,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct RuleArg {
    /// A stored rule
    #[arg(long)]
    pub rule_id: Option<RuleId>,
    /// A rule body file
    #[arg(long, value_name = "FILE")]
    pub rule: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page::new(args.offset, args.limit)
    }
}

#[derive(Debug, Serialize)]
struct Validated {
    valid: bool,
    conditions: usize,
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs a parsed command line and returns what to print.
pub fn run(cli: Cli) -> Result<String> {
    let mut config = load_config(cli.config.as_deref())?;
    if !cli.order.is_empty() {
        config.default_order = cli.order.clone();
    }
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    };

    match &cli.command {
        Command::Validate { path } => {
            let body = read_json(path)?;
            let errors = validate_json(&body);
            if !errors.is_empty() {
                return Err(EngineError::Invalid(errors))
                    .with_context(|| format!("{} is not a valid rule", path.display()));
            }
            let conditions = body
                .get("conditions")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            render(cli.format, &Validated {
                valid: true,
                conditions,
            })
        }
        Command::Preview { path, user, limit } => {
            let data = read_rule(path)?;
            let store = open_store(&cli)?;
            let engine = RulesEngine::new(&store).with_config(config).with_clock(clock);
            render(cli.format, &engine.preview(&data, *user, *limit)?)
        }
        Command::Evaluate(args) => {
            let store = open_store(&cli)?;
            let engine = RulesEngine::new(&store).with_config(config).with_clock(clock);
            let result = match (&args.rule.rule_id, &args.rule.rule) {
                (Some(rule_id), _) => {
                    engine.evaluate(RuleSource::Stored(*rule_id), args.user, args.page.into())?
                }
                (None, Some(path)) => {
                    let data = read_rule(path)?;
                    engine.evaluate(RuleSource::Inline(&data), args.user, args.page.into())?
                }
                (None, None) => anyhow::bail!("either --rule-id or --rule is required"),
            };
            render(cli.format, &result)
        }
        Command::Folder { id, user, page } => {
            let store = open_store(&cli)?;
            let engine = RulesEngine::new(&store).with_config(config).with_clock(clock);
            render(cli.format, &engine.evaluate_smart_folder(*id, *user, (*page).into())?)
        }
        Command::Rules {
            user,
            public,
            system,
        } => {
            let store = open_store(&cli)?;
            let rules = RuleLibrary::new(&store).list(*user, *public, *system)?;
            render(cli.format, &rules)
        }
        Command::Migrate { user, folder } => {
            let path = store_path(&cli)?;
            let store = open_store(&cli)?;
            let library = RuleLibrary::new(&store).with_clock(clock);
            let migrated = match folder {
                Some(folder) => vec![library.migrate_smart_folder(*folder, *user, None)?],
                None => library.migrate_all(*user)?,
            };
            if !migrated.is_empty() {
                save_store(path, &store)?;
                info!(count = migrated.len(), path = %path.display(), "store saved");
            }
            render(cli.format, &migrated)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config = EngineConfig::from_yaml_str(&yaml)
        .with_context(|| format!("cannot parse config {}", path.display()))?;
    debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

fn store_path(cli: &Cli) -> Result<&Path> {
    cli.store
        .as_deref()
        .context("--store is required for this command")
}

fn open_store(cli: &Cli) -> Result<MemoryStore> {
    let path = store_path(cli)?;
    let file = File::open(path).with_context(|| format!("cannot open store {}", path.display()))?;
    let store = MemoryStore::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot load store {}", path.display()))?;
    debug!(path = %path.display(), "store loaded");
    Ok(store)
}

fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.snapshot()?)?;
    fs::write(path, json).with_context(|| format!("cannot write store {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read rule {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))
}

fn read_rule(path: &Path) -> Result<RuleData> {
    serde_json::from_value(read_json(path)?)
        .with_context(|| format!("{} is not a rule body", path.display()))
}

fn render<T: Serialize>(format: Format, value: &T) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
    })
}
