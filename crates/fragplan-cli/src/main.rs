//! fragplan CLI: validate and explain distributed plan documents.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fragplan_core::catalog::InMemoryCatalog;
use fragplan_core::config::{parse_worker_list, ValidatorConfig};
use fragplan_core::diagnostic::ValidationReport;
use fragplan_core::id::OpRef;
use fragplan_core::plan::Plan;
use fragplan_validate::{validate_plan, ValidatedPlan};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "fragplan")]
#[command(
    about = "Validate distributed query plan fragments before they are scheduled",
    long_about = None
)]
#[command(version = fragplan_core::VERSION)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a plan document and report every problem in it
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate, then show resolved fragments, schemas and shuffle routes
    Explain {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the plan's stable fingerprint
    Fingerprint {
        /// Path to the plan JSON file
        #[arg(short, long)]
        plan: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to the plan JSON file
    #[arg(short, long)]
    plan: PathBuf,

    /// Relation catalog (JSON or YAML)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Validator config file (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Known worker ids, comma-separated (overrides config)
    #[arg(long)]
    known_workers: Option<String>,

    /// Validate fragments in parallel (overrides config)
    #[arg(long)]
    parallel: bool,

    /// Skip the append-mode insert schema check (overrides config)
    #[arg(long)]
    no_append_check: bool,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // A second init (tests) fails harmlessly.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init();
}

fn run(command: Commands) -> CliResult<i32> {
    match command {
        Commands::Validate { input, json } => {
            let (plan, catalog, cfg) = load_inputs(&input)?;
            let Some(plan) = decoded_or_report(plan, json)? else {
                return Ok(1);
            };
            match validate_plan(&plan, &catalog, &cfg) {
                Ok(v) => {
                    let fp = v.fingerprint()?;
                    if json {
                        let out = serde_json::json!({
                            "accepted": true,
                            "fingerprint": fp.to_hex(),
                        });
                        println!("{out}");
                    } else {
                        println!("plan accepted");
                        println!("  fragments: {}", plan.fragments.len());
                        println!("  shuffles: {}", v.shuffles().len());
                        println!("  fingerprint: {fp}");
                    }
                    Ok(0)
                }
                Err(report) => {
                    print_report(&report, json)?;
                    Ok(1)
                }
            }
        }
        Commands::Explain { input } => {
            let (plan, catalog, cfg) = load_inputs(&input)?;
            let Some(plan) = decoded_or_report(plan, false)? else {
                return Ok(1);
            };
            match validate_plan(&plan, &catalog, &cfg) {
                Ok(v) => {
                    print!("{}", explain(&v)?);
                    Ok(0)
                }
                Err(report) => {
                    print_report(&report, false)?;
                    Ok(1)
                }
            }
        }
        Commands::Fingerprint { plan } => {
            let plan = Plan::load(&plan)?;
            println!("{}", plan.fingerprint()?);
            Ok(0)
        }
    }
}

/// Decode errors are a rejection like any other and are printed the same way.
fn decoded_or_report(plan: fragplan_core::Result<Plan>, json: bool) -> CliResult<Option<Plan>> {
    match plan {
        Ok(plan) => Ok(Some(plan)),
        Err(fragplan_core::Error::Decode(report)) => {
            print_report(&report, json)?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn load_inputs(
    input: &InputArgs,
) -> CliResult<(fragplan_core::Result<Plan>, InMemoryCatalog, ValidatorConfig)> {
    let cfg = layered_config(input.config.as_deref(), input)?;
    let catalog = match &input.catalog {
        Some(path) => InMemoryCatalog::load(path)?,
        None => InMemoryCatalog::new(),
    };
    tracing::debug!(relations = catalog.len(), ?cfg, "inputs loaded");
    Ok((Plan::load(&input.plan), catalog, cfg))
}

/// Config file, then environment, then flags.
fn layered_config(file: Option<&Path>, input: &InputArgs) -> CliResult<ValidatorConfig> {
    let mut cfg = match file {
        Some(path) => ValidatorConfig::load(path)?,
        None => ValidatorConfig::default(),
    };
    cfg.apply_env();
    apply_flags(&mut cfg, input)?;
    Ok(cfg)
}

fn apply_flags(cfg: &mut ValidatorConfig, input: &InputArgs) -> CliResult<()> {
    if let Some(list) = &input.known_workers {
        cfg.known_workers = Some(parse_worker_list(list)?);
    }
    if input.parallel {
        cfg.parallel = true;
    }
    if input.no_append_check {
        cfg.check_append_schema = false;
    }
    Ok(())
}

fn print_report(report: &ValidationReport, json: bool) -> CliResult<()> {
    if json {
        let out = serde_json::json!({ "accepted": false, "errors": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("plan rejected ({} error(s))", report.len());
        for e in report {
            println!("  {e}");
        }
    }
    Ok(())
}

fn explain(v: &ValidatedPlan<'_>) -> CliResult<String> {
    let plan = v.plan();
    let mut out = String::new();

    writeln!(out, "Plan {}", v.fingerprint()?)?;
    writeln!(out, "========")?;
    for r in v.resolved_fragments() {
        let fi = r.fragment().get();
        let frag = &plan.fragments[fi];
        let workers = match &frag.workers {
            Some(ws) => ws.iter().map(i32::to_string).collect::<Vec<_>>().join(", "),
            None => "unassigned".into(),
        };
        writeln!(out)?;
        writeln!(out, "Fragment {fi} (workers: {workers})")?;
        for &op in r.topo_order() {
            let operator = &frag.operators[op.get()];
            let schema = v
                .schema_of(OpRef::new(fi, op.get()))
                .map_or_else(|| "-".to_string(), ToString::to_string);
            writeln!(
                out,
                "  {:<16} {:<16} {}",
                operator.op_name(),
                operator.op_type().as_str(),
                schema
            )?;
        }
    }

    if !v.shuffles().is_empty() {
        writeln!(out)?;
        writeln!(out, "Shuffles:")?;
        for route in v.shuffles().iter() {
            let consumers = route
                .consumers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let channels = route
                .channel_count(plan)
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            writeln!(
                out,
                "  {}: {} -> [{}] ({} channels)",
                route.id, route.producer, consumers, channels
            )?;
        }
    }
    Ok(out)
}
