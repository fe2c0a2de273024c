use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use season_arbiter::config::{Config, ConfigOverrides};
use season_arbiter::conflicts::{
    detect_conflicts_with, AutoResolveSummary, ConflictResolver, DetectionOutcome, ManualRequest,
    Rejection,
};
use season_arbiter::constraints::{
    generate_constraints, validate_parameters, Constraint, RegistryParameters,
};
use season_arbiter::evaluation::{
    EvaluationContext, NoopObserver, TracingObserver, ViolationObserver,
};
use season_arbiter::output::csv::{
    audit_to_csv, conflicts_to_csv, constraints_to_csv, issues_to_csv, report_to_csv,
};
use season_arbiter::output::json::render_json;
use season_arbiter::output::table::{
    render_conflicts_table, render_constraints_table, render_report_table,
    render_resolution_table, render_validation_table, render_violations_table,
};
use season_arbiter::schedule::{Schedule, TeamDirectory};
use season_arbiter::scoring::{score_schedule, ScoreReport};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "season-arbiter",
    about = "Score conference schedules against constraints and arbitrate rule conflicts"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    sport: Option<String>,
    #[arg(short, long)]
    gender: Option<String>,
    /// JSON object of registry settings (rivalries, rest days, blackouts, ...)
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct ScheduleArgs {
    /// Current-season schedule JSON
    #[arg(long)]
    schedule: Option<PathBuf>,
    /// Previous-season schedule JSON
    #[arg(long)]
    previous: Option<PathBuf>,
    /// Team directory JSON (venues, unavailable dates)
    #[arg(long)]
    directory: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Constraints,
    Validate,
    Evaluate {
        #[command(flatten)]
        inputs: ScheduleArgs,
        /// Log every violation as a structured event
        #[arg(long)]
        log_violations: bool,
        #[arg(long)]
        details: bool,
    },
    Conflicts {
        #[command(flatten)]
        inputs: ScheduleArgs,
    },
    Resolve {
        #[command(flatten)]
        inputs: ScheduleArgs,
        #[arg(long)]
        mode: Option<String>,
        /// Apply a resolution by hand: CONFLICT_ID=RESOLUTION_ID
        #[arg(long = "pick")]
        picks: Vec<String>,
        #[arg(long = "dismiss")]
        dismissals: Vec<String>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        sport: cli.sport.clone(),
        gender: cli.gender.clone(),
        mode: match &cli.command {
            Commands::Resolve { mode, .. } => mode.clone(),
            _ => None,
        },
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let params = registry_parameters(&config, cli.settings.as_deref())?;

    match &cli.command {
        Commands::Constraints => {
            let constraints = generate_constraints(&params)?;
            print_constraints(&constraints, cli.output)?;
        }
        Commands::Validate => {
            let report = validate_parameters(&params);
            match cli.output {
                OutputFormat::Table => println!("{}", render_validation_table(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)?),
                OutputFormat::Csv => println!("{}", issues_to_csv(&report)?),
            }
            if !report.is_valid {
                return Err(anyhow!(
                    "parameters rejected with {} error(s)",
                    report.errors.len()
                ));
            }
        }
        Commands::Evaluate {
            inputs,
            log_violations,
            details,
        } => {
            let constraints = generate_constraints(&params)?;
            let loaded = LoadedInputs::load(inputs)?;
            let schedule = loaded.schedule()?;
            let observer: &dyn ViolationObserver = if *log_violations {
                &TracingObserver
            } else {
                &NoopObserver
            };
            let report = score(&config, &params, &constraints, schedule, &loaded, observer)?;
            print_report(&report, *details, cli.output)?;
        }
        Commands::Conflicts { inputs } => {
            let constraints = generate_constraints(&params)?;
            let outcome = detect(&config, &params, &constraints, inputs)?;
            print_conflicts(&outcome, cli.output)?;
        }
        Commands::Resolve {
            inputs,
            picks,
            dismissals,
            ..
        } => {
            let constraints = generate_constraints(&params)?;
            let outcome = detect(&config, &params, &constraints, inputs)?;
            let mode = config.mode()?;
            let mut resolver = ConflictResolver::new(constraints, outcome.conflicts);

            let mut requests: Vec<ManualRequest> =
                dismissals.iter().map(|id| ManualRequest::dismiss(id)).collect();
            let mut rejected = Vec::new();
            for pick in picks {
                match ManualRequest::pick(pick) {
                    Some(request) => requests.push(request),
                    None => {
                        warn!(pick = %pick, "--pick expects CONFLICT_ID=RESOLUTION_ID");
                        rejected.push(Rejection::new(
                            pick.as_str(),
                            "expected CONFLICT_ID=RESOLUTION_ID",
                        ));
                    }
                }
            }
            rejected.extend(resolver.apply_requests(&requests, "applied from CLI"));

            let mut summary = resolver.auto_resolve(mode);
            summary.rejected = rejected;
            print_resolution(&resolver, &summary, cli.output)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn registry_parameters(config: &Config, settings: Option<&Path>) -> Result<RegistryParameters> {
    let mut params = RegistryParameters::new(config.sport()?, config.gender()?);
    if let Some(path) = settings {
        let Value::Object(map) = read_json(path)? else {
            return Err(anyhow!("settings file must hold a JSON object: {}", path.display()));
        };
        for (key, value) in map {
            params = params.with_setting(&key, value);
        }
    }
    Ok(params)
}

fn read_json(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed parsing JSON: {}", path.display()))
}

struct LoadedInputs {
    schedule: Option<Schedule>,
    previous: Option<Schedule>,
    directory: Option<TeamDirectory>,
}

impl LoadedInputs {
    fn load(args: &ScheduleArgs) -> Result<Self> {
        let schedule = args
            .schedule
            .as_deref()
            .map(|path| {
                let value = read_json(path)?;
                Schedule::from_value(&value)
                    .with_context(|| format!("invalid schedule: {}", path.display()))
            })
            .transpose()?;
        let previous = match args.previous.as_deref() {
            Some(path) => {
                let value = read_json(path)?;
                let previous = Schedule::previous_from_value(Some(&value));
                if previous.is_none() {
                    warn!("previous season in {} is not a schedule, ignoring", path.display());
                }
                previous
            }
            None => None,
        };
        let directory = args
            .directory
            .as_deref()
            .map(|path| {
                let value = read_json(path)?;
                serde_json::from_value::<TeamDirectory>(value)
                    .with_context(|| format!("invalid team directory: {}", path.display()))
            })
            .transpose()?;
        Ok(Self {
            schedule,
            previous,
            directory,
        })
    }

    fn schedule(&self) -> Result<&Schedule> {
        self.schedule
            .as_ref()
            .ok_or_else(|| anyhow!("--schedule is required for this command"))
    }
}

fn score(
    config: &Config,
    params: &RegistryParameters,
    constraints: &[Constraint],
    schedule: &Schedule,
    loaded: &LoadedInputs,
    observer: &dyn ViolationObserver,
) -> Result<ScoreReport> {
    let sport = params
        .sport
        .ok_or_else(|| anyhow!("sport is required"))?;
    let ctx = EvaluationContext::new(sport, params.gender)
        .with_previous_season(loaded.previous.as_ref())
        .with_directory(loaded.directory.as_ref());
    let report = score_schedule(constraints, schedule, &ctx, &config.scoring_options(), observer);
    info!(
        total_score = report.total_score,
        violations = report.violations.len(),
        "schedule evaluated"
    );
    Ok(report)
}

/// Scans the generated set. With a schedule and `violations_only`, only
/// pairs touching a violated constraint are compared.
fn detect(
    config: &Config,
    params: &RegistryParameters,
    constraints: &[Constraint],
    inputs: &ScheduleArgs,
) -> Result<DetectionOutcome> {
    let mut options = config.detector_options();
    if config.conflicts.violations_only {
        let loaded = LoadedInputs::load(inputs)?;
        match loaded.schedule.as_ref() {
            Some(schedule) => {
                let report = score(config, params, constraints, schedule, &loaded, &NoopObserver)?;
                options = options.with_violated_ids(report.violated_ids());
            }
            None => warn!("violations_only is set but no --schedule was given; scanning all pairs"),
        }
    }
    let outcome = detect_conflicts_with(constraints, &options);
    if outcome.partial {
        warn!(
            comparisons = outcome.comparisons,
            "conflict scan hit its budget; results are partial"
        );
    }
    Ok(outcome)
}

fn print_constraints(constraints: &[Constraint], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_constraints_table(constraints)),
        OutputFormat::Json => println!("{}", render_json(constraints)?),
        OutputFormat::Csv => println!("{}", constraints_to_csv(constraints)?),
    }
    Ok(())
}

fn print_report(report: &ScoreReport, details: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_report_table(report));
            if details && !report.violations.is_empty() {
                println!("{}", render_violations_table(report));
            }
        }
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", report_to_csv(report)?),
    }
    Ok(())
}

fn print_conflicts(outcome: &DetectionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_conflicts_table(&outcome.conflicts));
            if outcome.partial {
                println!("Partial scan after {} comparisons", outcome.comparisons);
            }
        }
        OutputFormat::Json => println!("{}", render_json(outcome)?),
        OutputFormat::Csv => println!("{}", conflicts_to_csv(&outcome.conflicts)?),
    }
    Ok(())
}

fn print_resolution(
    resolver: &ConflictResolver,
    summary: &AutoResolveSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_resolution_table(summary, resolver.audit_trail()));
            let active: Vec<_> = resolver.active_conflicts().into_iter().cloned().collect();
            if !active.is_empty() {
                println!("{}", render_conflicts_table(&active));
            }
        }
        OutputFormat::Json => println!(
            "{}",
            render_json(&json!({
                "summary": summary,
                "audit": resolver.audit_trail(),
                "active_conflicts": resolver.active_conflicts(),
                "constraints": resolver.constraints(),
            }))?
        ),
        OutputFormat::Csv => println!("{}", audit_to_csv(resolver.audit_trail())?),
    }
    Ok(())
}
