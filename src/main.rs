//! PolicyAudit - compliance analysis for automated agents
//!
//! Discovers agent definitions, pairs them with execution logs, fans the
//! analyses out to a bounded worker pool and turns the persisted reports into
//! a dashboard and a compliance matrix.
//!
//! Exit codes:
//!   0 - Success (individual analyses may still have failed)
//!   1 - Runtime error (no agents, bad policy selection, config, I/O, etc.)

mod analysis;
mod cli;
mod config;
mod discovery;
mod error;
mod invoker;
mod matcher;
mod models;
mod orchestrator;
mod report;
mod scheduler;

use anyhow::{Context, Result};
use cli::{AnalyzeArgs, Args, Command, OutputFormat, ShowArgs, ViewArgs};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ClassifiedReport, RunSummary};
use report::ReportParser;
use scheduler::ProgressEvent;
use std::io::Write;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("PolicyAudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .policyaudit.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize paths, the analyzer backend and allowed regulations.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected subcommand. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command {
        Command::Agents(ref agents) => handle_agents(&config, agents.format),
        Command::Analyze(ref analyze) => handle_analyze(&config, analyze, args.quiet).await,
        Command::Dashboard(ref view) => handle_dashboard(&config, view),
        Command::Matrix(ref view) => handle_matrix(&config, view),
        Command::Show(ref show) => handle_show(&config, show),
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// List discovered agents with their matched logs.
fn handle_agents(config: &Config, format: OutputFormat) -> Result<i32> {
    let agents = orchestrator::match_agents(&config.paths.agents_dir, &config.paths.logs_dir)?;

    let output = match format {
        OutputFormat::Json => report::generate_json(&agents)?,
        OutputFormat::Markdown => report::generate_agents_listing(&agents),
    };
    print!("{}", output);

    Ok(0)
}

/// Run one analysis pass and print or persist the reports.
async fn handle_analyze(config: &Config, args: &AnalyzeArgs, quiet: bool) -> Result<i32> {
    let plan = orchestrator::plan_analysis(config, args)?;
    let concurrency = config.general.concurrency;
    let total = plan.items.len();

    if !quiet {
        println!(
            "🔍 Analyzing {} agents against {} ({} with execution logs)",
            total,
            plan.policy,
            plan.with_logs()
        );
        if concurrency > 1 {
            println!("   Running {} analyses in parallel", concurrency);
        }
        println!();
    }

    let invoker = invoker::build_invoker(&config.analyzer, config.general.verbose)?;

    let run = if concurrency == 1 {
        orchestrator::run_analysis(&plan, invoker, 1, |event| {
            if !quiet {
                print_sequential_progress(event);
            }
        })
        .await?
    } else {
        let progress_bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );
            pb
        };

        let run = orchestrator::run_analysis(&plan, invoker, concurrency, |event| {
            if let ProgressEvent::Finished { result, .. } = event {
                if !result.success {
                    progress_bar.println(format!("   ❌ {} failed", result.agent.name));
                }
                progress_bar.set_message(result.agent.name.clone());
                progress_bar.inc(1);
            }
        })
        .await?;

        progress_bar.finish_and_clear();
        run
    };

    match config.general.output_dir {
        Some(ref dir) => {
            let written = report::write_reports(dir, &run.results, &plan.policy)?;
            if !quiet {
                println!(
                    "\n💾 Saved {} reports to {}",
                    written.len(),
                    dir.display()
                );
            }
        }
        None => {
            println!();
            print!(
                "{}",
                report::generate_analysis_output(&run.results, &plan.policy)
            );
        }
    }

    let summary = RunSummary::from_results(&run.results, run.elapsed);
    if !quiet {
        println!("\n{}", report::generate_run_summary(&summary));
    }

    for result in run.results.iter().filter(|r| !r.success) {
        warn!(
            "Analysis of {} failed: {}",
            result.agent.name,
            result.raw_output.trim()
        );
    }

    if summary.failed > 0 {
        eprintln!(
            "⚠️  {} of {} analyses failed",
            summary.failed, summary.total
        );
    }

    Ok(0)
}

/// "[i/n] Analyzing: name with log X... (1.2s)"
fn print_sequential_progress(event: ProgressEvent<'_>) {
    match event {
        ProgressEvent::Started {
            position,
            total,
            item,
        } => {
            print!("[{}/{}] Analyzing: {}", position, total, item.agent.name);
            if let Some(ref log) = item.log {
                print!(" with log {}", log.name);
            }
            print!("...");
            let _ = std::io::stdout().flush();
        }
        ProgressEvent::Finished { result, .. } => {
            let status = if result.success { "" } else { " ❌" };
            println!(" ({:.1}s){}", result.elapsed.as_secs_f64(), status);
        }
    }
}

/// Load and classify every persisted report.
fn load_classified(config: &Config, view: &ViewArgs) -> Vec<ClassifiedReport> {
    let parser = ReportParser::new(config.report.regulation_exceptions.clone());
    let reports = report::load_reports(&config.paths.results_dir, &parser);

    if reports.is_empty() && view.format == OutputFormat::Markdown {
        warn!(
            "No analysis reports found in {}",
            config.paths.results_dir.display()
        );
    }

    reports
}

fn handle_dashboard(config: &Config, view: &ViewArgs) -> Result<i32> {
    let reports = load_classified(config, view);
    let views = analysis::group(&reports);
    let stats = analysis::dashboard_stats(&reports);

    let output = match view.format {
        OutputFormat::Json => report::generate_json(&serde_json::json!({
            "stats": stats,
            "agents": views,
        }))?,
        OutputFormat::Markdown => report::generate_dashboard_markdown(&views, &stats),
    };
    print!("{}", output);

    Ok(0)
}

fn handle_matrix(config: &Config, view: &ViewArgs) -> Result<i32> {
    let reports = load_classified(config, view);
    let matrix = analysis::matrix(&analysis::group(&reports));

    let output = match view.format {
        OutputFormat::Json => report::generate_json(&matrix)?,
        OutputFormat::Markdown => report::generate_matrix_markdown(&matrix),
    };
    print!("{}", output);

    Ok(0)
}

fn handle_show(config: &Config, show: &ShowArgs) -> Result<i32> {
    let reports = load_classified(config, &show.view);
    let views = analysis::group(&reports);

    let Some(agent) = analysis::find_agent(&views, &show.agent_id) else {
        eprintln!("❌ No reports found for agent '{}'", show.agent_id);
        return Ok(1);
    };

    let output = match show.view.format {
        OutputFormat::Json => {
            let selected: Vec<&ClassifiedReport> = agent
                .sorted_reports()
                .into_iter()
                .filter(|r| {
                    show.regulation
                        .as_deref()
                        .map_or(true, |wanted| r.report.regulation == wanted)
                })
                .collect();
            report::generate_json(&selected)?
        }
        OutputFormat::Markdown => {
            report::generate_agent_markdown(agent, show.regulation.as_deref())
        }
    };
    print!("{}", output);

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
