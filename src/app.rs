//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - runs the pipeline (acquire → clean → align → regress → rank)
//! - prints reports/plots
//! - writes the exports requested on the command line

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FetchArgs, FitArgs, SourceArgs};
use crate::domain::{BondConfig, FredConfig, PipelineConfig, SampleConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `rvf` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args, OutputMode::Full),
        Command::Rank(args) => handle_fit(args, OutputMode::RankOnly),
        Command::Fetch(args) => handle_fetch(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    RankOnly,
}

fn default_filter(verbose: u8) -> &'static str {
    if verbose == 0 { "rv_factors=info" } else { "rv_factors=debug" }
}

fn init_tracing(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    // Logs go to stderr so stdout stays clean for reports.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;

    if mode == OutputMode::Full {
        println!("{}", crate::report::format_run_summary(&run));
    }

    println!(
        "{}",
        crate::report::format_mispriced(&run.result, &run.mispriced, config.top_n)
    );

    if mode == OutputMode::Full && config.plot {
        let plot = crate::plot::render_residual_plot(
            &run.result,
            &run.mispriced,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    write_exports(&config, &run)
}

/// Write every requested export, or none of them.
///
/// Each file is first written next to its destination under a `.partial`
/// name; the destinations are only replaced once all writes succeeded.
fn write_exports(config: &PipelineConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    let jobs = [
        (ExportKind::Results, config.export_results.as_deref()),
        (ExportKind::Mispriced, config.export_mispriced.as_deref()),
        (ExportKind::Model, config.export_model.as_deref()),
    ];

    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(jobs.len());
    for (kind, dest) in jobs {
        let Some(dest) = dest else { continue };
        let tmp = partial_path(dest);
        if let Err(err) = kind.write(&tmp, run) {
            let _ = std::fs::remove_file(&tmp);
            for (written, _) in &staged {
                let _ = std::fs::remove_file(written);
            }
            return Err(err);
        }
        staged.push((tmp, dest));
    }

    for (tmp, dest) in &staged {
        std::fs::rename(tmp, dest).map_err(|e| {
            AppError::usage(format!("Failed to move export into place at '{}': {e}", dest.display()))
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum ExportKind {
    Results,
    Mispriced,
    Model,
}

impl ExportKind {
    fn write(self, path: &Path, run: &pipeline::RunOutput) -> Result<(), AppError> {
        match self {
            ExportKind::Results => crate::io::export::write_results_csv(path, &run.result),
            ExportKind::Mispriced => {
                crate::io::export::write_mispriced_csv(path, &run.result, &run.mispriced)
            }
            ExportKind::Model => crate::io::model::write_model_json(path, &run.result, &run.mispriced),
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let config = PipelineConfig {
        all_series: true,
        ..source_config(&args.source)
    };
    let series = pipeline::load_series(&config)?;
    crate::io::export::write_series_csv(&args.out, &series)?;
    println!("Wrote {} series to {}", series.len(), args.out.display());
    Ok(())
}

/// Build the run configuration from `fit`/`rank` arguments.
pub fn config_from_args(args: &FitArgs) -> PipelineConfig {
    PipelineConfig {
        target: args.target.clone(),
        factors: args.factors.clone(),
        quantile: args.quantile,
        rank_tolerance: args.rank_tol,
        top_n: args.top,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_mispriced: args.export_mispriced.clone(),
        export_model: args.export_model.clone(),
        ..source_config(&args.source)
    }
}

fn source_config(args: &SourceArgs) -> PipelineConfig {
    PipelineConfig {
        source: args.source,
        input: args.input.clone(),
        policy: args.policy,
        all_series: args.all_series,
        fred: FredConfig {
            timeout_secs: args.timeout,
            retries: args.retries,
            observation_start: args.start,
        },
        bonds: BondConfig {
            include: args.bonds,
            timeout_secs: args.timeout,
            retries: args.retries,
        },
        sample: SampleConfig {
            months: args.months,
            seed: args.seed,
            gap_prob: args.gap_prob,
            shock_prob: args.shock_prob,
        },
        ..PipelineConfig::default()
    }
}
