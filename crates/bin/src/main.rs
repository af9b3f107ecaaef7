//! Hobart CLI binary.
//!
//! Provides command-line interface for distributed-lag event-study
//! estimation: simulating panels, fitting event studies and checking
//! the distributed-lag estimate against its binned companion.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use hobart::{check_equivalence, DistributedLagConfig, DistributedLagModel, EventStudyEstimate};
use hobart_output::{
    EstimateExport, EstimateSummary, EventTimeRecord, ExportFormat, Exporter, GammaRecord,
};
use hobart_panel::{simulate_panel, SimulationConfig};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: Distributed-lag event-study estimation", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic staggered-adoption panel
    Simulate {
        /// Output CSV path
        #[arg(long, default_value = "panel.csv")]
        out: PathBuf,

        /// Number of cross-sectional units
        #[arg(long, default_value = "676")]
        units: usize,

        /// Number of periods per unit
        #[arg(long, default_value = "20")]
        periods: usize,

        /// Share of units that ever receive treatment
        #[arg(long, default_value = "0.4")]
        treated_share: f64,

        /// Candidate onset periods, comma separated
        #[arg(long, default_value = "7,8,9", value_delimiter = ',')]
        onsets: Vec<i64>,

        /// Post-treatment shift in the outcome
        #[arg(long, default_value = "-3.0", allow_hyphen_values = true)]
        effect: f64,

        /// Standard deviation of the unit effects
        #[arg(long, default_value = "2.0")]
        unit_sd: f64,

        /// Standard deviation of the period effects
        #[arg(long, default_value = "1.0")]
        time_sd: f64,

        /// Standard deviation of the idiosyncratic noise
        #[arg(long, default_value = "1.0")]
        noise_sd: f64,

        /// Generator seed
        #[arg(long, default_value = "7")]
        seed: u64,
    },

    /// Estimate an event study from a panel CSV
    Estimate {
        /// Input panel CSV
        input: PathBuf,

        #[command(flatten)]
        design: DesignArgs,

        /// Also print the raw lead/lag coefficients (text output only)
        #[arg(long)]
        gammas: bool,

        /// Output format (text, markdown, csv, json or pretty-json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the table to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check the distributed-lag estimate against a binned event study
    Verify {
        /// Input panel CSV
        input: PathBuf,

        #[command(flatten)]
        design: DesignArgs,

        /// Largest acceptable coefficient or standard error deviation
        #[arg(long, default_value = "1e-6")]
        tolerance: f64,
    },
}

/// Columns and window of the estimation design.
#[derive(Args)]
struct DesignArgs {
    /// Outcome column
    #[arg(long, default_value = "outcome")]
    outcome: String,

    /// Treatment exposure column
    #[arg(long, default_value = "post")]
    exposure: String,

    /// Unit identifier column
    #[arg(long, default_value = "unit")]
    unit: String,

    /// Time column
    #[arg(long, default_value = "time")]
    time: String,

    /// First event period of the window
    #[arg(long, default_value = "-3", allow_hyphen_values = true)]
    from: i64,

    /// Last event period of the window
    #[arg(long, default_value = "3", allow_hyphen_values = true)]
    to: i64,

    /// Omitted reference period
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    reference: i64,

    /// Control columns, comma separated
    #[arg(long, value_delimiter = ',')]
    covariates: Vec<String>,

    /// Fixed-effect dimensions absorbed beyond unit and time, comma separated
    #[arg(long, value_delimiter = ',')]
    absorb: Vec<String>,

    /// Regression engine
    #[arg(long, default_value = "within")]
    engine: String,
}

impl DesignArgs {
    fn to_config(&self, verbose: bool) -> DistributedLagConfig {
        let covariates: Vec<&str> = self.covariates.iter().map(String::as_str).collect();
        let absorb: Vec<&str> = self.absorb.iter().map(String::as_str).collect();
        DistributedLagConfig::new(
            &self.outcome,
            &self.exposure,
            &self.unit,
            &self.time,
            self.from,
            self.to,
        )
        .with_reference(self.reference)
        .with_covariates(&covariates)
        .with_extra_absorb(&absorb)
        .with_engine(&self.engine)
        .with_verbose(verbose)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Simulate {
            out,
            units,
            periods,
            treated_share,
            onsets,
            effect,
            unit_sd,
            time_sd,
            noise_sd,
            seed,
        } => {
            let config = SimulationConfig {
                n_units: units,
                n_periods: periods,
                treated_share,
                onset_periods: onsets,
                effect,
                unit_effect_sd: unit_sd,
                time_effect_sd: time_sd,
                noise_sd,
                seed,
            };
            simulate(&config, &out)?;
        }
        Commands::Estimate {
            input,
            design,
            gammas,
            format,
            out,
        } => {
            let config = design.to_config(cli.verbose);
            estimate(&input, &config, gammas, &format, out.as_deref())?;
        }
        Commands::Verify {
            input,
            design,
            tolerance,
        } => {
            let config = design.to_config(cli.verbose);
            verify(&input, &config, tolerance)?;
        }
    }

    Ok(())
}

fn simulate(config: &SimulationConfig, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    print!(
        "Simulating {} units x {} periods...",
        config.n_units, config.n_periods
    );
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut panel = match simulate_panel(config) {
        Ok(panel) => {
            println!(" ✓ ({} rows)", panel.height());
            panel
        }
        Err(e) => {
            println!(" ✗");
            return Err(format!("Simulation failed: {}", e).into());
        }
    };

    print!("Writing {}...", out.display());
    std::io::Write::flush(&mut std::io::stdout())?;
    let file = File::create(out)?;
    CsvWriter::new(file).finish(&mut panel)?;
    println!(" ✓");

    Ok(())
}

fn estimate(
    input: &Path,
    config: &DistributedLagConfig,
    show_gammas: bool,
    format: &str,
    out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = format.to_lowercase();
    let human = matches!(format.as_str(), "text" | "markdown" | "md");

    if human {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!(
            "║{:^62}║",
            format!("EVENT-STUDY ESTIMATION: {}", config.outcome)
        );
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!(
            "Window: [{}, {}] with reference period {}",
            config.from, config.to, config.reference
        );
        println!("Exposure: {}", config.exposure);
        println!("Clustered by: {}", config.unit);
        if !config.covariates.is_empty() {
            println!("Covariates: {}", config.covariates.join(", "));
        }
        if !config.extra_absorb.is_empty() {
            println!("Extra absorbed: {}", config.extra_absorb.join(", "));
        }
        println!("Engine: {}\n", config.engine);
    }

    let panel = load_panel(input, human)?;

    if human {
        print!("Estimating...");
        std::io::Write::flush(&mut std::io::stdout())?;
    }
    let model = DistributedLagModel::new(config.clone())?;
    let fitted = match model.estimate(&panel) {
        Ok(fitted) => {
            if human {
                println!(
                    " ✓ ({} observations, {} clusters)\n",
                    fitted.n_obs, fitted.n_clusters
                );
            }
            fitted
        }
        Err(e) => {
            if human {
                println!(" ✗");
            }
            return Err(format!("Estimation failed: {}", e).into());
        }
    };

    match format.as_str() {
        "text" => emit(&summary_of(&fitted).to_ascii_table(), out)?,
        "markdown" | "md" => emit(&summary_of(&fitted).to_markdown(), out)?,
        other => {
            let export_format = ExportFormat::from_str(other)?;
            let export = export_of(&fitted);
            match out {
                Some(path) => {
                    export.export_to_file(path, export_format)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", export.export_to_string(export_format)?),
            }
        }
    }

    if show_gammas && human {
        println!("\nLead/lag coefficients:");
        for record in gamma_records(&fitted) {
            println!(
                "  {:<8} {:>12.6}  (se {:.6})",
                record.term, record.estimate, record.se
            );
        }
    }

    Ok(())
}

fn verify(
    input: &Path,
    config: &DistributedLagConfig,
    tolerance: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "DISTRIBUTED-LAG vs BINNED EVENT STUDY");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let panel = load_panel(input, true)?;

    print!("Running both estimators...");
    std::io::Write::flush(&mut std::io::stdout())?;
    let report = match check_equivalence(&panel, config) {
        Ok(report) => {
            println!(" ✓");
            report
        }
        Err(e) => {
            println!(" ✗");
            return Err(format!("Equivalence check failed: {}", e).into());
        }
    };

    println!();
    println!(
        "  Observations:         {} (shared by both estimators)",
        report.distributed_lag.n_obs
    );
    println!("  Clusters:             {}", report.distributed_lag.n_clusters);
    println!("  Max coef deviation:   {:.3e}", report.max_coef_deviation);
    println!("  Max se deviation:     {:.3e}", report.max_se_deviation);
    println!();

    if report.within(tolerance) {
        println!("Estimates agree within {:.1e} ✓", tolerance);
        Ok(())
    } else {
        println!("Estimates diverge beyond {:.1e} ✗", tolerance);
        Err(format!(
            "max deviation {:.3e} exceeds tolerance {:.1e}",
            report.max_coef_deviation.max(report.max_se_deviation),
            tolerance
        )
        .into())
    }
}

fn load_panel(path: &Path, announce: bool) -> Result<DataFrame, Box<dyn std::error::Error>> {
    if announce {
        print!("Loading {}...", path.display());
        std::io::Write::flush(&mut std::io::stdout())?;
    }
    match read_csv(path) {
        Ok(panel) => {
            if announce {
                println!(" ✓ ({} rows)", panel.height());
            }
            Ok(panel)
        }
        Err(e) => {
            if announce {
                println!(" ✗");
            }
            Err(format!("Failed to read {}: {}", path.display(), e).into())
        }
    }
}

fn read_csv(path: &Path) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(file)
        .finish()?)
}

fn emit(rendered: &str, out: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match out {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn summary_of(fitted: &EventStudyEstimate) -> EstimateSummary {
    EstimateSummary::new(
        fitted.outcome.clone(),
        fitted.exposure.clone(),
        fitted.window.from(),
        fitted.window.to(),
        fitted.window.reference(),
        fitted.n_obs,
        fitted.n_clusters,
        rows_of(fitted),
    )
}

fn export_of(fitted: &EventStudyEstimate) -> EstimateExport {
    EstimateExport::new(
        fitted.outcome.clone(),
        fitted.exposure.clone(),
        fitted.unit.clone(),
        fitted.time.clone(),
        fitted.window.from(),
        fitted.window.to(),
        fitted.window.reference(),
        fitted.n_obs,
        fitted.n_clusters,
        rows_of(fitted),
        gamma_records(fitted),
    )
}

fn rows_of(fitted: &EventStudyEstimate) -> Vec<EventTimeRecord> {
    fitted
        .table
        .iter()
        .map(|row| EventTimeRecord {
            time_to_event: row.time_to_event,
            coef: row.coef,
            se: row.se,
            ci_lower: row.ci_lower,
            ci_upper: row.ci_upper,
        })
        .collect()
}

fn gamma_records(fitted: &EventStudyEstimate) -> Vec<GammaRecord> {
    fitted
        .gammas()
        .enumerate()
        .map(|(i, (offset, estimate))| GammaRecord {
            term: offset.to_string(),
            estimate,
            se: fitted.gamma_covariance[[i, i]].sqrt(),
        })
        .collect()
}
