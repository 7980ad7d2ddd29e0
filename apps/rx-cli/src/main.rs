use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rx_app::{AppResult, RunRequest, project_service, run_service};

#[derive(Parser)]
#[command(name = "rx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reactor core transient simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file and build its plant
    Validate {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Print the state vector layout of a case
    Layout {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Run a transient
    Run {
        /// Path to the case YAML file
        case_path: PathBuf,
        /// Run store root; each run gets a timestamped directory inside it
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },
    /// List the runs stored under a root
    Runs {
        #[arg(default_value = "output")]
        output: PathBuf,
    },
    /// Show the manifest and stream summaries of a run directory
    Show {
        run_dir: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Layout { case_path } => cmd_layout(&case_path),
        Commands::Run { case_path, output } => cmd_run(&case_path, &output),
        Commands::Runs { output } => cmd_runs(&output),
        Commands::Show { run_dir } => cmd_show(&run_dir),
    }
}

fn cmd_validate(case_path: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = project_service::load_case(case_path)?;
    let summary = project_service::validate_case(&case)?;
    let solve: Vec<&str> = summary.solve.iter().map(|k| k.as_str()).collect();
    println!("✓ Case '{}' is valid", summary.name);
    println!("  Solve: {}", solve.join(", "));
    println!("  State variables: {}", summary.state_len);
    println!("  Streams: {}", summary.streams.join(", "));
    Ok(())
}

fn cmd_layout(case_path: &Path) -> AppResult<()> {
    let case = project_service::load_case(case_path)?;
    let entries = project_service::layout(&case)?;
    println!("{:>6}  {:<14}  label", "index", "subsystem");
    for entry in entries {
        println!("{:>6}  {:<14}  {}", entry.index, entry.subsystem.as_str(), entry.label);
    }
    Ok(())
}

fn cmd_run(case_path: &Path, output: &Path) -> AppResult<()> {
    info!(case = %case_path.display(), output = %output.display(), "starting run");
    let response = run_service::run_case(&RunRequest {
        case_path,
        output_root: output,
        cancel: None,
    })
    .inspect_err(|e| error!(error = %e, "run did not complete"))?;

    println!("✓ Run completed: {}", response.run_dir.display());
    println!("  Samples: {}", response.summary.samples);
    println!("  Final time: {:.6e} s", response.summary.t_final);
    println!(
        "  Steps: {} accepted, {} rejected, {} RHS calls",
        response.summary.stats.accepted_steps,
        response.summary.stats.rejected_steps,
        response.summary.stats.rhs_calls
    );
    println!("  Wall time: {:.3}s", response.wall_time_s);
    Ok(())
}

fn cmd_runs(output: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(output)?;
    if runs.is_empty() {
        println!("No runs found under {}", output.display());
        return Ok(());
    }
    for (dir, manifest) in runs {
        println!(
            "  {}  {:<10} {} ({} samples)",
            dir.display(),
            format!("{:?}", manifest.status).to_lowercase(),
            manifest.case_name,
            manifest.samples
        );
    }
    Ok(())
}

fn cmd_show(run_dir: &Path) -> AppResult<()> {
    let (manifest, tables) = run_service::load_run(run_dir)?;

    println!("Run: {}", run_dir.display());
    println!("  Case: {}", manifest.case_name);
    println!("  Started: {}", manifest.timestamp);
    println!("  Solver: {}", manifest.solver);
    println!("  Status: {:?}", manifest.status);
    if let Some(t) = manifest.t_final_s {
        println!("  Final time: {t:.6e} s");
    }
    if let Some(error) = &manifest.error {
        println!("  Error: {error}");
    }
    println!("  Input SHA-256: {}", manifest.input_sha256);

    println!("\nStreams:");
    for (name, table) in tables {
        println!("  {} ({} rows)", name, table.rows.len());
        let Some(last) = table.last() else {
            continue;
        };
        for (label, value) in table.columns.iter().zip(&last[1..]) {
            println!("    {label:<16} {value:.5e}");
        }
    }
    Ok(())
}
