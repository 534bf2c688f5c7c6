// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! finmesh CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use finmesh::cli::Reporter;
use finmesh::{CliOverrides, FinConfig, MeshAlgorithm};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Parser)]
#[command(name = "finmesh")]
#[command(about = "Build, tag and mesh a parametric 2D fin cross-section", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Characteristic mesh size
    #[arg(long)]
    lc: Option<f64>,

    /// Generate the mesh and write it
    #[arg(long)]
    mesh: bool,

    /// Fragment the post against the fins
    #[arg(long)]
    fragment: bool,

    /// Render a preview and wait for Enter
    #[arg(long)]
    view: bool,

    /// Debug-level logging
    #[arg(long)]
    debug: bool,

    /// TOML configuration file (default: finmesh.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mesh output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// 2D algorithm, by name or numeric code
    #[arg(long)]
    algorithm: Option<MeshAlgorithm>,

    /// Write a JSON summary of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Print the effective configuration
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration to a file
    Init {
        #[arg(default_value = finmesh::config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },

    /// List the meshing algorithms
    Algorithms,

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(err) = dispatch(&cli) {
        Reporter::report_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Init { path }) => {
            FinConfig::default().save(path)?;
            Reporter::success(&format!("Wrote default configuration to {}", path.display()));
        }
        Some(Commands::Algorithms) => {
            for algorithm in MeshAlgorithm::ALL {
                println!("{:>2}  {}", algorithm.code(), algorithm);
            }
        }
        Some(Commands::Version) => {
            println!("finmesh v{}", env!("CARGO_PKG_VERSION"));
        }
        None => run_command(cli)?,
    }
    Ok(())
}

fn run_command(cli: &Cli) -> Result<()> {
    let mut config = FinConfig::load(cli.config.as_deref())?;
    config.apply_cli(&CliOverrides {
        lc: cli.lc,
        output: cli.output.clone(),
        algorithm: cli.algorithm,
        fragment: cli.fragment,
        generate_mesh: cli.mesh,
        view: cli.view,
    });
    config.validate()?;

    if cli.verbose {
        println!("{}", toml::to_string_pretty(&config)?);
    }

    let summary = finmesh::run(&config)?;

    if let Some(path) = &cli.report {
        summary.write_json(path)?;
        Reporter::report_info(&format!("Report written to {}", path.display()));
    }
    match &summary.mesh {
        Some(mesh) => Reporter::success(&format!("Mesh written to {}", mesh.path.display())),
        None => Reporter::success("Geometry tagged (no mesh requested)"),
    }
    Ok(())
}
