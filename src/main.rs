//! Command-line front end for the DWI volume reorder transform.

use clap::Parser;
use dwireorder::{ReorderConfig, B0_THRESHOLD};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Reorder a DWI series so baseline (b=0) volumes come first.
///
/// The image, bval, and bvec outputs stay mutually aligned; existing
/// files at the output paths are overwritten.
#[derive(Debug, Parser)]
#[command(name = "dwireorder", version, about)]
struct Cli {
    /// Input 4D NIfTI image (.nii or .nii.gz)
    #[arg(long, value_name = "FILE")]
    dwi: PathBuf,

    /// Input b-value table
    #[arg(long, value_name = "FILE")]
    bval: PathBuf,

    /// Input b-vector table (3xN or Nx3)
    #[arg(long, value_name = "FILE")]
    bvec: PathBuf,

    /// Output NIfTI image
    #[arg(long, value_name = "FILE")]
    out_dwi: PathBuf,

    /// Output b-value table
    #[arg(long, value_name = "FILE")]
    out_bval: PathBuf,

    /// Output b-vector table (written 3xN)
    #[arg(long, value_name = "FILE")]
    out_bvec: PathBuf,

    /// B-values below this count as baseline (exclusive bound)
    #[arg(long, value_name = "BVAL", default_value_t = B0_THRESHOLD)]
    b0_threshold: f64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReorderConfig {
        nifti_in: cli.dwi,
        bval_in: cli.bval,
        bvec_in: cli.bvec,
        nifti_out: cli.out_dwi,
        bval_out: cli.out_bval,
        bvec_out: cli.out_bvec,
        b0_threshold: cli.b0_threshold,
    };

    match dwireorder::run(&config) {
        Ok(summary) => {
            println!(
                "Reordering complete: saved to {}",
                summary.nifti_out.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("dwireorder: {err}");
            ExitCode::FAILURE
        }
    }
}
