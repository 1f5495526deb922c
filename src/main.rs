//! ----------------------
//! Author: Sang Young Noh
//! ----------------------
//!
//! ------------------------
//! Last Updated: 16/10/2026
//! ------------------------
//!

/*

Check a simulation box and print the periodic boundary geometry that the
distance routines would use for it: which dimensions are periodic, the
maximum safe cut-off and the triclinic shift vectors.

    sang_pbc --box 5 0 0  1 5 0  -1 2 5 --pbc xyz --correct -v
*/

use clap::Parser;
use env_logger::Env;
use log::info;
use sang_pbc::pbc::check_box;
use sang_pbc::{CellMatrix, GeometryConfig, PbcError, PbcSelector, Real, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sang_pbc")]
#[command(about = "Check a simulation box and print its periodic boundary geometry")]
#[command(version)]
struct Cli {
    /// Box vectors a, b and c, row by row
    #[arg(long = "box", num_args = 9, value_name = "X", allow_negative_numbers = true, required = true)]
    cell: Vec<Real>,

    /// Type of pbc: auto, no, x, y, z, xy, xz, yz, xyz or screw
    #[arg(long)]
    pbc: Option<PbcSelector>,

    /// Geometry configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the geometry as JSON
    #[arg(long)]
    json: bool,

    /// Correct the box when it is too skewed
    #[arg(long)]
    correct: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let mut config = match &cli.config {
        Some(path) => GeometryConfig::from_file(path)?,
        None => GeometryConfig {
            correct_box: false,
            ..Default::default()
        },
    };
    if let Some(pbc) = cli.pbc {
        config.pbc = pbc;
    }
    config.correct_box |= cli.correct;

    let values: [Real; 9] = cli.cell.try_into().map_err(|values: Vec<Real>| {
        PbcError::InvalidCell(format!("expected 9 numbers, got {}", values.len()))
    })?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PbcError::InvalidCell(format!("non-finite box element in {values:?}")));
    }
    let mut cell = CellMatrix::from_row_slice(&values);

    let mode = config.resolve_mode(&cell);
    match check_box(Some(mode), &cell) {
        Ok(()) => info!("box is valid for {mode} pbc"),
        Err(problem) => info!("{problem}"),
    }

    let geometry = config.build(&mut cell)?;
    if cli.json {
        println!("{}", geometry.to_json()?);
    } else {
        print!("{}", geometry.dump());
    }
    Ok(())
}
