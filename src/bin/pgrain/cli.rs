use std::path::PathBuf;

use clap::Parser;

use polygrain::model::lattice::DEFAULT_VOLUME_UNIT;
use polygrain::VolumeUnit;

#[derive(Parser)]
#[command(
    name = "pgrain",
    about = "Grain detection and tracking in FCC atomistic snapshots",
    version,
    author,
    before_help = crate::display::banner_for_help()
)]
pub struct Cli {
    /// Input CFG snapshots, in time order
    #[arg(value_name = "CFG", required = true)]
    pub inputs: Vec<PathBuf>,

    /// FCC lattice parameter (Å)
    #[arg(
        short = 'a',
        long = "lattice-parameter",
        value_name = "Å",
        default_value = "4.05",
        value_parser = parse_lattice_parameter
    )]
    pub lattice_parameter: f64,

    /// Growth misorientation threshold (degrees)
    #[arg(
        short = 't',
        long = "threshold",
        value_name = "DEG",
        default_value = "1.0",
        value_parser = parse_angle
    )]
    pub threshold_deg: f64,

    /// Treat the simulation box as non-periodic (periodic by default)
    #[arg(long)]
    pub open: bool,

    /// Element name carried into the lattice description
    #[arg(long, value_name = "NAME", default_value = "Al")]
    pub element: String,

    /// Unit for exported grain volumes, `[number]unit^3`
    #[arg(long = "volume-unit", value_name = "UNIT", default_value = DEFAULT_VOLUME_UNIT)]
    pub volume_unit: VolumeUnit,

    /// Orphan adoption passes (0 repeats until nothing is adopted)
    #[arg(long = "orphan-passes", value_name = "N", default_value = "0")]
    pub orphan_passes: u32,

    /// Maximum misorientation between tracking partners (degrees)
    #[arg(
        long = "track-threshold",
        value_name = "DEG",
        default_value = "5.0",
        value_parser = parse_angle
    )]
    pub track_threshold_deg: f64,

    /// Grain table of an earlier run to seed tracking ids from
    #[arg(long, value_name = "FILE")]
    pub restart: Option<PathBuf>,

    /// Skip the cross-frame tracking stage
    #[arg(long = "no-track")]
    pub no_track: bool,

    /// Directory for exported files (defaults to each input's directory)
    #[arg(short, long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_lattice_parameter(s: &str) -> Result<f64, String> {
    let a: f64 = s
        .parse()
        .map_err(|_| format!("invalid lattice parameter: '{}'", s))?;
    if a <= 0.0 || a > 100.0 {
        return Err("lattice parameter must be in (0, 100] Å".to_string());
    }
    Ok(a)
}

fn parse_angle(s: &str) -> Result<f64, String> {
    let deg: f64 = s.parse().map_err(|_| format!("invalid angle: '{}'", s))?;
    if deg <= 0.0 || deg > 90.0 {
        return Err("angle must be in (0, 90] degrees".to_string());
    }
    Ok(deg)
}

pub fn parse() -> Cli {
    Cli::parse()
}
