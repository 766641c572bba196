mod detect;
mod track;

pub use detect::FileReport;

use anyhow::{bail, Result};
use rayon::prelude::*;

use polygrain::{CubicLattice, DetectConfig, TrackConfig};

use crate::cli::Cli;
use crate::display::{self, Context, Progress};

pub fn run(cli: Cli, ctx: Context) -> Result<()> {
    let lattice = CubicLattice::fcc(cli.lattice_parameter, cli.volume_unit.clone(), &cli.element);
    let params = detect::Params {
        lattice: lattice.clone(),
        config: DetectConfig {
            angular_threshold: cli.threshold_deg.to_radians(),
            periodic: !cli.open,
            orphan_depth: cli.orphan_passes,
            ..DetectConfig::default()
        },
        out_dir: cli.out_dir.clone(),
    };

    let mut progress = Progress::new(ctx.interactive);

    // per-snapshot detection is embarrassingly parallel
    let bar = progress.batch(cli.inputs.len() as u64);
    let results: Vec<_> = cli
        .inputs
        .par_iter()
        .map(|path| {
            let result = detect::process_file(path, &params);
            bar.advance(
                &path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            result
        })
        .collect();
    bar.finish();

    let mut frames = Vec::new();
    for (path, result) in cli.inputs.iter().zip(results) {
        match result {
            Ok(frame) => frames.push(frame),
            Err(e) => display::print_warning(&format!("skipping {}: {:#}", path.display(), e)),
        }
    }
    if frames.is_empty() {
        bail!("No snapshot could be processed");
    }

    let total_atoms: usize = frames.iter().map(|f| f.report.num_atoms).sum();
    let total_grains: usize = frames.iter().map(|f| f.report.num_grains).sum();
    progress.stage_done(
        &format!(
            "Detected grains in {} of {} snapshots",
            frames.len(),
            cli.inputs.len()
        ),
        &[format!("{total_atoms} atoms, {total_grains} grains total")],
    );

    if ctx.interactive {
        let reports: Vec<&FileReport> = frames.iter().map(|f| &f.report).collect();
        display::print_file_reports(&reports);
    }

    let tracked = if cli.restart.is_some() {
        frames.len()
    } else {
        frames.len().saturating_sub(1)
    };
    if !cli.no_track && tracked > 0 {
        let track_config = TrackConfig {
            max_misorientation: cli.track_threshold_deg.to_radians(),
            ..TrackConfig::default()
        };
        let bar = progress.batch(tracked as u64);
        let relabeled = track::run_tracking(
            &mut frames,
            &lattice,
            &track_config,
            cli.restart.as_deref(),
            &bar,
        )?;
        bar.finish();
        progress.stage_done(
            &format!("Tracked grain ids over {tracked} frames"),
            &[format!("{relabeled} frames relabeled")],
        );
    }

    progress.finish();
    Ok(())
}
