use std::path::Path;

use anyhow::{Context as _, Result};

use polygrain::io::{cfg, table};
use polygrain::{CubicLattice, GrainTracker, TrackConfig};

use crate::display::FileBar;

use super::detect::ProcessedFrame;

/// Carries grain ids through the processed frames in order, rewriting
/// each frame's table (and, when ids changed, its annotated CFG) in
/// place. Returns the number of frames whose ids were relabeled.
pub fn run_tracking(
    frames: &mut [ProcessedFrame],
    lattice: &CubicLattice,
    config: &TrackConfig,
    restart: Option<&Path>,
    bar: &FileBar,
) -> Result<usize> {
    let (mut tracker, rest) = match restart {
        Some(path) => {
            let initial = table::read_file(path)
                .with_context(|| format!("Failed to read restart table {}", path.display()))?;
            let tracker = GrainTracker::from_restart(config, lattice.clone(), initial);
            (tracker, frames)
        }
        None => {
            let Some((first, rest)) = frames.split_first_mut() else {
                return Ok(0);
            };
            let tracker =
                GrainTracker::from_first_frame(config, lattice.clone(), first.summary.clone());
            (tracker, rest)
        }
    };

    let mut relabeled = 0;
    for frame in rest {
        let mapping = tracker.advance(&mut frame.summary);
        table::write_file(&frame.table_path, &frame.summary, lattice)
            .with_context(|| format!("Failed to rewrite {}", frame.table_path.display()))?;
        if !mapping.is_identity() {
            cfg::rewrite_grain_ids(&frame.config_path, &mapping)
                .with_context(|| format!("Failed to relabel {}", frame.config_path.display()))?;
            relabeled += 1;
        }
        bar.advance(&frame.report.name);
    }

    Ok(relabeled)
}
