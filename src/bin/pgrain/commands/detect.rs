use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use polygrain::io::cfg::{self, CfgAtom, CfgContent, GRAIN_ID_COLUMN, NO_GRAIN, ORIENT_ID_COLUMN};
use polygrain::io::table;
use polygrain::{CubicLattice, DetectConfig, FrameSummary, Snapshot};

/// Suffix of the annotated CFG export, appended to the input stem.
const CONFIG_SUFFIX: &str = ".grains.cfg";
/// Suffix of the per-frame grain table.
const TABLE_SUFFIX: &str = ".grains.csv";

/// Shared per-run detection parameters.
pub struct Params {
    pub lattice: CubicLattice,
    pub config: DetectConfig,
    pub out_dir: Option<PathBuf>,
}

/// A snapshot processed through detection, with the paths of its exports
/// so the tracking stage can rewrite them in place.
pub struct ProcessedFrame {
    pub config_path: PathBuf,
    pub table_path: PathBuf,
    pub summary: FrameSummary,
    pub report: FileReport,
}

pub struct FileReport {
    pub name: String,
    pub num_atoms: usize,
    pub num_grains: usize,
    pub num_unassigned: usize,
    pub skipped_lines: u64,
}

/// Runs the full per-snapshot pipeline on one CFG file: read, solve
/// orientations, detect grains, export the annotated configuration and
/// the grain table.
pub fn process_file(path: &Path, params: &Params) -> Result<ProcessedFrame> {
    let content = cfg::read_file(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;

    let mut snapshot = Snapshot::new(
        [0.0; 3],
        content.size,
        params.lattice.clone(),
        params.config.clone(),
    )?;

    // annotation columns from an earlier export are stale; drop them and
    // append fresh ones on output
    let keep: Vec<bool> = content
        .property_names
        .iter()
        .map(|n| n != GRAIN_ID_COLUMN && n != ORIENT_ID_COLUMN)
        .collect();
    let strip = |values: &[f64]| -> Vec<f64> {
        values
            .iter()
            .zip(&keep)
            .filter(|(_, &k)| k)
            .map(|(&v, _)| v)
            .collect()
    };
    let names: Vec<String> = content
        .property_names
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(n, _)| n.clone())
        .collect();
    snapshot.set_property_names(names.clone());

    let mut handles = Vec::with_capacity(content.atoms.len());
    for atom in &content.atoms {
        handles.push(snapshot.add_atom(&atom.position, &strip(&atom.properties)));
    }

    snapshot.solve_orientations();
    snapshot.detect_grains();
    let summary = snapshot.summary();

    let mut out_names = names;
    out_names.push(ORIENT_ID_COLUMN.to_string());
    out_names.push(GRAIN_ID_COLUMN.to_string());
    let mut out_atoms = Vec::with_capacity(content.atoms.len());
    for (atom, handle) in content.atoms.iter().zip(&handles) {
        let Some(handle) = handle else {
            continue;
        };
        let mut properties = strip(&atom.properties);
        let stored = snapshot.index().atom(*handle);
        properties.push(stored.orientation().map_or(NO_GRAIN, |o| o as f64));
        properties.push(stored.grain().map_or(NO_GRAIN, |g| g as f64));
        out_atoms.push(CfgAtom {
            position: atom.position,
            properties,
        });
    }

    let config_path = output_path(path, params.out_dir.as_deref(), CONFIG_SUFFIX);
    let table_path = output_path(path, params.out_dir.as_deref(), TABLE_SUFFIX);

    let out_content = CfgContent {
        size: content.size,
        property_names: out_names,
        element: content.element.clone(),
        mass: content.mass,
        atoms: out_atoms,
        skipped_lines: 0,
    };
    cfg::write_file(&config_path, &out_content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    table::write_file(&table_path, &summary, snapshot.lattice())
        .with_context(|| format!("Failed to write {}", table_path.display()))?;

    let report = FileReport {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        num_atoms: snapshot.num_atoms(),
        num_grains: snapshot.num_grains(),
        num_unassigned: snapshot.num_unassigned_atoms(),
        skipped_lines: content.skipped_lines,
    };

    Ok(ProcessedFrame {
        config_path,
        table_path,
        summary,
        report,
    })
}

fn output_path(input: &Path, out_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_replace_the_extension() {
        let path = output_path(Path::new("runs/frame_0001.cfg"), None, TABLE_SUFFIX);
        assert_eq!(path, PathBuf::from("runs/frame_0001.grains.csv"));
    }

    #[test]
    fn output_paths_honor_the_output_directory() {
        let path = output_path(
            Path::new("runs/frame_0001.cfg"),
            Some(Path::new("out")),
            CONFIG_SUFFIX,
        );
        assert_eq!(path, PathBuf::from("out/frame_0001.grains.cfg"));
    }
}
