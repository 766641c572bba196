use std::io::{self, Write};

use crate::commands::FileReport;
use crate::util::truncate;

/// Per-snapshot detection results, one row per input file.
pub fn print_file_reports(reports: &[&FileReport]) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "   \x1b[2m{:<32} {:>10} {:>8} {:>10} {:>8}\x1b[0m",
        "Snapshot", "Atoms", "Grains", "Unassigned", "Skipped"
    );
    for report in reports {
        let _ = writeln!(
            stderr,
            "   {:<32} {:>10} {:>8} {:>10} {:>8}",
            truncate(&report.name, 32),
            report.num_atoms,
            report.num_grains,
            report.num_unassigned,
            report.skipped_lines
        );
    }
    let _ = writeln!(stderr);
}
