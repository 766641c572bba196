use std::io::{self, Write};

use anyhow::Error;

use crate::util::wrap;

pub fn print_warning(message: &str) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "  \x1b[33m⚠\x1b[0m {}", message);
}

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    let msg = err.to_string();
    for line in wrap(&msg, 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 59) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    if let Some(hints) = collect_hints(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

fn collect_hints(err: &Error) -> Option<Vec<String>> {
    let mut hints = Vec::new();

    collect_io_hints(err, &mut hints);
    collect_detect_hints(err, &mut hints);

    if hints.is_empty() {
        collect_fallback_hints(err, &mut hints);
    }

    if hints.is_empty() {
        None
    } else {
        Some(hints)
    }
}

fn collect_io_hints(err: &Error, hints: &mut Vec<String>) {
    use polygrain::io::Error as IoError;

    let Some(io_err) = err.downcast_ref::<IoError>() else {
        return;
    };

    match io_err {
        IoError::Io { source } => collect_std_io_hints(source, hints),

        IoError::Parse { format, line, .. } => {
            hints.push(format!(
                "Parser encountered an issue near line {} in {} format",
                line, format
            ));
            hints.push("Inspect the file around that line for malformed entries".into());
            collect_format_hints(*format, hints);
        }

        IoError::WrongFormat(format) => {
            hints.push(format!("The file is not a valid {} file", format));
            collect_format_hints(*format, hints);
        }
    }
}

fn collect_format_hints(format: polygrain::io::Format, hints: &mut Vec<String>) {
    use polygrain::io::Format;

    match format {
        Format::Cfg => {
            hints.push("CFG: the header must set 'Number of particles'".into());
            hints.push("CFG: check H0 cell entries and auxiliary[i] declarations".into());
        }
        Format::GrainTable => {
            hints.push("Grain tables start with a title, a geometry line and the column names".into());
            hints.push("Pass a table written by an earlier run, not a raw CSV".into());
        }
    }
}

fn collect_std_io_hints(source: &std::io::Error, hints: &mut Vec<String>) {
    use std::io::ErrorKind;

    match source.kind() {
        ErrorKind::NotFound => {
            hints.push("File or directory not found".into());
            hints.push("Check the path spelling and ensure the file exists".into());
        }
        ErrorKind::PermissionDenied => {
            hints.push("Permission denied accessing the file".into());
            hints.push("Check file permissions with `ls -la`".into());
        }
        ErrorKind::InvalidData => {
            hints.push("File contains invalid or corrupt data".into());
            hints.push("Verify the file is not truncated or corrupted".into());
        }
        ErrorKind::UnexpectedEof => {
            hints.push("Unexpected end of file encountered".into());
            hints.push("The file may be truncated or incomplete".into());
        }
        ErrorKind::WriteZero => {
            hints.push("Failed to write data (disk full?)".into());
            hints.push("Check available disk space".into());
        }
        _ => {
            hints.push("I/O operation failed".into());
            hints.push("Check file path, permissions, and disk space".into());
        }
    }
}

fn collect_detect_hints(err: &Error, hints: &mut Vec<String>) {
    use polygrain::DetectError;

    let Some(detect_err) = err.downcast_ref::<DetectError>() else {
        return;
    };

    match detect_err {
        DetectError::InvalidBoxSize(_) => {
            hints.push("The input declares a degenerate simulation box".into());
            hints.push("Check the H0 cell matrix in the CFG header".into());
        }
        DetectError::InvalidLatticeParameter(_) => {
            hints.push("Pass a positive lattice parameter via -a".into());
        }
        DetectError::InvalidAngularThreshold(_) => {
            hints.push("Pass a growth threshold in (0, 90] degrees via -t".into());
        }
    }
}

fn collect_fallback_hints(err: &Error, hints: &mut Vec<String>) {
    let msg = error_chain_text(err);

    if msg.contains("no such file") || msg.contains("not found") {
        hints.push("Check that the file path is correct".into());
        hints.push("Verify the file exists and is readable".into());
        return;
    }

    if msg.contains("permission denied") {
        hints.push("Check file permissions with `ls -la`".into());
        hints.push("Ensure you have the required access rights".into());
    }
}

fn error_chain_text(err: &Error) -> String {
    let mut text = String::new();

    text.push_str(&err.to_string());

    let mut source = err.source();
    while let Some(cause) = source {
        text.push('\n');
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text.to_lowercase()
}
