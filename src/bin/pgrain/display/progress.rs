use std::io::{self, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Stage-level progress reporting: a bar per file batch, a checkmark line
/// per completed stage, a footer with the total runtime.
pub struct Progress {
    interactive: bool,
    start: Instant,
    stage_start: Instant,
}

impl Progress {
    pub fn new(interactive: bool) -> Self {
        let now = Instant::now();
        Self {
            interactive,
            start: now,
            stage_start: now,
        }
    }

    /// Opens a progress bar over `len` files and marks the stage start.
    pub fn batch(&mut self, len: u64) -> FileBar {
        self.stage_start = Instant::now();
        FileBar::new(self.interactive, len)
    }

    pub fn stage_done(&mut self, description: &str, substeps: &[String]) {
        if !self.interactive {
            return;
        }

        let elapsed = self.stage_start.elapsed();
        let mut stderr = io::stderr().lock();

        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m {:<44} {:>5.1}s",
            description,
            elapsed.as_secs_f64()
        );

        for substep in substeps {
            let _ = writeln!(stderr, "      \x1b[2m·\x1b[0m {}", substep);
        }
    }

    pub fn finish(self) {
        if !self.interactive {
            return;
        }

        let elapsed = self.start.elapsed();
        let mut stderr = io::stderr().lock();

        let _ = writeln!(stderr);
        let _ = writeln!(
            stderr,
            "  \x1b[2m╺━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╸\x1b[0m"
        );
        let _ = writeln!(stderr);
        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m Analysis complete {:>32}",
            format!("Total: {:.2}s", elapsed.as_secs_f64())
        );
        let _ = writeln!(stderr);
    }
}

/// A per-file progress bar, safe to advance from worker threads.
pub struct FileBar {
    bar: Option<ProgressBar>,
}

impl FileBar {
    fn new(interactive: bool, len: u64) -> Self {
        if !interactive {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} [{bar:30.cyan}] {pos}/{len} {msg}")
                .expect("invalid template")
                .progress_chars("━╸ ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar: Some(bar) }
    }

    pub fn advance(&self, name: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(name.to_string());
            bar.inc(1);
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
