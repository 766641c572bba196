mod banner;
mod error;
mod progress;
mod report;

pub use banner::{banner_for_help, print_banner};
pub use error::{print_error, print_warning};
pub use progress::{FileBar, Progress};
pub use report::print_file_reports;

use std::io::{self, IsTerminal};

#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub interactive: bool,
}

impl Context {
    pub fn detect() -> Self {
        Self {
            interactive: io::stderr().is_terminal(),
        }
    }

    pub fn with_quiet(self, quiet: bool) -> Self {
        if quiet {
            Self { interactive: false }
        } else {
            self
        }
    }
}
