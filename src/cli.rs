use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;

use crate::zip::{ArchiveOptions, DEFAULT_CHUNK_SIZE};

/// Which extraction scenario to run.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Extract into a freshly allocated heap buffer
    Heap,
    /// Extract into a preallocated fixed-size buffer
    Buffer,
    /// Stream through read and write callbacks
    Callback,
    /// Run heap, buffer and callback in that order
    All,
}

#[derive(Parser, Debug)]
#[command(name = "memzip")]
#[command(version)]
#[command(about = "Extract a ZIP entry to the heap, a fixed buffer, or a callback", long_about = None)]
#[command(after_help = "Examples:\n  \
  memzip                          run all three scenarios on the built-in sample\n  \
  memzip data.zip notes.txt -m callback --heap-stats\n  \
  memzip -v data.zip              list entries with sizes and dates")]
pub struct Cli {
    /// ZIP file path (default: built-in sample archive)
    #[arg(value_name = "ARCHIVE")]
    pub archive: Option<PathBuf>,

    /// Entry to extract
    #[arg(value_name = "NAME", default_value = "test.txt")]
    pub name: String,

    /// Extraction scenario
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::All)]
    pub mode: Mode,

    /// Size of the fixed buffer used by the buffer scenario
    #[arg(short = 'b', long, value_name = "BYTES", default_value_t = 24 * 1024)]
    pub buffer_size: usize,

    /// Bytes read and inflated per step
    #[arg(short = 'c', long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Print allocator usage around each extraction and inside the callbacks
    #[arg(long)]
    pub heap_stats: bool,

    /// Skip CRC-32 verification
    #[arg(long)]
    pub no_crc: bool,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_list(&self) -> bool {
        self.list || self.verbose
    }

    /// Whether `mode` is one of the scenarios selected on the command line.
    pub fn runs(&self, mode: Mode) -> bool {
        self.mode == Mode::All || self.mode == mode
    }

    /// Default log level when `RUST_LOG` is not set.
    pub fn log_level(&self) -> Level {
        match self.quiet {
            0 => Level::INFO,
            1 => Level::WARN,
            _ => Level::ERROR,
        }
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions::new()
            .with_chunk_size(self.chunk_size)
            .with_verify_crc(!self.no_crc)
    }
}
