//! Main entry point for the memzip demo.
//!
//! Runs the three extraction scenarios (heap, fixed buffer, callbacks) against
//! the built-in sample archive or a ZIP file given on the command line, and
//! optionally prints allocator usage around them.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::alloc::{GlobalAlloc, Layout, System};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use memzip::cli::Mode;
use memzip::{
    CallbackReader, Cli, EntryRecord, ExtractHook, LocalFileReader, MemoryReader, ReadAt,
    ZipArchive,
};

/// Archive used when no path is given: one DEFLATE entry, `test.txt`.
static SAMPLE_ARCHIVE: &[u8] = include_bytes!("../assets/test.zip");

/// Counts live heap bytes so the demo can report usage like firmware reports free heap.
struct TrackingAllocator;

static CURRENT_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn current_alloc_bytes() -> usize {
    CURRENT_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn peak_alloc_bytes() -> usize {
    PEAK_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn add_current_alloc_bytes(delta: usize) {
    let current = CURRENT_ALLOC_BYTES.fetch_add(delta, Ordering::Relaxed) + delta;
    PEAK_ALLOC_BYTES.fetch_max(current, Ordering::Relaxed);
}

fn sub_current_alloc_bytes(delta: usize) {
    CURRENT_ALLOC_BYTES.fetch_sub(delta, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        sub_current_alloc_bytes(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                add_current_alloc_bytes(new_size - layout.size());
            } else {
                sub_current_alloc_bytes(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

fn print_heap(label: &str) {
    println!(
        "{label:<15}: Heap In Use = {}, Peak Heap In Use = {}",
        current_alloc_bytes(),
        peak_alloc_bytes()
    );
}

/// Prints allocator usage before and after every extraction.
struct HeapReport;

impl ExtractHook for HeapReport {
    fn before_extract(&mut self, _entry: &EntryRecord) {
        print_heap("Before");
    }

    fn after_extract(&mut self, _entry: &EntryRecord, _result: &memzip::Result<u64>) {
        print_heap("After");
    }
}

/// Where the archive bytes come from.
enum Source {
    Embedded(&'static [u8]),
    File(PathBuf),
}

impl Source {
    fn from_cli(cli: &Cli) -> Self {
        match &cli.archive {
            Some(path) => Source::File(path.clone()),
            None => Source::Embedded(SAMPLE_ARCHIVE),
        }
    }

    fn describe(&self) -> String {
        match self {
            Source::Embedded(_) => "<built-in sample>".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }

    fn open(&self) -> Result<Box<dyn ReadAt>> {
        let reader: Box<dyn ReadAt> = match self {
            Source::Embedded(image) => Box::new(MemoryReader::new(*image)),
            Source::File(path) => Box::new(
                LocalFileReader::new(path)
                    .with_context(|| format!("cannot open {}", path.display()))?,
            ),
        };
        Ok(reader)
    }
}

/// Application entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let source = Source::from_cli(&cli);

    if cli.is_list() {
        return list_files(&source, &cli);
    }

    if cli.buffer_size == 0 {
        bail!("--buffer-size must be at least 1");
    }

    if cli.runs(Mode::Heap) {
        extract_to_heap(&source, &cli)?;
    }
    if cli.runs(Mode::Buffer) {
        extract_to_buffer(&source, &cli)?;
    }
    if cli.runs(Mode::Callback) {
        extract_with_callbacks(&source, &cli)?;
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_archive(source: &Source, cli: &Cli) -> Result<ZipArchive<Box<dyn ReadAt>>> {
    let reader = source.open()?;
    ZipArchive::open_with_options(reader, cli.archive_options())
        .with_context(|| format!("cannot read ZIP directory of {}", source.describe()))
}

/// Scenario 1: extract to a buffer allocated for exactly the entry size.
fn extract_to_heap(source: &Source, cli: &Cli) -> Result<()> {
    let mut archive = open_archive(source, cli)?;
    if cli.heap_stats {
        archive.set_hook(HeapReport);
    }

    let data = archive
        .extract_to_heap(&cli.name)
        .with_context(|| format!("heap extraction of '{}' failed", cli.name))?;
    archive.close();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

/// Scenario 2: extract into a fixed, preallocated buffer.
fn extract_to_buffer(source: &Source, cli: &Cli) -> Result<()> {
    let mut archive = open_archive(source, cli)?;
    if cli.heap_stats {
        archive.set_hook(HeapReport);
    }

    let mut buffer = vec![0u8; cli.buffer_size];
    let extracted_size = archive
        .extract_to_buffer(&cli.name, &mut buffer)
        .with_context(|| {
            format!(
                "extraction of '{}' into a {}-byte buffer failed",
                cli.name, cli.buffer_size
            )
        })?;
    archive.close();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&buffer[..extracted_size])?;
    stdout.flush()?;
    Ok(())
}

/// Scenario 3: read the archive through a callback and stream the entry to another.
///
/// The extracted entry is never held whole in memory.
fn extract_with_callbacks(source: &Source, cli: &Cli) -> Result<()> {
    let heap_stats = cli.heap_stats;
    if heap_stats {
        print_heap("Before");
    }

    let mut inner = source.open()?;
    let size = inner.size();
    let reader = CallbackReader::new(size, move |offset, buf: &mut [u8]| {
        if heap_stats {
            print_heap("zip_read_func");
        }
        match inner.read_at(offset, buf) {
            Ok(n) => n,
            Err(err) => {
                warn!(offset, len = buf.len(), "read callback failed: {err}");
                0
            }
        }
    });

    let mut archive = ZipArchive::open_with_options(reader, cli.archive_options())
        .with_context(|| format!("cannot read ZIP directory of {}", source.describe()))?;
    let extracted_size = archive
        .find(&cli.name)
        .with_context(|| format!("'{}' is not in the archive", cli.name))?
        .uncompressed_size;

    let mut stdout = std::io::stdout().lock();
    archive
        .extract_to_callback(&cli.name, |_offset, chunk| {
            if heap_stats {
                print_heap("zip_write_func");
                return chunk.len();
            }
            match stdout.write_all(chunk) {
                Ok(()) => chunk.len(),
                Err(_) => 0,
            }
        })
        .with_context(|| format!("callback extraction of '{}' failed", cli.name))?;
    archive.close();

    writeln!(stdout, "\nExtracted size : {extracted_size}")?;
    stdout.flush()?;
    drop(stdout);

    if heap_stats {
        print_heap("After");
    }
    Ok(())
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
fn list_files(source: &Source, cli: &Cli) -> Result<()> {
    let archive = open_archive(source, cli)?;
    let index = archive.index()?;

    if cli.verbose {
        // Print table header for verbose output
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    for entry in index.iter() {
        if !cli.verbose {
            // Simple format: just the file name
            println!("{}", entry.name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            format_ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.name
        );
    }

    // Print summary line in verbose mode
    if cli.verbose {
        let total_uncompressed = index.total_uncompressed_size();
        let total_compressed = index.total_compressed_size();
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            format_ratio(total_compressed, total_uncompressed),
            "",
            index.file_count()
        );
        if !cli.is_quiet() {
            eprintln!(
                "\n{}: {}",
                source.describe(),
                format_size(archive.archive_size())
            );
        }
    }

    Ok(())
}

/// Compression ratio as percentage saved, e.g. ` 42%`.
fn format_ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return "   0%".to_string();
    }
    let saved = 100 - (compressed.min(uncompressed) * 100 / uncompressed);
    format!("{saved:>4}%")
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
