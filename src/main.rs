use clap::{Parser, Subcommand, ValueEnum};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vpack::archive::VpArchive;
use vpack::batch::{extract_dir, BatchOptions};
use vpack::builder::{build_with_options, BuildOptions};

#[derive(Parser)]
#[command(name = "vp", version, about = "Build, inspect and extract VPVP (.vp) archives")]
struct Cli {
    /// Log verbosity; RUST_LOG overrides it
    #[arg(short = 'L', long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info  => "info",
            LogLevel::Warn  => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Package a directory tree into a .vp archive
    Build {
        source: PathBuf,
        output: PathBuf,
        /// Package the source as given even if it has a `data` subdirectory
        #[arg(long)]
        no_data_root: bool,
        /// Store 0 instead of file modification times
        #[arg(long)]
        zero_timestamps: bool,
    },
    /// List archive contents
    List {
        input: PathBuf,
        /// Show offset, size and timestamp
        #[arg(short, long)]
        long: bool,
        /// Show the BLAKE3 hash of each payload
        #[arg(long)]
        hash: bool,
    },
    /// Show header and table statistics
    Info {
        input: PathBuf,
    },
    /// Extract an archive (or selected paths) to <output_dir>/<archive name>/
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Only these archive paths
        paths: Vec<String>,
    },
    /// Extract every .vp archive in a directory
    Batch {
        input_dir: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long)]
        skip_existing: bool,
        /// One worker per archive (needs the `parallel` feature)
        #[arg(short, long)]
        parallel: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {

        // ── Build ────────────────────────────────────────────────────────────
        Commands::Build { source, output, no_data_root, zero_timestamps } => {
            let opts = BuildOptions {
                detect_data_root:    !no_data_root,
                preserve_timestamps: !zero_timestamps,
            };
            let summary = build_with_options(&source, &output, &opts)?;
            println!(
                "Created: {} ({} files, {} directories, {} bytes)",
                output.display(), summary.files, summary.directories, summary.payload_bytes
            );
            for skipped in &summary.skipped {
                println!("  skipped {}", skipped.display());
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, long, hash } => {
            let mut ar = VpArchive::open(&input)?;
            let entries: Vec<_> = ar.entries().map(|(p, e)| (p.to_owned(), e.clone())).collect();
            for (path, entry) in entries {
                let mut line = String::new();
                if long {
                    line.push_str(&format!(
                        "{:>10} {:>10}  {}  ",
                        entry.offset, entry.size, format_time(entry.timestamp)
                    ));
                }
                if hash {
                    line.push_str(&hex::encode(ar.digest(&path)?));
                    line.push_str("  ");
                }
                line.push_str(&path);
                println!("{line}");
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let ar = VpArchive::open(&input)?;
            let header = ar.header();
            let payload: u64 = ar.entries().map(|(_, e)| e.size as u64).sum();

            println!("── VP Archive ───────────────────────────────────────────");
            println!("  Path             {}", input.display());
            println!("  Signature        {}", String::from_utf8_lossy(&header.signature));
            println!("  Version          {}", header.version);
            println!("  Table offset     {} B", header.dir_offset);
            println!("  Declared records {}", header.dir_count);
            println!("  Records read     {}", ar.index().records_read());
            println!("  Records skipped  {}", ar.index().records_skipped());
            println!("  Files            {}", ar.len());
            println!("  Payload          {} B", payload);
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, paths } => {
            let mut ar = VpArchive::open(&input)?;
            if paths.is_empty() {
                let n = ar.extract_all(&output_dir)?;
                println!("Extracted {n} file(s) to {}", output_dir.join(ar.name()).display());
            } else {
                for path in &paths {
                    let out = ar.extract(path, &output_dir)?;
                    println!("  {}", out.display());
                }
            }
        }

        // ── Batch ────────────────────────────────────────────────────────────
        Commands::Batch { input_dir, output_dir, skip_existing, parallel, json } => {
            let opts = BatchOptions { skip_existing, parallel };
            let report = extract_dir(&input_dir, &output_dir, &opts)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                for f in &report.failed {
                    println!("  FAILED  {} [{}] {}", f.archive, f.kind, f.message);
                }
                println!("{}", report.summary());
            }
            if !report.is_success() {
                return Err(format!("{} archive(s) failed", report.failed.len()).into());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_time(timestamp: i32) -> String {
    DateTime::<Utc>::from_timestamp(i64::from(timestamp), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into())
}
