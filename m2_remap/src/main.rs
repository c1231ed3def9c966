use clap::Parser;
use m2_lib::{remap_file, RemapError, RemapReport};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Rebuild the sequence lookup of M2 models to match their sequences.
/// Fixes animation lookups in downported models.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The .m2 file or a folder containing .m2 files
    input: PathBuf,

    /// The output .m2 file. Modifies the input after creating a .bak backup if not specified.
    /// Ignored when processing a folder.
    output: Option<PathBuf>,

    /// Remap files even if they were already remapped
    #[arg(long)]
    force: bool,

    /// Process subfolders recursively
    #[arg(short, long)]
    recursive: bool,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
enum FileStatus {
    Remapped { changes: usize },
    Unchanged,
    Skipped,
    Failed { message: String },
}

impl FileStatus {
    fn from_result(result: &Result<RemapReport, RemapError>) -> Self {
        match result {
            Ok(report) if report.is_changed() => FileStatus::Remapped {
                changes: report.change_count(),
            },
            Ok(_) => FileStatus::Unchanged,
            Err(RemapError::AlreadyRemapped) => FileStatus::Skipped,
            Err(e) => FileStatus::Failed {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct FileResult {
    path: PathBuf,
    #[serde(flatten)]
    status: FileStatus,
    /// The full report for single files.
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RemapReport>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Folders produce one line per file, so only show warnings by default.
    let default_level = if cli.input.is_dir() { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if !cli.input.exists() {
        eprintln!("Path not found: {:?}", cli.input);
        return ExitCode::FAILURE;
    }

    let start = std::time::Instant::now();
    let code = if cli.input.is_dir() {
        process_folder(&cli)
    } else {
        process_file(&cli)
    };
    log::info!("Finished in {:?}", start.elapsed());

    code
}

fn process_file(cli: &Cli) -> ExitCode {
    let result = remap_file(&cli.input, cli.output.as_deref(), cli.force);

    if cli.json {
        print_json(&FileResult {
            path: cli.input.clone(),
            status: FileStatus::from_result(&result),
            report: result.as_ref().ok().cloned(),
        });
    } else {
        match &result {
            Ok(report) => println!("✓ {}", report.summary()),
            Err(e) => println!("✗ {e}"),
        }
    }

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(RemapError::AlreadyRemapped) => ExitCode::from(2),
        Err(_) => ExitCode::FAILURE,
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize JSON: {e}"),
    }
}

fn process_folder(cli: &Cli) -> ExitCode {
    if cli.output.is_some() {
        log::warn!("Ignoring the output path when processing a folder");
    }

    let folder = cli.input.as_path();
    if !cli.json {
        println!("Processing folder: {}", folder.display());
        if cli.recursive {
            println!("Mode: Recursive");
        } else {
            println!("Mode: Non-recursive (use --recursive or -r for subfolders)");
        }
        println!();
    }

    let max_depth = if cli.recursive { usize::MAX } else { 1 };
    let walker = match globwalk::GlobWalkerBuilder::from_patterns(folder, &["*.m2"])
        .case_insensitive(true)
        .max_depth(max_depth)
        .file_type(globwalk::FileType::FILE)
        .build()
    {
        Ok(walker) => walker,
        Err(e) => {
            eprintln!("Failed to search {folder:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut results: Vec<_> = walker
        .filter_map(|e| e.ok())
        .par_bridge()
        .map(|entry| {
            let path = entry.path();
            let status = FileStatus::from_result(&remap_file(path, None, cli.force));
            if !cli.json {
                print_status(relative_path(folder, path), &status);
            }
            FileResult {
                path: path.to_path_buf(),
                status,
                report: None,
            }
        })
        .collect();

    results.sort_by(|a, b| a.path.cmp(&b.path));

    let count = |f: fn(&FileStatus) -> bool| results.iter().filter(|r| f(&r.status)).count();
    let processed = count(|s| matches!(s, FileStatus::Remapped { .. } | FileStatus::Unchanged));
    let skipped = count(|s| matches!(s, FileStatus::Skipped));
    let failed = count(|s| matches!(s, FileStatus::Failed { .. }));

    if cli.json {
        print_json(&results);
    } else {
        println!();
        println!("Summary: {processed} processed, {skipped} skipped, {failed} failed");
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn relative_path<'a>(folder: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(folder).unwrap_or(path)
}

fn print_status(path: &Path, status: &FileStatus) {
    // Print each line at once since files are processed in parallel.
    match status {
        FileStatus::Remapped { changes } => {
            println!("Processing: {}... ✓ ({changes} entries)", path.display())
        }
        FileStatus::Unchanged => println!("Processing: {}... ✓", path.display()),
        FileStatus::Skipped => println!(
            "Processing: {}... (skipped - already processed)",
            path.display()
        ),
        FileStatus::Failed { message } => {
            println!("Processing: {}... ✗ {message}", path.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use m2_lib::FormatError;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_folder_flags() {
        let cli = Cli::parse_from(["m2_remap", "models", "-r", "--force"]);
        assert_eq!(PathBuf::from("models"), cli.input);
        assert_eq!(None, cli.output);
        assert!(cli.recursive);
        assert!(cli.force);
        assert!(!cli.json);
    }

    #[test]
    fn status_from_errors() {
        assert!(matches!(
            FileStatus::from_result(&Err(RemapError::AlreadyRemapped)),
            FileStatus::Skipped
        ));
        assert!(matches!(
            FileStatus::from_result(&Err(RemapError::Format(
                FormatError::UnrecognizedContainer { magic: *b"SKIN" }
            ))),
            FileStatus::Failed { .. }
        ));
    }

    #[test]
    fn remapped_status_json() {
        let result = FileResult {
            path: PathBuf::from("wolf.m2"),
            status: FileStatus::Remapped { changes: 3 },
            report: None,
        };
        assert_eq!(
            r#"{"path":"wolf.m2","status":"remapped","changes":3}"#,
            serde_json::to_string(&result).unwrap()
        );
    }
}
