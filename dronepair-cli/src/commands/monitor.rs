//! Monitor command - follow dataset generation progress in a folder.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dronepair::progress::{format_duration, ProgressTracker};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::CliError;
use crate::runner::install_ctrlc;

/// Folder poll interval.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Arguments for the monitor command.
pub struct MonitorArgs {
    pub folder: PathBuf,
    pub target: usize,
    /// Print plain progress lines instead of a progress bar.
    pub plain: bool,
}

/// Run the monitor command.
pub fn run(args: MonitorArgs) -> Result<(), CliError> {
    let shutdown = install_ctrlc()?;

    let start = count_entries(&args.folder)?;
    let mut tracker = ProgressTracker::new(start, args.target, Instant::now());

    let bar = if args.plain {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(args.target as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} items | {msg}")
                .map_err(|e| CliError::Output(e.to_string()))?,
        );
        bar.set_position(start as u64);
        bar
    };

    let mut current = start;
    while !tracker.is_complete(current) && !shutdown.is_cancelled() {
        std::thread::sleep(POLL_INTERVAL);
        current = count_entries(&args.folder)?;

        if let Some(report) = tracker.observe(current, Instant::now()) {
            if args.plain {
                println!("{}", report);
            } else {
                bar.set_position(report.current as u64);
                bar.set_message(format!(
                    "Elapsed: {} | ETA: {} | Avg: {:.2}s/item",
                    format_duration(report.elapsed),
                    format_duration(report.eta),
                    report.avg_per_item.as_secs_f64()
                ));
            }
        }
    }

    bar.finish();
    if tracker.is_complete(current) {
        println!("Target of {} items reached.", args.target);
    }
    Ok(())
}

/// Number of entries directly inside `folder`.
pub fn count_entries(folder: &Path) -> Result<usize, CliError> {
    let entries = std::fs::read_dir(folder).map_err(|source| CliError::Folder {
        path: folder.to_path_buf(),
        source,
    })?;
    Ok(entries.filter(|e| e.is_ok()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_entries() {
        let dir = TempDir::new().unwrap();
        assert_eq!(count_entries(dir.path()).unwrap(), 0);

        std::fs::write(dir.path().join("a.png"), b"").unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert_eq!(count_entries(dir.path()).unwrap(), 3);
    }

    #[test]
    fn test_missing_folder() {
        let dir = TempDir::new().unwrap();
        let err = count_entries(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CliError::Folder { .. }));
    }
}
