use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Marker embedded in the names of in-flight atomic writes.
pub(crate) const TMP_MARKER: &str = ".nsgentmp.";

/// Removes every file under `root` last modified more than `threshold` ago.
///
/// Temp files and finished artifacts are treated alike: whoever was supposed to pick them up
/// is long gone. Empty subdirectories are pruned as well.
pub(crate) async fn purge_stale(root: &Path, threshold: Duration) -> usize {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, threshold)).await {
        Ok((removed, failed)) => {
            if removed > 0 || failed > 0 {
                info!(removed, failed, "Reclaimed stale scratch files");
            }
            removed
        },
        Err(e) => {
            error!(error = %e, "Scratch cleanup task panicked");
            0
        },
    }
}

fn remove_stale(root: &Path, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    for entry in WalkDir::new(root).contents_first(true).into_iter().flatten() {
        let path = entry.path();
        if path == root {
            continue;
        }

        if entry.file_type().is_file() {
            if !is_stale(&entry, now, threshold) {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove stale file");
                    failed += 1;
                },
            }
        } else if entry.file_type().is_dir() {
            // Fails harmlessly while the directory still has content.
            let _ = std::fs::remove_dir(path);
        }
    }

    (removed, failed)
}

pub(crate) fn is_tmp(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()).is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .map_or(is_tmp(entry.path()), |age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_marker_detection() {
        assert!(is_tmp(Path::new("/scratch/abc.zip.nsgentmp.3")));
        assert!(!is_tmp(Path::new("/scratch/abc.zip")));
    }

    #[test]
    fn fresh_files_survive_and_old_ones_go() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fresh.zip");
        std::fs::write(&file, b"x").unwrap();

        let (removed, _) = remove_stale(dir.path(), SystemTime::now(), Duration::from_secs(60));
        assert_eq!(removed, 0);
        assert!(file.exists());

        let later = SystemTime::now() + Duration::from_secs(120);
        let (removed, failed) = remove_stale(dir.path(), later, Duration::from_secs(60));
        assert_eq!((removed, failed), (1, 0));
        assert!(!file.exists());
    }
}
