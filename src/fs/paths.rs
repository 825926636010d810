//! Path and directory management.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::Result;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Hidden temporary path next to `target` for an in-progress download.
pub fn part_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let parent = target.parent().unwrap_or(Path::new("."));
    parent.join(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Whether a file name is a leftover partial download.
pub fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.ends_with(".part"))
        .unwrap_or(false)
}

/// Remove partial downloads left behind by a crash. Returns how many were removed.
pub fn clean_part_files(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_part_file(&path) {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_is_hidden_sibling() {
        let target = PathBuf::from("/downloads/42_Filme.mp4");
        let part = part_path(&target);

        assert_eq!(part.parent(), Some(Path::new("/downloads")));
        assert!(is_part_file(&part));
        assert_ne!(part_path(&target), part);
    }

    #[test]
    fn test_clean_part_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(part_path(&dir.path().join("a.mp4")), b"x").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"x").unwrap();

        assert_eq!(clean_part_files(dir.path()).unwrap(), 1);
        assert!(dir.path().join("b.mp4").exists());
        assert_eq!(clean_part_files(&dir.path().join("missing")).unwrap(), 0);
    }
}
