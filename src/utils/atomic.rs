//! Atomic file replacement
//!
//! Write to `<path>.tmp`, `sync_all`, then rename over the destination. A reader
//! sees either the old file or the new one, never a partial write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Atomically replace `path` with `content`
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
    atomic_write_with(path, |file| file.write_all(content.as_bytes()))
}

/// Atomically replace `path` with whatever `write_fn` writes
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    write_fn(&mut file)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}

/// Remove `.tmp` leftovers from an interrupted write; returns how many were removed
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }

    let mut cleaned = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "tmp") {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partition-0.offset");

        atomic_write(&path, "41").unwrap();
        atomic_write(&path, "42").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "42");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_with_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store").join("events.jsonl");

        atomic_write_with(&path, |file| {
            writeln!(file, "{{\"a\":1}}")?;
            writeln!(file, "{{\"a\":2}}")
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn test_cleanup_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("partition-1.tmp"), "7").unwrap();
        fs::write(temp_dir.path().join("partition-1.jsonl"), "").unwrap();

        assert_eq!(cleanup_temp_files(temp_dir.path()).unwrap(), 1);
        assert!(temp_dir.path().join("partition-1.jsonl").exists());
    }
}
