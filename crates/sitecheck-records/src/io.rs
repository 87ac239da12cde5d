//! JSONL snapshot I/O, atomic replacement and the data-dir lock

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Read every record from a JSONL snapshot. A missing file reads as empty;
/// lines that do not parse are logged and skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = number + 1,
                error = %e,
                "skipping unreadable record"
            ),
        }
    }
    Ok(records)
}

/// Replace a JSONL file with `records`, one per line, atomically
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> io::Result<()> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    atomic_write(path, &buf)
}

/// Write `data` to a uniquely named sibling temp file, then rename it over `path`.
/// Readers see either the old contents or the new, never a partial write.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// Run `f` while holding an exclusive lock on `lock_path`, waiting for any
/// other holder first. The lock file is created if needed and never removed.
pub fn with_file_lock<T, E, F>(lock_path: &Path, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<io::Error>,
{
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)?;
    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock.write()?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComplianceSummary, Detection, DetectionEvent};

    fn event(id: &str, filename: &str) -> DetectionEvent {
        let detections = vec![Detection::labeled("helmet"), Detection::labeled("no-vest")];
        DetectionEvent {
            id: id.to_string(),
            timestamp: "2025-06-01T12:00:00Z".parse().unwrap(),
            filename: filename.to_string(),
            site: Some("Dock 4".to_string()),
            supervisor: Some("R. Osei".to_string()),
            summary: ComplianceSummary::from_detections(&detections),
            detections,
        }
    }

    #[test]
    fn test_write_jsonl_replaces_contents() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("records.jsonl");

        write_jsonl(&path, &[event("det_1", "a.jpg"), event("det_2", "b.jpg")]).unwrap();
        write_jsonl(&path, &[event("det_3", "c.jpg")]).unwrap();

        let read: Vec<DetectionEvent> = read_jsonl(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].filename, "c.jpg");

        // No temp files left behind next to the snapshot
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("records.jsonl")]);
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("records.jsonl");
        let good = serde_json::to_string(&event("det_1", "a.jpg")).unwrap();
        std::fs::write(&path, format!("{good}\nnot json\n\n")).unwrap();

        let read: Vec<DetectionEvent> = read_jsonl(&path).unwrap();
        assert_eq!(read.len(), 1);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let read: Vec<DetectionEvent> = read_jsonl(&temp.path().join("absent.jsonl")).unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn test_file_lock_serialises_read_modify_write() {
        let temp = tempfile::TempDir::new().unwrap();
        let counter = temp.path().join("counter");
        let lock = temp.path().join("counter.lock");
        std::fs::write(&counter, "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (counter, lock) = (counter.clone(), lock.clone());
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        with_file_lock(&lock, || -> io::Result<()> {
                            let n: u32 = std::fs::read_to_string(&counter)?.parse().unwrap();
                            std::thread::yield_now();
                            atomic_write(&counter, (n + 1).to_string().as_bytes())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(std::fs::read_to_string(&counter).unwrap(), "200");
    }
}
