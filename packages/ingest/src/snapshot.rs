//! Snapshot persistence.
//!
//! The snapshot is serialized in full before the filesystem is touched,
//! written to a temporary file next to the target, flushed, then renamed
//! over the target. Readers see either the previous snapshot or the new
//! one, never a partial file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use dime_ingest_models::Snapshot;

use crate::IngestError;

/// Writes `snapshot` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Returns [`IngestError`] if serialization or any filesystem step fails.
/// On failure the temporary file is removed and `path` is left as it was.
pub fn store(path: &Path, snapshot: &Snapshot) -> Result<(), IngestError> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path(path);
    if let Err(e) = write_and_rename(&temp, path, &bytes) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    log::debug!(
        "Stored snapshot with {} records at {}",
        snapshot.len(),
        path.display()
    );
    Ok(())
}

/// Reads the snapshot at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not a valid
/// snapshot.
pub fn load(path: &Path) -> Result<Option<Snapshot>, IngestError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = serde_json::from_str(&text)?;
    log::debug!(
        "Loaded snapshot with {} records from {}",
        snapshot.len(),
        path.display()
    );
    Ok(Some(snapshot))
}

fn write_and_rename(temp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp, target)
}

/// `<dir>/.<file name>.tmp`, so the rename never crosses filesystems.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use dime_ingest_models::EnrichedRecord;
    use dime_neighborhood_models::{DetectedZone, ZoneKind};
    use serde_json::json;

    use super::*;

    fn snapshot(names: &[&str]) -> Snapshot {
        Snapshot {
            records: names
                .iter()
                .map(|name| {
                    EnrichedRecord::new(
                        json!({ "infraestructura": name }).as_object().cloned().unwrap(),
                        Some("Calle 15, Santiago de Tolú".to_string()),
                        &DetectedZone::Matched {
                            name: "Centro".to_string(),
                            kind: ZoneKind::Barrio,
                        },
                    )
                })
                .collect(),
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base_datos_enriquecida.json");
        let original = snapshot(&["Alcaldía", "Muelle Turístico"]);

        store(&path, &original).unwrap();

        assert_eq!(load(&path).unwrap(), Some(original));
        assert_eq!(entries(dir.path()), vec!["base_datos_enriquecida.json"]);
    }

    #[test]
    fn writes_indented_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        store(&path, &snapshot(&["Alcaldía"])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
        assert!(text.contains("\"Alcaldía\""));
        assert!(text.contains("Tolú"));
    }

    #[test]
    fn overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        store(&path, &snapshot(&["A", "B", "C"])).unwrap();
        store(&path, &snapshot(&["D"])).unwrap();

        assert_eq!(load(&path).unwrap().unwrap().len(), 1);
        assert_eq!(entries(dir.path()), vec!["snapshot.json"]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("snapshot.json");
        store(&path, &snapshot(&["A"])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn failed_rename_leaves_target_and_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("snapshot.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "previous").unwrap();

        assert!(store(&target, &snapshot(&["A"])).is_err());

        assert_eq!(entries(dir.path()), vec!["snapshot.json"]);
        assert_eq!(
            fs::read_to_string(target.join("keep.txt")).unwrap(),
            "previous"
        );
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(IngestError::Json(_))));
    }
}
