//! Snapshot file reading and writing.
//!
//! Each refresh writes the full snapshot twice with identical bytes: once
//! under an immutable date-keyed name and once as `latest.json`. Writes go
//! through a temp-file-and-rename so a failed refresh can never truncate or
//! partially overwrite `latest.json`; the previous files stay authoritative.
//! The date key is the snapshot's `generatedAt` shifted into the platform's
//! UTC+9 local day.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::Snapshot;
use crate::utils::{BoxError, date_key_utc9};

const SNAPSHOT_PREFIX: &str = "roblox_top5_";
const LATEST_FILENAME: &str = "latest.json";

/// File name for a dated snapshot, e.g. `roblox_top5_2024-01-02.json`.
pub fn snapshot_filename(date_key: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{date_key}.json")
}

/// Write a snapshot to its dated file and to `latest.json`.
///
/// Both files receive the same serialized bytes. Returns the dated path.
///
/// # Errors
///
/// Fails when serialization or either write fails; in that case the caller
/// must treat the refresh as failed and keep the previous snapshot.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_snapshot(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf, BoxError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let date_key = date_key_utc9(&snapshot.generatedAt)?;

    fs::create_dir_all(dir).await?;

    let dated_path = dir.join(snapshot_filename(&date_key));
    write_atomic(&dated_path, json.as_bytes()).await?;

    let latest_path = dir.join(LATEST_FILENAME);
    write_atomic(&latest_path, json.as_bytes()).await?;

    info!(dated = %dated_path.display(), bytes = json.len(), "Wrote snapshot files");
    Ok(dated_path)
}

/// Write bytes to a temp file next to `path`, then rename into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BoxError> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Read `latest.json` if it exists.
///
/// Returns `Ok(None)` when the file does not exist; a present-but-corrupt
/// file is an error (the API maps it to a 500).
pub async fn read_latest(dir: &Path) -> Result<Option<Snapshot>, BoxError> {
    read_snapshot_file(&dir.join(LATEST_FILENAME)).await
}

/// Read the dated snapshot for a specific date key, if present.
pub async fn read_dated(dir: &Path, date_key: &str) -> Result<Option<Snapshot>, BoxError> {
    read_snapshot_file(&dir.join(snapshot_filename(date_key))).await
}

/// Read the edition immediately preceding `current_key`, if any.
///
/// Dated keys are `YYYY-MM-DD`, so lexicographic order is chronological
/// order.
pub async fn read_previous(dir: &Path, current_key: &str) -> Result<Option<Snapshot>, BoxError> {
    let keys = list_date_keys(dir).await?;
    let Some(previous_key) = keys.into_iter().filter(|k| k.as_str() < current_key).next_back()
    else {
        return Ok(None);
    };
    read_dated(dir, &previous_key).await
}

/// List the date keys of all dated snapshot files, sorted ascending.
pub async fn list_date_keys(dir: &Path) -> Result<Vec<String>, BoxError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(key) = name
            .strip_prefix(SNAPSHOT_PREFIX)
            .and_then(|rest| rest.strip_suffix(".json"))
        {
            keys.push(key.to_string());
        }
    }
    keys.sort();
    Ok(keys)
}

async fn read_snapshot_file(path: &Path) -> Result<Option<Snapshot>, BoxError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{sample_game, sample_snapshot};

    #[tokio::test]
    async fn test_write_snapshot_creates_dated_and_latest_files() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = sample_snapshot("2024-01-01T16:00:00.000Z", vec![sample_game(1)]);

        let dated = write_snapshot(&snapshot, dir.path()).await.unwrap();
        assert_eq!(
            dated.file_name().unwrap().to_str().unwrap(),
            "roblox_top5_2024-01-02.json"
        );
        assert!(dir.path().join("latest.json").exists());

        let latest = read_latest(dir.path()).await.unwrap().unwrap();
        assert_eq!(latest, snapshot);
    }

    #[tokio::test]
    async fn test_write_snapshot_is_byte_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = sample_snapshot("2024-01-01T16:00:00.000Z", vec![sample_game(1)]);

        write_snapshot(&snapshot, dir.path()).await.unwrap();
        let first = fs::read(dir.path().join("latest.json")).await.unwrap();

        write_snapshot(&snapshot, dir.path()).await.unwrap();
        let second = fs::read(dir.path().join("latest.json")).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dated_and_latest_contents_match() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = sample_snapshot("2024-03-04T01:00:00.000Z", vec![sample_game(2)]);

        let dated = write_snapshot(&snapshot, dir.path()).await.unwrap();
        let dated_bytes = fs::read(&dated).await.unwrap();
        let latest_bytes = fs::read(dir.path().join("latest.json")).await.unwrap();
        assert_eq!(dated_bytes, latest_bytes);
    }

    #[tokio::test]
    async fn test_read_latest_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_latest(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_latest_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latest.json"), b"{not json")
            .await
            .unwrap();
        assert!(read_latest(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_previous_picks_immediately_preceding_edition() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in [
            "2024-01-01T00:00:00.000Z",
            "2024-01-08T00:00:00.000Z",
            "2024-01-15T00:00:00.000Z",
        ] {
            let snapshot = sample_snapshot(stamp, vec![sample_game(1)]);
            write_snapshot(&snapshot, dir.path()).await.unwrap();
        }

        let previous = read_previous(dir.path(), "2024-01-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.generatedAt, "2024-01-08T00:00:00.000Z");

        // first-ever edition has no previous
        assert!(
            read_previous(dir.path(), "2024-01-01")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_date_keys_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latest.json"), b"{}").await.unwrap();
        fs::write(dir.path().join("roblox_top5_2024-02-05.json"), b"{}")
            .await
            .unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();

        let keys = list_date_keys(dir.path()).await.unwrap();
        assert_eq!(keys, ["2024-02-05"]);
    }
}
