// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Cache snapshot file
//!
//! JSON envelope carrying a format version and the hex MD5 of the serialized
//! entries. The file is written next to its final path and renamed into place,
//! so a reader never sees a partial snapshot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

use super::SnapshotRecord;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u32,
    checksum: String,
    entries: &'a [SnapshotRecord],
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    checksum: String,
    entries: Vec<SnapshotRecord>,
}

fn checksum(records: &[SnapshotRecord]) -> Result<String> {
    let payload = serde_json::to_vec(records)?;
    Ok(hex::encode(md5::compute(&payload).0))
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes records to `path`, replacing any previous snapshot
pub async fn save_snapshot(path: &Path, records: &[SnapshotRecord]) -> Result<()> {
    let file = SnapshotFileRef {
        version: SNAPSHOT_VERSION,
        checksum: checksum(records)?,
        entries: records,
    };
    let data = serde_json::to_vec(&file)?;

    let tmp = temporary_path(path);
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, path).await?;
    tracing::trace!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Reads records from `path`; `Ok(None)` when there is no snapshot yet
pub async fn load_snapshot(path: &Path) -> Result<Option<Vec<SnapshotRecord>>> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let file: SnapshotFile = serde_json::from_slice(&data)?;
    if file.version != SNAPSHOT_VERSION {
        return Err(AppError::Persist(format!(
            "unsupported snapshot version {} (expected {})",
            file.version, SNAPSHOT_VERSION
        )));
    }
    if checksum(&file.entries)? != file.checksum {
        return Err(AppError::Persist("snapshot checksum mismatch".to_string()));
    }
    Ok(Some(file.entries))
}
