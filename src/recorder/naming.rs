//! Output file naming
//!
//! Names carry the recording-start epoch time for humans plus a random suffix
//! so two recordings started within the same second never collide.

use crate::config::ContainerFormat;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name for a recording started at `started`
pub fn recording_file_name(started: DateTime<Utc>, id: Uuid, container: ContainerFormat) -> String {
    let simple = id.simple().to_string();
    format!(
        "recording-{}-{}.{}",
        started.timestamp(),
        &simple[..8],
        container.extension()
    )
}

/// Derive a fresh, unused output path in `output_dir`, creating the directory
pub fn next_output_path(output_dir: &Path, container: ContainerFormat) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    loop {
        let name = recording_file_name(Utc::now(), Uuid::new_v4(), container);
        let path = output_dir.join(name);
        if !path.exists() {
            return Ok(path);
        }
        tracing::warn!("Output path {:?} already exists, picking another", path);
    }
}
