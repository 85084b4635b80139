// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::ListError;
use crate::http::{HttpClient, is_success};

/// Split a list body into entries, dropping blank lines and line terminators
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Fetch a remote episode list, newest entry first as the server sends it
///
/// An empty body is not an error; it yields an empty list.
pub async fn fetch_remote<C: HttpClient>(client: &C, url: &str) -> Result<Vec<String>, ListError> {
    let response = client
        .get_bytes(url)
        .await
        .map_err(|e| ListError::Network {
            url: url.to_string(),
            source: e,
        })?;

    if !is_success(response.status) {
        return Err(ListError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let text = std::str::from_utf8(&response.body).map_err(|e| ListError::Decode {
        origin: url.to_string(),
        source: e,
    })?;

    Ok(split_lines(text))
}

/// Read the local list of already fetched episodes
pub async fn read_local(path: &Path) -> Result<Vec<String>, ListError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ListError::NotFound(path.to_path_buf()),
        _ => ListError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let text = std::str::from_utf8(&bytes).map_err(|e| ListError::Decode {
        origin: path.display().to_string(),
        source: e,
    })?;

    Ok(split_lines(text))
}

/// Append a single entry to the local list and flush it to disk before returning
///
/// The file must already exist. A last line without its terminator is closed
/// first so the new entry always lands on its own line.
pub async fn append_local(path: &Path, line: &str) -> Result<(), ListError> {
    let write_failed = |e: std::io::Error| ListError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ListError::NotFound(path.to_path_buf()),
            _ => write_failed(e),
        })?;

    let existing = tokio::fs::read(path)
        .await
        .map_err(|e| ListError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let needs_separator = existing.last().is_some_and(|b| *b != b'\n');

    let mut entry = String::with_capacity(line.len() + 2);
    if needs_separator {
        entry.push('\n');
    }
    entry.push_str(line.trim_end());
    entry.push('\n');

    file.write_all(entry.as_bytes()).await.map_err(write_failed)?;
    file.flush().await.map_err(write_failed)?;
    file.sync_data().await.map_err(write_failed)?;

    Ok(())
}

/// Create an empty local list unless one already exists
pub async fn create_local(path: &Path) -> Result<(), ListError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ListError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
