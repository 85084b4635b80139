// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::RegistryError;
use crate::list::split_lines;
use crate::series::validate_series_url;

/// The list of tracked series, one remote list URL per line
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    urls: Vec<String>,
}

impl Registry {
    /// Load the registry at `path`; a missing file is [`RegistryError::NotFound`]
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RegistryError::NotFound(path.to_path_buf()),
            _ => RegistryError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            urls: split_lines(&content),
        })
    }

    /// Add a series to the registry at `path`, creating the file if needed
    ///
    /// Parent directories are created as needed. Nothing is written if the URL
    /// is not a valid series URL.
    pub fn register(path: &Path, url: &str) -> Result<Self, RegistryError> {
        validate_series_url(url)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let mut registry = match Self::load(path) {
            Ok(registry) => registry,
            Err(RegistryError::NotFound(_)) => Self {
                path: path.to_path_buf(),
                urls: Vec::new(),
            },
            Err(e) => return Err(e),
        };

        registry.add(url)?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registered series URLs in registration order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        let url = url.trim();
        self.urls.iter().any(|u| u == url)
    }

    /// Register a new series and append it to the registry file
    pub fn add(&mut self, url: &str) -> Result<(), RegistryError> {
        let url = url.trim();
        validate_series_url(url)?;

        if self.contains(url) {
            return Err(RegistryError::AlreadyRegistered(url.to_string()));
        }

        let write_failed = |e: std::io::Error| RegistryError::WriteFailed {
            path: self.path.clone(),
            source: e,
        };

        // Keep one URL per line even if the file lacks a trailing newline
        let needs_separator = match std::fs::read(&self.path) {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(RegistryError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_failed)?;

        let entry = if needs_separator {
            format!("\n{url}\n")
        } else {
            format!("{url}\n")
        };
        file.write_all(entry.as_bytes()).map_err(write_failed)?;
        file.flush().map_err(write_failed)?;

        tracing::info!(url, registry = %self.path.display(), "series registered");

        self.urls.push(url.to_string());
        Ok(())
    }
}
