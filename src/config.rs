// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Directory (under the home directory) holding the registry and state files
pub const STATE_DIR_NAME: &str = ".tvcheck";

/// File name of the series registry inside the state directory
pub const REGISTRY_FILE_NAME: &str = "list";

/// Directory (under the home directory) episodes are downloaded to
pub const DOWNLOADS_DIR_NAME: &str = "Downloads";

/// What to do when the registry file does not exist yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingRegistry {
    /// Ask the user for a first series URL and create the registry
    #[default]
    Prompt,
    /// Treat a missing registry as an error
    Fail,
}

/// Paths and policies resolved before a sync pass starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub registry_path: PathBuf,
    pub state_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub on_missing_registry: MissingRegistry,
}

impl Config {
    /// Default layout relative to a home directory
    pub fn with_home(home: &Path) -> Self {
        let state_dir = home.join(STATE_DIR_NAME);
        Self {
            registry_path: state_dir.join(REGISTRY_FILE_NAME),
            state_dir,
            destination_dir: home.join(DOWNLOADS_DIR_NAME),
            on_missing_registry: MissingRegistry::default(),
        }
    }

    /// Default layout for the current user
    pub fn from_home_dir() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::with_home(&home))
    }

    /// Make sure the state directory exists and the destination directory is usable
    pub fn prepare(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|e| ConfigError::CreateStateDirFailed {
            path: self.state_dir.clone(),
            source: e,
        })?;

        if !self.destination_dir.is_dir() {
            return Err(ConfigError::DestinationMissing(self.destination_dir.clone()));
        }

        Ok(())
    }
}
