// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when reading or writing an episode list
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Failed to fetch episode list from {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("HTTP error {status} for episode list {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Episode list from {origin} is not valid UTF-8: {source}")]
    Decode {
        origin: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Local episode list {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read local episode list {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write local episode list {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ListError {
    /// Whether the error came from the network rather than local storage
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}

/// Errors that can occur while downloading a single episode
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Destination directory does not exist: {0}")]
    DestinationMissing(PathBuf),

    #[error("Invalid episode file name '{name}'")]
    InvalidName { name: String },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: HttpError,
    },
}

/// Rejected series or episode identifiers
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Series URL must start with {prefix}: {url}")]
    MissingPrefix { url: String, prefix: &'static str },

    #[error("Series URL has nothing after {prefix}: {url}")]
    EmptySeriesName { url: String, prefix: &'static str },

    #[error("Invalid series URL {url}: {reason}")]
    MalformedUrl { url: String, reason: String },
}

/// Errors that can occur when working with the series registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Series registry {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read series registry {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write series registry {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Series is already registered: {0}")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised while resolving the runtime configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to resolve the home directory")]
    NoHomeDirectory,

    #[error("Destination directory does not exist: {0}")]
    DestinationMissing(PathBuf),

    #[error("Failed to create state directory {path}: {source}")]
    CreateStateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that prevent a single series from being compared at all
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Episode list error: {0}")]
    List(#[from] ListError),

    #[error("Invalid series: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors that abort the remaining episodes of a series
#[derive(Error, Debug)]
pub enum EpisodeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Downloaded but failed to record: {0}")]
    Record(#[from] ListError),
}
