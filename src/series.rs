// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::ValidationError;

/// Every tracked series URL starts with this prefix; the remainder names the state file
pub const SERIES_URL_PREFIX: &str = "http://fs.to/flist/";

/// A series whose remote episode list is being tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSeries {
    /// Remote episode list URL, as registered
    pub url: String,
    /// Local file recording the episodes already fetched
    pub state_path: PathBuf,
}

impl TrackedSeries {
    /// Build a series from a registry line, placing its state file in `state_dir`
    pub fn from_registry_line(line: &str, state_dir: &Path) -> Result<Self, ValidationError> {
        let url = line.trim().to_string();
        let file_name = state_file_name(&url)?;

        Ok(Self {
            state_path: state_dir.join(file_name),
            url,
        })
    }
}

/// Derive the state file name for a series URL by stripping [`SERIES_URL_PREFIX`]
///
/// The remainder is sanitized so it always forms a single path component.
pub fn state_file_name(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();
    let rest = url
        .strip_prefix(SERIES_URL_PREFIX)
        .ok_or_else(|| ValidationError::MissingPrefix {
            url: url.to_string(),
            prefix: SERIES_URL_PREFIX,
        })?;

    let name = sanitize_filename::sanitize(rest);
    if name.is_empty() {
        return Err(ValidationError::EmptySeriesName {
            url: url.to_string(),
            prefix: SERIES_URL_PREFIX,
        });
    }

    Ok(name)
}

/// Check that a URL can be registered as a new series
pub fn validate_series_url(url: &str) -> Result<(), ValidationError> {
    Url::parse(url.trim()).map_err(|e| ValidationError::MalformedUrl {
        url: url.trim().to_string(),
        reason: e.to_string(),
    })?;
    state_file_name(url).map(|_| ())
}
