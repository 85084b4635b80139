// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Display name of an episode: everything after the final `/` of its URL
pub fn episode_name(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[idx + 1..],
        None => url,
    }
}

/// File name an episode is stored under, or `None` if its URL yields no usable name
///
/// Sanitizing keeps the result a single path component inside the destination directory.
pub fn episode_file_name(url: &str) -> Option<String> {
    let name = sanitize_filename::sanitize(episode_name(url));
    (!name.is_empty()).then_some(name)
}
