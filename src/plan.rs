// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Result of comparing a remote episode list with the local record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStatus {
    /// Nothing new; `count` episodes already fetched
    UpToDate { count: usize },
    /// The server returned no episodes at all
    EmptyRemote { local_count: usize },
    /// `count` episodes appeared since the last sync
    Pending { count: usize },
    /// The remote list is shorter than what was already fetched
    Divergent {
        remote_count: usize,
        local_count: usize,
    },
}

/// Classify a series by the lengths of its remote and local lists
///
/// Equal lengths win over an empty remote, so a series with nothing fetched
/// and nothing published is simply up to date.
pub fn classify(remote_len: usize, local_len: usize) -> SeriesStatus {
    if remote_len == local_len {
        SeriesStatus::UpToDate { count: remote_len }
    } else if remote_len == 0 {
        SeriesStatus::EmptyRemote {
            local_count: local_len,
        }
    } else if remote_len > local_len {
        SeriesStatus::Pending {
            count: remote_len - local_len,
        }
    } else {
        SeriesStatus::Divergent {
            remote_count: remote_len,
            local_count: local_len,
        }
    }
}

/// Episodes not yet fetched, oldest first
///
/// The remote list is newest first, so the unfetched episodes are its first
/// `remote.len() - local.len()` entries; they are returned reversed so they
/// replay in publication order.
pub fn pending_in_chronological_order<'a>(remote: &'a [String], local: &[String]) -> Vec<&'a str> {
    let pending = remote.len().saturating_sub(local.len());

    remote[..pending].iter().rev().map(String::as_str).collect()
}
