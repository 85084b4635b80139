// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use futures::StreamExt;

use crate::episode::{DownloadContext, download_episode, episode_file_name, episode_name};
use crate::error::{EpisodeError, FetchError, SyncError};
use crate::http::HttpClient;
use crate::list::{append_local, fetch_remote, read_local};
use crate::plan::{SeriesStatus, classify, pending_in_chronological_order};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::series::TrackedSeries;

/// Options for a sync pass
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of series synced at the same time; episodes within a series are
    /// always fetched one after another
    pub max_concurrent_series: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_concurrent_series: 1,
        }
    }
}

/// The episode that stopped a series, and why
#[derive(Debug)]
pub struct EpisodeFailure {
    pub url: String,
    pub error: EpisodeError,
}

/// What happened to a series that could be compared
#[derive(Debug)]
pub struct SeriesOutcome {
    pub url: String,
    pub status: SeriesStatus,
    /// Episode URLs downloaded and recorded during this pass, in order
    pub fetched: Vec<String>,
    /// Set when an episode failed and the rest of the series was skipped
    pub failure: Option<EpisodeFailure>,
}

impl SeriesOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of one series within a sync pass
#[derive(Debug)]
pub struct SeriesReport {
    /// Position of the series in the registry
    pub series_id: usize,
    pub url: String,
    pub result: Result<SeriesOutcome, SyncError>,
}

impl SeriesReport {
    /// Episodes fetched for this series, empty if it could not be checked
    pub fn fetched(&self) -> &[String] {
        match &self.result {
            Ok(outcome) => &outcome.fetched,
            Err(_) => &[],
        }
    }

    /// Whether the series failed to check or stopped at a failed episode
    pub fn is_failure(&self) -> bool {
        match &self.result {
            Ok(outcome) => !outcome.is_complete(),
            Err(_) => true,
        }
    }
}

/// Result of a sync pass over all registered series, in registry order
#[derive(Debug, Default)]
pub struct SyncReport {
    pub series: Vec<SeriesReport>,
}

impl SyncReport {
    /// All newly fetched episode URLs
    pub fn fetched(&self) -> Vec<&str> {
        self.series
            .iter()
            .flat_map(|report| report.fetched().iter().map(String::as_str))
            .collect()
    }

    pub fn downloaded(&self) -> usize {
        self.series.iter().map(|report| report.fetched().len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.series.iter().filter(|report| report.is_failure()).count()
    }

    pub fn up_to_date(&self) -> usize {
        self.series
            .iter()
            .filter(|report| {
                matches!(
                    &report.result,
                    Ok(SeriesOutcome {
                        status: SeriesStatus::UpToDate { .. },
                        ..
                    })
                )
            })
            .count()
    }
}

/// Download one episode and record it in the series' local list
async fn fetch_and_record<C: HttpClient>(
    client: &C,
    series: &TrackedSeries,
    url: &str,
    destination_dir: &Path,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, EpisodeError> {
    let file_name = episode_file_name(url).ok_or_else(|| FetchError::InvalidName {
        name: episode_name(url).to_string(),
    })?;

    let bytes =
        download_episode(client, url, destination_dir, &file_name, context, reporter).await?;

    // Only a complete download is recorded, one line at a time
    append_local(&series.state_path, url).await?;

    Ok(bytes)
}

/// Synchronize a single series
///
/// 1. Fetches the remote episode list and reads the local one
/// 2. Classifies the series by comparing their lengths
/// 3. Downloads pending episodes oldest first, recording each right after it completes
///
/// The first failed episode stops the series; everything fetched before it
/// stays recorded and is listed in the outcome.
pub async fn sync_series<C: HttpClient>(
    client: &C,
    series: &TrackedSeries,
    series_id: usize,
    destination_dir: &Path,
    reporter: &SharedProgressReporter,
) -> Result<SeriesOutcome, SyncError> {
    reporter.report(ProgressEvent::CheckingSeries {
        series_id,
        url: series.url.clone(),
    });

    let remote = fetch_remote(client, &series.url).await?;
    let local = read_local(&series.state_path).await?;
    let status = classify(remote.len(), local.len());

    tracing::debug!(
        url = %series.url,
        remote = remote.len(),
        local = local.len(),
        ?status,
        "series compared"
    );

    reporter.report(ProgressEvent::SeriesChecked {
        series_id,
        url: series.url.clone(),
        status,
    });

    let mut outcome = SeriesOutcome {
        url: series.url.clone(),
        status,
        fetched: Vec::new(),
        failure: None,
    };

    match status {
        SeriesStatus::UpToDate { .. } => {}
        SeriesStatus::EmptyRemote { local_count } => {
            tracing::warn!(
                url = %series.url,
                local_count,
                "server returned an empty episode list, the series may need to be registered again"
            );
        }
        SeriesStatus::Divergent {
            remote_count,
            local_count,
        } => {
            tracing::warn!(
                url = %series.url,
                remote_count,
                local_count,
                "remote episode list is shorter than the local record, leaving it untouched"
            );
        }
        SeriesStatus::Pending { .. } => {
            let pending = pending_in_chronological_order(&remote, &local);
            let total_to_download = pending.len();

            for (episode_index, url) in pending.into_iter().enumerate() {
                let context = DownloadContext {
                    series_id,
                    episode_index,
                    total_to_download,
                };

                match fetch_and_record(client, series, url, destination_dir, &context, reporter)
                    .await
                {
                    Ok(bytes_downloaded) => {
                        tracing::info!(url, bytes_downloaded, "episode recorded");
                        reporter.report(ProgressEvent::DownloadCompleted {
                            series_id,
                            episode_name: episode_name(url).to_string(),
                            bytes_downloaded,
                        });
                        outcome.fetched.push(url.to_string());
                    }
                    Err(error) => {
                        tracing::warn!(
                            url,
                            error = %error,
                            skipped = total_to_download - episode_index - 1,
                            "episode failed, skipping the rest of the series"
                        );
                        reporter.report(ProgressEvent::DownloadFailed {
                            series_id,
                            episode_name: episode_name(url).to_string(),
                            error: error.to_string(),
                        });
                        outcome.failure = Some(EpisodeFailure {
                            url: url.to_string(),
                            error,
                        });
                        break;
                    }
                }
            }
        }
    }

    Ok(outcome)
}

async fn sync_registry_entry<C: HttpClient>(
    client: &C,
    series_id: usize,
    url: &str,
    state_dir: &Path,
    destination_dir: &Path,
    reporter: &SharedProgressReporter,
) -> SeriesReport {
    let result = match TrackedSeries::from_registry_line(url, state_dir) {
        Ok(series) => sync_series(client, &series, series_id, destination_dir, reporter).await,
        Err(e) => Err(SyncError::from(e)),
    };

    if let Err(error) = &result {
        tracing::warn!(url, error = %error, "series failed");
        reporter.report(ProgressEvent::SeriesFailed {
            series_id,
            url: url.to_string(),
            error: error.to_string(),
        });
    }

    SeriesReport {
        series_id,
        url: url.trim().to_string(),
        result,
    }
}

/// Synchronize every registered series
///
/// A failing series never stops the pass; its error is kept in the report and
/// the next series is checked. Reports are returned in registry order.
pub async fn sync_all<C: HttpClient>(
    client: &C,
    urls: &[String],
    state_dir: &Path,
    destination_dir: &Path,
    options: &SyncOptions,
    reporter: SharedProgressReporter,
) -> SyncReport {
    reporter.report(ProgressEvent::SyncStarting {
        series_count: urls.len(),
    });

    let reporter_ref = &reporter;
    let series: Vec<SeriesReport> = futures::stream::iter(urls.iter().enumerate())
        .map(|(series_id, url)| {
            sync_registry_entry(
                client,
                series_id,
                url,
                state_dir,
                destination_dir,
                reporter_ref,
            )
        })
        .buffered(options.max_concurrent_series.max(1))
        .collect()
        .await;

    let report = SyncReport { series };

    reporter.report(ProgressEvent::SyncCompleted {
        downloaded_count: report.downloaded(),
        up_to_date_count: report.up_to_date(),
        failed_count: report.failed(),
    });

    report
}
