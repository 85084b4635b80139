// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ffi::OsStr;
use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::http::{HttpClient, is_success};
use crate::progress::{ProgressEvent, SharedProgressReporter, TransferProgress};

/// Upper bound on the piece of the body written (and reported) at once
///
/// Network chunks larger than this are split; smaller ones are written as they arrive.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Where a download sits within its series
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// Position of the series in the registry
    pub series_id: usize,
    /// Index of this episode among the pending episodes
    pub episode_index: usize,
    /// Number of pending episodes in the series
    pub total_to_download: usize,
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name() == Some(OsStr::new(name))
}

/// Download an episode into `destination_dir` under `file_name`
///
/// Streams the response body to disk, reporting progress through the reporter.
/// Returns the number of bytes written on success. On a broken stream the
/// partially written file is left in place.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    url: &str,
    destination_dir: &Path,
    file_name: &str,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, FetchError> {
    if !destination_dir.is_dir() {
        return Err(FetchError::DestinationMissing(
            destination_dir.to_path_buf(),
        ));
    }

    if !is_single_component(file_name) {
        return Err(FetchError::InvalidName {
            name: file_name.to_string(),
        });
    }

    let output_path = destination_dir.join(file_name);

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| FetchError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !is_success(response.status) {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        series_id: context.series_id,
        episode_name: file_name.to_string(),
        episode_index: context.episode_index,
        total_to_download: context.total_to_download,
        content_length: response.content_length,
    });

    let mut file =
        File::create(&output_path)
            .await
            .map_err(|e| FetchError::FileCreateFailed {
                path: output_path.clone(),
                source: e,
            })?;

    let mut progress = TransferProgress::new(response.content_length);
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // Keep what already arrived on disk; the next pass overwrites it
                if let Err(flush_error) = file.flush().await {
                    tracing::warn!(
                        path = %output_path.display(),
                        error = %flush_error,
                        "failed to flush partial download"
                    );
                }
                return Err(FetchError::StreamFailed {
                    url: url.to_string(),
                    source: e,
                });
            }
        };

        for piece in chunk.chunks(CHUNK_SIZE) {
            file.write_all(piece)
                .await
                .map_err(|e| FetchError::FileWriteFailed {
                    path: output_path.clone(),
                    source: e,
                })?;

            progress.record(piece.len() as u64);

            reporter.report(ProgressEvent::DownloadProgress {
                series_id: context.series_id,
                episode_name: file_name.to_string(),
                progress,
            });
        }
    }

    file.flush()
        .await
        .map_err(|e| FetchError::FileWriteFailed {
            path: output_path.clone(),
            source: e,
        })?;

    tracing::debug!(
        url,
        path = %output_path.display(),
        bytes = progress.bytes_so_far(),
        "episode downloaded"
    );

    Ok(progress.bytes_so_far())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ByteStream, HttpBody, HttpError, HttpResponse};
    use crate::progress::{NoopReporter, ProgressReporter};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};

    use tempfile::tempdir;

    struct MockHttpClient {
        chunks: Vec<Vec<u8>>,
        status: u16,
        content_length: Option<u64>,
        fail_after_chunks: bool,
    }

    impl MockHttpClient {
        fn ok(data: &[u8]) -> Self {
            Self {
                chunks: vec![data.to_vec()],
                status: 200,
                content_length: Some(data.len() as u64),
                fail_after_chunks: false,
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, _url: &str) -> Result<HttpBody, HttpError> {
            unreachable!("downloads always stream")
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, HttpError> {
            let mut items: Vec<Result<Bytes, HttpError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            if self.fail_after_chunks {
                items.push(Err(HttpError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ))));
            }

            let stream: ByteStream = Box::pin(futures::stream::iter(items));

            Ok(HttpResponse {
                status: self.status,
                content_length: self.content_length,
                body: stream,
            })
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        progress: Mutex<Vec<TransferProgress>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            if let ProgressEvent::DownloadProgress { progress, .. } = event {
                self.progress.lock().unwrap().push(progress);
            }
        }
    }

    fn context() -> DownloadContext {
        DownloadContext {
            series_id: 0,
            episode_index: 0,
            total_to_download: 1,
        }
    }

    #[tokio::test]
    async fn download_writes_file() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::ok(b"test video content");
        let reporter = NoopReporter::shared();

        let bytes = download_episode(
            &client,
            "http://host/path/Show.S01E01.mkv",
            dir.path(),
            "Show.S01E01.mkv",
            &context(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(bytes, 18);
        let content = std::fs::read(dir.path().join("Show.S01E01.mkv")).unwrap();
        assert_eq!(content, b"test video content");
    }

    #[tokio::test]
    async fn download_reports_fixed_size_chunks() {
        let dir = tempdir().unwrap();
        let data = vec![7u8; CHUNK_SIZE * 2 + 100];
        let client = MockHttpClient::ok(&data);
        let recorder = Arc::new(RecordingReporter::default());
        let reporter: SharedProgressReporter = recorder.clone();

        download_episode(
            &client,
            "http://host/big.mkv",
            dir.path(),
            "big.mkv",
            &context(),
            &reporter,
        )
        .await
        .unwrap();

        let seen: Vec<u64> = recorder
            .progress
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.bytes_so_far())
            .collect();
        assert_eq!(
            seen,
            vec![
                CHUNK_SIZE as u64,
                CHUNK_SIZE as u64 * 2,
                CHUNK_SIZE as u64 * 2 + 100
            ]
        );
        let last = recorder.progress.lock().unwrap().last().copied().unwrap();
        assert_eq!(last.percent(), Some(100.0));
    }

    #[tokio::test]
    async fn download_without_content_length_counts_bytes() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient {
            chunks: vec![b"abc".to_vec(), b"def".to_vec()],
            status: 200,
            content_length: None,
            fail_after_chunks: false,
        };
        let recorder = Arc::new(RecordingReporter::default());
        let reporter: SharedProgressReporter = recorder.clone();

        let bytes = download_episode(
            &client,
            "http://host/e.mkv",
            dir.path(),
            "e.mkv",
            &context(),
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(bytes, 6);
        let progress = recorder.progress.lock().unwrap();
        assert_eq!(progress.len(), 2);
        assert!(progress.iter().all(|p| p.total().is_none() && p.percent().is_none()));
    }

    #[tokio::test]
    async fn download_fails_on_http_error() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient {
            status: 404,
            ..MockHttpClient::ok(b"Not Found")
        };
        let reporter = NoopReporter::shared();

        let result = download_episode(
            &client,
            "http://host/e.mkv",
            dir.path(),
            "e.mkv",
            &context(),
            &reporter,
        )
        .await;

        match result.unwrap_err() {
            FetchError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
        assert!(!dir.path().join("e.mkv").exists());
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_partial_file() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient {
            chunks: vec![b"partial".to_vec()],
            status: 200,
            content_length: Some(1000),
            fail_after_chunks: true,
        };
        let reporter = NoopReporter::shared();

        let result = download_episode(
            &client,
            "http://host/e.mkv",
            dir.path(),
            "e.mkv",
            &context(),
            &reporter,
        )
        .await;

        assert!(matches!(result, Err(FetchError::StreamFailed { .. })));
        assert_eq!(std::fs::read(dir.path().join("e.mkv")).unwrap(), b"partial");
    }

    #[tokio::test]
    async fn interrupted_stream_keeps_every_received_chunk_on_disk() {
        let dir = tempdir().unwrap();
        let first = vec![1u8; CHUNK_SIZE + 10];
        let second = vec![2u8; 300];
        let client = MockHttpClient {
            chunks: vec![first.clone(), second.clone()],
            status: 200,
            content_length: None,
            fail_after_chunks: true,
        };
        let recorder = Arc::new(RecordingReporter::default());
        let reporter: SharedProgressReporter = recorder.clone();

        let result = download_episode(
            &client,
            "http://host/e.mkv",
            dir.path(),
            "e.mkv",
            &context(),
            &reporter,
        )
        .await;

        assert!(matches!(result, Err(FetchError::StreamFailed { .. })));
        let on_disk = std::fs::read(dir.path().join("e.mkv")).unwrap();
        assert_eq!(on_disk.len(), first.len() + second.len());
        assert_eq!(&on_disk[..first.len()], first.as_slice());
        assert_eq!(&on_disk[first.len()..], second.as_slice());

        let reported = recorder.progress.lock().unwrap().last().copied().unwrap();
        assert_eq!(reported.bytes_so_far(), on_disk.len() as u64);
    }

    #[tokio::test]
    async fn missing_destination_is_rejected_before_request() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let client = MockHttpClient::ok(b"data");
        let reporter = NoopReporter::shared();

        let result = download_episode(
            &client,
            "http://host/e.mkv",
            &missing,
            "e.mkv",
            &context(),
            &reporter,
        )
        .await;

        match result.unwrap_err() {
            FetchError::DestinationMissing(path) => assert_eq!(path, missing),
            other => panic!("Expected DestinationMissing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_name_must_stay_in_destination() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::ok(b"data");
        let reporter = NoopReporter::shared();

        for name in ["", "..", "a/b.mkv"] {
            let result = download_episode(
                &client,
                "http://host/e.mkv",
                dir.path(),
                name,
                &context(),
                &reporter,
            )
            .await;
            assert!(matches!(result, Err(FetchError::InvalidName { .. })));
        }
    }
}
