// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tvcheck::{
    DownloadContext, EpisodeError, FetchError, ListError, NoopReporter, ProgressEvent,
    ProgressReporter, ReqwestClient, SeriesStatus, SharedProgressReporter, TrackedSeries,
    download_episode, fetch_remote, sync_series,
};

async fn serve_list(server: &MockServer, list_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(list_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn serve_episode(server: &MockServer, episode_path: &str, status: u16, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(episode_path))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn fetch_remote_reads_lines_over_http() {
    let server = MockServer::start().await;
    let uri = server.uri();
    serve_list(
        &server,
        "/flist/show",
        format!("{uri}/v/E3.mkv\r\n{uri}/v/E2.mkv\r\n{uri}/v/E1.mkv\r\n"),
    )
    .await;

    let list = fetch_remote(&ReqwestClient::new(), &format!("{uri}/flist/show"))
        .await
        .unwrap();

    assert_eq!(
        list,
        vec![
            format!("{uri}/v/E3.mkv"),
            format!("{uri}/v/E2.mkv"),
            format!("{uri}/v/E1.mkv"),
        ]
    );
}

#[tokio::test]
async fn fetch_remote_empty_body_is_not_an_error() {
    let server = MockServer::start().await;
    serve_list(&server, "/flist/empty", String::new()).await;

    let list = fetch_remote(
        &ReqwestClient::new(),
        &format!("{}/flist/empty", server.uri()),
    )
    .await
    .unwrap();

    assert!(list.is_empty());
}

#[tokio::test]
async fn fetch_remote_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flist/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetch_remote(
        &ReqwestClient::new(),
        &format!("{}/flist/gone", server.uri()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ListError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn fetch_remote_reports_unreachable_server() {
    let server = MockServer::start().await;
    let url = format!("{}/flist/show", server.uri());
    drop(server);

    let err = fetch_remote(&ReqwestClient::new(), &url).await.unwrap_err();

    assert!(matches!(err, ListError::Network { .. }));
}

#[derive(Default)]
struct TotalsReporter {
    totals: Mutex<Vec<Option<u64>>>,
}

impl ProgressReporter for TotalsReporter {
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::DownloadProgress { progress, .. } = event {
            self.totals.lock().unwrap().push(progress.total());
        }
    }
}

#[tokio::test]
async fn download_uses_content_length_for_progress() {
    let server = MockServer::start().await;
    let data = vec![1u8; 40 * 1024];
    serve_episode(&server, "/v/Show.S01E02.mkv", 200, &data).await;

    let dir = tempdir().unwrap();
    let recorder = Arc::new(TotalsReporter::default());
    let reporter: SharedProgressReporter = recorder.clone();
    let context = DownloadContext {
        series_id: 0,
        episode_index: 0,
        total_to_download: 1,
    };

    let bytes = download_episode(
        &ReqwestClient::new(),
        &format!("{}/v/Show.S01E02.mkv", server.uri()),
        dir.path(),
        "Show.S01E02.mkv",
        &context,
        &reporter,
    )
    .await
    .unwrap();

    assert_eq!(bytes, data.len() as u64);
    assert_eq!(
        std::fs::read(dir.path().join("Show.S01E02.mkv")).unwrap(),
        data
    );
    let totals = recorder.totals.lock().unwrap();
    assert!(totals.len() >= 3);
    assert!(totals.iter().all(|t| *t == Some(data.len() as u64)));
}

#[tokio::test]
async fn sync_series_downloads_new_episodes_in_order() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let (e1, e2, e3) = (
        format!("{uri}/v/Show.S01E01.mkv"),
        format!("{uri}/v/Show.S01E02.mkv"),
        format!("{uri}/v/Show.S01E03.mkv"),
    );
    serve_list(&server, "/flist/show", format!("{e3}\n{e2}\n{e1}\n")).await;
    serve_episode(&server, "/v/Show.S01E02.mkv", 200, b"second").await;
    serve_episode(&server, "/v/Show.S01E03.mkv", 200, b"third").await;

    let state = tempdir().unwrap();
    let downloads = tempdir().unwrap();
    let series = TrackedSeries {
        url: format!("{uri}/flist/show"),
        state_path: state.path().join("show"),
    };
    std::fs::write(&series.state_path, format!("{e1}\n")).unwrap();

    let outcome = sync_series(
        &ReqwestClient::new(),
        &series,
        0,
        downloads.path(),
        &NoopReporter::shared(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, SeriesStatus::Pending { count: 2 });
    assert_eq!(outcome.fetched, vec![e2.clone(), e3.clone()]);
    assert_eq!(
        std::fs::read_to_string(&series.state_path).unwrap(),
        format!("{e1}\n{e2}\n{e3}\n")
    );
    assert_eq!(
        std::fs::read(downloads.path().join("Show.S01E03.mkv")).unwrap(),
        b"third"
    );
    assert_eq!(
        requested_paths(&server).await,
        vec!["/flist/show", "/v/Show.S01E02.mkv", "/v/Show.S01E03.mkv"]
    );
}

#[tokio::test]
async fn sync_series_stops_at_failed_episode() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let (e1, e2) = (
        format!("{uri}/v/Show.S01E01.mkv"),
        format!("{uri}/v/Show.S01E02.mkv"),
    );
    serve_list(&server, "/flist/show", format!("{e2}\n{e1}\n")).await;
    serve_episode(&server, "/v/Show.S01E01.mkv", 500, b"oops").await;
    serve_episode(&server, "/v/Show.S01E02.mkv", 200, b"second").await;

    let state = tempdir().unwrap();
    let downloads = tempdir().unwrap();
    let series = TrackedSeries {
        url: format!("{uri}/flist/show"),
        state_path: state.path().join("show"),
    };
    std::fs::write(&series.state_path, "").unwrap();

    let outcome = sync_series(
        &ReqwestClient::new(),
        &series,
        0,
        downloads.path(),
        &NoopReporter::shared(),
    )
    .await
    .unwrap();

    assert!(outcome.fetched.is_empty());
    let failure = outcome.failure.expect("first episode fails");
    assert_eq!(failure.url, e1);
    assert!(matches!(
        failure.error,
        EpisodeError::Fetch(FetchError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(std::fs::read_to_string(&series.state_path).unwrap(), "");
    assert!(
        !requested_paths(&server)
            .await
            .contains(&"/v/Show.S01E02.mkv".to_string())
    );
}
