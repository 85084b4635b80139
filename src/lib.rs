pub mod config;
pub mod episode;
pub mod error;
pub mod http;
pub mod list;
pub mod plan;
pub mod progress;
pub mod registry;
pub mod series;
mod sync;

// Re-export main types for convenience
pub use config::{Config, MissingRegistry};
pub use episode::{DownloadContext, download_episode, episode_file_name, episode_name};
pub use error::{
    ConfigError, EpisodeError, FetchError, ListError, RegistryError, SyncError, ValidationError,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use list::{append_local, create_local, fetch_remote, read_local};
pub use plan::{SeriesStatus, classify, pending_in_chronological_order};
pub use progress::{
    NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter, TransferProgress,
    format_rate,
};
pub use registry::Registry;
pub use series::{SERIES_URL_PREFIX, TrackedSeries, validate_series_url};
pub use sync::{
    EpisodeFailure, SeriesOutcome, SeriesReport, SyncOptions, SyncReport, sync_all, sync_series,
};
