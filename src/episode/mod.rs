mod download;
mod name;

pub use download::{CHUNK_SIZE, DownloadContext, download_episode};
pub use name::{episode_file_name, episode_name};
