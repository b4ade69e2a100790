//! Downloads of resolved movie files, resumable across restarts.

mod resume;

pub use resume::{DownloadEntry, RESUME_FILE, ResumeList};

use crate::engine::Movie;
use crate::settings::DownloadSettings;
use futures::StreamExt;
use reqwest::{Client, StatusCode, header};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("No download link for {0}")]
    NoDownloadLink(String),

    #[error("Download of {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resume list error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Streams files to `<output_dir>/<title>/` and records them in the resume list
#[derive(Clone)]
pub struct DownloadManager {
    client: Client,
    output_dir: PathBuf,
    resume: Arc<ResumeList>,
}

impl DownloadManager {
    pub fn new(settings: &DownloadSettings) -> Result<Self> {
        let resume = ResumeList::in_dir(&settings.state_dir)?;
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client, settings.output_dir.clone(), resume))
    }

    pub fn with_client(client: Client, output_dir: PathBuf, resume: ResumeList) -> Self {
        Self {
            client,
            output_dir,
            resume: Arc::new(resume),
        }
    }

    pub fn resume_list(&self) -> &ResumeList {
        &self.resume
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory a movie's file is written to
    pub fn target_dir(&self, movie: &Movie) -> PathBuf {
        self.output_dir.join(sanitize_file_name(&movie.title))
    }

    /// Record `movie` in the resume list and download its file.
    ///
    /// Series need an episode picked first, so they are rejected.
    pub async fn download(&self, movie: &Movie) -> Result<PathBuf> {
        let url = match (&movie.download_link, movie.is_series) {
            (Some(url), false) => url.clone(),
            _ => return Err(DownloadError::NoDownloadLink(movie.title.clone())),
        };
        let dir = self.target_dir(movie);

        self.resume.add(DownloadEntry::new(
            movie.title.as_str(),
            url.clone(),
            dir.clone(),
            movie.source.as_str(),
        ))?;
        self.run(&movie.title, &url, &dir).await
    }

    /// Continue every download the resume list still has open
    pub async fn resume_pending(&self) -> Vec<(String, Result<PathBuf>)> {
        let mut results = Vec::new();
        for entry in self.resume.pending() {
            info!("Resuming download of {}", entry.title);
            let result = self.run(&entry.title, &entry.url, &entry.dir).await;
            results.push((entry.title, result));
        }
        results
    }

    async fn run(&self, title: &str, url: &Url, dir: &Path) -> Result<PathBuf> {
        match self.fetch_to_dir(url, dir).await {
            Ok(path) => {
                self.resume.mark_completed(title)?;
                info!("Downloaded {} to {}", title, path.display());
                Ok(path)
            }
            Err(e) => {
                warn!("Download of {} failed: {}", title, e);
                Err(e)
            }
        }
    }

    /// Stream `url` into `dir`, continuing a partial file with a Range request
    pub async fn fetch_to_dir(&self, url: &Url, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name_for(url));

        let existing = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let mut request = self.client.get(url.as_str());
        if existing > 0 {
            debug!("Resuming {} from byte {}", path.display(), existing);
            request = request.header(header::RANGE, format!("bytes={existing}-"));
        }
        let response = request.send().await?;

        let append = match response.status() {
            StatusCode::PARTIAL_CONTENT => true,
            StatusCode::RANGE_NOT_SATISFIABLE if existing > 0 => {
                debug!("{} is already complete", path.display());
                return Ok(path);
            }
            status if status.is_success() => false,
            status => {
                return Err(DownloadError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(path)
    }
}

/// Last path segment of `url`, or "download"
fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(sanitize_file_name)
        .unwrap_or_else(|| "download".to_string())
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}
