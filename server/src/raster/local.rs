//! GeoTIFF reader for local files and HTTP(S) URLs
//!
//! Metadata comes from a prefix of the source: the first ranged read is
//! `header_fetch_bytes` long and grows fourfold until the GeoTIFF header
//! parses or `max_header_bytes` is reached. Only coverage downloads read a
//! source in full, up to `max_download_bytes`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::{counter, histogram};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, HeaderMap, RANGE};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::RasterConfig;

use super::cache::{RasterCacheConfig, RasterInfoCache};
use super::geotiff::parse_geotiff;
use super::service::RasterReader;
use super::types::{Bounds, RasterError, RasterInfo};

/// Leading bytes of a source
struct Prefix {
    bytes: Bytes,
    /// Whether `bytes` is the whole source
    complete: bool,
}

/// Reads GeoTIFF headers from disk or over HTTP
pub struct LocalRasterReader {
    data_dir: Option<PathBuf>,
    allow_remote: bool,
    client: reqwest::Client,
    cache: RasterInfoCache,
    header_fetch_bytes: usize,
    max_header_bytes: usize,
    max_download_bytes: usize,
}

impl LocalRasterReader {
    pub fn new(config: &RasterConfig) -> Result<Self, RasterError> {
        if let Some(dir) = &config.data_dir
            && !dir.is_dir()
        {
            return Err(RasterError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Data directory not found: {:?}", dir),
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| RasterError::Request {
                url: String::new(),
                reason: e.to_string(),
            })?;

        info!(
            "Initialized raster reader (data_dir: {:?}, remote sources: {}, header limit: {} bytes)",
            config.data_dir, config.allow_remote, config.max_header_bytes
        );

        Ok(Self {
            data_dir: config.data_dir.clone(),
            allow_remote: config.allow_remote,
            client,
            cache: RasterInfoCache::new(RasterCacheConfig {
                max_entries: config.cache_max_entries,
                ttl: config.cache_ttl,
            }),
            header_fetch_bytes: config.header_fetch_bytes.max(1),
            max_header_bytes: config.max_header_bytes.max(1),
            max_download_bytes: config.max_download_bytes,
        })
    }

    fn is_remote(src_path: &str) -> bool {
        src_path.starts_with("http://") || src_path.starts_with("https://")
    }

    /// Map a source path to a file on disk, confined to `data_dir` when set
    fn resolve_path(&self, src_path: &str) -> Result<PathBuf, RasterError> {
        let path = Path::new(src_path.strip_prefix("file://").unwrap_or(src_path));

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(RasterError::InvalidPath(src_path.to_string()));
        }

        match &self.data_dir {
            Some(dir) => {
                let relative = path.strip_prefix("/").unwrap_or(path);
                Ok(dir.join(relative))
            }
            None => Ok(path.to_path_buf()),
        }
    }

    /// Read at most `limit` leading bytes of a source.
    ///
    /// With `require_complete`, a source known to be longer than `limit`
    /// fails with [`RasterError::TooLarge`] before its body is read.
    async fn fetch_prefix(
        &self,
        src_path: &str,
        limit: usize,
        require_complete: bool,
    ) -> Result<Prefix, RasterError> {
        let start = Instant::now();

        let prefix = if Self::is_remote(src_path) {
            if !self.allow_remote {
                return Err(RasterError::RemoteDisabled(src_path.to_string()));
            }
            self.fetch_remote(src_path, limit, require_complete).await?
        } else {
            self.fetch_local(src_path, limit, require_complete).await?
        };

        histogram!("tilecast_raster_fetch_duration_seconds").record(start.elapsed().as_secs_f64());
        debug!(
            "Fetched {} bytes of {} (complete: {})",
            prefix.bytes.len(),
            src_path,
            prefix.complete
        );
        Ok(prefix)
    }

    async fn fetch_local(
        &self,
        src_path: &str,
        limit: usize,
        require_complete: bool,
    ) -> Result<Prefix, RasterError> {
        let path = self.resolve_path(src_path)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RasterError::NotFound(src_path.to_string()));
            }
            Err(e) => return Err(RasterError::IoError(e)),
        };

        let len = file.metadata().await?.len();
        if require_complete && len > limit as u64 {
            return Err(RasterError::TooLarge {
                path: src_path.to_string(),
                limit,
            });
        }

        let mut buffer = Vec::with_capacity(usize::try_from(len).unwrap_or(limit).min(limit));
        file.take(limit as u64).read_to_end(&mut buffer).await?;

        Ok(Prefix {
            complete: buffer.len() as u64 >= len,
            bytes: Bytes::from(buffer),
        })
    }

    async fn fetch_remote(
        &self,
        url: &str,
        limit: usize,
        require_complete: bool,
    ) -> Result<Prefix, RasterError> {
        let request_err = |e: reqwest::Error| RasterError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", limit.saturating_sub(1)))
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetching {} returned {}", url, status);
            counter!("tilecast_upstream_errors_total").increment(1);
            return Err(RasterError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Servers without range support answer 200 with the whole object
        let total = if status == StatusCode::PARTIAL_CONTENT {
            content_range_total(response.headers())
        } else {
            response.content_length()
        };
        if require_complete && total.is_some_and(|t| t > limit as u64) {
            return Err(RasterError::TooLarge {
                path: url.to_string(),
                limit,
            });
        }

        let mut buffer = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await.map_err(request_err)? {
            let room = limit - buffer.len();
            if chunk.len() >= room {
                buffer.extend_from_slice(&chunk[..room]);
                truncated = chunk.len() > room;
                break;
            }
            buffer.extend_from_slice(&chunk);
        }

        let complete = match total {
            Some(total) => buffer.len() as u64 >= total,
            None => !truncated && buffer.len() < limit,
        };
        if require_complete && !complete {
            return Err(RasterError::TooLarge {
                path: url.to_string(),
                limit,
            });
        }

        Ok(Prefix {
            bytes: Bytes::from(buffer),
            complete,
        })
    }

    /// Parse the GeoTIFF header from the shortest prefix that contains it
    async fn read_header(&self, src_path: &str) -> Result<RasterInfo, RasterError> {
        let name = Self::source_name(src_path);
        let mut limit = self.header_fetch_bytes;

        loop {
            let prefix = self.fetch_prefix(src_path, limit, false).await?;
            match parse_geotiff(&prefix.bytes, &name) {
                Ok(info) => return Ok(info),
                Err(e) if prefix.complete => return Err(e),
                Err(_) if limit >= self.max_header_bytes => {
                    return Err(RasterError::TooLarge {
                        path: src_path.to_string(),
                        limit: self.max_header_bytes,
                    });
                }
                Err(e) => {
                    debug!("Header of {} not within {} bytes: {}", src_path, limit, e);
                    limit = limit.saturating_mul(4).min(self.max_header_bytes);
                }
            }
        }
    }

    fn source_name(src_path: &str) -> String {
        let trimmed = src_path.split(['?', '#']).next().unwrap_or(src_path);
        trimmed
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(trimmed)
            .to_string()
    }
}

/// Object size from a `Content-Range: bytes 0-N/TOTAL` header
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl RasterReader for LocalRasterReader {
    async fn info(&self, src_path: &str) -> Result<Arc<RasterInfo>, RasterError> {
        self.cache
            .get_or_try_insert_with(src_path, self.read_header(src_path))
            .await
            .map_err(RasterError::from)
    }

    async fn read(&self, src_path: &str, bbox: Option<Bounds>) -> Result<Bytes, RasterError> {
        let info = self.info(src_path).await?;

        if let Some(bbox) = bbox
            && !bbox.intersects(&info.bounds)
        {
            return Err(RasterError::InvalidBbox(format!(
                "{:?} does not intersect the dataset bounds {:?}",
                bbox.to_array(),
                info.bounds.to_array()
            )));
        }

        let prefix = self
            .fetch_prefix(src_path, self.max_download_bytes, true)
            .await?;
        Ok(prefix.bytes)
    }
}
