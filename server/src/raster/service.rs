//! RasterReader trait definition

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::types::{Bounds, RasterError, RasterInfo};

/// Trait for raster I/O backends (local GeoTIFF reader or an external tiler)
#[async_trait]
pub trait RasterReader: Send + Sync {
    /// Get georeferencing and band metadata for a source
    async fn info(&self, src_path: &str) -> Result<Arc<RasterInfo>, RasterError>;

    /// Get the coverage of a source as GeoTIFF bytes, optionally limited to a bbox
    async fn read(&self, src_path: &str, bbox: Option<Bounds>) -> Result<Bytes, RasterError>;
}
