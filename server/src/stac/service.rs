//! StacItemProvider trait definition

use async_trait::async_trait;

use super::types::{ItemOptions, StacError, StacItem};

/// Trait for STAC item generators (built from raster metadata or fetched elsewhere)
#[async_trait]
pub trait StacItemProvider: Send + Sync {
    /// Create a STAC item describing the raster at `src_path`
    async fn create_item(
        &self,
        src_path: &str,
        options: &ItemOptions,
    ) -> Result<StacItem, StacError>;
}
