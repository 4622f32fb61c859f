//! TileJSON documents and tile URL templates

mod types;

pub use types::{
    ImageType, MAX_ZOOM_LIMIT, RenderParams, TileJson, TileJsonError, TilePath, TileScheme,
    WORLD_BOUNDS,
};
