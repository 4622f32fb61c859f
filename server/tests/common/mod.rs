//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use bytes::Bytes;
use serde_json::{Map, Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tilecast_server::build_router;
use tilecast_server::config::Config;
use tilecast_server::raster::{BandInfo, Bounds, RasterError, RasterInfo, RasterReader};
use tilecast_server::stac::{ItemOptions, StacError, StacItem, StacItemProvider};
use tower::util::ServiceExt;

/// Source path the mock STAC provider answers with an upstream 404
pub const MISSING_SOURCE: &str = "https://data.example.com/missing.tif";
/// Source path the mock STAC provider answers with an upstream 503
pub const BROKEN_SOURCE: &str = "https://data.example.com/broken.tif";

/// Create a test application router with mock collaborators
pub fn create_test_app() -> Router {
    create_test_app_with_config(Config::default())
}

pub fn create_test_app_with_config(config: Config) -> Router {
    build_router(
        &config,
        Arc::new(MockRasterReader::new()),
        Arc::new(MockStacProvider),
    )
}

/// Send a GET request and return the response
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

/// A STAC item whose single asset is named `asset_name`
pub fn test_item(asset_name: &str, asset: Value, bbox: Vec<f64>) -> StacItem {
    let mut assets = Map::new();
    assets.insert(asset_name.to_string(), asset);

    StacItem {
        item_type: "Feature".to_string(),
        stac_version: "1.0.0".to_string(),
        stac_extensions: Vec::new(),
        id: "test-item".to_string(),
        geometry: Value::Null,
        bbox,
        properties: as_map(json!({"datetime": "2021-01-01T00:00:00Z"})),
        links: Vec::new(),
        assets,
        collection: None,
    }
}

/// Mock STAC provider whose items depend on the source path's file name
pub struct MockStacProvider;

#[async_trait]
impl StacItemProvider for MockStacProvider {
    async fn create_item(
        &self,
        src_path: &str,
        options: &ItemOptions,
    ) -> Result<StacItem, StacError> {
        let bbox = vec![-10.0, 40.0, 10.0, 50.0];
        let name = options.asset_name.as_str();

        let item = match src_path {
            MISSING_SOURCE => {
                return Err(RasterError::Fetch {
                    url: src_path.to_string(),
                    status: 404,
                }
                .into());
            }
            BROKEN_SOURCE => {
                return Err(RasterError::Fetch {
                    url: src_path.to_string(),
                    status: 503,
                }
                .into());
            }
            "local-missing.tif" => {
                return Err(RasterError::NotFound(src_path.to_string()).into());
            }
            "rgb.tif" => test_item(
                name,
                json!({
                    "href": src_path,
                    "bands": [{"name": "red"}, {"name": "green"}, {"name": "blue"}],
                    "render": {"bands": [1, 2, 3], "rescale": [[0, 100]]}
                }),
                bbox,
            ),
            "styled.tif" => test_item(
                name,
                json!({
                    "href": src_path,
                    "nodata": -9999,
                    "render": {
                        "color_formula": "Gamma RGB 3.5",
                        "colormap_name": "viridis",
                        "nodata": null
                    }
                }),
                bbox,
            ),
            "null-bands.tif" => test_item(
                name,
                json!({"href": src_path, "render": {"bands": null}}),
                bbox,
            ),
            "volume.tif" => test_item(
                name,
                json!({"href": src_path}),
                vec![-10.0, 40.0, 0.0, 10.0, 50.0, 100.0],
            ),
            // Item whose only asset is named "data" regardless of the request
            "fixed-asset.tif" => test_item("data", json!({"href": src_path}), bbox),
            _ => test_item(name, json!({"href": src_path}), bbox),
        };

        Ok(item)
    }
}

/// Mock raster reader serving one dataset, `scene.tif`
pub struct MockRasterReader {
    info: Arc<RasterInfo>,
}

impl MockRasterReader {
    pub fn new() -> Self {
        Self {
            info: Arc::new(RasterInfo {
                name: "scene.tif".to_string(),
                width: 200,
                height: 100,
                bounds: Bounds::new(-10.0, 40.0, 10.0, 50.0),
                epsg: Some(4326),
                transform: [0.1, 0.0, -10.0, 0.0, -0.1, 50.0],
                bands: vec![
                    BandInfo {
                        name: "b1".to_string(),
                        data_type: "uint8".to_string(),
                        nodata: None,
                    },
                    BandInfo {
                        name: "b2".to_string(),
                        data_type: "uint8".to_string(),
                        nodata: None,
                    },
                ],
                nodata: None,
            }),
        }
    }

    pub fn payload() -> Bytes {
        Bytes::from_static(b"II*\0mock-geotiff")
    }
}

#[async_trait]
impl RasterReader for MockRasterReader {
    async fn info(&self, src_path: &str) -> Result<Arc<RasterInfo>, RasterError> {
        if src_path == "scene.tif" {
            Ok(self.info.clone())
        } else {
            Err(RasterError::NotFound(src_path.to_string()))
        }
    }

    async fn read(&self, src_path: &str, bbox: Option<Bounds>) -> Result<Bytes, RasterError> {
        let info = self.info(src_path).await?;
        if let Some(bbox) = bbox
            && !bbox.intersects(&info.bounds)
        {
            return Err(RasterError::InvalidBbox("outside the dataset".to_string()));
        }
        Ok(Self::payload())
    }
}

/// Write a single-band uint8 GeoTIFF in EPSG:`epsg` with the given origin
/// and pixel size
pub fn write_geotiff(
    width: u32,
    height: u32,
    origin: (f64, f64),
    pixel_size: f64,
    epsg: u16,
) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray8>(width, height)
            .unwrap();

        let (model_type, cs_key) = if (4000..5000).contains(&epsg) {
            (2u16, 2048u16)
        } else {
            (1, 3072)
        };
        let geokeys: Vec<u16> = vec![1, 1, 0, 2, 1024, 0, 1, model_type, cs_key, 0, 1, epsg];

        let dir = image.encoder();
        dir.write_tag(Tag::Unknown(33550), [pixel_size, pixel_size, 0.0].as_slice())
            .unwrap();
        dir.write_tag(
            Tag::Unknown(33922),
            [0.0, 0.0, 0.0, origin.0, origin.1, 0.0].as_slice(),
        )
        .unwrap();
        dir.write_tag(Tag::Unknown(34735), geokeys.as_slice())
            .unwrap();
        dir.write_tag(Tag::Unknown(42113), "0").unwrap();

        image
            .write_data(&vec![1u8; (width * height) as usize])
            .unwrap();
    }
    buffer.into_inner()
}
