//! STAC item generation from raster metadata

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, histogram};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::raster::projection::{bounds_to_wgs84, round_coord};
use crate::raster::{Bounds, RasterInfo, RasterReader};

use super::service::StacItemProvider;
use super::types::{
    EO_EXTENSION, GEOTIFF_MEDIA_TYPE, ItemOptions, PROJECTION_EXTENSION, RASTER_EXTENSION,
    STAC_VERSION, StacError, StacItem, StacLink, format_datetime,
};

/// Builds STAC items from the metadata a [`RasterReader`] provides
pub struct RasterStacProvider {
    reader: Arc<dyn RasterReader>,
}

impl RasterStacProvider {
    pub fn new(reader: Arc<dyn RasterReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl StacItemProvider for RasterStacProvider {
    async fn create_item(
        &self,
        src_path: &str,
        options: &ItemOptions,
    ) -> Result<StacItem, StacError> {
        let start = Instant::now();
        let info = self.reader.info(src_path).await?;
        let item = build_item(&info, src_path, options)?;

        histogram!("tilecast_stac_item_build_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        counter!("tilecast_stac_items_total").increment(1);
        debug!("Created STAC item {} for {}", item.id, src_path);

        Ok(item)
    }
}

/// Item id derived from a source path: basename up to the first `.`
pub fn default_item_id(src_path: &str) -> String {
    let path = src_path.split(['?', '#']).next().unwrap_or(src_path);
    let basename = path.rsplit('/').next().unwrap_or(path);
    basename.split('.').next().unwrap_or(basename).to_string()
}

/// Assemble a STAC 1.0.0 item for `info`
pub fn build_item(
    info: &RasterInfo,
    src_path: &str,
    options: &ItemOptions,
) -> Result<StacItem, StacError> {
    let wgs84 = bounds_to_wgs84(&info.bounds, info.epsg, options.geom_densify_pts)?;
    let precision = options.geom_precision;
    let bbox = Bounds::new(
        round_coord(wgs84.minx, precision),
        round_coord(wgs84.miny, precision),
        round_coord(wgs84.maxx, precision),
        round_coord(wgs84.maxy, precision),
    );
    if bbox.minx > bbox.maxx || bbox.miny > bbox.maxy {
        return Err(StacError::InvalidItem(format!(
            "degenerate footprint {:?}",
            bbox.to_array()
        )));
    }

    let mut properties = options.properties.clone();
    let datetime = match options.datetime {
        Some(dt) => Value::String(format_datetime(&dt)),
        // An interval stands in for the instant
        None if properties.contains_key("start_datetime")
            || properties.contains_key("end_datetime") =>
        {
            Value::Null
        }
        None => Value::String(format_datetime(&Utc::now())),
    };
    properties.insert("datetime".to_string(), datetime);

    let mut extensions = options.extensions.clone();
    let mut add_extension = |url: &str| {
        if !extensions.iter().any(|e| e == url) {
            extensions.push(url.to_string());
        }
    };

    if options.with_proj {
        add_extension(PROJECTION_EXTENSION);
        properties.insert("proj:epsg".to_string(), json!(info.epsg));
        properties.insert(
            "proj:geometry".to_string(),
            polygon(&info.bounds, -1),
        );
        properties.insert("proj:bbox".to_string(), json!(info.bounds.to_array()));
        properties.insert("proj:shape".to_string(), json!([info.height, info.width]));
        let t = info.transform;
        properties.insert(
            "proj:transform".to_string(),
            json!([t[0], t[1], t[2], t[3], t[4], t[5], 0.0, 0.0, 1.0]),
        );
    }

    let mut asset = Map::new();
    asset.insert(
        "href".to_string(),
        Value::String(
            options
                .asset_href
                .clone()
                .unwrap_or_else(|| src_path.to_string()),
        ),
    );
    asset.insert(
        "type".to_string(),
        Value::String(
            options
                .asset_media_type
                .clone()
                .unwrap_or_else(|| GEOTIFF_MEDIA_TYPE.to_string()),
        ),
    );
    if !options.asset_roles.is_empty() {
        asset.insert("roles".to_string(), json!(options.asset_roles));
    }

    if options.with_raster {
        add_extension(RASTER_EXTENSION);
        let bands: Vec<Value> = info
            .bands
            .iter()
            .map(|band| {
                let mut entry = Map::new();
                entry.insert("data_type".to_string(), json!(band.data_type));
                entry.insert("scale".to_string(), json!(1.0));
                entry.insert("offset".to_string(), json!(0.0));
                entry.insert("sampling".to_string(), json!("area"));
                if let Some(nodata) = band.nodata.or(info.nodata) {
                    entry.insert("nodata".to_string(), nodata_value(nodata));
                }
                Value::Object(entry)
            })
            .collect();
        asset.insert("raster:bands".to_string(), Value::Array(bands));
    }

    if options.with_eo {
        add_extension(EO_EXTENSION);
        let bands: Vec<Value> = info
            .bands
            .iter()
            .map(|band| json!({"name": band.name}))
            .collect();
        asset.insert("eo:bands".to_string(), Value::Array(bands));
    }

    let mut assets = Map::new();
    assets.insert(options.asset_name.clone(), Value::Object(asset));

    let links = options
        .collection_url
        .iter()
        .map(|href| StacLink {
            rel: "collection".to_string(),
            href: href.clone(),
            media_type: Some("application/json".to_string()),
            title: None,
        })
        .collect();

    Ok(StacItem {
        item_type: "Feature".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: extensions,
        id: options
            .id
            .clone()
            .unwrap_or_else(|| default_item_id(src_path)),
        geometry: polygon(&bbox, precision),
        bbox: bbox.to_array().to_vec(),
        properties,
        links,
        assets,
        collection: options.collection.clone(),
    })
}

/// GeoJSON Polygon covering `bounds`, counter-clockwise
fn polygon(bounds: &Bounds, precision: i32) -> Value {
    let r = |v: f64| round_coord(v, precision);
    json!({
        "type": "Polygon",
        "coordinates": [[
            [r(bounds.minx), r(bounds.miny)],
            [r(bounds.maxx), r(bounds.miny)],
            [r(bounds.maxx), r(bounds.maxy)],
            [r(bounds.minx), r(bounds.maxy)],
            [r(bounds.minx), r(bounds.miny)],
        ]]
    })
}

/// JSON has no NaN or infinity, so those are written as strings
fn nodata_value(nodata: f64) -> Value {
    if nodata.is_nan() {
        json!("nan")
    } else if nodata.is_infinite() {
        json!(if nodata > 0.0 { "inf" } else { "-inf" })
    } else {
        json!(nodata)
    }
}
