//! Reprojection of raster bounds to WGS84 (proj4rs + crs-definitions)

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::types::{Bounds, RasterError};

pub const WGS84: u16 = 4326;

/// Upper bound on intermediate points per edge when densifying bounds
pub const MAX_DENSIFY_PTS: u32 = 10_000;

fn proj_string(epsg: u16) -> Option<&'static str> {
    crs_definitions::from_code(epsg).map(|def| def.proj4)
}

fn is_geographic(epsg: u16) -> bool {
    match proj_string(epsg) {
        Some(def) => def.contains("+proj=longlat"),
        None => (4000..5000).contains(&epsg),
    }
}

fn load(epsg: u16) -> Result<Proj, RasterError> {
    let def = proj_string(epsg)
        .ok_or_else(|| RasterError::UnsupportedCrs(format!("EPSG:{} is not a known code", epsg)))?;
    Proj::from_proj_string(def)
        .map_err(|e| RasterError::UnsupportedCrs(format!("EPSG:{}: {:?}", epsg, e)))
}

/// Transform `bounds` from `epsg` to WGS84 longitude/latitude.
///
/// Each edge gets `densify_pts` intermediate points so curved edges in
/// the target CRS are covered, capped at [`MAX_DENSIFY_PTS`]. `None` or
/// 4326 means the bounds are already geographic and they are returned
/// unchanged.
pub fn bounds_to_wgs84(
    bounds: &Bounds,
    epsg: Option<u16>,
    densify_pts: u32,
) -> Result<Bounds, RasterError> {
    let source = match epsg {
        None | Some(WGS84) => return Ok(*bounds),
        Some(code) => code,
    };

    let src = load(source)?;
    let dst = load(WGS84)?;
    let source_geographic = is_geographic(source);

    let mut minx = f64::INFINITY;
    let mut miny = f64::INFINITY;
    let mut maxx = f64::NEG_INFINITY;
    let mut maxy = f64::NEG_INFINITY;

    for (x, y) in edge_points(bounds, densify_pts) {
        let mut point = if source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&src, &dst, &mut point).map_err(|e| {
            RasterError::UnsupportedCrs(format!("EPSG:{} to EPSG:4326 failed: {:?}", source, e))
        })?;

        let (lon, lat) = (point.0.to_degrees(), point.1.to_degrees());
        if !lon.is_finite() || !lat.is_finite() {
            continue;
        }
        minx = minx.min(lon);
        miny = miny.min(lat);
        maxx = maxx.max(lon);
        maxy = maxy.max(lat);
    }

    if !minx.is_finite() || !maxx.is_finite() {
        return Err(RasterError::UnsupportedCrs(format!(
            "EPSG:{} bounds could not be projected",
            source
        )));
    }

    Ok(Bounds::new(minx, miny, maxx, maxy))
}

/// Points walking the rectangle's boundary, corners included
fn edge_points(bounds: &Bounds, densify_pts: u32) -> impl Iterator<Item = (f64, f64)> {
    let steps = densify_pts.min(MAX_DENSIFY_PTS) + 1;
    let corners = [
        (bounds.minx, bounds.miny),
        (bounds.maxx, bounds.miny),
        (bounds.maxx, bounds.maxy),
        (bounds.minx, bounds.maxy),
    ];

    (0..4).flat_map(move |i| {
        let (x0, y0) = corners[i];
        let (x1, y1) = corners[(i + 1) % 4];
        (0..steps).map(move |step| {
            let t = f64::from(step) / f64::from(steps);
            (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t)
        })
    })
}

/// Round a coordinate to `precision` decimals; negative precision keeps it as is
pub fn round_coord(value: f64, precision: i32) -> f64 {
    if precision < 0 {
        return value;
    }
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}
