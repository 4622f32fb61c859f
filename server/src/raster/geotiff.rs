//! GeoTIFF header parsing
//!
//! Reads only the first IFD's tags: dimensions, sample layout, the
//! georeferencing tags (pixel scale + tie point or a full model
//! transformation), the GeoKey directory for the EPSG code and GDAL's
//! nodata tag. Pixel data is never decoded.

use std::io::Cursor;

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use super::types::{BandInfo, Bounds, RasterError, RasterInfo};

// GeoTIFF Tag IDs (not in standard tiff crate)
const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
const GEOTIFF_MODELTIEPOINT: u16 = 33922;
const GEOTIFF_MODELTRANSFORMATION: u16 = 34264;
const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

// GeoKey IDs
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// GeoKey value meaning "user defined", i.e. no EPSG code
const USER_DEFINED: u16 = 32767;

/// Parse GeoTIFF metadata from the bytes of a file
pub fn parse_geotiff(bytes: &[u8], name: &str) -> Result<RasterInfo, RasterError> {
    let decode_err = |e: tiff::TiffError| RasterError::Decode(format!("{}: {}", name, e));

    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(decode_err)?;
    let (width, height) = decoder.dimensions().map_err(decode_err)?;

    let samples = match decoder.find_tag(Tag::SamplesPerPixel).map_err(decode_err)? {
        Some(value) => value.into_u16().map_err(decode_err)?,
        None => 1,
    };
    let bits = match decoder.find_tag(Tag::BitsPerSample).map_err(decode_err)? {
        Some(value) => value.into_u16_vec().map_err(decode_err)?,
        None => vec![1],
    };
    let formats = match decoder.find_tag(Tag::SampleFormat).map_err(decode_err)? {
        Some(value) => value.into_u16_vec().map_err(decode_err)?,
        None => vec![1],
    };

    let transform = read_transform(&mut decoder, name)?;

    let epsg = match decoder
        .find_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY))
        .map_err(decode_err)?
    {
        Some(value) => epsg_from_geokeys(&value.into_u16_vec().map_err(decode_err)?),
        None => None,
    };

    let nodata = match decoder.find_tag(Tag::Unknown(GDAL_NODATA)).map_err(decode_err)? {
        Some(value) => parse_nodata(&value.into_string().map_err(decode_err)?),
        None => None,
    };

    let bands = (0..samples as usize)
        .map(|i| BandInfo {
            name: format!("b{}", i + 1),
            data_type: data_type(
                *formats.get(i).or(formats.first()).unwrap_or(&1),
                *bits.get(i).or(bits.first()).unwrap_or(&8),
            ),
            nodata,
        })
        .collect();

    let [a, b, c, d, e, f] = transform;
    let corners = [
        (c, f),
        (a * width as f64 + c, d * width as f64 + f),
        (b * height as f64 + c, e * height as f64 + f),
        (
            a * width as f64 + b * height as f64 + c,
            d * width as f64 + e * height as f64 + f,
        ),
    ];
    let bounds = Bounds::new(
        corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min),
        corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
        corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max),
        corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
    );

    Ok(RasterInfo {
        name: name.to_string(),
        width,
        height,
        bounds,
        epsg,
        transform,
        bands,
        nodata,
    })
}

/// Affine transform `[a, b, c, d, e, f]` from the georeferencing tags
fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    name: &str,
) -> Result<[f64; 6], RasterError> {
    let decode_err = |e: tiff::TiffError| RasterError::Decode(format!("{}: {}", name, e));

    if let Some(value) = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELTRANSFORMATION))
        .map_err(decode_err)?
    {
        let m = value.into_f64_vec().map_err(decode_err)?;
        if m.len() < 8 {
            return Err(RasterError::Decode(format!(
                "{}: model transformation has {} values",
                name,
                m.len()
            )));
        }
        return Ok([m[0], m[1], m[3], m[4], m[5], m[7]]);
    }

    let scale = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE))
        .map_err(decode_err)?;
    let tiepoint = decoder
        .find_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT))
        .map_err(decode_err)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => {
            let scale = scale.into_f64_vec().map_err(decode_err)?;
            let tie = tiepoint.into_f64_vec().map_err(decode_err)?;
            if scale.len() < 2 || tie.len() < 6 {
                return Err(RasterError::Decode(format!(
                    "{}: malformed pixel scale or tie point",
                    name
                )));
            }
            // Tie point (I, J, K, X, Y, Z) anchors raster (I, J) at model (X, Y)
            let origin_x = tie[3] - tie[0] * scale[0];
            let origin_y = tie[4] + tie[1] * scale[1];
            Ok([scale[0], 0.0, origin_x, 0.0, -scale[1], origin_y])
        }
        _ => Err(RasterError::Decode(format!(
            "{}: not georeferenced (no pixel scale/tie point or model transformation)",
            name
        ))),
    }
}

/// EPSG code from a GeoKeyDirectory
///
/// Layout: `[version, revision, minor, count, (key, location, count, value)*]`.
/// Only keys stored inline (location 0) are considered.
fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    let count = *keys.get(3)? as usize;
    let entries = keys.get(4..4 + count * 4)?;

    let mut geographic = None;
    let mut projected = None;
    for entry in entries.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(value),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(value),
            _ => {}
        }
    }

    projected.or(geographic)
}

fn parse_nodata(raw: &str) -> Option<f64> {
    raw.trim_matches(char::from(0)).trim().parse::<f64>().ok()
}

fn data_type(sample_format: u16, bits: u16) -> String {
    let kind = match sample_format {
        2 => "int",
        3 => "float",
        _ => "uint",
    };
    format!("{}{}", kind, bits)
}
