//! Codec Polyline (algorithme d'encodage Google), précision 5 ou 6
//!
//! Chaque valeur est un delta signé (zig-zag) émis par groupes de 5 bits, bit de
//! continuation 0x20, décalé de 63 pour rester dans l'ASCII imprimable.
//! L'ordre d'encodage est lat puis lon ; les positions décodées sont `[lon, lat]`.

use serde_json::Value;

use super::{Codec, FormatName, FormatOptions};
use crate::reproject::{is_valid_wgs84, SupportedProjection};
use crate::types::{assign_ids, Feature, Geometry, ParseResult, Position, Properties, RawFeature};
use crate::GeoError;

const ASCII_OFFSET: u8 = 63;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;

/// Dernier décalage où un groupe de 5 bits tient dans un i64 positif
const MAX_SHIFT: u32 = 55;

/// Borne des valeurs mises à l'échelle à l'encodage (2^53)
const MAX_SCALED: f64 = 9_007_199_254_740_992.0;

/// Décode une polyline en positions `[lon, lat]`
///
/// # Errors
///
/// Retourne `GeoError::InvalidPolyline` si un caractère sort de la plage 63..=126,
/// si la chaîne est tronquée au milieu d'une valeur ou si une valeur déborde.
pub fn decode(encoded: &str, precision: u32) -> Result<Vec<Position>, GeoError> {
    let factor = scale(precision);
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut positions = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(next_value(bytes, &mut index)?)
            .ok_or_else(|| GeoError::invalid_polyline(start, "latitude overflow"))?;

        if index >= bytes.len() {
            return Err(GeoError::invalid_polyline(index, "missing longitude"));
        }
        let start = index;
        lon = lon
            .checked_add(next_value(bytes, &mut index)?)
            .ok_or_else(|| GeoError::invalid_polyline(start, "longitude overflow"))?;

        positions.push(Position::new(lon as f64 / factor, lat as f64 / factor));
    }

    Ok(positions)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, GeoError> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(GeoError::invalid_polyline(*index, "truncated value"));
        };
        if !(ASCII_OFFSET..=126).contains(&byte) {
            return Err(GeoError::invalid_polyline(
                *index,
                format!("character {:?} out of range", char::from(byte)),
            ));
        }
        if shift > MAX_SHIFT {
            return Err(GeoError::invalid_polyline(*index, "value too long"));
        }

        let chunk = i64::from(byte - ASCII_OFFSET);
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode des positions `[lon, lat]` (z ignoré)
///
/// # Errors
///
/// Retourne `GeoError::PolylineRange` pour une coordonnée non finie ou dont la
/// valeur mise à l'échelle dépasse 2^53.
pub fn encode(positions: &[Position], precision: u32) -> Result<String, GeoError> {
    let factor = scale(precision);
    let mut out = String::with_capacity(positions.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for (index, p) in positions.iter().enumerate() {
        let out_of_range = || GeoError::PolylineRange {
            index,
            x: p.x,
            y: p.y,
        };
        let lat = scaled(p.y, factor).ok_or_else(out_of_range)?;
        let lon = scaled(p.x, factor).ok_or_else(out_of_range)?;
        encode_value(lat.checked_sub(prev_lat).ok_or_else(out_of_range)?, &mut out);
        encode_value(lon.checked_sub(prev_lon).ok_or_else(out_of_range)?, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    Ok(out)
}

fn scaled(value: f64, factor: f64) -> Option<i64> {
    let v = (value * factor).round();
    (v.is_finite() && v.abs() <= MAX_SCALED).then_some(v as i64)
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = (if value < 0 { !(value << 1) } else { value << 1 }) as u64;
    while v >= CONTINUATION as u64 {
        out.push(char::from((0x20 | (v & 0x1f)) as u8 + ASCII_OFFSET));
        v >>= 5;
    }
    out.push(char::from(v as u8 + ASCII_OFFSET));
}

#[inline]
fn scale(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

/// Codec paramétré par la précision (5 ou 6 décimales)
pub struct PolylineCodec {
    precision: u32,
}

impl PolylineCodec {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    fn format_name(&self) -> FormatName {
        if self.precision == 6 {
            FormatName::Polyline6
        } else {
            FormatName::Polyline5
        }
    }
}

impl Codec for PolylineCodec {
    fn name(&self) -> FormatName {
        self.format_name()
    }

    /// Une seule LineString, toujours en WGS84
    fn parse(&self, text: &str) -> ParseResult {
        let trimmed = text.trim();
        let format = self.format_name();
        if trimmed.is_empty() {
            return ParseResult::empty(format);
        }

        let positions = match decode(trimmed, self.precision) {
            Ok(positions) => positions,
            Err(e) => return ParseResult::failure(Some(format), e.to_string()),
        };
        if positions.is_empty() {
            return ParseResult::failure(Some(format), "No coordinates decoded from polyline");
        }

        let mut properties = Properties::new();
        properties.insert("pointCount".to_string(), Value::from(positions.len()));
        let raw = RawFeature {
            id: None,
            geometry: Some(Geometry::LineString(positions)),
            properties,
        };

        ParseResult {
            features: assign_ids(vec![raw]),
            errors: Vec::new(),
            detected_format: Some(format),
            detected_projection: Some(SupportedProjection::Wgs84),
        }
    }

    /// Toutes les coordonnées de toutes les features, concaténées
    fn format(&self, features: &[Feature], _options: &FormatOptions) -> Result<String, GeoError> {
        let mut positions = Vec::new();
        for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.for_each_position(&mut |p| positions.push(*p));
        }
        encode(&positions, self.precision)
    }

    fn detect(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with(['{', '[', '<']) {
            return false;
        }
        if trimmed
            .bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b',' | b';' | b':'))
        {
            return false;
        }
        if !trimmed.bytes().all(|b| (ASCII_OFFSET..=126).contains(&b)) {
            return false;
        }

        match decode(trimmed, self.precision) {
            Ok(positions) => positions.len() >= 2 && positions.iter().all(is_valid_wgs84),
            Err(_) => false,
        }
    }
}
