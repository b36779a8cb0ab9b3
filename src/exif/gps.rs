//! GPS IFD conversion to decimal coordinates

use super::ifd::GpsRaw;
use serde::Serialize;

/// GPS coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// Convert raw GPS IFD rationals to a decimal position.
///
/// Incomplete or malformed DMS triples yield None ("no GPS"), never an
/// error.
pub(crate) fn decimal_position(raw: &GpsRaw) -> Option<GpsPosition> {
    let latitude = dms_to_decimal(raw.latitude.as_deref()?, raw.latitude_ref.as_deref()?)?;
    let longitude = dms_to_decimal(raw.longitude.as_deref()?, raw.longitude_ref.as_deref()?)?;

    let altitude = raw
        .altitude
        .and_then(|(num, den)| (den != 0).then(|| num as f64 / den as f64));

    Some(GpsPosition {
        latitude,
        longitude,
        altitude,
    })
}

fn dms_to_decimal(dms: &[(u32, u32)], reference: &str) -> Option<f64> {
    if dms.len() < 3 {
        return None;
    }
    let component = |&(num, den): &(u32, u32)| -> Option<f64> {
        (den != 0).then(|| num as f64 / den as f64)
    };
    let degrees = component(&dms[0])?;
    let minutes = component(&dms[1])?;
    let seconds = component(&dms[2])?;

    let mut decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if matches!(reference, "S" | "W") {
        decimal = -decimal;
    }
    Some(decimal)
}
