// Normalization and view-model building for EMT responses
use crate::emt_models::{
    first_text, ArrivalBundle, Direction, EmtError, FormattedArrival, LineColors, RawArrival,
    RawDirection, RawShapePoint, RawStop, RawSubline, Result, RouteStop, ShapePoint, Subline,
};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ============================================================================
// Line codes
// ============================================================================

/// Canonical form of a line code so "03", "3" and "a1"/"A1" compare equal.
///
/// Letter-prefixed codes are uppercased. Anything else keeps only its digits,
/// rendered without leading zeros; a code with no digits is returned as is.
pub fn normalize_line_code(code: &str) -> String {
    let Some(first) = code.chars().next() else {
        return String::new();
    };

    if first.is_alphabetic() {
        return code.to_uppercase();
    }

    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return code.to_string();
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Arrivals
// ============================================================================

/// Whole minutes until arrival, rounded half away from zero and clamped at 0.
pub fn eta_minutes(seconds: f64) -> i64 {
    (seconds / 60.0).round().max(0.0) as i64
}

pub fn format_eta(seconds: f64) -> String {
    format!("{} min", eta_minutes(seconds))
}

pub fn format_arrival(arrival: &RawArrival, colors: &LineColors) -> FormattedArrival {
    FormattedArrival {
        line: arrival.line_code.clone(),
        destination: arrival.destination.clone(),
        eta: format_eta(arrival.eta_seconds),
        color: colors.resolve(&arrival.line_code).to_string(),
    }
}

/// Display bundle for a stop, keeping server order. An empty list is an
/// error so callers can tell it apart from a rendered result.
pub fn format_arrivals(
    arrivals: &[RawArrival],
    colors: &LineColors,
    now: &DateTime<Tz>,
) -> Result<ArrivalBundle> {
    if arrivals.is_empty() {
        return Err(EmtError::NoData(
            "No arrivals available for this stop.".to_string(),
        ));
    }

    Ok(ArrivalBundle {
        timestamp: now.format("%H:%M:%S").to_string(),
        data: arrivals
            .iter()
            .map(|arrival| format_arrival(arrival, colors))
            .collect(),
    })
}

// ============================================================================
// Stops, shapes, sublines and directions
// ============================================================================

const STOP_KEYS: &[&str] = &["stops", "data"];
const SHAPE_KEYS: &[&str] = &["shape", "points", "data"];
const SUBLINE_KEYS: &[&str] = &["sublines", "subLines", "data"];
const DIRECTION_KEYS: &[&str] = &["directions", "data"];

/// Array elements of `value`, or of the first `keys` entry holding an array.
fn records<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn decode_records<R: DeserializeOwned>(value: &Value, keys: &[&str]) -> Vec<R> {
    records(value, keys)
        .iter()
        .filter_map(|record| serde_json::from_value(record.clone()).ok())
        .collect()
}

pub fn stop_from_raw(raw: &RawStop) -> Option<RouteStop> {
    let latitude = raw.stop_lat.as_ref()?.as_f64()?;
    let longitude = raw.stop_lon.as_ref()?.as_f64()?;
    let stop_id = first_text(&[&raw.stop_code, &raw.stop_gtfs_id, &raw.id]).unwrap_or_default();
    let name = first_text(&[&raw.stop_name, &raw.stop_desc]).unwrap_or_else(|| stop_id.clone());

    Some(RouteStop {
        stop_id,
        latitude,
        longitude,
        name,
    })
}

/// Route stops with usable coordinates, in input order.
pub fn extract_stops(value: &Value) -> Vec<RouteStop> {
    decode_records::<RawStop>(value, STOP_KEYS)
        .iter()
        .filter_map(stop_from_raw)
        .collect()
}

pub fn extract_shape(value: &Value) -> Vec<ShapePoint> {
    decode_records::<RawShapePoint>(value, SHAPE_KEYS)
        .iter()
        .filter_map(|raw| {
            Some(ShapePoint {
                latitude: raw.latitude.as_ref()?.as_f64()?,
                longitude: raw.longitude.as_ref()?.as_f64()?,
            })
        })
        .collect()
}

pub fn extract_sublines(value: &Value) -> Vec<Subline> {
    decode_records::<RawSubline>(value, SUBLINE_KEYS)
        .iter()
        .filter_map(|raw| {
            Some(Subline {
                sub_line_id: first_text(&[&raw.sub_line_id])?,
                long_name: first_text(&[&raw.long_name]).unwrap_or_default(),
                external_code: first_text(&[&raw.external_code]).unwrap_or_default(),
            })
        })
        .collect()
}

pub fn extract_directions(value: &Value) -> Vec<Direction> {
    decode_records::<RawDirection>(value, DIRECTION_KEYS)
        .iter()
        .filter_map(|raw| {
            Some(Direction {
                trip_id: first_text(&[&raw.trip_id])?,
                head_sign: first_text(&[&raw.head_sign]).unwrap_or_default(),
                direction_id: first_text(&[&raw.direction_id]).unwrap_or_default(),
            })
        })
        .collect()
}
