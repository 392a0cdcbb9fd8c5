// Data model and application model for the EMT Palma bus client
// API base: https://www.emtpalma.cat/maas/api/v1/agency
//
// Endpoints:
// - Lines:        GET /lines/
// - Arrivals:     GET /stops/{id}/timestr
// - Sublines:     GET /lines/{lineId}/sublines
// - Directions:   GET /lines/directions-subline?subLineId=
// - Route stops:  GET /lines/{lineId}/stops?tripId=&isLine=0&isLineNearStop=0&both=1
// - Route shape:  GET /lines/{lineId}/shape?tripId=

use crate::emt_api::{EmtClient, HttpTransport, Transport};
use crate::emt_format;
use chrono::Utc;
use chrono_tz::Tz;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EmtError {
    /// Malformed identifier supplied by the caller, detected before any request.
    InvalidInput(String),
    NotFound(String),
    Unauthorized,
    RequestFailed(String),
    UnexpectedFormat(String),
    NoData(String),
    Credential(String),
}

impl std::fmt::Display for EmtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmtError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            EmtError::NotFound(e) => write!(f, "Not found: {}", e),
            EmtError::Unauthorized => write!(f, "Invalid or expired token (HTTP 401)"),
            EmtError::RequestFailed(e) => write!(f, "Request failed: {}", e),
            EmtError::UnexpectedFormat(e) => write!(f, "Unexpected format returned by server: {}", e),
            EmtError::NoData(e) => write!(f, "No data: {}", e),
            EmtError::Credential(e) => write!(f, "Token error: {}", e),
        }
    }
}

impl std::error::Error for EmtError {}

pub type Result<T> = std::result::Result<T, EmtError>;

// ============================================================================
// Loosely typed JSON scalars
// ============================================================================

/// A JSON field the server sends either as a string or as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Other(serde_json::Value),
}

impl Scalar {
    /// Non-empty textual form. Empty strings count as missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Text(s) if !s.is_empty() => Some(s.clone()),
            Scalar::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Number(n) => n.as_f64()?,
            Scalar::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// First present, non-empty text among `candidates`.
pub fn first_text(candidates: &[&Option<Scalar>]) -> Option<String> {
    candidates
        .iter()
        .find_map(|c| c.as_ref().and_then(Scalar::as_text))
}

// ============================================================================
// Raw endpoint records
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    pub code: Option<Scalar>,
    pub short_name: Option<Scalar>,
    pub name: Option<Scalar>,
    pub color: Option<Scalar>,
    pub route_color: Option<Scalar>,
    pub id: Option<Scalar>,
    pub route_gtfs_id: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArrivalEntry {
    pub line_code: Option<Scalar>,
    #[serde(default)]
    pub vehicles: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVehicle {
    pub destination: Option<Scalar>,
    pub seconds: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    pub stop_code: Option<Scalar>,
    pub stop_gtfs_id: Option<Scalar>,
    pub id: Option<Scalar>,
    pub stop_name: Option<Scalar>,
    pub stop_desc: Option<Scalar>,
    pub stop_lat: Option<Scalar>,
    pub stop_lon: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawShapePoint {
    pub latitude: Option<Scalar>,
    pub longitude: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubline {
    pub sub_line_id: Option<Scalar>,
    pub long_name: Option<Scalar>,
    pub external_code: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDirection {
    pub trip_id: Option<Scalar>,
    pub head_sign: Option<Scalar>,
    pub direction_id: Option<Scalar>,
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    /// Line code as shown to riders ("3", "A1").
    pub code: String,
    pub name: String,
    /// Hex color with a leading '#', when the server provides one.
    pub color: Option<String>,
    /// Identifier used for drill-down requests.
    pub id: Option<String>,
}

impl Line {
    pub const LIST_FALLBACK_COLOR: &'static str = "#999999";

    pub fn from_raw(raw: &RawLine) -> Self {
        Line {
            code: first_text(&[&raw.code, &raw.short_name]).unwrap_or_else(|| "?".to_string()),
            name: first_text(&[&raw.name]).unwrap_or_default(),
            color: Self::resolve_color(raw),
            id: first_text(&[&raw.route_gtfs_id, &raw.id]),
        }
    }

    /// `color` when already '#'-prefixed, else '#' + `routeColor`, else the
    /// bare `color` given a '#'.
    fn resolve_color(raw: &RawLine) -> Option<String> {
        let color = first_text(&[&raw.color]);
        if let Some(c) = color.as_ref().filter(|c| c.starts_with('#')) {
            return Some(c.clone());
        }
        if let Some(rc) = first_text(&[&raw.route_color]) {
            return Some(format!("#{}", rc.trim_start_matches('#')));
        }
        color
            .filter(|c| c.chars().all(|ch| ch.is_ascii_hexdigit()))
            .map(|c| format!("#{}", c))
    }

    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or(Self::LIST_FALLBACK_COLOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subline {
    pub sub_line_id: String,
    pub long_name: String,
    pub external_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Direction {
    pub trip_id: String,
    pub head_sign: String,
    pub direction_id: String,
}

/// One vehicle due at a stop, as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArrival {
    pub line_code: String,
    pub destination: String,
    pub eta_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedArrival {
    pub line: String,
    pub destination: String,
    pub eta: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalBundle {
    pub timestamp: String,
    pub data: Vec<FormattedArrival>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub stop_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapePoint {
    pub latitude: f64,
    pub longitude: f64,
}

// ============================================================================
// Line color table
// ============================================================================

/// Code → color table, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineColors {
    entries: Vec<(String, String)>,
}

impl LineColors {
    pub const TABLE_FALLBACK_COLOR: &'static str = "#aaaaaa";
    pub const ARRIVAL_FALLBACK_COLOR: &'static str = "#6b7280";

    pub fn from_lines(lines: &[Line]) -> Self {
        let mut colors = LineColors::default();
        for line in lines.iter().filter(|l| l.code != "?") {
            let color = line
                .color
                .clone()
                .unwrap_or_else(|| Self::TABLE_FALLBACK_COLOR.to_string());
            colors.insert(&line.code, &color);
        }
        colors
    }

    /// Later inserts for the same code replace the color but keep the
    /// original scan position.
    pub fn insert(&mut self, code: &str, color: &str) {
        match self.entries.iter_mut().find(|(c, _)| c == code) {
            Some(entry) => entry.1 = color.to_string(),
            None => self.entries.push((code.to_string(), color.to_string())),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, color)| color.as_str())
    }

    /// Color of the first code that normalizes like `line_code`.
    pub fn resolve(&self, line_code: &str) -> &str {
        let wanted = emt_format::normalize_line_code(line_code);
        self.entries
            .iter()
            .find(|(code, _)| emt_format::normalize_line_code(code) == wanted)
            .map(|(_, color)| color.as_str())
            .unwrap_or(Self::ARRIVAL_FALLBACK_COLOR)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for LineColors {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut colors = LineColors::default();
        for (code, color) in iter {
            colors.insert(code, color);
        }
        colors
    }
}

// ============================================================================
// Recently queried stops
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecentStops {
    stops: VecDeque<String>,
    capacity: usize,
}

impl Default for RecentStops {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl RecentStops {
    pub const DEFAULT_CAPACITY: usize = 6;

    pub fn with_capacity(capacity: usize) -> Self {
        RecentStops {
            stops: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Moves `stop_id` to the front, dropping the oldest entry when full.
    pub fn push(&mut self, stop_id: &str) {
        self.stops.retain(|s| s != stop_id);
        self.stops.push_front(stop_id.to_string());
        self.stops.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

// ============================================================================
// Main Implementation
// ============================================================================

/// Client plus the color table captured at startup.
pub struct EmtModels<T: Transport = HttpTransport> {
    client: Arc<EmtClient<T>>,
    colors: Arc<LineColors>,
    timezone: Tz,
}

impl<T: Transport> Clone for EmtModels<T> {
    fn clone(&self) -> Self {
        EmtModels {
            client: Arc::clone(&self.client),
            colors: Arc::clone(&self.colors),
            timezone: self.timezone,
        }
    }
}

impl<T: Transport> EmtModels<T> {
    /// Loads the color table once. A failure leaves it empty so every
    /// arrival falls back to the default color.
    pub fn initialize(client: EmtClient<T>, timezone: Tz) -> Self {
        let colors = match client.fetch_line_colors() {
            Ok(colors) => {
                info!("loaded {} line colors", colors.len());
                colors
            }
            Err(e) => {
                warn!("could not load line colors ({}), continuing with default colors", e);
                LineColors::default()
            }
        };
        Self::with_colors(client, colors, timezone)
    }

    pub fn with_colors(client: EmtClient<T>, colors: LineColors, timezone: Tz) -> Self {
        EmtModels {
            client: Arc::new(client),
            colors: Arc::new(colors),
            timezone,
        }
    }

    pub fn client(&self) -> &EmtClient<T> {
        &self.client
    }

    pub fn colors(&self) -> &LineColors {
        &self.colors
    }

    pub fn fetch_arrivals(&self, stop_id: &str) -> Result<ArrivalBundle> {
        let arrivals = self.client.fetch_arrivals(stop_id)?;
        let now = Utc::now().with_timezone(&self.timezone);
        emt_format::format_arrivals(&arrivals, &self.colors, &now)
    }

    pub fn fetch_lines(&self) -> Result<Vec<Line>> {
        self.client.fetch_lines()
    }

    pub fn fetch_sublines(&self, line_id: &str) -> Result<Vec<Subline>> {
        let raw = self.client.fetch_sublines(line_id)?;
        Ok(emt_format::extract_sublines(&raw))
    }

    pub fn fetch_directions(&self, subline_id: &str) -> Result<Vec<Direction>> {
        let raw = self.client.fetch_directions(subline_id)?;
        Ok(emt_format::extract_directions(&raw))
    }

    pub fn fetch_route_stops(&self, line_id: &str, trip_id: &str) -> Result<Vec<RouteStop>> {
        let raw = self.client.fetch_route_stops(line_id, trip_id)?;
        Ok(emt_format::extract_stops(&raw))
    }

    pub fn fetch_route_shape(&self, line_id: &str, trip_id: &str) -> Result<Vec<ShapePoint>> {
        let raw = self.client.fetch_route_shape(line_id, trip_id)?;
        Ok(emt_format::extract_shape(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_stops_moves_repeat_to_front() {
        let mut recent = RecentStops::default();
        recent.push("1");
        recent.push("2");
        recent.push("1");
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn recent_stops_keeps_six() {
        let mut recent = RecentStops::default();
        for stop in ["1", "2", "3", "4", "5", "6", "7"] {
            recent.push(stop);
        }
        assert_eq!(recent.len(), 6);
        assert_eq!(recent.iter().next(), Some("7"));
        assert!(!recent.iter().any(|s| s == "1"));
    }

    #[test]
    fn scalar_text_and_number() {
        let v: Scalar = serde_json::from_value(serde_json::json!(42)).unwrap();
        assert_eq!(v.as_text().as_deref(), Some("42"));
        let v: Scalar = serde_json::from_value(serde_json::json!("")).unwrap();
        assert_eq!(v.as_text(), None);
        let v: Scalar = serde_json::from_value(serde_json::json!(" 39.5 ")).unwrap();
        assert_eq!(v.as_f64(), Some(39.5));
        let v: Scalar = serde_json::from_value(serde_json::json!({"a": 1})).unwrap();
        assert_eq!(v.as_f64(), None);
    }

    #[test]
    fn line_color_rules() {
        let raw: RawLine = serde_json::from_value(serde_json::json!({
            "shortName": "A1", "color": "ff0000", "routeColor": "00ff00"
        }))
        .unwrap();
        let line = Line::from_raw(&raw);
        assert_eq!(line.code, "A1");
        assert_eq!(line.color.as_deref(), Some("#00ff00"));

        let raw: RawLine = serde_json::from_value(serde_json::json!({"code": 3})).unwrap();
        let line = Line::from_raw(&raw);
        assert_eq!(line.code, "3");
        assert_eq!(line.display_color(), "#999999");
    }

    #[test]
    fn color_table_replaces_duplicate_codes() {
        let mut colors = LineColors::default();
        colors.insert("3", "#111111");
        colors.insert("3", "#222222");
        assert_eq!(colors.len(), 1);
        assert_eq!(colors.get("3"), Some("#222222"));
    }
}
