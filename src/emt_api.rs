// HTTP client for the EMT Palma MAAS API
use crate::emt_config::Settings;
use crate::emt_credential::Credential;
use crate::emt_models::{
    EmtError, Line, LineColors, RawArrival, RawArrivalEntry, RawLine, RawVehicle, Result,
};
use log::debug;
use reqwest::blocking;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// Transport
// ============================================================================

/// A GET against the API base: `path` is appended to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        ApiRequest {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

pub trait Transport: Send + Sync {
    fn get(&self, request: &ApiRequest) -> Result<ApiReply>;
}

pub struct HttpTransport {
    client: blocking::Client,
    base_url: String,
}

impl HttpTransport {
    pub const ACCEPT: &'static str = "application/json, text/plain, */*";
    pub const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

    pub fn new(base_url: &str, credential: &Credential, timeout: Duration) -> Result<Self> {
        let client = blocking::Client::builder()
            .timeout(timeout)
            .default_headers(Self::default_headers(credential)?)
            .build()
            .map_err(|e| EmtError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn default_headers(credential: &Credential) -> Result<HeaderMap> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.token()))
            .map_err(|_| EmtError::Credential("token contains invalid header characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(Self::ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(Self::USER_AGENT));
        Ok(headers)
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &ApiRequest) -> Result<ApiReply> {
        let url = format!("{}{}", self.base_url, request.path);

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() { "request timed out" } else { "check your internet connection" };
                EmtError::RequestFailed(format!("GET {} failed: {} ({})", request.path, e, reason))
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| EmtError::RequestFailed(format!("Failed to read response: {}", e)))?;

        Ok(ApiReply { status, body })
    }
}

// ============================================================================
// Response shapes
// ============================================================================

/// The lines endpoint has answered both as a bare array and wrapped in
/// `{"lines": [...]}` across versions.
#[derive(Deserialize)]
#[serde(untagged)]
enum LinesPayload {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        lines: Vec<Value>,
    },
}

impl LinesPayload {
    fn into_records(self) -> Vec<Value> {
        match self {
            LinesPayload::Bare(lines) | LinesPayload::Wrapped { lines } => lines,
        }
    }
}

// ============================================================================
// Main Implementation
// ============================================================================

pub struct EmtClient<T: Transport = HttpTransport> {
    transport: T,
}

impl EmtClient<HttpTransport> {
    pub fn connect(settings: &Settings, credential: &Credential) -> Result<Self> {
        let transport = HttpTransport::new(&settings.base_url, credential, settings.timeout)?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: Transport> EmtClient<T> {
    pub fn with_transport(transport: T) -> Self {
        EmtClient { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn get_json(&self, request: ApiRequest) -> Result<Value> {
        let reply = self.transport.get(&request)?;
        debug!("GET {} -> {}", request.path, reply.status);

        match reply.status {
            200..=299 => {}
            404 => return Err(EmtError::NotFound(format!("{} returned 404", request.path))),
            401 => return Err(EmtError::Unauthorized),
            status => {
                return Err(EmtError::RequestFailed(format!(
                    "{} returned HTTP {}",
                    request.path, status
                )));
            }
        }

        serde_json::from_str(&reply.body)
            .map_err(|e| EmtError::UnexpectedFormat(format!("invalid JSON from {}: {}", request.path, e)))
    }

    fn check_numeric(stop_id: &str) -> Result<()> {
        if stop_id.is_empty() || !stop_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(EmtError::InvalidInput("Stop number must be numeric.".to_string()));
        }
        Ok(())
    }

    fn check_path_segment(name: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() || value.contains('/') {
            return Err(EmtError::InvalidInput(format!("{} '{}' is not a valid identifier", name, value)));
        }
        Ok(())
    }

    pub fn fetch_lines(&self) -> Result<Vec<Line>> {
        let json = self.get_json(ApiRequest::new("/lines/"))?;

        let payload: LinesPayload = serde_json::from_value(json)
            .map_err(|_| EmtError::UnexpectedFormat("line list is neither an array nor an object with 'lines'".to_string()))?;

        Ok(payload
            .into_records()
            .into_iter()
            .filter_map(|record| serde_json::from_value::<RawLine>(record).ok())
            .map(|raw| Line::from_raw(&raw))
            .collect())
    }

    pub fn fetch_line_colors(&self) -> Result<LineColors> {
        Ok(LineColors::from_lines(&self.fetch_lines()?))
    }

    /// One entry per vehicle due at `stop_id`, in server order.
    pub fn fetch_arrivals(&self, stop_id: &str) -> Result<Vec<RawArrival>> {
        Self::check_numeric(stop_id)?;

        let json = self
            .get_json(ApiRequest::new(format!("/stops/{}/timestr", stop_id)))
            .map_err(|e| match e {
                EmtError::NotFound(_) => EmtError::NotFound(format!("Stop {} not found.", stop_id)),
                other => other,
            })?;

        let Value::Array(entries) = json else {
            return Err(EmtError::UnexpectedFormat("arrivals response is not a list".to_string()));
        };

        let mut arrivals = Vec::new();
        for entry in entries {
            let Ok(entry) = serde_json::from_value::<RawArrivalEntry>(entry) else {
                continue;
            };
            let line_code = entry
                .line_code
                .as_ref()
                .and_then(|c| c.as_text())
                .unwrap_or_else(|| "?".to_string());

            for vehicle in entry.vehicles {
                let Ok(vehicle) = serde_json::from_value::<RawVehicle>(vehicle) else {
                    continue;
                };
                arrivals.push(RawArrival {
                    line_code: line_code.clone(),
                    destination: vehicle
                        .destination
                        .as_ref()
                        .and_then(|d| d.as_text())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    eta_seconds: vehicle.seconds.as_ref().and_then(|s| s.as_f64()).unwrap_or(0.0),
                });
            }
        }

        Ok(arrivals)
    }

    pub fn fetch_sublines(&self, line_id: &str) -> Result<Value> {
        Self::check_path_segment("line id", line_id)?;
        self.get_json(ApiRequest::new(format!("/lines/{}/sublines", line_id)))
    }

    pub fn fetch_directions(&self, subline_id: &str) -> Result<Value> {
        self.get_json(ApiRequest::new("/lines/directions-subline").param("subLineId", subline_id))
    }

    pub fn fetch_route_stops(&self, line_id: &str, trip_id: &str) -> Result<Value> {
        Self::check_path_segment("line id", line_id)?;
        self.get_json(
            ApiRequest::new(format!("/lines/{}/stops", line_id))
                .param("tripId", trip_id)
                .param("isLine", 0)
                .param("isLineNearStop", 0)
                .param("both", 1),
        )
    }

    pub fn fetch_route_shape(&self, line_id: &str, trip_id: &str) -> Result<Value> {
        Self::check_path_segment("line id", line_id)?;
        self.get_json(ApiRequest::new(format!("/lines/{}/shape", line_id)).param("tripId", trip_id))
    }
}
