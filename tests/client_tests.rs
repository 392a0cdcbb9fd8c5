use chrono_tz::Europe::Madrid;
use emt_bus::emt_api::{ApiReply, ApiRequest, EmtClient, Transport};
use emt_bus::emt_models::{EmtError, EmtModels, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Canned replies keyed by request path; records every request it sees.
#[derive(Default)]
struct FakeTransport {
    replies: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    fn reply(mut self, path: &str, status: u16, body: &str) -> Self {
        self.replies.insert(path.to_string(), (status, body.to_string()));
        self
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, request: &ApiRequest) -> Result<ApiReply> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.get(&request.path) {
            Some((status, body)) => Ok(ApiReply {
                status: *status,
                body: body.clone(),
            }),
            None => Err(EmtError::RequestFailed(format!("no route for {}", request.path))),
        }
    }
}

const LINES: &str = r##"[
    {"code": "3", "name": "Son Rapinya", "color": "#112233", "routeGtfsId": "L3"},
    {"shortName": "A1", "name": "Aeroport", "routeColor": "00ff00", "id": 71},
    {"name": "Sense codi"}
]"##;

const ARRIVALS: &str = r#"[
    {"lineCode": "03", "vehicles": [
        {"destination": "Airport", "seconds": 125},
        {"destination": "Airport", "seconds": "600"}
    ]},
    {"lineCode": "A1", "vehicles": [{}]},
    {"vehicles": [{"destination": "Depot", "seconds": 30}]}
]"#;

#[test]
fn non_numeric_stop_makes_no_request() {
    let client = EmtClient::with_transport(FakeTransport::default());
    for stop in ["", "12a", "-1", "1 2"] {
        let result = client.fetch_arrivals(stop);
        assert!(matches!(result, Err(EmtError::InvalidInput(_))), "stop {:?}", stop);
    }
    assert!(client.transport().requests().is_empty());
}

#[test]
fn arrivals_expand_one_row_per_vehicle() {
    let transport = FakeTransport::default().reply("/stops/45/timestr", 200, ARRIVALS);
    let client = EmtClient::with_transport(transport);

    let arrivals = client.fetch_arrivals("45").unwrap();
    assert_eq!(arrivals.len(), 4);
    assert_eq!(arrivals[0].line_code, "03");
    assert_eq!(arrivals[0].eta_seconds, 125.0);
    assert_eq!(arrivals[1].eta_seconds, 600.0);
    assert_eq!(arrivals[2].line_code, "A1");
    assert_eq!(arrivals[2].destination, "Unknown");
    assert_eq!(arrivals[2].eta_seconds, 0.0);
    assert_eq!(arrivals[3].line_code, "?");
}

#[test]
fn missing_stop_is_not_found() {
    let transport = FakeTransport::default().reply("/stops/9999/timestr", 404, "");
    let client = EmtClient::with_transport(transport);
    match client.fetch_arrivals("9999") {
        Err(EmtError::NotFound(message)) => assert_eq!(message, "Stop 9999 not found."),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn rejected_token_is_unauthorized() {
    let transport = FakeTransport::default().reply("/stops/45/timestr", 401, "");
    let client = EmtClient::with_transport(transport);
    assert_eq!(client.fetch_arrivals("45"), Err(EmtError::Unauthorized));
}

#[test]
fn server_errors_are_request_failures() {
    let transport = FakeTransport::default()
        .reply("/stops/45/timestr", 500, "oops")
        .reply("/lines/", 503, "");
    let client = EmtClient::with_transport(transport);
    assert!(matches!(client.fetch_arrivals("45"), Err(EmtError::RequestFailed(_))));
    assert!(matches!(client.fetch_lines(), Err(EmtError::RequestFailed(_))));
}

#[test]
fn non_list_arrivals_are_unexpected_format() {
    let transport = FakeTransport::default()
        .reply("/stops/1/timestr", 200, r#"{"message": "maintenance"}"#)
        .reply("/stops/2/timestr", 200, "<html>");
    let client = EmtClient::with_transport(transport);
    assert!(matches!(client.fetch_arrivals("1"), Err(EmtError::UnexpectedFormat(_))));
    assert!(matches!(client.fetch_arrivals("2"), Err(EmtError::UnexpectedFormat(_))));
}

#[test]
fn lines_from_bare_array() {
    let client = EmtClient::with_transport(FakeTransport::default().reply("/lines/", 200, LINES));
    let lines = client.fetch_lines().unwrap();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].code, "3");
    assert_eq!(lines[0].color.as_deref(), Some("#112233"));
    assert_eq!(lines[0].id.as_deref(), Some("L3"));
    assert_eq!(lines[1].code, "A1");
    assert_eq!(lines[1].color.as_deref(), Some("#00ff00"));
    assert_eq!(lines[1].id.as_deref(), Some("71"));
    assert_eq!(lines[2].code, "?");
    assert_eq!(lines[2].display_color(), "#999999");
}

#[test]
fn lines_from_wrapped_object() {
    let body = format!(r#"{{"lines": {}}}"#, LINES);
    let client = EmtClient::with_transport(FakeTransport::default().reply("/lines/", 200, &body));
    assert_eq!(client.fetch_lines().unwrap().len(), 3);
}

#[test]
fn object_without_lines_is_empty() {
    let client = EmtClient::with_transport(FakeTransport::default().reply("/lines/", 200, r#"{"total": 0}"#));
    assert!(client.fetch_lines().unwrap().is_empty());
}

#[test]
fn line_colors_skip_unknown_codes() {
    let client = EmtClient::with_transport(FakeTransport::default().reply("/lines/", 200, LINES));
    let colors = client.fetch_line_colors().unwrap();
    assert_eq!(colors.len(), 2);
    assert_eq!(colors.get("3"), Some("#112233"));
    assert_eq!(colors.get("A1"), Some("#00ff00"));
    assert_eq!(colors.get("?"), None);
}

#[test]
fn drill_down_paths_and_parameters() {
    let transport = FakeTransport::default()
        .reply("/lines/L3/sublines", 200, "[]")
        .reply("/lines/directions-subline", 200, "[]")
        .reply("/lines/L3/stops", 200, "[]")
        .reply("/lines/L3/shape", 200, "[]");
    let client = EmtClient::with_transport(transport);

    client.fetch_sublines("L3").unwrap();
    client.fetch_directions("301").unwrap();
    client.fetch_route_stops("L3", "T9").unwrap();
    client.fetch_route_shape("L3", "T9").unwrap();

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].query.is_empty());
    assert_eq!(requests[1].query, vec![("subLineId", "301".to_string())]);
    assert_eq!(
        requests[2].query,
        vec![
            ("tripId", "T9".to_string()),
            ("isLine", "0".to_string()),
            ("isLineNearStop", "0".to_string()),
            ("both", "1".to_string()),
        ]
    );
    assert_eq!(requests[3].query, vec![("tripId", "T9".to_string())]);
}

#[test]
fn drill_down_rejects_bad_line_ids() {
    let client = EmtClient::with_transport(FakeTransport::default());
    assert!(matches!(client.fetch_sublines(""), Err(EmtError::InvalidInput(_))));
    assert!(matches!(client.fetch_route_stops("a/b", "T"), Err(EmtError::InvalidInput(_))));
    assert!(client.transport().requests().is_empty());
}

#[test]
fn model_formats_arrivals_with_startup_colors() {
    let transport = FakeTransport::default()
        .reply("/lines/", 200, r##"[{"code": "3", "color": "#112233"}]"##)
        .reply("/stops/45/timestr", 200, r#"[{"lineCode": "3", "vehicles": [{"destination": "Airport", "seconds": 125}]}]"#);
    let model = EmtModels::initialize(EmtClient::with_transport(transport), Madrid);

    let bundle = model.fetch_arrivals("45").unwrap();
    assert_eq!(bundle.data.len(), 1);
    assert_eq!(bundle.data[0].line, "3");
    assert_eq!(bundle.data[0].destination, "Airport");
    assert_eq!(bundle.data[0].eta, "2 min");
    assert_eq!(bundle.data[0].color, "#112233");
    assert_eq!(bundle.timestamp.len(), 8);
}

#[test]
fn model_survives_color_table_failure() {
    let transport = FakeTransport::default()
        .reply("/lines/", 500, "")
        .reply("/stops/45/timestr", 200, r#"[{"lineCode": "3", "vehicles": [{"destination": "Airport", "seconds": 60}]}]"#);
    let model = EmtModels::initialize(EmtClient::with_transport(transport), Madrid);

    assert!(model.colors().is_empty());
    let bundle = model.fetch_arrivals("45").unwrap();
    assert_eq!(bundle.data[0].color, "#6b7280");
}

#[test]
fn model_reports_stops_without_buses() {
    let transport = FakeTransport::default()
        .reply("/lines/", 200, "[]")
        .reply("/stops/45/timestr", 200, "[]");
    let model = EmtModels::initialize(EmtClient::with_transport(transport), Madrid);
    assert!(matches!(model.fetch_arrivals("45"), Err(EmtError::NoData(_))));
}
