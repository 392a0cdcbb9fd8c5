use chrono::TimeZone;
use chrono_tz::Europe::Madrid;
use emt_bus::emt_format::{eta_minutes, format_arrival, format_arrivals, format_eta};
use emt_bus::emt_models::{EmtError, LineColors, RawArrival};

fn arrival(line: &str, destination: &str, seconds: f64) -> RawArrival {
    RawArrival {
        line_code: line.to_string(),
        destination: destination.to_string(),
        eta_seconds: seconds,
    }
}

#[test]
fn eta_rounds_to_nearest_minute() {
    assert_eq!(eta_minutes(89.0), 1);
    assert_eq!(eta_minutes(149.0), 2);
    assert_eq!(eta_minutes(125.0), 2);
    assert_eq!(eta_minutes(0.0), 0);
}

#[test]
fn eta_halves_round_away_from_zero() {
    assert_eq!(eta_minutes(90.0), 2);
    assert_eq!(eta_minutes(150.0), 3);
}

#[test]
fn eta_never_negative() {
    assert_eq!(eta_minutes(-30.0), 0);
    assert_eq!(eta_minutes(-600.0), 0);
    assert_eq!(format_eta(-30.0), "0 min");
}

#[test]
fn color_lookup_normalizes_codes() {
    let colors: LineColors = [("3", "#ff0000")].into_iter().collect();
    let formatted = format_arrival(&arrival("03", "Centre", 60.0), &colors);
    assert_eq!(formatted.color, "#ff0000");
    assert_eq!(formatted.line, "03");
}

#[test]
fn unknown_line_gets_fallback_color() {
    let colors: LineColors = [("3", "#ff0000")].into_iter().collect();
    let formatted = format_arrival(&arrival("99", "Somewhere", 60.0), &colors);
    assert_eq!(formatted.color, LineColors::ARRIVAL_FALLBACK_COLOR);
    assert_eq!(formatted.color, "#6b7280");
}

#[test]
fn first_matching_code_wins() {
    let colors: LineColors = [("03", "#111111"), ("3", "#222222")].into_iter().collect();
    assert_eq!(colors.resolve("3"), "#111111");
}

#[test]
fn empty_arrivals_are_no_data() {
    let now = Madrid.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let result = format_arrivals(&[], &LineColors::default(), &now);
    assert!(matches!(result, Err(EmtError::NoData(_))));
}

#[test]
fn bundle_keeps_order_and_stamps_local_time() {
    let now = Madrid.with_ymd_and_hms(2024, 5, 1, 14, 3, 9).unwrap();
    let colors: LineColors = [("3", "#112233"), ("25", "#445566")].into_iter().collect();
    let raw = vec![
        arrival("25", "Aeroport", 600.0),
        arrival("3", "Airport", 125.0),
    ];

    let bundle = format_arrivals(&raw, &colors, &now).unwrap();
    assert_eq!(bundle.timestamp, "14:03:09");
    assert_eq!(bundle.data.len(), 2);
    assert_eq!(bundle.data[0].line, "25");
    assert_eq!(bundle.data[0].eta, "10 min");
    assert_eq!(bundle.data[1].destination, "Airport");
    assert_eq!(bundle.data[1].eta, "2 min");
    assert_eq!(bundle.data[1].color, "#112233");
}

#[test]
fn bundle_serializes_for_json_output() {
    let now = Madrid.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    let bundle = format_arrivals(&[arrival("3", "Airport", 125.0)], &LineColors::default(), &now).unwrap();
    let json = serde_json::to_value(&bundle).unwrap();
    assert_eq!(json["timestamp"], "09:30:00");
    assert_eq!(json["data"][0]["eta"], "2 min");
    assert_eq!(json["data"][0]["color"], "#6b7280");
}
