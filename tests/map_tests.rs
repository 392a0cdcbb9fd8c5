use eframe::egui::{Pos2, Rect};
use emt_bus::emt_map::{hit_test, MapBridge, RouteMap, DEFAULT_CENTER};
use emt_bus::emt_models::{RouteStop, ShapePoint};

fn stop(id: &str, latitude: f64, longitude: f64) -> RouteStop {
    RouteStop {
        stop_id: id.to_string(),
        latitude,
        longitude,
        name: format!("Parada {}", id),
    }
}

fn route(stops: Vec<RouteStop>, shape: Vec<ShapePoint>) -> RouteMap {
    RouteMap {
        line_code: "3".to_string(),
        head_sign: "Aeroport".to_string(),
        stops,
        shape,
    }
}

#[test]
fn title_names_the_line() {
    assert_eq!(route(vec![], vec![]).title(), "Mapa de línea 3");
}

#[test]
fn empty_route_centres_on_palma() {
    assert_eq!(route(vec![], vec![]).center(), DEFAULT_CENTER);
}

#[test]
fn centre_is_mean_of_stops() {
    let map = route(vec![stop("1", 39.0, 2.0), stop("2", 40.0, 3.0)], vec![]);
    let (lat, lon) = map.center();
    assert!((lat - 39.5).abs() < 1e-9);
    assert!((lon - 2.5).abs() < 1e-9);
}

#[test]
fn projected_points_stay_inside_the_view() {
    let map = route(
        vec![stop("1", 39.56, 2.63), stop("2", 39.58, 2.67)],
        vec![
            ShapePoint { latitude: 39.55, longitude: 2.62 },
            ShapePoint { latitude: 39.59, longitude: 2.68 },
        ],
    );
    let screen = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(800.0, 600.0));
    let projection = map.projection();

    let mut points: Vec<Pos2> = map
        .stops
        .iter()
        .map(|s| projection.project(s.latitude, s.longitude, screen))
        .collect();
    points.extend(map.shape.iter().map(|p| projection.project(p.latitude, p.longitude, screen)));

    for p in &points {
        assert!(screen.expand(0.5).contains(*p), "{:?} outside view", p);
    }
    // North is up.
    assert!(points[1].y < points[0].y);
    assert!(points[1].x > points[0].x);
}

#[test]
fn single_stop_projects_to_the_centre() {
    let map = route(vec![stop("1", 39.57, 2.65)], vec![]);
    let screen = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(400.0, 400.0));
    let p = map.projection().project(39.57, 2.65, screen);
    assert!((p.x - 200.0).abs() < 0.5);
    assert!((p.y - 200.0).abs() < 0.5);
}

#[test]
fn hit_test_picks_closest_marker_in_range() {
    let markers = [Pos2::new(10.0, 10.0), Pos2::new(20.0, 10.0), Pos2::new(100.0, 100.0)];
    assert_eq!(hit_test(&markers, Pos2::new(17.0, 10.0), 10.0), Some(1));
    assert_eq!(hit_test(&markers, Pos2::new(11.0, 11.0), 10.0), Some(0));
    assert_eq!(hit_test(&markers, Pos2::new(50.0, 50.0), 10.0), None);
    assert_eq!(hit_test(&[], Pos2::new(0.0, 0.0), 10.0), None);
}

#[test]
fn bridge_delivers_stop_ids_in_order() {
    let (bridge, receiver) = MapBridge::channel();
    bridge.send_stop("45");
    bridge.clone().send_stop("1021");
    assert_eq!(receiver.try_recv().unwrap(), "45");
    assert_eq!(receiver.try_recv().unwrap(), "1021");
    assert!(receiver.try_recv().is_err());
}

#[test]
fn bridge_ignores_closed_host() {
    let (bridge, receiver) = MapBridge::channel();
    drop(receiver);
    bridge.send_stop("45");
}
