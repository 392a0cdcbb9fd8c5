// Route map window: shape polyline, stop markers and the stop bridge
use crate::emt_models::{RouteStop, ShapePoint};
use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use geo::{BoundingRect, Centroid};
use geo_types::{Coord, LineString, MultiPoint, Point};
use log::debug;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Palma city centre, used when a trip has no stops.
pub const DEFAULT_CENTER: (f64, f64) = (39.57, 2.65);

const MARKER_RADIUS: f32 = 6.0;
const HIT_RADIUS: f32 = 10.0;

// ============================================================================
// Bridge
// ============================================================================

/// One-way channel from map windows back to the host window.
#[derive(Clone)]
pub struct MapBridge {
    sender: Sender<String>,
}

impl MapBridge {
    pub fn channel() -> (Self, Receiver<String>) {
        let (sender, receiver) = channel();
        (MapBridge { sender }, receiver)
    }

    /// Fire and forget: nothing happens if the host is gone.
    pub fn send_stop(&self, stop_id: &str) {
        if self.sender.send(stop_id.to_string()).is_err() {
            debug!("map bridge closed, dropping stop {}", stop_id);
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RouteMap {
    pub line_code: String,
    pub head_sign: String,
    pub stops: Vec<RouteStop>,
    pub shape: Vec<ShapePoint>,
}

impl RouteMap {
    pub fn title(&self) -> String {
        format!("Mapa de línea {}", self.line_code)
    }

    fn stop_points(&self) -> MultiPoint<f64> {
        self.stops
            .iter()
            .map(|s| Point::new(s.longitude, s.latitude))
            .collect::<Vec<_>>()
            .into()
    }

    fn shape_line(&self) -> LineString<f64> {
        self.shape
            .iter()
            .map(|p| Coord { x: p.longitude, y: p.latitude })
            .collect::<Vec<_>>()
            .into()
    }

    /// Mean stop position as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        self.stop_points()
            .centroid()
            .map(|c| (c.y(), c.x()))
            .unwrap_or(DEFAULT_CENTER)
    }

    pub fn projection(&self) -> Projection {
        let stops = self.stop_points().bounding_rect();
        let shape = self.shape_line().bounding_rect();

        let bounds = match (stops, shape) {
            (Some(a), Some(b)) => Some(geo_types::Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )),
            (a, b) => a.or(b),
        };

        match bounds {
            Some(rect) => Projection::new(rect.min(), rect.max()),
            None => {
                let (lat, lon) = self.center();
                let c = Coord { x: lon, y: lat };
                Projection::new(c, c)
            }
        }
    }
}

/// Equirectangular fit of a lat/lon box into a screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    min: Coord<f64>,
    max: Coord<f64>,
}

impl Projection {
    /// Smallest span in degrees, so one stop still gets a visible area.
    const MIN_SPAN: f64 = 0.005;

    pub fn new(min: Coord<f64>, max: Coord<f64>) -> Self {
        let mid = Coord { x: (min.x + max.x) / 2.0, y: (min.y + max.y) / 2.0 };
        let half_x = ((max.x - min.x) / 2.0).max(Self::MIN_SPAN / 2.0);
        let half_y = ((max.y - min.y) / 2.0).max(Self::MIN_SPAN / 2.0);
        Projection {
            min: Coord { x: mid.x - half_x, y: mid.y - half_y },
            max: Coord { x: mid.x + half_x, y: mid.y + half_y },
        }
    }

    pub fn project(&self, latitude: f64, longitude: f64, screen: Rect) -> Pos2 {
        // Longitude degrees shrink with latitude.
        let mid_lat = ((self.min.y + self.max.y) / 2.0).to_radians();
        let span_x = (self.max.x - self.min.x) * mid_lat.cos();
        let span_y = self.max.y - self.min.y;

        let scale = (screen.width() as f64 / span_x).min(screen.height() as f64 / span_y);
        let used = Vec2::new((span_x * scale) as f32, (span_y * scale) as f32);
        let origin = screen.center() - used / 2.0;

        let x = (longitude - self.min.x) * mid_lat.cos() * scale;
        let y = (self.max.y - latitude) * scale;
        Pos2::new(origin.x + x as f32, origin.y + y as f32)
    }
}

/// Index of the marker closest to `pointer`, if within `radius`.
pub fn hit_test(markers: &[Pos2], pointer: Pos2, radius: f32) -> Option<usize> {
    markers
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.distance(pointer)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

// ============================================================================
// Window
// ============================================================================

pub struct MapWindow {
    id: egui::Id,
    map: RouteMap,
    color: Color32,
    projection: Projection,
    selected: Option<usize>,
    pub open: bool,
}

impl MapWindow {
    pub fn new(serial: u64, map: RouteMap, color: Color32) -> Self {
        let projection = map.projection();
        MapWindow {
            id: egui::Id::new(("route_map", serial)),
            map,
            color,
            projection,
            selected: None,
            open: true,
        }
    }

    pub fn map(&self) -> &RouteMap {
        &self.map
    }

    pub fn show(&mut self, ctx: &egui::Context, bridge: &MapBridge) {
        let mut open = self.open;
        egui::Window::new(self.map.title())
            .id(self.id)
            .open(&mut open)
            .default_size([800.0, 650.0])
            .show(ctx, |ui| self.contents(ui, bridge));
        self.open = open;
    }

    fn contents(&mut self, ui: &mut Ui, bridge: &MapBridge) {
        ui.label(format!("→ {}  ({} paradas)", self.map.head_sign, self.map.stops.len()));

        let size = Vec2::new(ui.available_width(), (ui.available_height() - 60.0).max(240.0));
        let (response, painter) = ui.allocate_painter(size, Sense::click());
        let screen = response.rect;

        painter.rect_filled(screen, 4.0, Color32::from_rgb(235, 238, 242));

        let shape: Vec<Pos2> = self
            .map
            .shape
            .iter()
            .map(|p| self.projection.project(p.latitude, p.longitude, screen))
            .collect();
        if shape.len() > 1 {
            painter.add(egui::Shape::line(shape, Stroke::new(3.0, self.color)));
        }

        let markers: Vec<Pos2> = self
            .map
            .stops
            .iter()
            .map(|s| self.projection.project(s.latitude, s.longitude, screen))
            .collect();

        let hovered = response
            .hover_pos()
            .and_then(|pos| hit_test(&markers, pos, HIT_RADIUS));

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.selected = hit_test(&markers, pos, HIT_RADIUS);
            }
        }

        for (i, pos) in markers.iter().enumerate() {
            let highlighted = Some(i) == hovered || Some(i) == self.selected;
            let radius = if highlighted { MARKER_RADIUS + 2.0 } else { MARKER_RADIUS };
            painter.circle(*pos, radius, Color32::from_rgb(214, 40, 40), Stroke::new(1.5, Color32::WHITE));
        }

        if let Some(stop) = hovered.and_then(|i| self.map.stops.get(i)) {
            ui.label(format!("{} - {}", stop.stop_id, stop.name));
        } else {
            ui.label(" ");
        }

        if let Some(stop) = self.selected.and_then(|i| self.map.stops.get(i)) {
            ui.horizontal(|ui| {
                ui.strong(&stop.name);
                if ui.button(format!("Consultar parada {}", stop.stop_id)).clicked() {
                    bridge.send_stop(&stop.stop_id);
                }
            });
        }
    }
}
