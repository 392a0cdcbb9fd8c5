// GUI implementation for the EMT Palma bus client using egui/eframe
use crate::emt_controllers::EmtControllers;
use crate::emt_map::{MapBridge, MapWindow, RouteMap};
use crate::emt_models::{
    ArrivalBundle, Direction, EmtModels, Line, RecentStops, Result, Subline,
};
use eframe::egui;
use egui::{Color32, RichText, Ui};
use log::info;
use poll_promise::Promise;
use std::sync::mpsc::Receiver;
use std::time::Duration;

// ============================================================================
// Application State
// ============================================================================

#[derive(PartialEq, Clone, Copy)]
enum AppTab {
    StopArrivals,
    LineBrowser,
}

pub struct EmtApp {
    model: EmtModels,
    current_tab: AppTab,

    // Stop arrivals tab
    stop_input: String,
    arrivals: Option<(String, ArrivalBundle)>,
    recent: RecentStops,
    arrivals_promise: Option<(String, Promise<Result<ArrivalBundle>>)>,

    // Line browser tab
    lines: Vec<Line>,
    lines_promise: Option<Promise<Result<Vec<Line>>>>,
    selected_line: Option<usize>,
    sublines: Vec<Subline>,
    sublines_promise: Option<Promise<Result<Vec<Subline>>>>,
    selected_subline: Option<usize>,
    directions: Vec<Direction>,
    directions_promise: Option<Promise<Result<Vec<Direction>>>>,
    route_promise: Option<Promise<Result<RouteMap>>>,

    // Map windows and the channel they report clicked stops on
    maps: Vec<MapWindow>,
    map_serial: u64,
    bridge: MapBridge,
    bridge_rx: Receiver<String>,

    error_message: Option<String>,
}

impl EmtApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, model: EmtModels) -> Self {
        let (bridge, bridge_rx) = MapBridge::channel();
        let mut app = EmtApp {
            model,
            current_tab: AppTab::StopArrivals,
            stop_input: String::new(),
            arrivals: None,
            recent: RecentStops::default(),
            arrivals_promise: None,
            lines: Vec::new(),
            lines_promise: None,
            selected_line: None,
            sublines: Vec::new(),
            sublines_promise: None,
            selected_subline: None,
            directions: Vec::new(),
            directions_promise: None,
            route_promise: None,
            maps: Vec::new(),
            map_serial: 0,
            bridge,
            bridge_rx,
            error_message: None,
        };

        app.load_lines();
        app
    }

    fn is_busy(&self) -> bool {
        self.arrivals_promise.is_some()
            || self.lines_promise.is_some()
            || self.sublines_promise.is_some()
            || self.directions_promise.is_some()
            || self.route_promise.is_some()
    }

    fn load_lines(&mut self) {
        let model = self.model.clone();
        self.lines_promise = Some(Promise::spawn_thread("lines", move || model.fetch_lines()));
    }

    fn check_stop(&mut self) {
        let stop = self.stop_input.trim().to_string();
        if stop.is_empty() {
            self.error_message = Some("Enter stop number.".to_string());
            return;
        }

        let model = self.model.clone();
        let stop_id = stop.clone();
        let promise = Promise::spawn_thread("arrivals", move || model.fetch_arrivals(&stop_id));
        self.arrivals_promise = Some((stop, promise));
    }

    fn open_line(&mut self, index: usize) {
        self.selected_line = Some(index);
        self.selected_subline = None;
        self.sublines.clear();
        self.directions.clear();

        let Some(line_id) = self.lines.get(index).and_then(|l| l.id.clone()) else {
            self.error_message = Some("This line has no identifier.".to_string());
            return;
        };

        let model = self.model.clone();
        self.sublines_promise = Some(Promise::spawn_thread("sublines", move || {
            model.fetch_sublines(&line_id)
        }));
    }

    fn open_subline(&mut self, index: usize) {
        self.selected_subline = Some(index);
        self.directions.clear();

        let Some(subline_id) = self.sublines.get(index).map(|s| s.sub_line_id.clone()) else {
            return;
        };

        let model = self.model.clone();
        self.directions_promise = Some(Promise::spawn_thread("directions", move || {
            model.fetch_directions(&subline_id)
        }));
    }

    fn open_direction(&mut self, direction: Direction) {
        let Some(line) = self.selected_line.and_then(|i| self.lines.get(i)).cloned() else {
            return;
        };
        let Some(line_id) = line.id.clone() else {
            return;
        };

        let model = self.model.clone();
        self.route_promise = Some(Promise::spawn_thread("route", move || {
            EmtControllers::load_route(
                &model,
                &line.code,
                &line_id,
                &direction.trip_id,
                &direction.head_sign,
            )
        }));
    }

    /// Collects finished background requests.
    fn poll_requests(&mut self) {
        if let Some((stop, promise)) = self.arrivals_promise.take() {
            match promise.try_take() {
                Ok(Ok(bundle)) => {
                    self.recent.push(&stop);
                    self.arrivals = Some((stop, bundle));
                }
                Ok(Err(e)) => self.error_message = Some(e.to_string()),
                Err(promise) => self.arrivals_promise = Some((stop, promise)),
            }
        }

        if let Some(promise) = self.lines_promise.take() {
            match promise.try_take() {
                Ok(Ok(lines)) => {
                    info!("loaded {} lines", lines.len());
                    self.lines = lines;
                }
                Ok(Err(e)) => self.error_message = Some(format!("API Error: {}", e)),
                Err(promise) => self.lines_promise = Some(promise),
            }
        }

        if let Some(promise) = self.sublines_promise.take() {
            match promise.try_take() {
                Ok(Ok(sublines)) => self.sublines = sublines,
                Ok(Err(e)) => self.error_message = Some(format!("Error cargando sublíneas: {}", e)),
                Err(promise) => self.sublines_promise = Some(promise),
            }
        }

        if let Some(promise) = self.directions_promise.take() {
            match promise.try_take() {
                Ok(Ok(directions)) => self.directions = directions,
                Ok(Err(e)) => self.error_message = Some(format!("Error cargando rutas: {}", e)),
                Err(promise) => self.directions_promise = Some(promise),
            }
        }

        if let Some(promise) = self.route_promise.take() {
            match promise.try_take() {
                Ok(Ok(map)) => {
                    let color = self
                        .selected_line
                        .and_then(|i| self.lines.get(i))
                        .map(|l| parse_hex_color(l.display_color()))
                        .unwrap_or(Color32::from_rgb(214, 40, 40));
                    self.map_serial += 1;
                    self.maps.push(MapWindow::new(self.map_serial, map, color));
                }
                Ok(Err(e)) => self.error_message = Some(format!("Error cargando mapa: {}", e)),
                Err(promise) => self.route_promise = Some(promise),
            }
        }
    }

    /// Stops clicked on a map re-run the stop lookup on the first tab.
    fn poll_bridge(&mut self) {
        while let Ok(stop_id) = self.bridge_rx.try_recv() {
            self.current_tab = AppTab::StopArrivals;
            self.stop_input = stop_id;
            self.check_stop();
        }
    }
}

impl eframe::App for EmtApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_requests();
        self.poll_bridge();

        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🚌 EMT Palma");
                ui.separator();
                ui.selectable_value(&mut self.current_tab, AppTab::StopArrivals, "Paso por parada");
                ui.selectable_value(&mut self.current_tab, AppTab::LineBrowser, "Consulta de líneas");
                if self.is_busy() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.spinner();
                    });
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.current_tab {
            AppTab::StopArrivals => self.show_stop_arrivals(ui),
            AppTab::LineBrowser => self.show_line_browser(ui),
        });

        for map in &mut self.maps {
            map.show(ctx, &self.bridge);
        }
        self.maps.retain(|m| m.open);

        if let Some(error) = self.error_message.clone() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.colored_label(Color32::RED, "❌ Error");
                    ui.label(&error);
                    if ui.button("OK").clicked() {
                        self.error_message = None;
                    }
                });
        }
    }
}

// ============================================================================
// View Implementations
// ============================================================================

impl EmtApp {
    fn show_stop_arrivals(&mut self, ui: &mut Ui) {
        ui.heading("Paso por parada");
        ui.separator();

        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label("Parada:");
            let response = ui.text_edit_singleline(&mut self.stop_input);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            if ui.button("Consultar").clicked() {
                submit = true;
            }
        });
        if submit && self.arrivals_promise.is_none() {
            self.check_stop();
        }

        ui.add_space(6.0);
        let mut replay: Option<String> = None;
        if !self.recent.is_empty() {
            ui.label("Recientes:");
            egui::Grid::new("recent_stops").show(ui, |ui| {
                for (i, stop) in self.recent.iter().enumerate() {
                    if ui.button(stop).clicked() {
                        replay = Some(stop.to_string());
                    }
                    if i % 3 == 2 {
                        ui.end_row();
                    }
                }
            });
        }
        if let Some(stop) = replay {
            self.stop_input = stop;
            self.check_stop();
        }

        ui.separator();

        egui::ScrollArea::vertical().id_source("arrivals").show(ui, |ui| {
            match &self.arrivals {
                Some((stop, bundle)) => {
                    ui.strong(format!("Parada {}", stop));
                    ui.add_space(6.0);
                    for arrival in &bundle.data {
                        egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(line_badge(&arrival.line, &arrival.color, Color32::BLACK));
                                ui.label(&arrival.destination);
                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    ui.strong(&arrival.eta);
                                });
                            });
                        });
                    }
                    ui.add_space(6.0);
                    ui.label(format!("Last updated: {}", bundle.timestamp));
                }
                None => {
                    ui.label("Introduce un número de parada.");
                }
            }
        });
    }

    fn show_line_browser(&mut self, ui: &mut Ui) {
        let mut clicked_line = None;
        let mut clicked_subline = None;
        let mut clicked_direction = None;

        ui.columns(2, |columns| {
            columns[0].heading("Líneas");
            columns[0].separator();
            egui::ScrollArea::vertical().id_source("lines").show(&mut columns[0], |ui| {
                if self.lines.is_empty() && self.lines_promise.is_none() {
                    ui.label("No hay líneas disponibles.");
                    if ui.button("Reintentar").clicked() {
                        clicked_line = Some(usize::MAX);
                    }
                }
                for (i, line) in self.lines.iter().enumerate() {
                    let selected = self.selected_line == Some(i);
                    let clicked = egui::Frame::group(ui.style())
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(line_badge(&line.code, line.display_color(), Color32::WHITE));
                                ui.selectable_label(selected, RichText::new(&line.name).strong())
                                    .clicked()
                            })
                            .inner
                        })
                        .inner;
                    if clicked {
                        clicked_line = Some(i);
                    }
                }
            });

            columns[1].heading("Sublíneas y dirección");
            columns[1].separator();
            egui::ScrollArea::vertical().id_source("directions").show(&mut columns[1], |ui| {
                if self.selected_line.is_none() {
                    ui.label("Selecciona una línea.");
                    return;
                }
                if self.sublines.is_empty() && self.sublines_promise.is_none() {
                    ui.strong("No hay rutas disponibles");
                }
                for (i, subline) in self.sublines.iter().enumerate() {
                    let selected = self.selected_subline == Some(i);
                    let text = format!("{} ({})", subline.long_name, subline.external_code);
                    if ui.selectable_label(selected, RichText::new(text).strong()).clicked() {
                        clicked_subline = Some(i);
                    }

                    if selected {
                        let code = self
                            .selected_line
                            .and_then(|l| self.lines.get(l))
                            .map(|l| l.code.as_str())
                            .unwrap_or("?");
                        for direction in &self.directions {
                            egui::Frame::group(ui.style()).show(ui, |ui| {
                                if ui.link(format!("{} → {}", code, direction.head_sign)).clicked() {
                                    clicked_direction = Some(direction.clone());
                                }
                                ui.label(
                                    RichText::new(format!("Dirección {} · viaje {}", direction.direction_id, direction.trip_id))
                                        .small()
                                        .color(Color32::GRAY),
                                );
                            });
                        }
                    }
                }
            });
        });

        match clicked_line {
            Some(usize::MAX) => self.load_lines(),
            Some(i) => self.open_line(i),
            None => {}
        }
        if let Some(i) = clicked_subline {
            self.open_subline(i);
        }
        if let Some(direction) = clicked_direction {
            self.open_direction(direction);
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn line_badge(code: &str, hex: &str, text: Color32) -> RichText {
    RichText::new(format!(" {} ", code))
        .strong()
        .size(16.0)
        .color(text)
        .background_color(parse_hex_color(hex))
}

pub fn parse_hex_color(hex: &str) -> Color32 {
    let hex = hex.trim_start_matches('#');
    if hex.len() == 6 && hex.is_ascii() {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return Color32::from_rgb(r, g, b);
        }
    }
    // Default color if parsing fails
    Color32::from_rgb(100, 100, 100)
}

// ============================================================================
// Public entry point
// ============================================================================

pub fn run_gui(model: EmtModels) -> std::result::Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "EMT Palma",
        options,
        Box::new(|cc| Ok(Box::new(EmtApp::new(cc, model)))),
    )
}
