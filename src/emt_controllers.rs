// Terminal controllers for the EMT Palma bus client
use crate::emt_api::Transport;
use crate::emt_config::Command;
use crate::emt_map::RouteMap;
use crate::emt_models::{EmtError, EmtModels, Line, RecentStops, Result};
use crate::emt_views::EmtViews;
use log::warn;
use std::io::{self, Write};

pub struct EmtControllers;

impl EmtControllers {
    /// Runs one terminal command. `Gui` is handled by the caller.
    pub fn run<T: Transport>(command: &Command, model: &EmtModels<T>) -> Result<()> {
        match command {
            Command::Gui => Ok(()),
            Command::Arrivals { stop, json } => {
                let bundle = model.fetch_arrivals(stop.trim())?;
                if *json {
                    let text = serde_json::to_string_pretty(&bundle)
                        .map_err(|e| EmtError::UnexpectedFormat(e.to_string()))?;
                    println!("{}", text);
                } else {
                    EmtViews::show_arrivals(stop.trim(), &bundle);
                }
                Ok(())
            }
            Command::Lines => {
                EmtViews::show_lines(&model.fetch_lines()?);
                Ok(())
            }
            Command::Sublines { line_id } => {
                EmtViews::show_sublines(&model.fetch_sublines(line_id)?);
                Ok(())
            }
            Command::Directions { subline_id } => {
                EmtViews::show_directions("", &model.fetch_directions(subline_id)?);
                Ok(())
            }
            Command::Route { line_id, trip_id } => {
                let map = Self::load_route(model, line_id, line_id, trip_id, "")?;
                EmtViews::show_route(&map);
                Ok(())
            }
            Command::Menu => {
                Self::menu(model);
                Ok(())
            }
        }
    }

    /// Stops are required; a missing shape only loses the polyline.
    pub fn load_route<T: Transport>(
        model: &EmtModels<T>,
        line_code: &str,
        line_id: &str,
        trip_id: &str,
        head_sign: &str,
    ) -> Result<RouteMap> {
        let stops = model.fetch_route_stops(line_id, trip_id)?;
        let shape = model.fetch_route_shape(line_id, trip_id).unwrap_or_else(|e| {
            warn!("no shape for line {} trip {} ({})", line_id, trip_id, e);
            Vec::new()
        });

        Ok(RouteMap {
            line_code: line_code.to_string(),
            head_sign: head_sign.to_string(),
            stops,
            shape,
        })
    }

    /// Interactive menu loop
    fn menu<T: Transport>(model: &EmtModels<T>) {
        let mut recent = RecentStops::default();
        let mut lines: Option<Vec<Line>> = None;

        loop {
            EmtViews::show_menu();
            let Some(choice) = Self::read_line() else {
                EmtViews::goodbye_message();
                break;
            };

            match choice.trim() {
                "1" => {
                    EmtViews::prompt("🚏 Enter stop number", "'45', '1021'");
                    let stop = Self::read_input().trim().to_string();
                    Self::check_stop(model, &stop, &mut recent);
                    Self::pause();
                }
                "2" => {
                    if let Some(lines) = Self::cached_lines(model, &mut lines) {
                        EmtViews::show_lines(lines);
                    }
                    Self::pause();
                }
                "3" => {
                    if let Some(lines) = Self::cached_lines(model, &mut lines) {
                        Self::browse_line(model, lines);
                    }
                    Self::pause();
                }
                "4" => {
                    EmtViews::show_recent(&recent);
                    if !recent.is_empty() {
                        EmtViews::prompt("Enter a number to check it again (or Enter to go back)", "");
                        let input = Self::read_input();
                        let picked = Self::pick(input.trim(), recent.len())
                            .and_then(|i| recent.iter().nth(i))
                            .map(str::to_string);
                        if let Some(stop) = picked {
                            Self::check_stop(model, &stop, &mut recent);
                        }
                    }
                    Self::pause();
                }
                "0" => {
                    EmtViews::goodbye_message();
                    break;
                }
                "" => {}
                other => {
                    EmtViews::invalid_choice(other);
                    Self::pause();
                }
            }
        }
    }

    fn check_stop<T: Transport>(model: &EmtModels<T>, stop: &str, recent: &mut RecentStops) {
        if stop.is_empty() {
            println!("\n⚠️  Enter stop number.");
            return;
        }
        match model.fetch_arrivals(stop) {
            Ok(bundle) => {
                EmtViews::show_arrivals(stop, &bundle);
                recent.push(stop);
            }
            Err(e) => EmtViews::show_error(&e),
        }
    }

    /// Lines are fetched once per menu session.
    fn cached_lines<'a, T: Transport>(
        model: &EmtModels<T>,
        cache: &'a mut Option<Vec<Line>>,
    ) -> Option<&'a Vec<Line>> {
        if cache.is_none() {
            match model.fetch_lines() {
                Ok(lines) => *cache = Some(lines),
                Err(e) => {
                    EmtViews::show_error(&e);
                    return None;
                }
            }
        }
        cache.as_ref()
    }

    fn browse_line<T: Transport>(model: &EmtModels<T>, lines: &[Line]) {
        EmtViews::prompt("🚌 Enter line code", "'3', '25', 'A1'");
        let input = Self::read_input();
        let wanted = input.trim();

        let Some(line) = lines.iter().find(|l| l.code.eq_ignore_ascii_case(wanted)) else {
            println!("\n✗ Line '{}' not found", wanted);
            return;
        };
        let Some(line_id) = line.id.as_deref() else {
            println!("\n✗ Line '{}' has no identifier for drill-down", line.code);
            return;
        };

        let sublines = match model.fetch_sublines(line_id) {
            Ok(sublines) => sublines,
            Err(e) => return EmtViews::show_error(&e),
        };
        EmtViews::show_sublines(&sublines);
        let Some(subline) = Self::select(&sublines) else {
            return;
        };

        let directions = match model.fetch_directions(&subline.sub_line_id) {
            Ok(directions) => directions,
            Err(e) => return EmtViews::show_error(&e),
        };
        EmtViews::show_directions(&line.code, &directions);
        let Some(direction) = Self::select(&directions) else {
            return;
        };

        match Self::load_route(model, &line.code, line_id, &direction.trip_id, &direction.head_sign) {
            Ok(map) => EmtViews::show_route(&map),
            Err(e) => EmtViews::show_error(&e),
        }
    }

    /// Select from a list of items
    fn select<I>(items: &[I]) -> Option<&I> {
        if items.is_empty() {
            return None;
        }
        print!("\n➜ Enter number (1-{}): ", items.len());
        let _ = io::stdout().flush();

        let input = Self::read_input();
        match Self::pick(input.trim(), items.len()) {
            Some(i) => items.get(i),
            None => {
                println!("✗ Invalid selection. Please enter a number between 1 and {}", items.len());
                None
            }
        }
    }

    /// 1-based menu number to index
    pub fn pick(input: &str, len: usize) -> Option<usize> {
        match input.parse::<usize>() {
            Ok(num) if num > 0 && num <= len => Some(num - 1),
            _ => None,
        }
    }

    /// Simple pause - wait for Enter key
    fn pause() {
        print!("\n📌 Press Enter to continue...");
        let _ = io::stdout().flush();
        let _ = Self::read_input();
    }

    fn read_input() -> String {
        Self::read_line().unwrap_or_default()
    }

    /// Read a line from stdin; `None` once stdin is closed
    fn read_line() -> Option<String> {
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input),
            Err(e) => {
                eprintln!("⚠️  Error reading input: {}", e);
                None
            }
        }
    }
}
