// Terminal views for the EMT Palma bus client
use crate::emt_map::RouteMap;
use crate::emt_models::{ArrivalBundle, Direction, EmtError, Line, RecentStops, Subline};
use std::io::{self, Write};

pub struct EmtViews;

impl EmtViews {
    /// Show main menu
    pub fn show_menu() {
        println!("\n{}", "═".repeat(60));
        println!("     🚌 EMT PALMA - PASO POR PARADA");
        println!("{}", "═".repeat(60));
        println!("\n📋 MENU OPTIONS");
        println!("  1️⃣  Check a stop");
        println!("  2️⃣  List all lines");
        println!("  3️⃣  Browse a line (sublines, directions, stops)");
        println!("  4️⃣  Recent stops");
        println!("  0️⃣  Quit application");
        println!("\n{}", "─".repeat(60));
        print!("➜ Your choice: ");
        let _ = io::stdout().flush();
    }

    pub fn prompt(label: &str, examples: &str) {
        print!("\n{}\n", label);
        if !examples.is_empty() {
            print!("   Examples: {}\n", examples);
        }
        print!("➜ ");
        let _ = io::stdout().flush();
    }

    pub fn show_arrivals(stop_id: &str, bundle: &ArrivalBundle) {
        println!("\n{}", "═".repeat(60));
        println!("🕐 NEXT BUSES AT STOP {}", stop_id);
        println!("{}", "═".repeat(60));

        for arrival in &bundle.data {
            println!(
                "  {}  {:<36} {:>8}",
                Self::colorize_line(&arrival.line, &arrival.color),
                arrival.destination,
                arrival.eta
            );
        }

        println!("{}", "─".repeat(60));
        println!("Last updated: {}", bundle.timestamp);
    }

    pub fn show_lines(lines: &[Line]) {
        println!("\n{}", "═".repeat(60));
        println!("🚌 ALL LINES ({} total)", lines.len());
        println!("{}", "═".repeat(60));

        for line in lines {
            println!(
                "  {} {}{}",
                Self::colorize_line(&line.code, line.display_color()),
                line.name,
                line.id.as_ref().map(|id| format!("  (id {})", id)).unwrap_or_default()
            );
        }
    }

    pub fn show_sublines(sublines: &[Subline]) {
        if sublines.is_empty() {
            println!("\n⚠️  No sublines available");
            return;
        }
        println!("\n📋 Sublines:");
        for (i, subline) in sublines.iter().enumerate() {
            println!(
                "  {}. {} [{}] (id {})",
                i + 1,
                subline.long_name,
                subline.external_code,
                subline.sub_line_id
            );
        }
    }

    pub fn show_directions(line_code: &str, directions: &[Direction]) {
        if directions.is_empty() {
            println!("\n⚠️  No directions available");
            return;
        }
        println!("\n🎯 Directions:");
        for (i, direction) in directions.iter().enumerate() {
            println!(
                "  {}. {} → {} (trip {})",
                i + 1,
                line_code,
                direction.head_sign,
                direction.trip_id
            );
        }
    }

    pub fn show_route(map: &RouteMap) {
        println!("\n{}", "═".repeat(60));
        println!("🗺️  {} → {}", map.title(), map.head_sign);
        println!("{}", "═".repeat(60));

        let (lat, lon) = map.center();
        println!("  📌 Centre: ({:.6}, {:.6})", lat, lon);
        println!("  〰️  Shape points: {}", map.shape.len());
        println!("\n  🚏 Stops ({}):", map.stops.len());
        for stop in &map.stops {
            println!(
                "     {:>6}  {:<34} ({:.6}, {:.6})",
                stop.stop_id, stop.name, stop.latitude, stop.longitude
            );
        }
    }

    pub fn show_recent(recent: &RecentStops) {
        if recent.is_empty() {
            println!("\nℹ️  No stops checked yet");
            return;
        }
        println!("\n🕘 Recent stops:");
        for (i, stop) in recent.iter().enumerate() {
            println!("  {}. {}", i + 1, stop);
        }
    }

    /// Error messages with a hint per failure kind
    pub fn show_error(error: &EmtError) {
        println!("\n{}", "─".repeat(60));
        println!("✗ {}", error);

        let tip = match error {
            EmtError::InvalidInput(_) => "Stop numbers contain digits only (e.g. '45').",
            EmtError::NotFound(_) => "Check the number printed on the stop sign.",
            EmtError::Unauthorized => "The token was rejected; replace token.txt with a fresh one.",
            EmtError::RequestFailed(_) => "Check your internet connection and try again.",
            EmtError::UnexpectedFormat(_) => "The EMT API answered with an unknown format.",
            EmtError::NoData(_) => "No buses are due at this stop right now.",
            EmtError::Credential(_) => "Put the bearer token in token.txt or pass --token-file.",
        };
        println!("\n💡 {}", tip);
        println!("{}", "─".repeat(60));
    }

    pub fn invalid_choice(choice: &str) {
        println!("\n✗ Invalid option '{}'.", choice);
    }

    pub fn goodbye_message() {
        println!("\n{}", "═".repeat(60));
        println!("       👋 Gracias por usar EMT Palma!");
        println!("{}", "═".repeat(60));
        println!();
    }

    pub fn parse_hex_color(hex_color: &str) -> (u8, u8, u8) {
        let hex = hex_color.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return (128, 128, 128);
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(128);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(128);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(128);
        (r, g, b)
    }

    /// Line badge with the line color as ANSI background
    pub fn colorize_line(code: &str, hex_color: &str) -> String {
        let (r, g, b) = Self::parse_hex_color(hex_color);

        // Relative luminance picks black or white text
        let luminance = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
        let text_color = if luminance > 0.5 { "30" } else { "97" };

        format!(
            "\x1b[48;2;{};{};{}m\x1b[{}m {:^4} \x1b[0m",
            r, g, b, text_color, code
        )
    }
}
