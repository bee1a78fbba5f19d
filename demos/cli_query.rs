use std::io::{stdout, Write};

use transit_core::model::{ClockTime, Route, Stop, TimetableEntry, TransportMode};
use transit_core::{build_graph, plan, Query, RouterConfig, Snapshot};

/// A small fixture network standing in for a real timetable feed: two bus
/// routes crossing at a hub stop, plus a walking shortcut.
fn demo_snapshot() -> Snapshot {
    let stop = |code: &str, name: &str, hub_score: f64| Stop {
        code: code.into(),
        name: name.into(),
        mode: TransportMode::Bus,
        latitude: 0.0,
        longitude: 0.0,
        locality: None,
        hub_score,
    };

    let entry = |route_id: u32, stop_code: &str, seq: u32, arr: Option<(u8, u8)>, dep: Option<(u8, u8)>, trip: &str| TimetableEntry {
        route_id,
        stop_code: stop_code.into(),
        stop_sequence: seq,
        arrival_time: arr.map(|(h, m)| ClockTime::new(h, m, 0)),
        departure_time: dep.map(|(h, m)| ClockTime::new(h, m, 0)),
        trip_id: Some(trip.into()),
        days_of_week: None,
        valid_from: None,
        valid_to: None,
    };

    Snapshot {
        stops: vec![
            stop("STN", "Central Station", 0.9),
            stop("HIGH", "High Street", 0.2),
            stop("PARK", "Parkside", 0.1),
            stop("MARK", "Market Square", 0.3),
        ],
        routes: vec![
            Route { route_id: 1, operator: "Townline Buses".into(), route_name: "1 - Parkside".into(), mode: TransportMode::Bus },
            Route { route_id: 2, operator: "Townline Buses".into(), route_name: "2 - Market".into(), mode: TransportMode::Bus },
        ],
        timetable_entries: vec![
            entry(1, "STN", 0, None, Some((8, 0)), "T1-a"),
            entry(1, "HIGH", 1, Some((8, 8)), Some((8, 9)), "T1-a"),
            entry(1, "PARK", 2, Some((8, 20)), None, "T1-a"),
            entry(2, "HIGH", 0, None, Some((8, 15)), "T2-a"),
            entry(2, "MARK", 1, Some((8, 28)), None, "T2-a"),
        ],
        walking_connections: vec![("HIGH".into(), "MARK".into(), 6.0, 450.0)],
        disrupted_route_ids: vec![],
    }
}

fn read_line(prompt: &str) -> std::io::Result<String> {
    print!("{prompt}");
    stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn get_stop_from_user(graph: &transit_core::Graph, prompt: &str) -> std::io::Result<String> {
    loop {
        let code = read_line(&format!("Where are you {prompt}? (stop code): "))?;
        if graph.get_stop(&code).is_some() {
            return Ok(code);
        }
        println!("Stop not found. Known codes: STN, HIGH, PARK, MARK.");
    }
}

fn get_time_from_user(prompt: &str) -> std::io::Result<ClockTime> {
    loop {
        let text = read_line(prompt)?;
        let mut parts = text.splitn(2, ':');
        if let (Some(h), Some(m)) = (parts.next(), parts.next()) {
            if let (Ok(h), Ok(m)) = (h.parse::<u8>(), m.parse::<u8>()) {
                if h < 24 && m < 60 {
                    return Ok(ClockTime::new(h, m, 0));
                }
            }
        }
        println!("Invalid time format, expected HH:MM. Please try again.");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let graph = build_graph(demo_snapshot());
    println!("Loaded demo network: {} stops, {} transit edges.", graph.num_stops(), graph.num_transit_edges());
    println!();

    loop {
        let origin = get_stop_from_user(&graph, "starting")?;
        let destination = get_stop_from_user(&graph, "going")?;
        let depart_time = get_time_from_user("What time are you leaving? (HH:MM): ")?;
        println!();

        let query = Query { origin, destination, depart_time, max_results: 3 };
        let plans = plan(&graph, &query, &RouterConfig::default());

        if plans.is_empty() {
            println!("No journeys found.");
        } else {
            for (i, journey) in plans.iter().enumerate() {
                println!("Option {}: cost {:.1}, {:.0} min, {} transfer(s)", i + 1, journey.total_cost, journey.total_duration_mins, journey.num_transfers);
                for leg in &journey.legs {
                    match leg.route_name.as_deref() {
                        Some(name) => println!("  {} -> {} via {} ({} - {})", leg.from_stop, leg.to_stop, name, leg.departure_time, leg.arrival_time),
                        None => println!("  {} -> {} on foot ({} - {})", leg.from_stop, leg.to_stop, leg.departure_time, leg.arrival_time),
                    }
                }
            }
        }

        let again = read_line("\nSearch again? (y/n): ")?;
        if again != "y" {
            break;
        }
        println!();
    }

    Ok(())
}
