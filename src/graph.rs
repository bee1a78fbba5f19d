//! Graph Builder (§4.2) — turns a [`Snapshot`] into a finalised, query-ready
//! time-dependent [`Graph`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{ClockTime, Route, Stop, TimetableEntry, TransportMode};

/// One timetabled travel leg between two consecutive stops of the same trip.
///
/// Invariant: `departure_time` was present on the origin `TimetableEntry` and
/// `arrival_time` was present on the destination one — pairs missing either
/// clock are never turned into a `TransitEdge` at all (§4.2 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitEdge {
    pub from_stop: String,
    pub to_stop: String,
    pub route_id: u32,
    pub departure_time: ClockTime,
    pub arrival_time: ClockTime,
    pub mode: TransportMode,
}

impl TransitEdge {
    /// `(arrival - departure) mod 1440` minutes.
    pub fn travel_minutes(&self) -> f64 {
        self.departure_time.minutes_until(self.arrival_time)
    }
}

/// A time-invariant walking connection between two nearby stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkingEdge {
    pub from_stop: String,
    pub to_stop: String,
    pub walk_minutes: f64,
    pub distance_metres: f64,
}

/// The two closed edge variants, tagged rather than dispatched through a
/// trait object — the router's fragile-connection logic needs to inspect the
/// variant itself (same-route continuation only makes sense for transit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Edge {
    Transit(TransitEdge),
    Walk(WalkingEdge),
}

impl Edge {
    pub fn to_stop(&self) -> &str {
        match self {
            Edge::Transit(e) => &e.to_stop,
            Edge::Walk(e) => &e.to_stop,
        }
    }

    pub fn from_stop(&self) -> &str {
        match self {
            Edge::Transit(e) => &e.from_stop,
            Edge::Walk(e) => &e.from_stop,
        }
    }

    /// `(from, to, route_id)` key used for first-edge exclusion in the
    /// k-alternatives loop (§4.4.2). `route_id` is `None` for a walk.
    pub fn first_edge_key(&self) -> (String, String, Option<u32>) {
        match self {
            Edge::Transit(e) => (e.from_stop.clone(), e.to_stop.clone(), Some(e.route_id)),
            Edge::Walk(e) => (e.from_stop.clone(), e.to_stop.clone(), None),
        }
    }
}

/// Raw input data handed to [`build_graph`]: stops, routes, timetable rows,
/// walking connections, and the set of currently disrupted route ids.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub timetable_entries: Vec<TimetableEntry>,
    pub walking_connections: Vec<(String, String, f64, f64)>,
    pub disrupted_route_ids: Vec<u32>,
}

/// A finalised, immutable (apart from the disruption set) time-dependent
/// transport graph, ready to be queried by the router.
pub struct Graph {
    stops: HashMap<String, Stop>,
    routes: HashMap<u32, Route>,
    transit_edges: HashMap<String, Vec<TransitEdge>>,
    walking_edges: HashMap<String, Vec<WalkingEdge>>,
    disrupted_route_ids: HashSet<u32>,
}

impl Graph {
    pub fn get_stop(&self, code: &str) -> Option<&Stop> {
        self.stops.get(code)
    }

    pub fn get_route(&self, route_id: u32) -> Option<&Route> {
        self.routes.get(&route_id)
    }

    pub fn is_disrupted(&self, route_id: u32) -> bool {
        self.disrupted_route_ids.contains(&route_id)
    }

    /// Transit edges departing `code` at or after `earliest_departure`,
    /// **within the same day** (no midnight wraparound — Open Question 1),
    /// with disrupted routes already filtered out.
    pub fn get_outgoing_transit_edges(&self, code: &str, earliest_departure: ClockTime) -> Vec<&TransitEdge> {
        self.transit_edges
            .get(code)
            .into_iter()
            .flatten()
            .filter(|e| !self.disrupted_route_ids.contains(&e.route_id))
            .filter(|e| e.departure_time.is_same_day_at_or_after(earliest_departure))
            .collect()
    }

    pub fn get_walking_edges(&self, code: &str) -> &[WalkingEdge] {
        self.walking_edges.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn num_transit_edges(&self) -> usize {
        self.transit_edges.values().map(Vec::len).sum()
    }

    /// Flags a route as disrupted. The only mutator permitted after
    /// finalise; callers must serialise this with concurrent searches
    /// themselves (§5).
    pub fn mark_disrupted(&mut self, route_id: u32) {
        self.disrupted_route_ids.insert(route_id);
    }

    pub fn clear_disruption(&mut self, route_id: u32) {
        self.disrupted_route_ids.remove(&route_id);
    }
}

/// Constructs a finalised [`Graph`] from a [`Snapshot`] (§4.2).
pub fn build_graph(snapshot: Snapshot) -> Graph {
    let mut stops = HashMap::with_capacity(snapshot.stops.len());
    for stop in snapshot.stops {
        stops.insert(stop.code.clone(), stop);
    }

    let mut routes = HashMap::with_capacity(snapshot.routes.len());
    for route in snapshot.routes {
        routes.insert(route.route_id, route);
    }

    // Partition timetable entries by (route_id, trip_id), sort each
    // partition by stop_sequence, then emit one TransitEdge per consecutive
    // pair that has both clocks present.
    let mut by_trip: HashMap<(u32, Option<String>), Vec<TimetableEntry>> = HashMap::new();
    for entry in snapshot.timetable_entries {
        let key = (entry.route_id, entry.trip_id.clone());
        by_trip.entry(key).or_default().push(entry);
    }

    let mut transit_edges: HashMap<String, Vec<TransitEdge>> = HashMap::new();
    for ((route_id, _trip_id), mut entries) in by_trip {
        entries.sort_by_key(|e| e.stop_sequence);
        let mode = routes.get(&route_id).map(|r| r.mode).unwrap_or(TransportMode::Bus);

        for pair in entries.windows(2) {
            let (curr, next) = (&pair[0], &pair[1]);
            let (Some(departure_time), Some(arrival_time)) = (curr.departure_time, next.arrival_time) else {
                continue;
            };
            transit_edges.entry(curr.stop_code.clone()).or_default().push(TransitEdge {
                from_stop: curr.stop_code.clone(),
                to_stop: next.stop_code.clone(),
                route_id,
                departure_time,
                arrival_time,
                mode,
            });
        }
    }

    let mut walking_edges: HashMap<String, Vec<WalkingEdge>> = HashMap::new();
    for (a, b, mins, dist) in snapshot.walking_connections {
        walking_edges.entry(a.clone()).or_default().push(WalkingEdge {
            from_stop: a.clone(),
            to_stop: b.clone(),
            walk_minutes: mins,
            distance_metres: dist,
        });
        walking_edges.entry(b.clone()).or_default().push(WalkingEdge {
            from_stop: b,
            to_stop: a,
            walk_minutes: mins,
            distance_metres: dist,
        });
    }

    let disrupted_route_ids = snapshot.disrupted_route_ids.into_iter().collect();

    // Finalise: sort each per-stop transit-edge list by departure time.
    for edges in transit_edges.values_mut() {
        edges.sort_by_key(|e| (e.departure_time.hour, e.departure_time.minute));
    }

    Graph { stops, routes, transit_edges, walking_edges, disrupted_route_ids }
}
