//! Router (§4.4) — modified-Dijkstra single-pair search, the k-alternatives
//! loop built on top of it, and journey reconstruction with leg merging.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cost::{is_fragile_connection, transit_edge_cost, walking_edge_cost, ReliabilityInputs};
use crate::error::{RouterError, RouterResult};
use crate::graph::{Edge, Graph};
use crate::model::{ClockTime, TransportMode};

/// Safety-valve ceiling on the number of priority-queue pops a single search
/// performs before giving up (§4.4.1). Not a correctness condition.
pub const MAX_EXPANSIONS: usize = 50_000;

/// The tunables in §4.3/§4.4, bundled so a caller can override them without
/// the core needing a config-loading dependency of its own (§4.6). The
/// `Default` reproduces the historical hard-coded constants.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub min_transfer_mins: f64,
    pub wait_penalty_factor: f64,
    pub hub_max_bonus_mins: f64,
    pub delay_max_penalty_mins: f64,
    pub max_expansions: usize,
    pub reliability: ReliabilityInputs,
    /// Lower bound `plan()` clamps `Query::max_results` up to.
    pub min_results: usize,
    /// Upper bound `plan()` clamps `Query::max_results` down to.
    pub max_results_cap: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_transfer_mins: crate::cost::MIN_TRANSFER_MINS,
            wait_penalty_factor: crate::cost::WAIT_PENALTY_FACTOR,
            hub_max_bonus_mins: crate::cost::HUB_MAX_BONUS_MINS,
            delay_max_penalty_mins: crate::cost::DELAY_MAX_PENALTY_MINS,
            max_expansions: MAX_EXPANSIONS,
            reliability: ReliabilityInputs::default(),
            min_results: 1,
            max_results_cap: 10,
        }
    }
}

/// A request for up to `max_results` journeys from `origin` to `destination`,
/// departing at or after `depart_time`.
#[derive(Debug, Clone)]
pub struct Query {
    pub origin: String,
    pub destination: String,
    pub depart_time: ClockTime,
    pub max_results: usize,
}

/// One leg of a multi-modal journey — a single vehicle ride (after merging
/// consecutive same-route edges) or a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyLeg {
    pub from_stop: String,
    pub to_stop: String,
    pub departure_time: ClockTime,
    pub arrival_time: ClockTime,
    pub mode: LegMode,
    pub route_id: Option<u32>,
    pub route_name: Option<String>,
    pub operator: Option<String>,
}

impl JourneyLeg {
    /// `(arrival - departure) mod 1440` minutes.
    pub fn duration_mins(&self) -> f64 {
        self.departure_time.minutes_until(self.arrival_time)
    }
}

/// A leg's mode, `walk` kept distinct from `TransportMode` since it is not a
/// real transport mode and always implies `route_id = None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegMode {
    Bus,
    Rail,
    Tram,
    Walk,
}

impl From<TransportMode> for LegMode {
    fn from(mode: TransportMode) -> Self {
        match mode {
            TransportMode::Bus => LegMode::Bus,
            TransportMode::Rail => LegMode::Rail,
            TransportMode::Tram => LegMode::Tram,
        }
    }
}

/// A complete journey option: an ordered, non-empty list of legs plus
/// summary metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyPlan {
    pub legs: Vec<JourneyLeg>,
    pub total_cost: f64,
    pub total_duration_mins: f64,
    pub num_transfers: usize,
}

/// `(from_stop, to_stop, route_id_or_none)` — the key the k-alternatives
/// loop excludes on subsequent searches (§4.4.2).
type FirstEdgeKey = (String, String, Option<u32>);

/// Priority-queue entry. Ordered by cost only (ties broken by insertion
/// order via `seq`, a stable-heap idiom rather than a derived total order
/// over floats).
struct SearchNode {
    cost: f64,
    seq: u64,
    stop: String,
    arrival_time: ClockTime,
    prev_stop: Option<String>,
    incoming_edge: Option<Edge>,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}
impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the lowest cost first;
        // ties broken by insertion order (lower seq first).
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs the k-alternatives search (§4.4.2): up to `query.max_results` plans,
/// ordered best-first by `total_cost`.
pub fn plan(graph: &Graph, query: &Query, config: &RouterConfig) -> Vec<JourneyPlan> {
    let max_results = query.max_results.clamp(config.min_results.max(1), config.max_results_cap);

    let mut results = Vec::new();
    let mut excluded_first_edges: HashSet<FirstEdgeKey> = HashSet::new();

    for _ in 0..max_results {
        let Some(result) = single_pair_search(graph, query, config, &excluded_first_edges) else {
            break;
        };
        let first_leg = &result.legs[0];
        excluded_first_edges.insert((first_leg.from_stop.clone(), first_leg.to_stop.clone(), first_leg.route_id));
        results.push(result);
    }

    results
}

/// Boundary-level opt-in pre-check (§4.5/§7). `plan` never calls this itself;
/// a caller that wants to fail fast on an unknown stop instead of paying for
/// a doomed search can call it first.
pub fn validate_query_stops(graph: &Graph, query: &Query) -> RouterResult<()> {
    if graph.get_stop(&query.origin).is_none() {
        return Err(RouterError::UnknownStop { code: query.origin.clone() });
    }
    if graph.get_stop(&query.destination).is_none() {
        return Err(RouterError::UnknownStop { code: query.destination.clone() });
    }
    Ok(())
}

fn single_pair_search(graph: &Graph, query: &Query, config: &RouterConfig, excluded_first_edges: &HashSet<FirstEdgeKey>) -> Option<JourneyPlan> {
    let origin = &query.origin;
    let destination = &query.destination;

    let mut best_cost: HashMap<String, f64> = HashMap::new();
    let mut predecessors: HashMap<String, SearchNode> = HashMap::new();
    let mut heap: BinaryHeap<SearchNode> = BinaryHeap::new();
    let mut seq: u64 = 0;

    let start = SearchNode { cost: 0.0, seq, stop: origin.clone(), arrival_time: query.depart_time, prev_stop: None, incoming_edge: None };
    seq += 1;
    best_cost.insert(origin.clone(), 0.0);
    predecessors.insert(
        origin.clone(),
        SearchNode { cost: 0.0, seq: start.seq, stop: origin.clone(), arrival_time: query.depart_time, prev_stop: None, incoming_edge: None },
    );
    heap.push(start);

    let mut expansions = 0usize;

    while let Some(current) = heap.pop() {
        expansions += 1;
        if expansions > config.max_expansions {
            log::warn!("journey search hit the expansion ceiling ({} expansions) from {origin} to {destination}", config.max_expansions);
            return None;
        }

        if current.stop == *destination {
            log::debug!("journey search reached {destination} after {expansions} expansions at cost {:.2}", current.cost);
            return reconstruct(graph, origin, &current, &predecessors);
        }

        if current.cost > *best_cost.get(&current.stop).unwrap_or(&f64::INFINITY) {
            continue;
        }

        let Some(current_stop_meta) = graph.get_stop(&current.stop) else {
            continue;
        };

        for edge in graph.get_outgoing_transit_edges(&current.stop, current.arrival_time) {
            if current.stop == *origin {
                let key = (edge.from_stop.clone(), edge.to_stop.clone(), Some(edge.route_id));
                if excluded_first_edges.contains(&key) {
                    continue;
                }
            }

            let dest_stop = graph.get_stop(&edge.to_stop);
            let Some(edge_cost) = transit_edge_cost(
                edge,
                current.arrival_time,
                dest_stop,
                config.reliability,
                config.wait_penalty_factor,
                config.hub_max_bonus_mins,
                config.delay_max_penalty_mins,
            ) else {
                continue;
            };

            if let Some(incoming) = &current.incoming_edge {
                let is_transfer = !matches!(incoming, Edge::Transit(t) if t.route_id == edge.route_id);
                if is_transfer {
                    let wait = current.arrival_time.minutes_until(edge.departure_time);
                    if is_fragile_connection(wait, current_stop_meta, config.min_transfer_mins) {
                        continue;
                    }
                }
            }

            let new_cost = current.cost + edge_cost;
            if new_cost < *best_cost.get(&edge.to_stop).unwrap_or(&f64::INFINITY) {
                best_cost.insert(edge.to_stop.clone(), new_cost);
                let node = SearchNode {
                    cost: new_cost,
                    seq,
                    stop: edge.to_stop.clone(),
                    arrival_time: edge.arrival_time,
                    prev_stop: Some(current.stop.clone()),
                    incoming_edge: Some(Edge::Transit(edge.clone())),
                };
                seq += 1;
                predecessors.insert(
                    edge.to_stop.clone(),
                    SearchNode {
                        cost: node.cost,
                        seq: node.seq,
                        stop: node.stop.clone(),
                        arrival_time: node.arrival_time,
                        prev_stop: node.prev_stop.clone(),
                        incoming_edge: node.incoming_edge.clone(),
                    },
                );
                heap.push(node);
            }
        }

        for wedge in graph.get_walking_edges(&current.stop) {
            if current.stop == *origin {
                let key = (wedge.from_stop.clone(), wedge.to_stop.clone(), None);
                if excluded_first_edges.contains(&key) {
                    continue;
                }
            }

            let walk_cost = walking_edge_cost(wedge);
            let walk_arrival = current.arrival_time.add_minutes(wedge.walk_minutes);
            let new_cost = current.cost + walk_cost;
            if new_cost < *best_cost.get(&wedge.to_stop).unwrap_or(&f64::INFINITY) {
                best_cost.insert(wedge.to_stop.clone(), new_cost);
                let node = SearchNode {
                    cost: new_cost,
                    seq,
                    stop: wedge.to_stop.clone(),
                    arrival_time: walk_arrival,
                    prev_stop: Some(current.stop.clone()),
                    incoming_edge: Some(Edge::Walk(wedge.clone())),
                };
                seq += 1;
                predecessors.insert(
                    wedge.to_stop.clone(),
                    SearchNode {
                        cost: node.cost,
                        seq: node.seq,
                        stop: node.stop.clone(),
                        arrival_time: node.arrival_time,
                        prev_stop: node.prev_stop.clone(),
                        incoming_edge: node.incoming_edge.clone(),
                    },
                );
                heap.push(node);
            }
        }
    }

    None
}

/// Walks `predecessors` backwards from the destination pop, then folds the
/// resulting edge list into merged legs (§4.4.3).
fn reconstruct(graph: &Graph, origin: &str, dest_node: &SearchNode, predecessors: &HashMap<String, SearchNode>) -> Option<JourneyPlan> {
    let total_cost = dest_node.cost;

    // Collect (edge, arrival_time_at_edge.from_stop) from destination back to origin.
    let mut path_reversed: Vec<(Edge, ClockTime)> = Vec::new();
    let mut current_stop = dest_node.stop.clone();
    let mut current_edge = dest_node.incoming_edge.clone();
    let mut current_prev = dest_node.prev_stop.clone();

    while current_stop != origin {
        let edge = current_edge?;
        let prev_stop = current_prev?;
        let from_arrival = predecessors.get(&prev_stop).map(|n| n.arrival_time)?;
        path_reversed.push((edge, from_arrival));

        current_stop = prev_stop;
        let prev_node = predecessors.get(&current_stop)?;
        current_edge = prev_node.incoming_edge.clone();
        current_prev = prev_node.prev_stop.clone();
    }

    path_reversed.reverse();

    let mut legs: Vec<JourneyLeg> = Vec::new();
    for (edge, from_arrival_time) in path_reversed {
        match edge {
            Edge::Transit(t) => {
                let can_merge = legs.last().is_some_and(|last| last.route_id == Some(t.route_id) && last.to_stop == t.from_stop);
                if can_merge {
                    let last = legs.last_mut().unwrap();
                    last.to_stop = t.to_stop.clone();
                    last.arrival_time = t.arrival_time;
                } else {
                    let route = graph.get_route(t.route_id);
                    legs.push(JourneyLeg {
                        from_stop: t.from_stop.clone(),
                        to_stop: t.to_stop.clone(),
                        departure_time: t.departure_time,
                        arrival_time: t.arrival_time,
                        mode: t.mode.into(),
                        route_id: Some(t.route_id),
                        route_name: route.map(|r| r.route_name.clone()),
                        operator: route.map(|r| r.operator.clone()),
                    });
                }
            }
            Edge::Walk(w) => {
                let departure = from_arrival_time;
                let arrival = departure.add_minutes(w.walk_minutes);
                legs.push(JourneyLeg {
                    from_stop: w.from_stop.clone(),
                    to_stop: w.to_stop.clone(),
                    departure_time: departure,
                    arrival_time: arrival,
                    mode: LegMode::Walk,
                    route_id: None,
                    route_name: None,
                    operator: None,
                });
            }
        }
    }

    if legs.is_empty() {
        return None;
    }

    let total_duration_mins = legs[0].departure_time.minutes_until(legs[legs.len() - 1].arrival_time);
    let num_transfers = legs.iter().filter(|l| l.mode != LegMode::Walk).count().saturating_sub(1);

    Some(JourneyPlan { legs, total_cost, total_duration_mins, num_transfers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_graph, Snapshot};
    use crate::model::{ClockTime, Route, Stop, TimetableEntry, TransportMode};

    fn stop(code: &str, mode: TransportMode, hub_score: f64) -> Stop {
        Stop { code: code.into(), name: code.into(), mode, latitude: 0.0, longitude: 0.0, locality: None, hub_score }
    }

    fn route(route_id: u32) -> Route {
        Route { route_id, operator: "Op".into(), route_name: format!("R{route_id}"), mode: TransportMode::Bus }
    }

    fn entry(route_id: u32, stop_code: &str, seq: u32, arr: Option<(u8, u8)>, dep: Option<(u8, u8)>, trip: &str) -> TimetableEntry {
        TimetableEntry {
            route_id,
            stop_code: stop_code.into(),
            stop_sequence: seq,
            arrival_time: arr.map(|(h, m)| ClockTime::new(h, m, 0)),
            departure_time: dep.map(|(h, m)| ClockTime::new(h, m, 0)),
            trip_id: Some(trip.into()),
            days_of_week: None,
            valid_from: None,
            valid_to: None,
        }
    }

    fn query(origin: &str, destination: &str, hour: u8, min: u8, max_results: usize) -> Query {
        Query { origin: origin.into(), destination: destination.into(), depart_time: ClockTime::new(hour, min, 0), max_results }
    }

    #[test]
    fn straight_bus_ride_merges_into_one_leg() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((9, 0)), "T1"),
                entry(1, "B", 1, Some((9, 10)), Some((9, 10)), "T1"),
                entry(1, "C", 2, Some((9, 20)), None, "T1"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 8, 50, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
        let p = &plans[0];
        assert_eq!(p.legs.len(), 1);
        assert_eq!(p.legs[0].from_stop, "A");
        assert_eq!(p.legs[0].to_stop, "C");
        assert_eq!(p.legs[0].departure_time, ClockTime::new(9, 0, 0));
        assert_eq!(p.legs[0].arrival_time, ClockTime::new(9, 20, 0));
        assert_eq!(p.num_transfers, 0);
    }

    #[test]
    fn fragile_transfer_is_rejected() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1), route(2)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((9, 0)), "T1"),
                entry(1, "B", 1, Some((9, 10)), None, "T1"),
                entry(2, "B", 0, None, Some((9, 13)), "T2"),
                entry(2, "C", 1, Some((9, 30)), None, "T2"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 8, 50, 1), &RouterConfig::default());
        assert!(plans.is_empty(), "a 3-minute transfer at a non-hub must be rejected");
    }

    #[test]
    fn exactly_five_minute_transfer_is_accepted() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1), route(2)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((9, 0)), "T1"),
                entry(1, "B", 1, Some((9, 10)), None, "T1"),
                entry(2, "B", 0, None, Some((9, 15)), "T2"),
                entry(2, "C", 1, Some((9, 30)), None, "T2"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 8, 50, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].num_transfers, 1);
    }

    #[test]
    fn hub_relaxation_accepts_a_four_minute_transfer() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.8), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1), route(2)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((9, 0)), "T1"),
                entry(1, "B", 1, Some((9, 10)), None, "T1"),
                entry(2, "B", 0, None, Some((9, 14)), "T2"),
                entry(2, "C", 1, Some((9, 30)), None, "T2"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 8, 50, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn same_route_continuation_is_not_a_transfer_and_merges() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((9, 0)), "T1"),
                entry(1, "B", 1, Some((9, 10)), Some((9, 12)), "T1"),
                entry(1, "C", 2, Some((9, 20)), None, "T1"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 8, 50, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].legs.len(), 1);
        assert_eq!(plans[0].num_transfers, 0);
    }

    #[test]
    fn disruption_falls_back_to_walking() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("C", TransportMode::Bus, 0.0)],
            routes: vec![route(1)],
            timetable_entries: vec![entry(1, "A", 0, None, Some((9, 0)), "T1"), entry(1, "C", 1, Some((9, 20)), None, "T1")],
            walking_connections: vec![("A".into(), "C".into(), 30.0, 2400.0)],
            disrupted_route_ids: vec![1],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "C", 9, 0, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].legs.len(), 1);
        assert_eq!(plans[0].legs[0].mode, LegMode::Walk);
        assert_eq!(plans[0].legs[0].departure_time, ClockTime::new(9, 0, 0));
        assert_eq!(plans[0].legs[0].arrival_time, ClockTime::new(9, 30, 0));
    }

    #[test]
    fn k_alternatives_yields_diverse_first_legs() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0)],
            routes: vec![route(1), route(2)],
            timetable_entries: vec![
                entry(1, "A", 0, None, Some((8, 0)), "T1"),
                entry(1, "B", 1, Some((8, 20)), None, "T1"),
                entry(2, "A", 0, None, Some((8, 0)), "T2"),
                entry(2, "B", 1, Some((8, 25)), None, "T2"),
            ],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "B", 8, 0, 3), &RouterConfig::default());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].legs[0].route_id, Some(1));
        assert_eq!(plans[1].legs[0].route_id, Some(2));
        assert!(plans[0].total_cost <= plans[1].total_cost);
    }

    #[test]
    fn unknown_stop_yields_an_empty_plan_not_an_error() {
        let graph = build_graph(Snapshot::default());
        let plans = plan(&graph, &query("nope", "also-nope", 8, 0, 1), &RouterConfig::default());
        assert!(plans.is_empty());
    }

    #[test]
    fn validate_query_stops_flags_the_unknown_one() {
        let graph = build_graph(Snapshot::default());
        let err = validate_query_stops(&graph, &query("nope", "also-nope", 8, 0, 1)).unwrap_err();
        assert!(matches!(err, RouterError::UnknownStop { code } if code == "nope"));
    }

    #[test]
    fn empty_graph_any_query_on_known_stops_returns_no_plans() {
        let snapshot = Snapshot { stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0)], ..Default::default() };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "B", 8, 0, 1), &RouterConfig::default());
        assert!(plans.is_empty());
    }

    #[test]
    fn overnight_leg_duration_wraps_correctly() {
        let snapshot = Snapshot {
            stops: vec![stop("A", TransportMode::Bus, 0.0), stop("B", TransportMode::Bus, 0.0)],
            routes: vec![route(1)],
            timetable_entries: vec![entry(1, "A", 0, None, Some((23, 55)), "T1"), entry(1, "B", 1, Some((0, 5)), None, "T1")],
            walking_connections: vec![],
            disrupted_route_ids: vec![],
        };
        let graph = build_graph(snapshot);
        let plans = plan(&graph, &query("A", "B", 23, 50, 1), &RouterConfig::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].total_duration_mins, 10.0);
    }
}
