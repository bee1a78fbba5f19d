pub mod model;

pub use model::{ClockTime, Route, Stop, TimetableEntry, TransportMode};

pub mod graph;

pub use graph::{build_graph, Edge, Graph, Snapshot, TransitEdge, WalkingEdge};

pub mod cost;

pub use cost::ReliabilityInputs;

pub mod router;

pub use router::{plan, validate_query_stops, JourneyLeg, JourneyPlan, LegMode, Query, RouterConfig};

pub mod error;

pub use error::{RouterError, RouterResult};
