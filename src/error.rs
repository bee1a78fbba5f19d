//! Typed errors for the boundary-level pre-validation helper (§4.5/§7).
//!
//! `build_graph` and `plan` are themselves infallible: no plan found, an
//! infeasible edge, the expansion ceiling tripping, an unknown stop in a
//! query — all surface as an empty `Vec` or a silently skipped edge, never
//! as an `Err`. `RouterError` exists only for callers that want to
//! pre-validate a query and fail fast instead (see [`crate::router::validate_query_stops`]).

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("unknown stop code: {code:?}")]
    UnknownStop { code: String },
}

pub type RouterResult<T> = Result<T, RouterError>;
