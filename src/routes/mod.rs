//! HTTP route handlers.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive an
//! OpenAPI document alongside the route table.

pub mod cards;
pub(crate) mod helpers;
pub mod params;
