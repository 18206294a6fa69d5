//! Ingestion-facing HTTP process: wires C5 (auth), C6 (dispatch), C9
//! (query) behind an axum router, per §6's HTTP API table.

pub mod auth_mw;
pub mod entities;
pub mod enrichment;
pub mod envelope;
pub mod events;
pub mod health;
pub mod routes;
pub mod state;
