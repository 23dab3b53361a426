//! # Route Modules
//!
//! - `gateway` — `GET /<repository>/<path...>`, the caching proxy itself.
//! - `health` — liveness, readiness, and counters under `/-/`. These static
//!   routes take precedence over the catch-all.

pub mod gateway;
pub mod health;
