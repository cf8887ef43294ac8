//! hearsay-core: witness sampling, belief interpretation, scoped
//! reputation profiles and rumor propagation for one play session.
//!
//! Pipeline, leaf-first:
//!   geometry → event → witness → interpretation → profile → gossip
//! with `engine` wiring them into `ingest_event` and `tick`.

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod geometry;
pub mod gossip;
pub mod interpretation;
pub mod profile;
pub mod query;
pub mod rng;
pub mod store;
pub mod trait_map;
pub mod types;
pub mod witness;
pub mod world;
