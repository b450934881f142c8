//! Rural/Directed Rural Postman Problem route solver.
//!
//! Pipeline: an OSM extract is filtered down to a driving graph, the
//! required-to-service streets are pulled out of it, a solver (undirected or
//! directed depending on whether the driving graph has one-way arcs) adds the
//! minimum extra driving needed to make every required street part of a
//! single closed or open tour, and the tour is walked back out to a polyline
//! and written as GPX.

pub mod config;
pub mod error;
pub mod filter;
pub mod geo_types;
pub mod graph;
pub mod osm;
pub mod required;
pub mod matching;
pub mod flow;
pub mod rpp;
pub mod drpp;
pub mod tour;
pub mod snap;
pub mod gpx_export;
pub mod builder;

pub use noisy_float::prelude::{n64, N64};

/// OSM's original 64-bit node identifier, as it appears in input files,
/// diagnostics and error messages.
pub type NodeId = i64;

/// A dense, contiguous node index assigned by [`graph::NodeTable`]. All
/// graph storage (`D`, `R`, `E`) is indexed this way internally.
pub type NodeIdx = usize;
