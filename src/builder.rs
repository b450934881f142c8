//! The graph builder. Turns a filtered [`RawGraph`]
//! into the driving graph `D` and its undirected projection, restricted to
//! the largest weakly connected component.

use std::rc::Rc;

use log::warn;

use crate::config::RunConfig;
use crate::error::SolverError;
use crate::filter::is_drivable;
use crate::geo_types::{HighwayClass, RawGraph};
use crate::graph::{EdgeKind, Multigraph, NodeTable};
use crate::n64;

pub struct BuiltGraphs {
    /// Directed driving graph, one-way arcs respected (`D`).
    pub drive: Multigraph,
    /// Undirected projection of `drive` over the same node/edge space,
    /// used wherever connector/duplicate paths may service a street in
    /// either direction (`S`, aliased to `D` when `directed_service` is
    /// unset).
    pub service: Multigraph,
    /// `drive.edges()[i]`'s first highway token, kept alongside `drive` so
    /// the required-edge extractor doesn't need to re-walk the
    /// raw input or re-run the drivability filter.
    pub drive_highway: Vec<HighwayClass>,
}

/// Builds `D` from a raw, unfiltered graph: drops non-drivable edges, keeps
/// only the largest weakly connected component, and assigns a fallback
/// weight of `1.0` (logged) to edges missing a usable `length`.
pub fn build(raw: &RawGraph, cfg: &RunConfig) -> Result<BuiltGraphs, SolverError> {
    let mut table = NodeTable::new();
    for node in &raw.nodes {
        table.intern(node.id, node.lat, node.lon);
    }
    let table = Rc::new(table);

    let mut drive = Multigraph::new(Rc::clone(&table));
    let mut highway = Vec::new();
    for edge in raw.edges.iter().filter(|e| is_drivable(e)) {
        let (u, v) = match (table.lookup(edge.u), table.lookup(edge.v)) {
            (Some(u), Some(v)) => (u, v),
            _ => continue,
        };
        let weight = if edge.length.is_finite() && edge.length > 0.0 {
            n64(edge.length)
        } else {
            warn!(
                "edge {}->{} missing a usable length; defaulting weight to 1.0",
                edge.u, edge.v
            );
            n64(1.0)
        };
        let directed = edge.oneway && !cfg.ignore_oneway;
        drive.add_edge(u, v, directed, weight, edge.geometry.clone(), EdgeKind::Physical);
        highway.push(
            edge.primary_highway()
                .cloned()
                .unwrap_or(HighwayClass::Other(String::new())),
        );
    }

    if drive.edge_count() == 0 {
        return Err(SolverError::EmptyGraph);
    }

    let (drive, highway) = restrict_to_largest_component(&drive, highway);
    if drive.edge_count() == 0 {
        return Err(SolverError::EmptyGraph);
    }

    let service = if cfg.directed_service {
        drive.clone()
    } else {
        undirected_projection(&drive)
    };

    Ok(BuiltGraphs {
        drive,
        service,
        drive_highway: highway,
    })
}

/// Rebuilds a graph keeping only the largest weakly connected component's
/// edges, over the same shared node table (unreferenced nodes simply have no
/// incident edges and fall out of every later traversal). The parallel
/// `highway` vector is filtered in lockstep so indices keep lining up with
/// the rebuilt edge list.
fn restrict_to_largest_component(
    g: &Multigraph,
    highway: Vec<HighwayClass>,
) -> (Multigraph, Vec<HighwayClass>) {
    let components = g.weakly_connected_components();
    let largest = match components.iter().max_by_key(|c| c.len()) {
        Some(largest) => largest,
        None => return (Multigraph::new(Rc::clone(&g.nodes)), Vec::new()),
    };
    let keep: std::collections::HashSet<_> = largest.iter().copied().collect();

    let mut out = Multigraph::new(Rc::clone(&g.nodes));
    let mut out_highway = Vec::new();
    for (edge, hw) in g.edges().iter().zip(highway.into_iter()) {
        if keep.contains(&edge.u) && keep.contains(&edge.v) {
            out.add_edge(
                edge.u,
                edge.v,
                edge.directed,
                edge.weight,
                edge.geometry.clone(),
                edge.kind,
            );
            out_highway.push(hw);
        }
    }
    (out, out_highway)
}

/// Same edges, all marked undirected - used to build `S` when the driving
/// graph's one-ways shouldn't constrain which direction a street is serviced.
fn undirected_projection(g: &Multigraph) -> Multigraph {
    let mut out = Multigraph::new(Rc::clone(&g.nodes));
    for edge in g.edges() {
        out.add_edge(edge.u, edge.v, false, edge.weight, edge.geometry.clone(), edge.kind);
    }
    out
}
