//! The required-edge extractor. Pulls the streets
//! that must be serviced out of the driving graph, as their own multigraph
//! over the same node space - undirected (`R_u`) for the Rural Postman
//! variant, directed (`R_d`) for the Directed variant.

use std::rc::Rc;

use crate::builder::BuiltGraphs;
use crate::config::RequiredHighways;
use crate::graph::{EdgeKind, Multigraph};

/// Builds the required-edge subgraph from `D`'s edges plus their highway
/// classification, collapsing parallel input arcs between the same pair of
/// nodes into a single required edge: multiple matching arcs between the
/// same two nodes collapse to one required edge.
///
/// `directed` selects `R_d` (arcs keep `D`'s direction) vs `R_u` (every
/// required edge is undirected, matching `S`).
pub fn extract(built: &BuiltGraphs, required: &RequiredHighways, directed: bool) -> Multigraph {
    let mut seen = std::collections::HashSet::new();
    let mut out = Multigraph::new(Rc::clone(&built.drive.nodes));
    for (edge, hw) in built.drive.edges().iter().zip(built.drive_highway.iter()) {
        if !required.contains(hw) {
            continue;
        }
        let key = if directed {
            (edge.u, edge.v)
        } else {
            (edge.u.min(edge.v), edge.u.max(edge.v))
        };
        if !seen.insert(key) {
            continue;
        }
        out.add_edge(
            edge.u,
            edge.v,
            directed && edge.directed,
            edge.weight,
            edge.geometry.clone(),
            EdgeKind::Required,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::geo_types::{HighwayClass, RawEdge, RawGraph, RawNode};

    fn raw() -> RawGraph {
        RawGraph {
            nodes: vec![
                RawNode { id: 1, lat: 0.0, lon: 0.0 },
                RawNode { id: 2, lat: 0.0, lon: 0.001 },
                RawNode { id: 3, lat: 0.001, lon: 0.001 },
            ],
            edges: vec![
                RawEdge {
                    u: 1,
                    v: 2,
                    length: 10.0,
                    highway: vec![HighwayClass::Residential],
                    oneway: false,
                    geometry: None,
                    access: Default::default(),
                },
                RawEdge {
                    u: 2,
                    v: 3,
                    length: 10.0,
                    highway: vec![HighwayClass::Primary],
                    oneway: false,
                    geometry: None,
                    access: Default::default(),
                },
            ],
        }
    }

    #[test]
    fn only_required_classes_survive() {
        let cfg = RunConfig {
            ignore_oneway: false,
            directed_service: false,
            drop_drpp_blockers: false,
        };
        let built = crate::builder::build(&raw(), &cfg).unwrap();
        let req = RequiredHighways::default_set();
        let r = extract(&built, &req, false);
        assert_eq!(r.edge_count(), 1);
    }
}
