//! The tour extractor. Classical Hierholzer's algorithm, adapted to walk
//! an edge-indexed multigraph (an undirected
//! edge, once walked in either direction, counts as used) rather than a
//! plain adjacency list, and to return edge ids - not just node ids - since
//! `E` can hold several parallel edges between the same two nodes.

use crate::error::SolverError;
use crate::graph::{EdgeId, Multigraph, NodeIdx};

/// Extracts a tour from `E`: any Eulerian circuit with no endpoints, a
/// circuit anchored at `s` when `start == end` or only `start` is given, or
/// an Eulerian path `s -> t` when both differ. Returns the edge ids walked,
/// in order.
pub fn extract(e: &Multigraph, endpoints: Option<(NodeIdx, NodeIdx)>) -> Result<Vec<EdgeId>, SolverError> {
    if e.edge_count() == 0 {
        // No required streets matched: a valid, empty route, not a failure.
        return Ok(Vec::new());
    }

    let anchor = match endpoints {
        Some((s, _)) => s,
        None => e.active_nodes().next().unwrap(),
    };

    let n = e.node_count();
    let mut cursor: Vec<usize> = vec![0; n];
    let mut used: Vec<bool> = vec![false; e.edge_count()];

    // Iterative Hierholzer: `work` holds the node path currently being
    // extended; when a node is exhausted it's popped onto `circuit`.
    let mut work: Vec<NodeIdx> = vec![anchor];
    let mut edge_of_step: Vec<Option<EdgeId>> = vec![None];
    let mut circuit_nodes: Vec<NodeIdx> = Vec::new();
    let mut circuit_edges: Vec<EdgeId> = Vec::new();

    while let Some(&v) = work.last() {
        let incident = e.incident(v);
        let mut advanced = false;
        while cursor[v] < incident.len() {
            let eid = incident[cursor[v]];
            cursor[v] += 1;
            if used[eid] {
                continue;
            }
            let edge = e.edge(eid);
            if !edge.traversable_from(v) {
                continue;
            }
            used[eid] = true;
            work.push(edge.other(v));
            edge_of_step.push(Some(eid));
            advanced = true;
            break;
        }
        if !advanced {
            work.pop();
            circuit_nodes.push(v);
            if let Some(eid) = edge_of_step.pop().unwrap() {
                circuit_edges.push(eid);
            }
        }
    }

    circuit_nodes.reverse();
    circuit_edges.reverse();

    if circuit_edges.len() != e.edge_count() {
        return Err(SolverError::InvariantFailure(format!(
            "Hierholzer walk used {} of {} edges - E is not Eulerian from the chosen anchor",
            circuit_edges.len(),
            e.edge_count()
        )));
    }

    if let Some((s, t)) = endpoints {
        if s != t {
            let last = *circuit_nodes.last().unwrap();
            if last != t {
                return Err(SolverError::InvariantFailure(format!(
                    "Eulerian walk ended at {} instead of requested end {}",
                    e.nodes.ext_id(last),
                    e.nodes.ext_id(t)
                )));
            }
        }
    }

    Ok(circuit_edges)
}

/// The node `extract` started its walk from - needed by callers (the
/// geometry exporter) to reconstruct the node-by-node path alongside the
/// edge ids `extract` returns, without re-running Hierholzer.
pub fn anchor(e: &Multigraph, endpoints: Option<(NodeIdx, NodeIdx)>) -> Option<NodeIdx> {
    match endpoints {
        Some((s, _)) => Some(s),
        None => e.active_nodes().next().or_else(|| (e.node_count() > 0).then(|| 0)),
    }
}

/// Replays a tour's edge sequence from `start`, returning the node visited
/// before and after each edge (`nodes.len() == tour.len() + 1`).
pub fn walk_nodes(e: &Multigraph, tour: &[EdgeId], start: NodeIdx) -> Vec<NodeIdx> {
    let mut nodes = Vec::with_capacity(tour.len() + 1);
    let mut cur = start;
    nodes.push(cur);
    for &eid in tour {
        cur = e.edge(eid).other(cur);
        nodes.push(cur);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, NodeTable};
    use crate::n64;
    use std::rc::Rc;

    fn square() -> Multigraph {
        let mut t = NodeTable::new();
        for i in 0..4 {
            t.intern(i, 0.0, 0.0);
        }
        let mut g = Multigraph::new(Rc::new(t));
        g.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        g.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);
        g.add_edge(2, 3, false, n64(1.0), None, EdgeKind::Required);
        g.add_edge(3, 0, false, n64(1.0), None, EdgeKind::Required);
        g
    }

    #[test]
    fn walks_every_edge_of_a_closed_square() {
        let g = square();
        let tour = extract(&g, None).unwrap();
        assert_eq!(tour.len(), 4);
    }

    #[test]
    fn empty_graph_yields_empty_tour_and_a_usable_anchor() {
        let mut t = NodeTable::new();
        t.intern(0, 0.0, 0.0);
        let g = Multigraph::new(Rc::new(t));
        let tour = extract(&g, None).unwrap();
        assert!(tour.is_empty());
        assert_eq!(anchor(&g, None), Some(0));
    }

    #[test]
    fn open_path_ends_at_requested_node() {
        let mut t = NodeTable::new();
        for i in 0..3 {
            t.intern(i, 0.0, 0.0);
        }
        let mut g = Multigraph::new(Rc::new(t));
        g.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        g.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);
        let tour = extract(&g, Some((0, 2))).unwrap();
        assert_eq!(tour.len(), 2);
    }

    #[test]
    fn walk_nodes_reconstructs_the_open_path() {
        let mut t = NodeTable::new();
        for i in 0..3 {
            t.intern(i, 0.0, 0.0);
        }
        let mut g = Multigraph::new(Rc::new(t));
        g.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        g.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);
        let tour = extract(&g, Some((0, 2))).unwrap();
        let start = anchor(&g, Some((0, 2))).unwrap();
        assert_eq!(walk_nodes(&g, &tour, start), vec![0, 1, 2]);
    }
}
