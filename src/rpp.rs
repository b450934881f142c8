//! The undirected RPP solver. Builds the Eulerian
//! multigraph `E` by connecting `R`'s components, then fixing the resulting
//! odd-degree nodes with a minimum-weight T-join.
//!
//! `E`'s edges are all undirected regardless of the underlying street's
//! one-way status (grounded in the original prototype's use of
//! `networkx.MultiGraph`, which has no notion of direction) - `D` is used
//! only to *find* connector/duplicate paths, so they're guaranteed drivable
//! in at least one direction; the tour extractor and geometry exporter are
//! what make that direction concrete in the final output.

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::SolverError;
use crate::graph::{EdgeKind, Multigraph, NodeIdx};
use crate::matching::min_weight_perfect_matching;

/// Builds `E` from `R` (required edges, undirected) using `D` (directed, for
/// connector/duplicate path-finding) and `S` (undirected, for the geometry
/// and weight those paths are materialized with).
///
/// `endpoints`, if `Some((s, t))` with `s != t`, requests an open tour: the
/// T-join step is solved over `O △ {s, t}` instead of `O`.
pub fn solve(
    r: &Multigraph,
    d: &Multigraph,
    s: &Multigraph,
    endpoints: Option<(NodeIdx, NodeIdx)>,
) -> Result<Multigraph, SolverError> {
    let mut e = Multigraph::new(Rc::clone(&s.nodes));

    // Step 1: component connection. An empty `r` (no required streets
    // matched) is a valid input - zero components means zero representatives
    // to connect, and steps 2-5 below fall through to an empty `E` with no
    // odd nodes to join.
    let components = r.weakly_connected_components();
    let mut reps: Vec<NodeIdx> = components
        .iter()
        .map(|c| *c.iter().min().unwrap())
        .collect();
    reps.sort_unstable();

    for pair in reps.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        materialize_shortest_path(&mut e, d, s, a, b)?;
    }

    // Step 2: required edges.
    for edge in r.edges() {
        e.add_edge(edge.u, edge.v, false, edge.weight, edge.geometry.clone(), EdgeKind::Required);
    }

    // Step 3: odd-degree T-join.
    let mut odd: Vec<NodeIdx> = e.active_nodes().filter(|&n| e.degree_undirected(n) % 2 == 1).collect();
    odd.sort_unstable();

    if let Some((start, end)) = endpoints {
        if start != end {
            symmetric_difference_in_place(&mut odd, start, end);
        }
    }

    join_odd_nodes(&mut e, d, s, &odd)?;

    // Step 5: invariants.
    verify(&e, endpoints)?;
    Ok(e)
}

fn symmetric_difference_in_place(odd: &mut Vec<NodeIdx>, s: NodeIdx, t: NodeIdx) {
    for n in [s, t] {
        match odd.iter().position(|&x| x == n) {
            Some(pos) => {
                odd.remove(pos);
            }
            None => odd.push(n),
        }
    }
    odd.sort_unstable();
}

/// Finds a shortest path `a -> b` in `d`; on failure tries `b -> a` and
/// reverses it. Fails with `DisconnectedRequiredComponents` if neither
/// direction reaches. Materializes the path's node pairs as `kind`-tagged
/// edges in `e`, weight/geometry taken from `s`.
fn materialize_shortest_path(
    e: &mut Multigraph,
    d: &Multigraph,
    s: &Multigraph,
    a: NodeIdx,
    b: NodeIdx,
) -> Result<(), SolverError> {
    let nodes = match d.shortest_path(a, b) {
        Some((_, _, nodes)) => nodes,
        None => match d.shortest_path(b, a) {
            Some((_, _, mut nodes)) => {
                nodes.reverse();
                nodes
            }
            None => {
                return Err(SolverError::DisconnectedRequiredComponents {
                    a: d.nodes.ext_id(a),
                    b: d.nodes.ext_id(b),
                })
            }
        },
    };
    for pair in nodes.windows(2) {
        add_from_service(e, s, pair[0], pair[1], EdgeKind::Connector);
    }
    Ok(())
}

/// Adds the cheapest `s`-edge between `u` and `v` into `e`, preferring
/// geometry-bearing candidates and breaking ties by weight.
fn add_from_service(e: &mut Multigraph, s: &Multigraph, u: NodeIdx, v: NodeIdx, kind: EdgeKind) {
    let candidates: Vec<_> = s
        .incident(u)
        .iter()
        .map(|&id| s.edge(id))
        .filter(|edge| edge.other(u) == v)
        .collect();
    let chosen = candidates
        .iter()
        .filter(|edge| edge.geometry.is_some())
        .min_by_key(|edge| edge.weight)
        .or_else(|| candidates.iter().min_by_key(|edge| edge.weight));
    match chosen {
        Some(edge) => {
            e.add_edge(u, v, false, edge.weight, edge.geometry.clone(), kind);
        }
        None => {
            // no direct S edge (shouldn't happen - D and S share edges) -
            // fall back to a geometry-less straight segment.
            e.add_edge(u, v, false, crate::n64(0.0), None, kind);
        }
    }
}

fn join_odd_nodes(
    e: &mut Multigraph,
    d: &Multigraph,
    s: &Multigraph,
    odd: &[NodeIdx],
) -> Result<(), SolverError> {
    if odd.is_empty() {
        return Ok(());
    }
    let n = odd.len();
    let mut cost = vec![vec![None; n]; n];
    let mut paths: Vec<Vec<Vec<NodeIdx>>> = vec![vec![Vec::new(); n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let (u, v) = (odd[i], odd[j]);
            let found = d.shortest_path(u, v).or_else(|| {
                d.shortest_path(v, u).map(|(w, edges, mut nodes)| {
                    nodes.reverse();
                    (w, edges, nodes)
                })
            });
            if let Some((w, _, nodes)) = found {
                cost[i][j] = Some(w);
                cost[j][i] = Some(w);
                paths[i][j] = nodes.clone();
                paths[j][i] = nodes;
            }
        }
    }
    let labels: Vec<crate::NodeId> = odd.iter().map(|&n| d.nodes.ext_id(n)).collect();
    let pairs = min_weight_perfect_matching(&cost, &labels)?;
    for (i, j) in pairs {
        for pair in paths[i][j].windows(2) {
            add_from_service(e, s, pair[0], pair[1], EdgeKind::Duplicate);
        }
    }
    Ok(())
}

fn verify(e: &Multigraph, endpoints: Option<(NodeIdx, NodeIdx)>) -> Result<(), SolverError> {
    let active: HashSet<NodeIdx> = e.active_nodes().collect();
    let components = e.weakly_connected_components();
    let non_trivial: Vec<_> = components.into_iter().filter(|c| !c.is_empty()).collect();
    if non_trivial.len() > 1 {
        return Err(SolverError::InvariantFailure(format!(
            "E is not connected: {} components over {} nodes",
            non_trivial.len(),
            active.len()
        )));
    }

    let expect_odd = match endpoints {
        Some((s, t)) if s != t => Some((s, t)),
        _ => None,
    };
    for &n in &active {
        let deg = e.degree_undirected(n);
        let should_be_odd = expect_odd.map_or(false, |(s, t)| n == s || n == t);
        if should_be_odd && deg % 2 == 0 {
            return Err(SolverError::InvariantFailure(format!(
                "endpoint node {} has even degree {}",
                e.nodes.ext_id(n),
                deg
            )));
        }
        if !should_be_odd && deg % 2 == 1 {
            return Err(SolverError::InvariantFailure(format!(
                "non-endpoint node {} has odd degree {}",
                e.nodes.ext_id(n),
                deg
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeTable;
    use crate::n64;

    fn triangle() -> (Multigraph, Multigraph, Rc<NodeTable>) {
        let mut t = NodeTable::new();
        for i in 0..3 {
            t.intern(i, 0.0, 0.0);
        }
        let t = Rc::new(t);
        let mut d = Multigraph::new(Rc::clone(&t));
        d.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(2, 0, false, n64(1.0), None, EdgeKind::Physical);
        let s = d.clone();
        (d.clone(), s, t)
    }

    #[test]
    fn single_required_edge_on_triangle_gets_duplicated_closed() {
        let (d, s, t) = triangle();
        let mut r = Multigraph::new(Rc::clone(&t));
        r.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        let e = solve(&r, &d, &s, None).unwrap();
        // every node must end up even degree for a closed tour
        for n in e.active_nodes() {
            assert_eq!(e.degree_undirected(n) % 2, 0);
        }
    }

    #[test]
    fn open_tour_endpoints_end_up_odd() {
        let (d, s, t) = triangle();
        let mut r = Multigraph::new(Rc::clone(&t));
        r.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        r.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);
        let e = solve(&r, &d, &s, Some((0, 2))).unwrap();
        assert_eq!(e.degree_undirected(0) % 2, 1);
        assert_eq!(e.degree_undirected(2) % 2, 1);
    }

    #[test]
    fn empty_required_set_succeeds_with_empty_eulerian_graph() {
        let (d, s, t) = triangle();
        let r = Multigraph::new(Rc::clone(&t));
        let e = solve(&r, &d, &s, None).unwrap();
        assert_eq!(e.edge_count(), 0);
    }
}
