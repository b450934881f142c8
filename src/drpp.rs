//! The directed RPP solver. Connects `R_d`'s
//! strongly connected components, adds the required arcs, then balances
//! in/out degree with a minimum-cost flow over the small `D⁻ x D⁺` network.

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::SolverError;
use crate::flow::min_cost_flow;
use crate::graph::{Edge, EdgeKind, Multigraph, NodeIdx};

pub struct SccReport {
    pub scc_count: usize,
    pub largest_scc_size: usize,
    pub largest_scc_index: usize,
    pub blockers: Vec<BlockerArc>,
}

pub struct BlockerArc {
    pub u: NodeIdx,
    pub v: NodeIdx,
    pub weight: crate::N64,
    pub geometry: Option<crate::geo_types::Polyline>,
}

/// Index of the largest SCC, ties broken by smallest contained node id.
/// `sccs` is assumed sorted by ascending minimum node id per SCC
/// (as [`Multigraph::strongly_connected_components`] returns it), so the
/// first-seen maximum is the correct tie-break winner -
/// `Iterator::max_by_key` would instead keep the *last* maximum and silently
/// violate the tie-break rule.
fn largest_scc_index(sccs: &[Vec<NodeIdx>]) -> usize {
    if sccs.is_empty() {
        return 0;
    }
    let mut best = 0usize;
    for (i, c) in sccs.iter().enumerate() {
        if c.len() > sccs[best].len() {
            best = i;
        }
    }
    best
}

/// Runs the pre-flight SCC analysis: finds the largest SCC of
/// `d` and the `r_d` arcs that touch a node outside it ("blockers").
pub fn analyze(d: &Multigraph, r_d: &Multigraph) -> SccReport {
    let (scc_of, sccs) = d.strongly_connected_components();
    let largest_scc_index = largest_scc_index(&sccs);
    let in_largest = |n: NodeIdx| scc_of[n] == Some(largest_scc_index);

    let blockers = r_d
        .edges()
        .iter()
        .filter(|e| !in_largest(e.u) || !in_largest(e.v))
        .map(|e| BlockerArc {
            u: e.u,
            v: e.v,
            weight: e.weight,
            geometry: e.geometry.clone(),
        })
        .collect();

    SccReport {
        scc_count: sccs.len(),
        largest_scc_size: sccs.get(largest_scc_index).map_or(0, |c| c.len()),
        largest_scc_index,
        blockers,
    }
}

/// Drops arcs touching a node outside `d`'s largest SCC from `r_d`.
pub fn drop_blockers(r_d: &Multigraph, report: &SccReport) -> Multigraph {
    let blocked: HashSet<(NodeIdx, NodeIdx)> =
        report.blockers.iter().map(|b| (b.u, b.v)).collect();
    let mut out = Multigraph::new(Rc::clone(&r_d.nodes));
    for e in r_d.edges() {
        if !blocked.contains(&(e.u, e.v)) {
            out.add_edge(e.u, e.v, true, e.weight, e.geometry.clone(), e.kind);
        }
    }
    out
}

/// Returns the error for strict mode when required arcs span more than one
/// SCC of `d`, listing up to 5 SCCs with sample nodes.
pub fn multi_scc_error(d: &Multigraph, r_d: &Multigraph) -> SolverError {
    let (scc_of, sccs) = d.strongly_connected_components();
    let mut touched: Vec<usize> = r_d
        .edges()
        .iter()
        .flat_map(|e| [scc_of[e.u], scc_of[e.v]])
        .flatten()
        .collect();
    touched.sort_unstable();
    touched.dedup();
    let samples = touched
        .iter()
        .take(5)
        .map(|&i| (d.nodes.ext_id(sccs[i][0]), sccs[i].len()))
        .collect();
    SolverError::MultiSccRequired {
        scc_count: touched.len(),
        largest_scc_size: sccs.iter().map(|c| c.len()).max().unwrap_or(0),
        samples,
    }
}

/// Builds `E` from `R_d` (required arcs, already blocker-filtered if
/// applicable) using `D` for connector/duplicate shortest paths.
pub fn solve(
    r_d: &Multigraph,
    d: &Multigraph,
    endpoints: Option<(NodeIdx, NodeIdx)>,
) -> Result<Multigraph, SolverError> {
    let mut e = Multigraph::new(Rc::clone(&d.nodes));

    // Step 1: component connection. Using strongly connected components of
    // R_d here would treat a single required arc A->B as two singleton
    // SCCs {A},{B}, forcing a spurious connector duplicate of that same arc
    // before degree balancing even runs. Weakly connected components -
    // mirroring the undirected solver's "connected components" step - only
    // stitch together genuinely separate required pieces instead.
    let components = r_d.weakly_connected_components();
    let mut reps: Vec<NodeIdx> = components.iter().map(|c| *c.iter().min().unwrap()).collect();
    reps.sort_unstable();
    for pair in reps.windows(2) {
        materialize_directed_path(&mut e, d, pair[0], pair[1], EdgeKind::Connector)?;
    }

    // Step 2: required arcs.
    for edge in r_d.edges() {
        e.add_edge(edge.u, edge.v, true, edge.weight, edge.geometry.clone(), EdgeKind::Required);
    }

    // Step 3 & 4: degree balancing, with the open-tour adjustment folded
    // into delta before the D-/D+ split, rather than patched on afterward.
    balance_degrees(&mut e, d, endpoints)?;

    verify(&e, endpoints)?;
    Ok(e)
}

fn materialize_directed_path(
    e: &mut Multigraph,
    d: &Multigraph,
    a: NodeIdx,
    b: NodeIdx,
    kind: EdgeKind,
) -> Result<(), SolverError> {
    let (reverse, nodes) = match d.shortest_path(a, b) {
        Some((_, _, nodes)) => (false, nodes),
        None => match d.shortest_path(b, a) {
            Some((_, _, nodes)) => (true, nodes),
            None => {
                return Err(SolverError::DisconnectedRequiredComponents {
                    a: d.nodes.ext_id(a),
                    b: d.nodes.ext_id(b),
                })
            }
        },
    };
    let nodes = if reverse {
        let mut n = nodes;
        n.reverse();
        n
    } else {
        nodes
    };
    for pair in nodes.windows(2) {
        add_directed_from(e, d, pair[0], pair[1], kind);
    }
    Ok(())
}

fn cheapest_arc<'a>(d: &'a Multigraph, u: NodeIdx, v: NodeIdx) -> Option<&'a Edge> {
    d.incident(u)
        .iter()
        .map(|&id| d.edge(id))
        .filter(|edge| edge.traversable_from(u) && edge.other(u) == v)
        .min_by_key(|edge| edge.weight)
}

fn add_directed_from(e: &mut Multigraph, d: &Multigraph, u: NodeIdx, v: NodeIdx, kind: EdgeKind) {
    match cheapest_arc(d, u, v) {
        Some(edge) => {
            e.add_edge(u, v, true, edge.weight, edge.geometry.clone(), kind);
        }
        None => {
            e.add_edge(u, v, true, crate::n64(0.0), None, kind);
        }
    }
}

fn balance_degrees(
    e: &mut Multigraph,
    d: &Multigraph,
    endpoints: Option<(NodeIdx, NodeIdx)>,
) -> Result<(), SolverError> {
    let n = e.node_count();
    let mut delta: Vec<i64> = vec![0; n];
    for node in e.active_nodes() {
        delta[node] = e.out_degree(node) as i64 - e.in_degree(node) as i64;
    }
    if let Some((s, t)) = endpoints {
        if s != t {
            delta[s] -= 1;
            delta[t] += 1;
        }
    }

    let minus: Vec<NodeIdx> = (0..n).filter(|&nd| delta[nd] < 0).collect();
    let plus: Vec<NodeIdx> = (0..n).filter(|&nd| delta[nd] > 0).collect();
    if minus.is_empty() && plus.is_empty() {
        return Ok(());
    }

    let supply: Vec<u32> = minus.iter().map(|&nd| (-delta[nd]) as u32).collect();
    let demand: Vec<u32> = plus.iter().map(|&nd| delta[nd] as u32).collect();

    let mut cost = vec![vec![None; plus.len()]; minus.len()];
    let mut paths: Vec<Vec<Vec<NodeIdx>>> = vec![vec![Vec::new(); plus.len()]; minus.len()];
    for (i, &u) in minus.iter().enumerate() {
        for (j, &v) in plus.iter().enumerate() {
            if let Some((w, _, nodes)) = d.shortest_path(u, v) {
                cost[i][j] = Some(w);
                paths[i][j] = nodes;
            }
        }
    }

    let supply_labels: Vec<crate::NodeId> = minus.iter().map(|&n| d.nodes.ext_id(n)).collect();
    let demand_labels: Vec<crate::NodeId> = plus.iter().map(|&n| d.nodes.ext_id(n)).collect();
    let flows = min_cost_flow(&supply, &demand, &cost, &supply_labels, &demand_labels)?;

    for f in flows {
        for _ in 0..f.units {
            for pair in paths[f.from][f.to].windows(2) {
                add_directed_from(e, d, pair[0], pair[1], EdgeKind::Duplicate);
            }
        }
    }
    Ok(())
}

fn verify(e: &Multigraph, endpoints: Option<(NodeIdx, NodeIdx)>) -> Result<(), SolverError> {
    let components = e.weakly_connected_components();
    if components.len() > 1 {
        return Err(SolverError::InvariantFailure(format!(
            "E is not weakly connected: {} components",
            components.len()
        )));
    }
    let expect_imbalance = match endpoints {
        Some((s, t)) if s != t => Some((s, t)),
        _ => None,
    };
    for n in e.active_nodes() {
        let delta = e.out_degree(n) as i64 - e.in_degree(n) as i64;
        let expected = match expect_imbalance {
            Some((s, _)) if s == n => 1,
            Some((_, t)) if t == n => -1,
            _ => 0,
        };
        if delta != expected {
            return Err(SolverError::InvariantFailure(format!(
                "node {} has imbalance {}, expected {}",
                e.nodes.ext_id(n),
                delta,
                expected
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

    /// Two equally-sized SCCs: the one containing the smaller node id must
    /// win the tie (the smallest node id wins rule), not whichever
    /// SCC Tarjan happens to finish last.
    #[test]
    fn largest_scc_tie_breaks_towards_smallest_node_id() {
        let mut t = NodeTable::new();
        for i in 0..4 {
            t.intern(i, 0.0, 0.0);
        }
        let mut d = Multigraph::new(Rc::new(t));
        d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(1, 0, true, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(2, 3, true, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(3, 2, true, n64(1.0), None, EdgeKind::Physical);
        d.add_edge(1, 2, true, n64(1.0), None, EdgeKind::Physical);

        let mut r_d = Multigraph::new(Rc::clone(&d.nodes));
        r_d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Required);
        r_d.add_edge(2, 3, true, n64(1.0), None, EdgeKind::Required);

        let report = analyze(&d, &r_d);
        assert_eq!(report.largest_scc_index, 0);
        // only the {2,3} arc should be flagged a blocker
        assert_eq!(report.blockers.len(), 1);
        assert_eq!(report.blockers[0].u, 2);
        assert_eq!(report.blockers[0].v, 3);
    }
}
