//! Minimum-cost flow over the small bipartite demand network built by the
//! directed solver's degree-balancing step. Successive shortest augmenting
//! paths (SSP) on an explicit residual graph - the network here is a small
//! fraction of `D`'s size, so constants dominate over asymptotics.

use crate::error::SolverError;
use crate::N64;

/// One unit of demand to move from `from` (a `D⁻` node, surplus inbound) to
/// `to` (a `D⁺` node, surplus outbound), at `units` required units and `cost`
/// per unit (the cached shortest-path distance in `D`).
pub struct Demand {
    pub from: usize,
    pub to: usize,
    pub units: u32,
    pub cost: N64,
}

#[derive(Clone, Copy)]
struct ResidualEdge {
    to: usize,
    cap: u32,
    cost: N64,
}

/// Solves min-cost flow on the complete bipartite graph `supply -> demand`
/// where arc `(i, j)` has the given `cost[i][j]` (`None` = no arc) and
/// unbounded capacity, with supply `supply[i]` units at source `i` and
/// demand `demand[j]` units at sink `j` (`sum(supply) == sum(demand)`).
///
/// Builds a source/sink residual network (`source -> supply -> demand ->
/// sink`) and repeatedly augments along a Bellman-Ford shortest path - safe
/// here since residual arcs can carry negative cost, and the network is
/// small enough that Bellman-Ford's lack of a Dijkstra-with-potentials
/// speedup doesn't matter.
pub fn min_cost_flow(
    supply: &[u32],
    demand: &[u32],
    cost: &[Vec<Option<N64>>],
    supply_labels: &[crate::NodeId],
    demand_labels: &[crate::NodeId],
) -> Result<Vec<Demand>, SolverError> {
    let ns = supply.len();
    let nd = demand.len();
    let source = 0usize;
    let supply_base = 1usize;
    let demand_base = supply_base + ns;
    let sink = demand_base + nd;
    let n = sink + 1;

    // adj[v] holds indices into `edges` of arcs leaving v; `edges[e]` and
    // `edges[e ^ 1]` are always the forward/backward pair.
    let mut edges: Vec<ResidualEdge> = Vec::new();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut add_edge = |edges: &mut Vec<ResidualEdge>, adj: &mut Vec<Vec<usize>>, from: usize, to: usize, cap: u32, cost: N64| {
        adj[from].push(edges.len());
        edges.push(ResidualEdge { to, cap, cost });
        adj[to].push(edges.len());
        edges.push(ResidualEdge {
            to: from,
            cap: 0,
            cost: -cost,
        });
    };

    let zero = crate::n64(0.0);
    for i in 0..ns {
        add_edge(&mut edges, &mut adj, source, supply_base + i, supply[i], zero);
    }
    for j in 0..nd {
        add_edge(&mut edges, &mut adj, demand_base + j, sink, demand[j], zero);
    }
    let mut arc_edge: Vec<Vec<Option<usize>>> = vec![vec![None; nd]; ns];
    for i in 0..ns {
        for j in 0..nd {
            if let Some(c) = cost[i][j] {
                arc_edge[i][j] = Some(edges.len());
                add_edge(&mut edges, &mut adj, supply_base + i, demand_base + j, u32::MAX / 2, c);
            }
        }
    }

    let total_supply: u32 = supply.iter().sum();
    let mut sent = 0u32;
    while sent < total_supply {
        // Bellman-Ford shortest path source -> sink in the residual graph.
        let mut dist: Vec<Option<N64>> = vec![None; n];
        let mut prev_edge: Vec<Option<usize>> = vec![None; n];
        dist[source] = Some(zero);
        for _ in 0..n {
            let mut relaxed = false;
            for v in 0..n {
                let dv = match dist[v] {
                    Some(d) => d,
                    None => continue,
                };
                for &e in &adj[v] {
                    if edges[e].cap == 0 {
                        continue;
                    }
                    let to = edges[e].to;
                    let nd_ = dv + edges[e].cost;
                    if dist[to].map_or(true, |d| nd_ < d) {
                        dist[to] = Some(nd_);
                        prev_edge[to] = Some(e);
                        relaxed = true;
                    }
                }
            }
            if !relaxed {
                break;
            }
        }

        if dist[sink].is_none() {
            let i = (0..ns).find(|&i| {
                let v = supply_base + i;
                // still has unsent supply reachable from source but no path to sink
                edges[adj[source][i]].cap > 0 && dist[v].is_none()
            });
            let (from_label, to_label) = match i {
                Some(i) => (supply_labels[i], demand_labels.first().copied().unwrap_or(supply_labels[i])),
                None => (
                    supply_labels.first().copied().unwrap_or(0),
                    demand_labels.first().copied().unwrap_or(0),
                ),
            };
            return Err(SolverError::FlowInfeasible {
                from: from_label,
                to: to_label,
            });
        }

        // bottleneck along the recovered path
        let mut bottleneck = u32::MAX;
        let mut v = sink;
        while v != source {
            let e = prev_edge[v].unwrap();
            bottleneck = bottleneck.min(edges[e].cap);
            v = edges[e ^ 1].to;
        }
        bottleneck = bottleneck.min(total_supply - sent);

        let mut v = sink;
        while v != source {
            let e = prev_edge[v].unwrap();
            edges[e].cap -= bottleneck;
            edges[e ^ 1].cap += bottleneck;
            v = edges[e ^ 1].to;
        }
        sent += bottleneck;
    }

    let mut out = Vec::new();
    for i in 0..ns {
        for j in 0..nd {
            if let Some(e) = arc_edge[i][j] {
                // flow on a forward arc equals how much of its original
                // capacity has been consumed, i.e. its reverse twin's cap.
                let flow = edges[e ^ 1].cap;
                if flow > 0 {
                    out.push(Demand {
                        from: i,
                        to: j,
                        units: flow,
                        cost: cost[i][j].unwrap(),
                    });
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n64;

    #[test]
    fn routes_single_unit_along_only_arc() {
        let cost = vec![vec![Some(n64(3.0))]];
        let flows = min_cost_flow(&[1], &[1], &cost, &[10], &[20]).unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].units, 1);
        assert_eq!(flows[0].cost, n64(3.0));
    }

    #[test]
    fn finds_globally_optimal_assignment_not_just_greedy() {
        // s0 -> d0 = 2, s0 -> d1 = 3; s1 -> d0 = 3, s1 -> d1 = 2.
        // Greedy cheapest-cell-first could pick the same diagonal here
        // (2+2=4 beats 3+3=6), so this mainly pins down the expected total.
        let cost = vec![
            vec![Some(n64(2.0)), Some(n64(3.0))],
            vec![Some(n64(3.0)), Some(n64(2.0))],
        ];
        let flows = min_cost_flow(&[1, 1], &[1, 1], &cost, &[0, 1], &[0, 1]).unwrap();
        let total: f64 = flows.iter().map(|f| f.cost.raw() * f.units as f64).sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn reports_unreachable_pair() {
        let cost = vec![vec![None]];
        let err = min_cost_flow(&[1], &[1], &cost, &[5], &[6]).unwrap_err();
        matches!(err, SolverError::FlowInfeasible { from: 5, to: 6 });
    }
}
