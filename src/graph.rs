//! Core multigraph storage shared by the driving graph, the required-edge
//! subgraph and the Eulerian output graph.
//!
//! Node ids are OSM's 64-bit integers, not contiguous, so they're mapped to
//! dense indices once, at load time, in a shared [`NodeTable`] so `D`, `R`
//! and `E` can all address the same node space without re-indexing. Edges
//! are id-indexed (not just node pairs) so parallel edges - a duplicated
//! required street is not the "same" edge as the original - stay
//! distinguishable.

use std::collections::HashMap;
use std::rc::Rc;

use priority_queue::PriorityQueue;

use crate::geo_types::Polyline;
use crate::{n64, NodeIdx, N64};

pub type EdgeId = usize;

/// Maps OSM node ids to dense indices, and dense indices back to coordinates.
/// Shared (via `Rc`) across `D`, `R` and `E` so they address one node space.
#[derive(Debug)]
pub struct NodeTable {
    ext_id: Vec<i64>,
    coord: Vec<(f64, f64)>, // (lat, lon)
    index: HashMap<i64, NodeIdx>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self {
            ext_id: Vec::new(),
            coord: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the dense index for `ext_id`, assigning a new one if unseen.
    pub fn intern(&mut self, ext_id: i64, lat: f64, lon: f64) -> NodeIdx {
        if let Some(idx) = self.index.get(&ext_id) {
            return *idx;
        }
        let idx = self.ext_id.len();
        self.ext_id.push(ext_id);
        self.coord.push((lat, lon));
        self.index.insert(ext_id, idx);
        idx
    }

    pub fn lookup(&self, ext_id: i64) -> Option<NodeIdx> {
        self.index.get(&ext_id).copied()
    }

    pub fn ext_id(&self, n: NodeIdx) -> i64 {
        self.ext_id[n]
    }

    pub fn coord(&self, n: NodeIdx) -> (f64, f64) {
        self.coord[n]
    }

    pub fn len(&self) -> usize {
        self.ext_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ext_id.is_empty()
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// What role an edge of the Eulerian output graph plays. Edges of
/// `D`, `S` and `R` are all tagged `Physical` since the tag is meaningless
/// before the solver runs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    Physical,
    Required,
    Connector,
    Duplicate,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub u: NodeIdx,
    pub v: NodeIdx,
    /// `true`: one-way arc, traversable only `u -> v`. `false`: traversable
    /// both ways.
    pub directed: bool,
    pub weight: N64,
    pub geometry: Option<Polyline>,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn other(&self, n: NodeIdx) -> NodeIdx {
        if n == self.u {
            self.v
        } else {
            self.u
        }
    }

    /// Whether this edge may be walked starting from `n`.
    pub fn traversable_from(&self, n: NodeIdx) -> bool {
        !self.directed || self.u == n
    }
}

/// A multigraph over a shared node space. Used for the driving graph `D`,
/// the required-edge subgraph `R` (undirected or directed) and the Eulerian
/// output graph `E`.
#[derive(Clone, Debug)]
pub struct Multigraph {
    pub nodes: Rc<NodeTable>,
    edges: Vec<Edge>,
    incident: Vec<Vec<EdgeId>>,
}

impl Multigraph {
    pub fn new(nodes: Rc<NodeTable>) -> Self {
        let n = nodes.len();
        Self {
            nodes,
            edges: Vec::new(),
            incident: vec![Vec::new(); n],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn incident(&self, n: NodeIdx) -> &[EdgeId] {
        &self.incident[n]
    }

    pub fn add_edge(
        &mut self,
        u: NodeIdx,
        v: NodeIdx,
        directed: bool,
        weight: N64,
        geometry: Option<Polyline>,
        kind: EdgeKind,
    ) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            u,
            v,
            directed,
            weight,
            geometry,
            kind,
        });
        self.incident[u].push(id);
        if v != u {
            self.incident[v].push(id);
        } else {
            // self-loops aren't expected from this pipeline's construction,
            // but keep degree accounting sane if one ever appears.
            self.incident[u].push(id);
        }
        id
    }

    /// Edges reachable departing from `n`, as `(edge id, other endpoint)`.
    pub fn out_neighbors(&self, n: NodeIdx) -> impl Iterator<Item = (EdgeId, NodeIdx)> + '_ {
        self.incident[n]
            .iter()
            .copied()
            .filter(move |&eid| self.edges[eid].traversable_from(n))
            .map(move |eid| (eid, self.edges[eid].other(n)))
    }

    /// Total incident edges, ignoring direction (undirected degree).
    pub fn degree_undirected(&self, n: NodeIdx) -> usize {
        self.incident[n].len()
    }

    pub fn out_degree(&self, n: NodeIdx) -> usize {
        self.incident[n]
            .iter()
            .filter(|&&eid| self.edges[eid].traversable_from(n))
            .count()
    }

    pub fn in_degree(&self, n: NodeIdx) -> usize {
        self.incident[n]
            .iter()
            .filter(|&&eid| {
                let e = &self.edges[eid];
                !e.directed || e.v == n
            })
            .count()
    }

    /// Nodes with at least one incident edge.
    pub fn active_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        (0..self.node_count()).filter(move |&n| !self.incident[n].is_empty())
    }

    /// Weakly connected components restricted to nodes with at least one
    /// incident edge; direction is ignored.
    pub fn weakly_connected_components(&self) -> Vec<Vec<NodeIdx>> {
        let n = self.node_count();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }
        for e in &self.edges {
            let (ru, rv) = (find(&mut parent, e.u), find(&mut parent, e.v));
            if ru != rv {
                parent[ru] = rv;
            }
        }
        let mut groups: HashMap<usize, Vec<NodeIdx>> = HashMap::new();
        for node in self.active_nodes() {
            let root = find(&mut parent, node);
            groups.entry(root).or_default().push(node);
        }
        let mut components: Vec<Vec<NodeIdx>> = groups.into_values().collect();
        components.sort_by_key(|c| *c.iter().min().unwrap());
        components
    }

    /// Strongly connected components (Tarjan), iterative to avoid recursion
    /// limits on large driving graphs. Returns `(scc_id_per_node, sccs)`
    /// where `sccs[i]` lists the nodes of SCC `i`, sorted by smallest
    /// contained node id (ties for "largest" are broken by this ordering).
    pub fn strongly_connected_components(&self) -> (Vec<Option<usize>>, Vec<Vec<NodeIdx>>) {
        let n = self.node_count();
        let mut index: Vec<Option<usize>> = vec![None; n];
        let mut lowlink: Vec<usize> = vec![0; n];
        let mut on_stack: Vec<bool> = vec![false; n];
        let mut stack: Vec<NodeIdx> = Vec::new();
        let mut next_index = 0usize;
        let mut sccs: Vec<Vec<NodeIdx>> = Vec::new();

        // Explicit-stack DFS: frames record the node and, on return, which
        // child's lowlink should be folded into it.
        enum Frame {
            Enter(NodeIdx),
            Return(NodeIdx, NodeIdx),
        }

        for start in self.active_nodes() {
            if index[start].is_some() {
                continue;
            }
            let mut work: Vec<Frame> = vec![Frame::Enter(start)];
            let mut cursor: HashMap<NodeIdx, usize> = HashMap::new();
            while let Some(frame) = work.pop() {
                match frame {
                    Frame::Enter(v) => {
                        if index[v].is_none() {
                            index[v] = Some(next_index);
                            lowlink[v] = next_index;
                            next_index += 1;
                            stack.push(v);
                            on_stack[v] = true;
                            cursor.insert(v, 0);
                        }
                        let neighbors: Vec<NodeIdx> =
                            self.out_neighbors(v).map(|(_, w)| w).collect();
                        let c = cursor.get_mut(&v).unwrap();
                        let mut descended = false;
                        while *c < neighbors.len() {
                            let w = neighbors[*c];
                            *c += 1;
                            if index[w].is_none() {
                                work.push(Frame::Return(v, w));
                                work.push(Frame::Enter(w));
                                descended = true;
                                break;
                            } else if on_stack[w] {
                                lowlink[v] = lowlink[v].min(index[w].unwrap());
                            }
                        }
                        if descended {
                            work.push(Frame::Enter(v));
                        } else if lowlink[v] == index[v].unwrap() {
                            let mut comp = Vec::new();
                            loop {
                                let w = stack.pop().unwrap();
                                on_stack[w] = false;
                                comp.push(w);
                                if w == v {
                                    break;
                                }
                            }
                            sccs.push(comp);
                        }
                    }
                    Frame::Return(v, child) => {
                        lowlink[v] = lowlink[v].min(lowlink[child]);
                        work.push(Frame::Enter(v));
                    }
                }
            }
        }

        for comp in sccs.iter_mut() {
            comp.sort_unstable();
        }
        sccs.sort_by_key(|c| c[0]);
        let mut scc_of: Vec<Option<usize>> = vec![None; n];
        for (i, comp) in sccs.iter().enumerate() {
            for &node in comp {
                scc_of[node] = Some(i);
            }
        }
        (scc_of, sccs)
    }

    /// Single-source Dijkstra from `src`, respecting edge direction. Distances
    /// are `None` until a node is reached - `N64` is finite-only, so
    /// "unreached" is modeled as an absent entry rather than an infinity.
    pub fn dijkstra(&self, src: NodeIdx) -> ShortestPaths {
        let n = self.node_count();
        let mut dist: Vec<Option<N64>> = vec![None; n];
        let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];
        dist[src] = Some(n64(0.0));
        let mut pq: PriorityQueue<NodeIdx, N64> = PriorityQueue::new();
        pq.push(src, n64(0.0));
        while let Some((u, neg_du)) = pq.pop() {
            let du = -neg_du;
            if dist[u].map_or(true, |d| d != du) {
                continue;
            }
            for (eid, v) in self.out_neighbors(u) {
                let nd = du + self.edge(eid).weight;
                if dist[v].map_or(true, |d| nd < d) {
                    dist[v] = Some(nd);
                    prev_edge[v] = Some(eid);
                    pq.push(v, -nd);
                }
            }
        }
        ShortestPaths { src, dist, prev_edge }
    }

    /// Shortest path from `src` to `dst` as `(distance, edge ids, node ids)`,
    /// or `None` if unreachable.
    pub fn shortest_path(
        &self,
        src: NodeIdx,
        dst: NodeIdx,
    ) -> Option<(N64, Vec<EdgeId>, Vec<NodeIdx>)> {
        let sp = self.dijkstra(src);
        sp.path_to(self, dst)
    }
}

pub struct ShortestPaths {
    pub src: NodeIdx,
    pub dist: Vec<Option<N64>>,
    pub prev_edge: Vec<Option<EdgeId>>,
}

impl ShortestPaths {
    pub fn path_to(
        &self,
        g: &Multigraph,
        dst: NodeIdx,
    ) -> Option<(N64, Vec<EdgeId>, Vec<NodeIdx>)> {
        let d = self.dist[dst]?;
        let mut edges = Vec::new();
        let mut nodes = vec![dst];
        let mut cur = dst;
        while cur != self.src {
            let eid = self.prev_edge[cur]?;
            edges.push(eid);
            cur = g.edge(eid).other(cur);
            nodes.push(cur);
        }
        edges.reverse();
        nodes.reverse();
        Some((d, edges, nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> Rc<NodeTable> {
        let mut t = NodeTable::new();
        for i in 0..n {
            t.intern(i as i64, 0.0, 0.0);
        }
        Rc::new(t)
    }

    #[test]
    fn dijkstra_respects_one_way() {
        let nodes = table(3);
        let mut g = Multigraph::new(nodes);
        // 0 -> 1 one-way, 1 <-> 2 two-way.
        g.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Physical);
        g.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Physical);
        assert!(g.shortest_path(0, 2).is_some());
        assert!(g.shortest_path(2, 0).is_none());
    }

    #[test]
    fn scc_splits_one_way_cycle_halves() {
        let nodes = table(4);
        let mut g = Multigraph::new(nodes);
        // 0 <-> 1 (two-way), 1 -> 2 (one-way), 2 <-> 3 (two-way).
        g.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Physical);
        g.add_edge(1, 2, true, n64(1.0), None, EdgeKind::Physical);
        g.add_edge(2, 3, false, n64(1.0), None, EdgeKind::Physical);
        let (scc_of, sccs) = g.strongly_connected_components();
        assert_eq!(sccs.len(), 2);
        assert_eq!(scc_of[0], scc_of[1]);
        assert_eq!(scc_of[2], scc_of[3]);
        assert_ne!(scc_of[0], scc_of[2]);
    }

    #[test]
    fn weakly_connected_ignores_direction() {
        let nodes = table(3);
        let mut g = Multigraph::new(nodes);
        g.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Physical);
        g.add_edge(1, 2, true, n64(1.0), None, EdgeKind::Physical);
        let wcc = g.weakly_connected_components();
        assert_eq!(wcc.len(), 1);
        assert_eq!(wcc[0].len(), 3);
    }
}
