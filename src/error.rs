//! Error taxonomy. Every solver failure is one of these variants;
//! `main` prints `Display` to stderr and exits non-zero.

use crate::NodeId;

#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    #[error("input error: {0}")]
    InputError(String),

    #[error("empty graph: no drivable edges after filtering")]
    EmptyGraph,

    #[error("disconnected required components: no path in D between node {a} and node {b} in either direction")]
    DisconnectedRequiredComponents { a: NodeId, b: NodeId },

    #[error("required edges span {scc_count} SCCs of the driving graph (largest has {largest_scc_size} nodes); samples: {samples:?}")]
    MultiSccRequired {
        scc_count: usize,
        largest_scc_size: usize,
        samples: Vec<(i64, usize)>,
    },

    #[error("odd-degree matching infeasible: node {node} has no reachable matching partner")]
    MatchingInfeasible { node: NodeId },

    #[error("min-cost-flow infeasible: no directed path from {from} to {to}")]
    FlowInfeasible { from: NodeId, to: NodeId },

    #[error("invariant failure: {0}")]
    InvariantFailure(String),

    #[error("io error at {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SolverError>;
