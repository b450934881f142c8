//! The endpoint snapper. Resolves a requested
//! `(lat, lon)` to the nearest node in `E`'s largest connected component.

use geo::{HaversineDistance, Point};

use crate::error::SolverError;
use crate::graph::{Multigraph, NodeIdx};

pub struct Snapped {
    pub node: NodeIdx,
    pub lat: f64,
    pub lon: f64,
    pub distance_m: f64,
    pub strategy: &'static str,
}

/// Snaps `target` to the nearest node of `e`'s largest connected component.
/// `weakly` selects weak (directed) vs. plain connectivity: the largest
/// connected component of `E` (weakly connected if directed).
pub fn snap(e: &Multigraph, target: (f64, f64), weakly: bool) -> Option<Snapped> {
    let _ = weakly; // weak connectivity is what Multigraph::weakly_connected_components always computes
    let components = e.weakly_connected_components();
    let largest = components.iter().max_by_key(|c| c.len())?;

    let (target_lat, target_lon) = target;
    let target_point = Point::new(target_lon, target_lat);
    largest
        .iter()
        .map(|&n| {
            let (lat, lon) = e.nodes.coord(n);
            let dist = Point::new(lon, lat).haversine_distance(&target_point);
            (n, lat, lon, dist)
        })
        .min_by(|a, b| a.3.partial_cmp(&b.3).unwrap())
        .map(|(node, lat, lon, distance_m)| Snapped {
            node,
            lat,
            lon,
            distance_m,
            strategy: "largest_component",
        })
}

/// Validates the `--start`/`--end` combination: supplying `end` without
/// `start` is an input error.
pub fn validate_endpoint_request(
    start: Option<(f64, f64)>,
    end: Option<(f64, f64)>,
) -> Result<(), SolverError> {
    if start.is_none() && end.is_some() {
        return Err(SolverError::InputError(
            "`end` was supplied without `start`".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, NodeTable};
    use crate::n64;
    use std::rc::Rc;

    #[test]
    fn snaps_to_nearest_node_in_largest_component() {
        let mut t = NodeTable::new();
        t.intern(1, 0.0, 0.0);
        t.intern(2, 0.0, 1.0);
        t.intern(3, 10.0, 10.0); // isolated, not in E
        let mut g = Multigraph::new(Rc::new(t));
        g.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
        let snapped = snap(&g, (0.01, 0.01), true).unwrap();
        assert_eq!(snapped.strategy, "largest_component");
        assert!(snapped.node == 0 || snapped.node == 1);
    }

    #[test]
    fn end_without_start_is_input_error() {
        assert!(validate_endpoint_request(None, Some((1.0, 1.0))).is_err());
        assert!(validate_endpoint_request(Some((1.0, 1.0)), Some((2.0, 2.0))).is_ok());
    }
}
