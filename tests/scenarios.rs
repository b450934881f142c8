//! End-to-end checks against the public solver API, exercising small
//! synthetic graphs built by hand instead of a real OSM extract.

use std::rc::Rc;

use rpp_route_solver::config::RequiredHighways;
use rpp_route_solver::drpp;
use rpp_route_solver::error::SolverError;
use rpp_route_solver::filter::is_drivable;
use rpp_route_solver::geo_types::{AccessTags, HighwayClass, RawEdge};
use rpp_route_solver::graph::{EdgeKind, Multigraph, NodeTable};
use rpp_route_solver::gpx_export::export_geometry;
use rpp_route_solver::n64;
use rpp_route_solver::rpp;
use rpp_route_solver::tour;

fn table(n: usize) -> Rc<NodeTable> {
    let mut t = NodeTable::new();
    for i in 0..n {
        t.intern(i as i64, 0.0, i as f64 * 0.001);
    }
    Rc::new(t)
}

fn total_weight(e: &Multigraph) -> f64 {
    e.edges().iter().map(|edge| edge.weight.raw()).sum()
}

/// Triangle, directed one-way cycle. Arcs A->B, B->C, C->A each weight 1;
/// required = {A->B}. DRPP must add the other two as connector/duplicate
/// arcs, giving a closed tour A->B->C->A of total weight 3.
#[test]
fn triangle_directed_one_way_cycle_closes_via_connectors() {
    let t = table(3);
    let mut d = Multigraph::new(Rc::clone(&t));
    d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(1, 2, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(2, 0, true, n64(1.0), None, EdgeKind::Physical);

    let mut r_d = Multigraph::new(Rc::clone(&t));
    r_d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Required);

    let e = drpp::solve(&r_d, &d, None).unwrap();
    assert_eq!(e.edge_count(), 3);
    assert_eq!(total_weight(&e), 3.0);

    let tour_edges = tour::extract(&e, None).unwrap();
    assert_eq!(tour_edges.len(), 3);
}

/// Bidirectional two-edge path A-B-C, both required. Minimum solution
/// duplicates each edge once: total weight 4, closed tour (all even degree).
#[test]
fn bidirectional_two_edge_path_closed_tour() {
    let t = table(3);
    let mut d = Multigraph::new(Rc::clone(&t));
    d.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Physical);
    let s = d.clone();

    let mut r_u = Multigraph::new(Rc::clone(&t));
    r_u.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
    r_u.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);

    let e = rpp::solve(&r_u, &d, &s, None).unwrap();
    assert_eq!(total_weight(&e), 4.0);
    for n in e.active_nodes() {
        assert_eq!(e.degree_undirected(n) % 2, 0);
    }
}

/// Same graph as above, but an open tour start=A end=C. No duplication
/// needed: exactly A and C end up odd, total weight 2, tour A->B->C.
#[test]
fn open_tour_on_required_path_needs_no_duplication() {
    let t = table(3);
    let mut d = Multigraph::new(Rc::clone(&t));
    d.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Physical);
    let s = d.clone();

    let mut r_u = Multigraph::new(Rc::clone(&t));
    r_u.add_edge(0, 1, false, n64(1.0), None, EdgeKind::Required);
    r_u.add_edge(1, 2, false, n64(1.0), None, EdgeKind::Required);

    let e = rpp::solve(&r_u, &d, &s, Some((0, 2))).unwrap();
    assert_eq!(total_weight(&e), 2.0);
    assert_eq!(e.degree_undirected(0) % 2, 1);
    assert_eq!(e.degree_undirected(2) % 2, 1);

    let tour_edges = tour::extract(&e, Some((0, 2))).unwrap();
    let nodes = tour::walk_nodes(&e, &tour_edges, 0);
    assert_eq!(nodes, vec![0, 1, 2]);
}

/// Two SCCs {A,B} and {C,D} linked one-way B->C. Required arcs = {A->B,
/// C->D}. Strict mode fails with MultiSccRequired; drop-blockers mode keeps
/// only A->B and closes it into a weight-2 tour.
#[test]
fn drpp_blocker_strict_then_drop() {
    let t = table(4); // A=0 B=1 C=2 D=3
    let mut d = Multigraph::new(Rc::clone(&t));
    d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(1, 0, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(2, 3, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(3, 2, true, n64(1.0), None, EdgeKind::Physical);
    d.add_edge(1, 2, true, n64(1.0), None, EdgeKind::Physical);

    let mut r_d = Multigraph::new(Rc::clone(&t));
    r_d.add_edge(0, 1, true, n64(1.0), None, EdgeKind::Required);
    r_d.add_edge(2, 3, true, n64(1.0), None, EdgeKind::Required);

    let report = drpp::analyze(&d, &r_d);
    assert!(!report.blockers.is_empty());

    let err = drpp::multi_scc_error(&d, &r_d);
    assert!(matches!(err, SolverError::MultiSccRequired { .. }));

    let dropped = drpp::drop_blockers(&r_d, &report);
    assert_eq!(dropped.edge_count(), 1);

    let e = drpp::solve(&dropped, &d, None).unwrap();
    assert_eq!(total_weight(&e), 2.0);
}

/// Highway class filter: footway never drivable; tertiary required;
/// primary drivable but not in the default required set.
#[test]
fn highway_class_filter_membership() {
    let footway = RawEdge {
        u: 0,
        v: 1,
        length: 10.0,
        highway: HighwayClass::parse_list("footway"),
        oneway: false,
        geometry: None,
        access: AccessTags::default(),
    };
    let tertiary = RawEdge {
        highway: HighwayClass::parse_list("tertiary"),
        ..footway.clone()
    };
    let primary = RawEdge {
        highway: HighwayClass::parse_list("primary"),
        ..footway.clone()
    };

    assert!(!is_drivable(&footway));
    assert!(is_drivable(&tertiary));
    assert!(is_drivable(&primary));

    let required = RequiredHighways::default_set();
    assert!(required.contains(&HighwayClass::Tertiary));
    assert!(!required.contains(&HighwayClass::Primary));
}

/// Polyline orientation: a stored polyline nearest-to-`u`-first is kept
/// when traversed u->v, reversed when traversed v->u.
#[test]
fn polyline_orientation_follows_traversal_direction() {
    let t = table(2);
    let mut e = Multigraph::new(Rc::clone(&t));
    let geom = vec![(0.0, 0.0), (0.0005, 0.0005), (0.001, 0.001)];
    e.add_edge(0, 1, false, n64(1.0), Some(geom.clone()), EdgeKind::Required);
    let s = e.clone();

    let forward = export_geometry(&[0], &e, &s, &[0, 1]);
    assert_eq!(forward, geom);

    let backward = export_geometry(&[0], &e, &s, &[1, 0]);
    let mut reversed = geom.clone();
    reversed.reverse();
    assert_eq!(backward, reversed);
}
