//! The geometry exporter, plus the GPX 1.1 and plain-text writers that
//! consume its output.

use std::io::Write;

use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use geo::Point as GeoPoint;

use crate::drpp::SccReport;
use crate::geo_types::Polyline;
use crate::graph::{EdgeId, Multigraph, NodeIdx};

/// Walks the tour and returns the ordered, deduplicated `(lon, lat)` stream
/// to emit. `s` is the service graph: for each traversed edge, a
/// representative record is looked up there (preferring one with geometry;
/// among those, the cheapest).
pub fn export_geometry(tour: &[EdgeId], e: &Multigraph, s: &Multigraph, path_nodes: &[NodeIdx]) -> Polyline {
    let mut out: Polyline = Vec::new();
    for (i, &eid) in tour.iter().enumerate() {
        let edge = e.edge(eid);
        let (u, v) = (path_nodes[i], path_nodes[i + 1]);
        let segment = representative_polyline(s, u, v, edge.weight);
        let oriented = orient(&segment, e.nodes.coord(u), e.nodes.coord(v));
        for p in oriented {
            if out.last() != Some(&p) {
                out.push(p);
            }
        }
    }
    out
}

/// Finds the cheapest `S`-edge between `u` and `v`, preferring one with
/// geometry, and returns its polyline (or a synthesized two-point segment
/// if none carries one).
fn representative_polyline(s: &Multigraph, u: NodeIdx, v: NodeIdx, fallback_weight: crate::N64) -> Polyline {
    let _ = fallback_weight;
    let candidates: Vec<_> = s
        .incident(u)
        .iter()
        .map(|&id| s.edge(id))
        .filter(|edge| edge.other(u) == v)
        .collect();
    let with_geom = candidates
        .iter()
        .filter(|edge| edge.geometry.is_some())
        .min_by_key(|edge| edge.weight);
    match with_geom.or_else(|| candidates.iter().min_by_key(|edge| edge.weight)) {
        Some(edge) => edge
            .geometry
            .clone()
            .unwrap_or_else(|| synth_segment(s, u, v)),
        None => synth_segment(s, u, v),
    }
}

fn synth_segment(s: &Multigraph, u: NodeIdx, v: NodeIdx) -> Polyline {
    let (lat_u, lon_u) = s.nodes.coord(u);
    let (lat_v, lon_v) = s.nodes.coord(v);
    vec![(lon_u, lat_u), (lon_v, lat_v)]
}

/// Orients a polyline to match the tour's `u -> v` traversal direction:
/// reverse iff NOT (`d²(p_0, u) <= d²(p_0, v)` AND
/// `d²(p_k, v) <= d²(p_k, u)`).
fn orient(polyline: &Polyline, u: (f64, f64), v: (f64, f64)) -> Polyline {
    if polyline.is_empty() {
        return polyline.clone();
    }
    let (lat_u, lon_u) = u;
    let (lat_v, lon_v) = v;
    let u_xy = (lon_u, lat_u);
    let v_xy = (lon_v, lat_v);
    let p0 = polyline[0];
    let pk = *polyline.last().unwrap();

    let keep_orientation = sq_dist(p0, u_xy) <= sq_dist(p0, v_xy) && sq_dist(pk, v_xy) <= sq_dist(pk, u_xy);
    if keep_orientation {
        polyline.clone()
    } else {
        let mut reversed = polyline.clone();
        reversed.reverse();
        reversed
    }
}

fn sq_dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (a.0 - b.0, a.1 - b.1);
    dx * dx + dy * dy
}

/// Writes a single-track, single-segment GPX 1.1 file. Point order
/// preserved, no timestamps.
pub fn write_gpx<W: Write>(writer: W, coords: &Polyline) -> std::io::Result<()> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        ..Default::default()
    };
    let mut track = Track::new();
    let mut segment = TrackSegment::new();
    for &(lon, lat) in coords {
        segment.points.push(Waypoint::new(GeoPoint::new(lon, lat)));
    }
    track.segments.push(segment);
    gpx.tracks.push(track);
    gpx::write(&gpx, writer).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Writes blocker arcs (`--drpp-blockers-gpx`) as a multi-track GPX file -
/// one track per blocker arc, each a two-point (or, if geometry was
/// available, full-polyline) segment.
pub fn write_blockers_gpx<W: Write>(
    writer: W,
    report: &SccReport,
    nodes: &crate::graph::NodeTable,
) -> std::io::Result<()> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        ..Default::default()
    };
    for blocker in &report.blockers {
        let mut track = Track::new();
        let mut segment = TrackSegment::new();
        let coords = blocker.geometry.clone().unwrap_or_else(|| {
            let (lat_u, lon_u) = nodes.coord(blocker.u);
            let (lat_v, lon_v) = nodes.coord(blocker.v);
            vec![(lon_u, lat_u), (lon_v, lat_v)]
        });
        for (lon, lat) in coords {
            segment.points.push(Waypoint::new(GeoPoint::new(lon, lat)));
        }
        track.segments.push(segment);
        gpx.tracks.push(track);
    }
    gpx::write(&gpx, writer).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Writes the plaintext DRPP diagnostics report.
pub fn write_diagnostics<W: Write>(
    mut writer: W,
    drive: &Multigraph,
    required: &Multigraph,
    report: &SccReport,
) -> std::io::Result<()> {
    let (scc_of, sccs) = drive.strongly_connected_components();
    let outside: Vec<NodeIdx> = required
        .active_nodes()
        .filter(|&n| scc_of[n] != Some(report.largest_scc_index))
        .collect();
    let crossing: Vec<_> = required
        .edges()
        .iter()
        .filter(|e| scc_of[e.u] != scc_of[e.v])
        .collect();

    writeln!(writer, "# DRPP diagnostics")?;
    writeln!(writer, "drive_nodes={}", drive.active_nodes().count())?;
    writeln!(writer, "drive_edges={}", drive.edge_count())?;
    writeln!(writer, "required_nodes={}", required.active_nodes().count())?;
    writeln!(writer, "required_edges={}", required.edge_count())?;
    writeln!(writer, "scc_count={}", report.scc_count)?;
    writeln!(writer, "largest_scc_id={}", report.largest_scc_index)?;
    writeln!(writer, "largest_scc_size={}", report.largest_scc_size)?;
    writeln!(writer, "required_nodes_outside_largest_scc={}", outside.len())?;
    writeln!(writer, "required_edges_outside_largest_scc={}", report.blockers.len())?;
    writeln!(writer, "required_edges_crossing_sccs={}", crossing.len())?;
    writeln!(writer)?;

    writeln!(writer, "[required_nodes_outside_largest_scc]")?;
    for &n in &outside {
        writeln!(writer, "{},scc={}", drive.nodes.ext_id(n), scc_of[n].unwrap_or(usize::MAX))?;
    }
    writeln!(writer)?;

    writeln!(writer, "[required_edges_outside_largest_scc]")?;
    for b in &report.blockers {
        writeln!(
            writer,
            "{},{},scc_u={},scc_v={}",
            drive.nodes.ext_id(b.u),
            drive.nodes.ext_id(b.v),
            scc_of[b.u].map_or("?".to_string(), |i| i.to_string()),
            scc_of[b.v].map_or("?".to_string(), |i| i.to_string()),
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "[required_edges_crossing_sccs]")?;
    for e in &crossing {
        writeln!(
            writer,
            "{},{},scc_u={},scc_v={}",
            drive.nodes.ext_id(e.u),
            drive.nodes.ext_id(e.v),
            scc_of[e.u].map_or("?".to_string(), |i| i.to_string()),
            scc_of[e.v].map_or("?".to_string(), |i| i.to_string()),
        )?;
    }
    Ok(())
}

/// Plain-text per-segment solution report, modeled on the Python
/// prototype's HTML visualization report but rendered as a flat text table
/// to match this crate's other plaintext output.
pub fn write_segment_report<W: Write>(
    mut writer: W,
    tour: &[EdgeId],
    e: &Multigraph,
    path_nodes: &[NodeIdx],
) -> std::io::Result<()> {
    writeln!(writer, "# route segments")?;
    writeln!(writer, "index,from,to,kind,weight_m")?;
    for (i, &eid) in tour.iter().enumerate() {
        let edge = e.edge(eid);
        let (u, v) = (path_nodes[i], path_nodes[i + 1]);
        writeln!(
            writer,
            "{},{},{},{:?},{:.2}",
            i,
            e.nodes.ext_id(u),
            e.nodes.ext_id(v),
            edge.kind,
            edge.weight.raw(),
        )?;
    }
    let total: f64 = tour.iter().map(|&eid| e.edge(eid).weight.raw()).sum();
    writeln!(writer, "total_weight_m={:.2}", total)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orient_keeps_polyline_matching_direction() {
        let polyline = vec![(0.0, 0.0), (1.0, 1.0)];
        let oriented = orient(&polyline, (0.0, 0.0), (1.0, 1.0));
        assert_eq!(oriented, polyline);
    }

    #[test]
    fn orient_reverses_polyline_against_direction() {
        let polyline = vec![(0.0, 0.0), (1.0, 1.0)];
        let oriented = orient(&polyline, (1.0, 1.0), (0.0, 0.0));
        assert_eq!(oriented, vec![(1.0, 1.0), (0.0, 0.0)]);
    }
}
