//! OSM XML loader collaborator: turns a `.osm` XML extract into a
//! [`RawGraph`](crate::geo_types::RawGraph). Ways are split into segments at
//! "intersection" nodes - any node shared by more than one way, or appearing
//! more than once inside the same way - mirroring the `simplify=True`
//! behaviour of the reference loader this was distilled from.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{HaversineDistance, Point};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SolverError;
use crate::geo_types::{AccessTags, HighwayClass, RawEdge, RawGraph, RawNode};

struct WayTags {
    highway: Option<String>,
    oneway: Option<String>,
    access: AccessTags,
}

struct Way {
    node_refs: Vec<i64>,
    tags: WayTags,
}

fn attr_value(tag: &BytesStart, name: &str) -> quick_xml::Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr?;
        if attr.key == name.as_bytes() {
            let value = attr.unescaped_value()?;
            return Ok(Some(String::from_utf8_lossy(&value).into_owned()));
        }
    }
    Ok(None)
}

fn io_err(path: &Path, source: std::io::Error) -> SolverError {
    SolverError::IoError {
        path: path.display().to_string(),
        source,
    }
}

fn xml_err(path: &Path, e: quick_xml::Error) -> SolverError {
    SolverError::InputError(format!("{}: malformed OSM XML: {}", path.display(), e))
}

/// Parses an OSM XML extract into a [`RawGraph`]: one node per `<node>`,
/// edges for each `<way>` segment between intersection nodes.
pub fn load(path: &Path) -> Result<RawGraph, SolverError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    reader.trim_text(true);

    let mut nodes: HashMap<i64, RawNode> = HashMap::new();
    let mut node_order: Vec<i64> = Vec::new();
    let mut ways: Vec<Way> = Vec::new();

    let mut buf = Vec::new();
    let mut in_way: Option<(Vec<i64>, WayTags)> = None;

    loop {
        match reader.read_event(&mut buf).map_err(|e| xml_err(path, e))? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name() {
                b"node" => {
                    let id = attr_value(e, "id")
                        .map_err(|e| xml_err(path, e))?
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or_else(|| SolverError::InputError("node missing id".into()))?;
                    let lat = attr_value(e, "lat")
                        .map_err(|e| xml_err(path, e))?
                        .and_then(|s| s.parse::<f64>().ok())
                        .ok_or_else(|| SolverError::InputError(format!("node {} missing lat", id)))?;
                    let lon = attr_value(e, "lon")
                        .map_err(|e| xml_err(path, e))?
                        .and_then(|s| s.parse::<f64>().ok())
                        .ok_or_else(|| SolverError::InputError(format!("node {} missing lon", id)))?;
                    if !nodes.contains_key(&id) {
                        node_order.push(id);
                    }
                    nodes.insert(id, RawNode { id, lat, lon });
                }
                b"way" => {
                    if e.name() == b"way" {
                        in_way = Some((
                            Vec::new(),
                            WayTags {
                                highway: None,
                                oneway: None,
                                access: AccessTags::default(),
                            },
                        ));
                    }
                }
                b"nd" => {
                    if let Some((refs, _)) = in_way.as_mut() {
                        if let Some(r) = attr_value(e, "ref").map_err(|e| xml_err(path, e))? {
                            if let Ok(r) = r.parse::<i64>() {
                                refs.push(r);
                            }
                        }
                    }
                }
                b"tag" => {
                    if let Some((_, tags)) = in_way.as_mut() {
                        let k = attr_value(e, "k").map_err(|e| xml_err(path, e))?;
                        let v = attr_value(e, "v").map_err(|e| xml_err(path, e))?;
                        if let (Some(k), Some(v)) = (k, v) {
                            match k.as_str() {
                                "highway" => tags.highway = Some(v),
                                "oneway" => tags.oneway = Some(v),
                                "service" => tags.access.service = Some(v),
                                "motor_vehicle" => tags.access.motor_vehicle = Some(v),
                                "vehicle" => tags.access.vehicle = Some(v),
                                "access" => tags.access.access = Some(v),
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::End(ref e) => {
                if e.name() == b"way" {
                    if let Some((refs, tags)) = in_way.take() {
                        if refs.len() >= 2 && tags.highway.is_some() {
                            ways.push(Way {
                                node_refs: refs,
                                tags,
                            });
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Intersection nodes: referenced by more than one way, or repeated
    // within the same way (closed loops, self-crossings).
    let mut ref_count: HashMap<i64, usize> = HashMap::new();
    for way in &ways {
        let mut seen_in_way: HashMap<i64, usize> = HashMap::new();
        for &n in &way.node_refs {
            *seen_in_way.entry(n).or_insert(0) += 1;
        }
        for (&n, &c) in &seen_in_way {
            *ref_count.entry(n).or_insert(0) += c.min(2);
        }
    }
    let is_intersection = |n: i64| ref_count.get(&n).copied().unwrap_or(0) > 1;

    let mut edges = Vec::new();
    for way in &ways {
        if way.node_refs.len() < 2 {
            continue;
        }
        let highway = way
            .tags
            .highway
            .as_deref()
            .map(HighwayClass::parse_list)
            .unwrap_or_default();
        let oneway = matches!(way.tags.oneway.as_deref(), Some("yes") | Some("true") | Some("1"));
        let reversed = matches!(way.tags.oneway.as_deref(), Some("-1"));

        let mut segment: Vec<i64> = vec![way.node_refs[0]];
        for &n in &way.node_refs[1..] {
            segment.push(n);
            let is_last = n == *way.node_refs.last().unwrap();
            if is_intersection(n) || is_last {
                if segment.len() >= 2 {
                    if let Some(edge) = build_segment_edge(
                        &segment,
                        &nodes,
                        &highway,
                        oneway,
                        reversed,
                        &way.tags.access,
                    ) {
                        edges.push(edge);
                    }
                }
                segment = vec![n];
            }
        }
    }

    let nodes = node_order
        .into_iter()
        .filter_map(|id| nodes.remove(&id))
        .collect();

    Ok(RawGraph { nodes, edges })
}

fn build_segment_edge(
    segment: &[i64],
    nodes: &HashMap<i64, RawNode>,
    highway: &[HighwayClass],
    oneway: bool,
    reversed: bool,
    access: &AccessTags,
) -> Option<RawEdge> {
    let mut geometry = Vec::with_capacity(segment.len());
    let mut length = 0.0;
    let mut prev: Option<&RawNode> = None;
    for id in segment {
        let node = nodes.get(id)?;
        geometry.push((node.lon, node.lat));
        if let Some(p) = prev {
            let a = Point::new(p.lon, p.lat);
            let b = Point::new(node.lon, node.lat);
            length += a.haversine_distance(&b);
        }
        prev = Some(node);
    }
    let (mut u, mut v) = (*segment.first()?, *segment.last()?);
    if reversed {
        std::mem::swap(&mut u, &mut v);
        geometry.reverse();
    }
    Some(RawEdge {
        u,
        v,
        length,
        highway: highway.to_vec(),
        oneway: oneway || reversed,
        geometry: Some(geometry),
        access: access.clone(),
    })
}
