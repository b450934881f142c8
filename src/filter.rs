//! The edge filter. Pure predicate, no errors.

use crate::geo_types::RawEdge;

const EXCLUDED_HIGHWAY_TOKENS: &[&str] = &[
    "footway",
    "pedestrian",
    "steps",
    "path",
    "corridor",
    "cycleway",
];

fn excluded(value: &str) -> bool {
    value.split(';').any(|tok| EXCLUDED_HIGHWAY_TOKENS.contains(&tok.trim()))
}

/// Decides whether a raw edge is allowed in the driving graph.
pub fn is_drivable(edge: &RawEdge) -> bool {
    if edge
        .highway
        .iter()
        .any(|h| excluded(h.as_str()))
    {
        return false;
    }
    if edge
        .access
        .service
        .as_deref()
        .map(|s| s.trim().eq_ignore_ascii_case("parking_aisle"))
        .unwrap_or(false)
    {
        return false;
    }
    for tag in [&edge.access.motor_vehicle, &edge.access.vehicle] {
        if let Some(v) = tag {
            let v = v.trim().to_lowercase();
            if v == "no" || v == "private" {
                return false;
            }
        }
    }
    if let Some(access) = &edge.access.access {
        let v = access.trim().to_lowercase();
        if v == "no" || v == "private" {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_types::{AccessTags, HighwayClass};

    fn edge(highway: &str, access: AccessTags) -> RawEdge {
        RawEdge {
            u: 0,
            v: 1,
            length: 10.0,
            highway: HighwayClass::parse_list(highway),
            oneway: false,
            geometry: None,
            access,
        }
    }

    #[test]
    fn excludes_footway_and_cycleway() {
        assert!(!is_drivable(&edge("footway", AccessTags::default())));
        assert!(!is_drivable(&edge("cycleway;residential", AccessTags::default())));
    }

    #[test]
    fn excludes_parking_aisle_and_private() {
        let mut tags = AccessTags::default();
        tags.service = Some("Parking_Aisle".to_string());
        assert!(!is_drivable(&edge("residential", tags)));

        let mut tags = AccessTags::default();
        tags.access = Some("private".to_string());
        assert!(!is_drivable(&edge("residential", tags)));

        let mut tags = AccessTags::default();
        tags.motor_vehicle = Some("no".to_string());
        assert!(!is_drivable(&edge("residential", tags)));
    }

    #[test]
    fn passes_plain_residential_and_primary() {
        assert!(is_drivable(&edge("residential", AccessTags::default())));
        assert!(is_drivable(&edge("primary", AccessTags::default())));
    }

    #[test]
    fn filter_is_idempotent() {
        let e = edge("tertiary", AccessTags::default());
        assert_eq!(is_drivable(&e), is_drivable(&e));
    }
}
