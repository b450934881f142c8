//! Typed edge/node records, replacing OSM's untyped attribute bags: a
//! closed edge record with `HighwayClass` as a tagged variant (including an
//! `Other(String)` catch-all for anything unrecognized), parsed once at
//! load time so every later filter operates on typed data instead of raw
//! tag strings.

use serde::{Deserialize, Serialize};

/// Ordered polyline of (lon, lat) pairs, WGS-84.
pub type Polyline = Vec<(f64, f64)>;

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HighwayClass {
    Residential,
    LivingStreet,
    Tertiary,
    Unclassified,
    Service,
    Primary,
    Secondary,
    Trunk,
    Motorway,
    Footway,
    Pedestrian,
    Steps,
    Path,
    Corridor,
    Cycleway,
    Other(String),
}

impl HighwayClass {
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "residential" => HighwayClass::Residential,
            "living_street" => HighwayClass::LivingStreet,
            "tertiary" => HighwayClass::Tertiary,
            "unclassified" => HighwayClass::Unclassified,
            "service" => HighwayClass::Service,
            "primary" => HighwayClass::Primary,
            "secondary" => HighwayClass::Secondary,
            "trunk" => HighwayClass::Trunk,
            "motorway" => HighwayClass::Motorway,
            "footway" => HighwayClass::Footway,
            "pedestrian" => HighwayClass::Pedestrian,
            "steps" => HighwayClass::Steps,
            "path" => HighwayClass::Path,
            "corridor" => HighwayClass::Corridor,
            "cycleway" => HighwayClass::Cycleway,
            other => HighwayClass::Other(other.to_string()),
        }
    }

    /// Parses a possibly semicolon-separated `highway` tag value into its tokens.
    pub fn parse_list(raw: &str) -> Vec<HighwayClass> {
        raw.split(';').map(HighwayClass::parse).collect()
    }

    pub fn as_str(&self) -> &str {
        match self {
            HighwayClass::Residential => "residential",
            HighwayClass::LivingStreet => "living_street",
            HighwayClass::Tertiary => "tertiary",
            HighwayClass::Unclassified => "unclassified",
            HighwayClass::Service => "service",
            HighwayClass::Primary => "primary",
            HighwayClass::Secondary => "secondary",
            HighwayClass::Trunk => "trunk",
            HighwayClass::Motorway => "motorway",
            HighwayClass::Footway => "footway",
            HighwayClass::Pedestrian => "pedestrian",
            HighwayClass::Steps => "steps",
            HighwayClass::Path => "path",
            HighwayClass::Corridor => "corridor",
            HighwayClass::Cycleway => "cycleway",
            HighwayClass::Other(s) => s.as_str(),
        }
    }
}

/// Access-control tags relevant to the driving filter.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct AccessTags {
    pub service: Option<String>,
    pub motor_vehicle: Option<String>,
    pub vehicle: Option<String>,
    pub access: Option<String>,
}

/// A raw, typed street segment as parsed from OSM, before filtering.
#[derive(Clone, Debug)]
pub struct RawEdge {
    pub u: i64,
    pub v: i64,
    pub length: f64,
    pub highway: Vec<HighwayClass>,
    pub oneway: bool,
    pub geometry: Option<Polyline>,
    pub access: AccessTags,
}

impl RawEdge {
    /// First token of a (possibly list-valued) `highway` tag.
    pub fn primary_highway(&self) -> Option<&HighwayClass> {
        self.highway.first()
    }
}

#[derive(Clone, Debug)]
pub struct RawNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// A labeled multigraph as emitted by the OSM loader collaborator.
#[derive(Clone, Debug, Default)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}
