//! Runtime configuration: the required-highway-class set (exposed as
//! configuration since different extracts care about different street
//! classes) and the handful of driving-graph toggles threaded through the
//! CLI.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geo_types::HighwayClass;

/// Default required-highway classes: residential, living_street, tertiary
/// and unclassified. (The original prototype this was distilled from also
/// required `service` by default; kept out here to avoid over-covering
/// driveways and parking aisles - pass `--required-highways` with a file
/// containing `service` too if that's wanted.)
pub fn default_required_highways() -> HashSet<String> {
    ["residential", "living_street", "tertiary", "unclassified"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `--required-highways <file.yaml>` payload: a flat list of highway tokens,
/// e.g. `[residential, living_street, tertiary, unclassified, service]`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RequiredHighwaysFile(pub Vec<String>);

pub struct RequiredHighways {
    tokens: HashSet<String>,
}

impl RequiredHighways {
    pub fn default_set() -> Self {
        Self {
            tokens: default_required_highways(),
        }
    }

    pub fn from_tokens(tokens: HashSet<String>) -> Self {
        Self { tokens }
    }

    pub fn contains(&self, hw: &HighwayClass) -> bool {
        self.tokens.contains(hw.as_str())
    }
}

/// Tour endpoint request, `--start`/`--end`.
#[derive(Clone, Copy, Debug)]
pub struct Endpoints {
    pub start: Option<(f64, f64)>,
    pub end: Option<(f64, f64)>,
}

/// Driving-graph and solver toggles threaded through the whole pipeline.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub ignore_oneway: bool,
    pub directed_service: bool,
    pub drop_drpp_blockers: bool,
}
