//! CLI entry point. Wires the library's pipeline stages together: load ->
//! filter/build -> extract required edges -> solve (RPP or DRPP) -> extract
//! tour -> export geometry -> write GPX (and optional diagnostics).

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{crate_version, App, Arg};

use rpp_route_solver::builder::{self, BuiltGraphs};
use rpp_route_solver::config::{Endpoints, RequiredHighways, RequiredHighwaysFile, RunConfig};
use rpp_route_solver::drpp;
use rpp_route_solver::error::SolverError;
use rpp_route_solver::gpx_export;
use rpp_route_solver::osm;
use rpp_route_solver::required;
use rpp_route_solver::rpp;
use rpp_route_solver::snap::{self, Snapped};
use rpp_route_solver::tour;
use rpp_route_solver::NodeIdx;

fn main() {
    env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn parse_latlon(raw: &str) -> Result<(f64, f64), SolverError> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| SolverError::InputError(format!("expected \"lat,lon\", got \"{}\"", raw)))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| SolverError::InputError(format!("invalid latitude in \"{}\"", raw)))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| SolverError::InputError(format!("invalid longitude in \"{}\"", raw)))?;
    Ok((lat, lon))
}

fn io_err(path: &Path, source: std::io::Error) -> SolverError {
    SolverError::IoError {
        path: path.display().to_string(),
        source,
    }
}

fn load_required_highways(path: Option<&str>) -> Result<RequiredHighways, SolverError> {
    match path {
        None => Ok(RequiredHighways::default_set()),
        Some(p) => {
            let path = PathBuf::from(p);
            let file = File::open(&path).map_err(|e| io_err(&path, e))?;
            let parsed: RequiredHighwaysFile = serde_yaml::from_reader(file)
                .map_err(|e| SolverError::InputError(format!("{}: invalid required-highways file: {}", path.display(), e)))?;
            Ok(RequiredHighways::from_tokens(parsed.0.into_iter().collect()))
        }
    }
}

/// Snaps a requested endpoint against the driving graph `D`: `D` is already
/// restricted to its single largest weakly connected component, so snapping
/// there is equivalent to snapping against the largest component of `E`
/// without requiring a completed solve first - `E`'s own connectivity
/// invariant guarantees it covers the same node set once the solver
/// succeeds.
fn snap_endpoint(built: &BuiltGraphs, label: &str, target: (f64, f64)) -> Result<Snapped, SolverError> {
    let snapped = snap::snap(&built.drive, target, true).ok_or_else(|| {
        SolverError::InputError(format!("{}: driving graph has no nodes to snap to", label))
    })?;
    println!(
        "Requested {label} (lat, lon): ({req_lat}, {req_lon}); snapped {label} (lat, lon): ({lat}, {lon}); node={node}; distance_m={dist}; component={strategy}",
        label = label,
        req_lat = target.0,
        req_lon = target.1,
        lat = snapped.lat,
        lon = snapped.lon,
        node = built.drive.nodes.ext_id(snapped.node),
        dist = snapped.distance_m,
        strategy = snapped.strategy,
    );
    Ok(snapped)
}

fn run() -> Result<(), SolverError> {
    let matches = App::new("rpp-route-solver")
        .version(crate_version!())
        .about("Minimum-length RPP/DRPP route over a required set of OSM streets")
        .arg(
            Arg::with_name("output")
                .index(1)
                .required(true)
                .help("Output GPX path"),
        )
        .arg(
            Arg::with_name("osm")
                .long("osm")
                .takes_value(true)
                .default_value("data/area.osm")
                .help("OSM XML extract to load"),
        )
        .arg(
            Arg::with_name("ignore-oneway")
                .long("ignore-oneway")
                .help("Treat one-ways bidirectionally for driving-graph shortest paths"),
        )
        .arg(
            Arg::with_name("directed-service")
                .long("directed-service")
                .help("Solve the directed variant (DRPP) instead of RPP"),
        )
        .arg(
            Arg::with_name("drop-drpp-blockers")
                .long("drop-drpp-blockers")
                .help("Drop required arcs outside the driving graph's largest SCC before solving"),
        )
        .arg(
            Arg::with_name("drpp-diagnostics")
                .long("drpp-diagnostics")
                .takes_value(true)
                .help("Write a plaintext DRPP diagnostics report to this path"),
        )
        .arg(
            Arg::with_name("drpp-blockers-gpx")
                .long("drpp-blockers-gpx")
                .takes_value(true)
                .help("Write dropped blocker arcs as a multi-track GPX file"),
        )
        .arg(
            Arg::with_name("start")
                .long("start")
                .takes_value(true)
                .value_name("lat,lon")
                .help("Snap to the nearest node as tour origin"),
        )
        .arg(
            Arg::with_name("end")
                .long("end")
                .takes_value(true)
                .value_name("lat,lon")
                .help("Snap to the nearest node as tour terminus; requires --start"),
        )
        .arg(
            Arg::with_name("required-highways")
                .long("required-highways")
                .takes_value(true)
                .help("YAML list of highway tokens overriding the default required set"),
        )
        .arg(
            Arg::with_name("report")
                .long("report")
                .takes_value(true)
                .help("Write a plaintext per-segment solution report to this path"),
        )
        .get_matches();

    let start_raw = matches.value_of("start").map(parse_latlon).transpose()?;
    let end_raw = matches.value_of("end").map(parse_latlon).transpose()?;
    let endpoints_req = Endpoints {
        start: start_raw,
        end: end_raw,
    };
    snap::validate_endpoint_request(endpoints_req.start, endpoints_req.end)?;

    let cfg = RunConfig {
        ignore_oneway: matches.is_present("ignore-oneway"),
        directed_service: matches.is_present("directed-service"),
        drop_drpp_blockers: matches.is_present("drop-drpp-blockers"),
    };

    let osm_path = PathBuf::from(matches.value_of("osm").unwrap());
    log::info!("loading OSM extract from {}", osm_path.display());
    let raw = osm::load(&osm_path)?;
    log::debug!("raw graph: {} nodes, {} edges", raw.nodes.len(), raw.edges.len());

    let built = builder::build(&raw, &cfg)?;
    log::info!(
        "driving graph: {} nodes, {} edges (directed_service={})",
        built.drive.active_nodes().count(),
        built.drive.edge_count(),
        cfg.directed_service,
    );

    let required_highways = load_required_highways(matches.value_of("required-highways"))?;

    let start = endpoints_req.start.map(|t| snap_endpoint(&built, "start", t)).transpose()?;
    let end = endpoints_req.end.map(|t| snap_endpoint(&built, "end", t)).transpose()?;
    let endpoints: Option<(NodeIdx, NodeIdx)> = start.map(|s| (s.node, end.map_or(s.node, |e| e.node)));

    let e = if cfg.directed_service {
        let r_d = required::extract(&built, &required_highways, true);
        log::info!("required graph R_d: {} arcs", r_d.edge_count());
        let report = drpp::analyze(&built.drive, &r_d);
        log::info!(
            "driving graph SCCs: {} total, largest has {} nodes",
            report.scc_count, report.largest_scc_size
        );

        if let Some(path) = matches.value_of("drpp-diagnostics") {
            let f = File::create(path).map_err(|err| io_err(Path::new(path), err))?;
            gpx_export::write_diagnostics(f, &built.drive, &r_d, &report)
                .map_err(|err| io_err(Path::new(path), err))?;
        }
        if let Some(path) = matches.value_of("drpp-blockers-gpx") {
            let f = File::create(path).map_err(|err| io_err(Path::new(path), err))?;
            gpx_export::write_blockers_gpx(f, &report, &built.drive.nodes)
                .map_err(|err| io_err(Path::new(path), err))?;
        }

        let r_d = if !report.blockers.is_empty() {
            if cfg.drop_drpp_blockers {
                log::info!("dropping {} blocker arc(s) outside the largest SCC", report.blockers.len());
                drpp::drop_blockers(&r_d, &report)
            } else {
                return Err(drpp::multi_scc_error(&built.drive, &r_d));
            }
        } else {
            r_d
        };

        drpp::solve(&r_d, &built.drive, endpoints)?
    } else {
        let r_u = required::extract(&built, &required_highways, false);
        log::info!("required graph R_u: {} edges", r_u.edge_count());
        rpp::solve(&r_u, &built.drive, &built.service, endpoints)?
    };
    log::info!("Eulerian multigraph E: {} nodes, {} edges", e.active_nodes().count(), e.edge_count());

    let tour_edges = tour::extract(&e, endpoints)?;
    let anchor = tour::anchor(&e, endpoints)
        .ok_or_else(|| SolverError::InvariantFailure("no tour anchor: E has no active nodes".into()))?;
    let path_nodes = tour::walk_nodes(&e, &tour_edges, anchor);
    log::info!("tour: {} edges walked", tour_edges.len());

    if let Some(path) = matches.value_of("report") {
        let f = File::create(path).map_err(|err| io_err(Path::new(path), err))?;
        gpx_export::write_segment_report(f, &tour_edges, &e, &path_nodes)
            .map_err(|err| io_err(Path::new(path), err))?;
    }

    let coords = gpx_export::export_geometry(&tour_edges, &e, &built.service, &path_nodes);
    let output_path = matches.value_of("output").unwrap();
    let f = File::create(output_path).map_err(|err| io_err(Path::new(output_path), err))?;
    gpx_export::write_gpx(f, &coords).map_err(|err| io_err(Path::new(output_path), err))?;
    log::info!("wrote {} coordinate(s) to {}", coords.len(), output_path);

    Ok(())
}
