//! # Waymark preview CLI
//!
//! Drives the clustering and map libraries headlessly: cluster a waypoint file for
//! a region, expand a cluster, or render a full map scene as a backend would see it.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use waymark_cluster::feature::feature_collection;
use waymark_cluster::{
    ClusterId, ClusterOptions, Feature, Viewport, WaypointClusterer, ZoomPolicy,
};
use waymark_common::config;
use waymark_common::{DrawingMode, MapConfig, Region};
use waymark_map::{
    Container, MapBackend, MapProps, MapView, NativeBackend, SnapshotOptions, SnapshotOutput,
    WebBackend,
};

mod cli;

#[derive(Parser)]
#[command(name = "waymark")]
#[command(about = "Waypoint clustering and map scene preview")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Map configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoomPolicyArg {
    /// Native backend: fractional zoom
    Fractional,
    /// Web backend: integer zoom
    Rounded,
}

impl From<ZoomPolicyArg> for ZoomPolicy {
    fn from(arg: ZoomPolicyArg) -> Self {
        match arg {
            ZoomPolicyArg::Fractional => ZoomPolicy::Fractional,
            ZoomPolicyArg::Rounded => ZoomPolicy::Rounded,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Native,
    Web,
}

impl Default for BackendArg {
    fn default() -> Self {
        if cfg!(feature = "web") {
            BackendArg::Web
        } else {
            BackendArg::Native
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster waypoints for a region and print a GeoJSON FeatureCollection
    Clusters {
        /// Waypoints JSON file
        #[arg(long)]
        waypoints: PathBuf,
        /// Visible region (lat,lng,latDelta,lngDelta)
        #[arg(long, value_parser = cli::parse_region, allow_hyphen_values = true)]
        region: Region,
        /// Drawing mode (pin, waypoint, pen); disables clustering
        #[arg(long)]
        mode: Option<DrawingMode>,
        #[arg(long, value_enum, default_value = "fractional")]
        zoom_policy: ZoomPolicyArg,
    },
    /// Print the leaves and the framing region of one cluster
    Expand {
        /// Waypoints JSON file
        #[arg(long)]
        waypoints: PathBuf,
        /// Cluster handle as printed by `clusters` (z<zoom>-<slot>)
        #[arg(long)]
        cluster: ClusterId,
        #[arg(long, value_enum, default_value = "fractional")]
        zoom_policy: ZoomPolicyArg,
    },
    /// Mount a map view headlessly and print the backend's scene
    Render {
        /// Waypoints JSON file
        #[arg(long)]
        waypoints: Option<PathBuf>,
        /// Initial region (lat,lng,latDelta,lngDelta)
        #[arg(long, value_parser = cli::parse_region, allow_hyphen_values = true)]
        region: Region,
        /// Recorded route JSON file
        #[arg(long)]
        route: Option<PathBuf>,
        /// Pen drawing JSON file
        #[arg(long)]
        pen: Option<PathBuf>,
        #[arg(long)]
        mode: Option<DrawingMode>,
        /// Id of the selected waypoint
        #[arg(long)]
        selected: Option<String>,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Show start/end markers on the route
        #[arg(long)]
        start_end: bool,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
        /// Also write an SVG snapshot (native backend only)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    cli::logging::init(cli.verbose, cli.log_json);

    if let Err(e) = run(cli) {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let loaded = cli::load_config(cli.config.as_deref())?;
    config::install(loaded).context("failed to install map configuration")?;
    let config = config::global();

    let output = match cli.command {
        Commands::Clusters {
            waypoints,
            region,
            mode,
            zoom_policy,
        } => {
            let clusterer = build_clusterer(config, &waypoints, zoom_policy.into(), mode)?;
            let viewport = Viewport::from_region(&region, zoom_policy.into())?;
            let features = clusterer.query(&viewport)?;
            tracing::info!(
                zoom = viewport.zoom,
                features = features.len(),
                clusters = features.iter().filter(|f| f.is_cluster()).count(),
                "clustered waypoints"
            );
            feature_collection(&features)
        }
        Commands::Expand {
            waypoints,
            cluster,
            zoom_policy,
        } => {
            let clusterer = build_clusterer(config, &waypoints, zoom_policy.into(), None)?;
            let expansion = clusterer.expand(cluster)?;
            let leaves: Vec<Value> = expansion
                .leaves
                .iter()
                .cloned()
                .map(|leaf| Feature::Leaf(leaf).to_geojson())
                .collect();
            json!({
                "cluster": expansion.cluster.to_string(),
                "expansionZoom": expansion.expansion_zoom,
                "region": expansion.region,
                "leaves": leaves,
            })
        }
        Commands::Render {
            waypoints,
            region,
            route,
            pen,
            mode,
            selected,
            backend,
            start_end,
            width,
            height,
            snapshot,
        } => {
            let mut props = MapProps::new(region)
                .with_drawing_mode(mode)
                .with_selected_pin(selected)
                .with_start_end_markers(start_end);
            if let Some(path) = waypoints {
                props = props.with_waypoints(cli::read_waypoints(&path)?);
            }
            if let Some(path) = route {
                props = props.with_route_path(cli::read_path(&path)?);
            }
            if let Some(path) = pen {
                props = props.with_pen_path(cli::read_path(&path)?);
            }
            let container = Container::new(width, height);

            match backend.unwrap_or_default() {
                BackendArg::Native => {
                    let mut view = MapView::with_config(NativeBackend::new(config), props, config);
                    mount(&mut view, container)?;
                    if let Some(path) = snapshot {
                        let options = SnapshotOptions {
                            width,
                            height,
                            region: None,
                            output: SnapshotOutput::File(path),
                        };
                        view.take_snapshot(&options)
                            .context("failed to write snapshot")?;
                    }
                    view.scene()
                }
                BackendArg::Web => {
                    if snapshot.is_some() {
                        bail!("--snapshot is only available with the native backend");
                    }
                    let mut view = MapView::with_config(WebBackend::new(config), props, config);
                    mount(&mut view, container)?;
                    view.scene()
                }
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_clusterer(
    config: &MapConfig,
    waypoints: &std::path::Path,
    policy: ZoomPolicy,
    mode: Option<DrawingMode>,
) -> Result<WaypointClusterer> {
    let radius = match policy {
        ZoomPolicy::Fractional => config.clustering.native_radius,
        ZoomPolicy::Rounded => config.clustering.web_radius,
    };
    let mut clusterer = WaypointClusterer::new(ClusterOptions::from_tuning(&config.clustering, radius));
    clusterer.set_waypoints(cli::read_waypoints(waypoints)?);
    clusterer.set_drawing_mode(mode);
    Ok(clusterer)
}

fn mount<B: MapBackend>(view: &mut MapView<B>, container: Container) -> Result<()> {
    if !view.mount(container) {
        bail!(
            "the {} map could not be initialized (is an access token configured?)",
            view.backend().kind()
        );
    }
    Ok(())
}
