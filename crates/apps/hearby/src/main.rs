mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use foundation::Coordinate;
use location::{
    FallbackPolicy, Fix, LocationError, LocationProvider, SimulatedCapability, SimulatedOutcome,
};
use map_view::{
    MapViewController, RecordingRenderer, ViewSnapshot, bind_zoom_events, mount_and_locate, share,
};
use serde::Serialize;
use session::{InMemorySessionStore, Screen, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::HearbyConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Hearby map demo")]
struct Args {
    /// JSON configuration file (falls back to HEARBY_CONFIG)
    #[arg(long, env = "HEARBY_CONFIG")]
    config: Option<PathBuf>,

    /// Base seed for jitter and heatmap (falls back to HEARBY_SEED)
    #[arg(long, env = "HEARBY_SEED")]
    seed: Option<u64>,

    /// What the simulated platform answers to a location request
    #[arg(long, value_enum, default_value_t = LocationMode::Grant)]
    location: LocationMode,

    /// Latitude reported when location is granted
    #[arg(long, default_value_t = 37.8760, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude reported when location is granted
    #[arg(long, default_value_t = -122.2590, allow_negative_numbers = true)]
    lng: f64,

    /// Use this position instead of the landmark when location fails: lat,lng
    #[arg(long, allow_negative_numbers = true)]
    fallback: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Press "Connect with Spotify (Demo Mode)" before rendering
    #[arg(long)]
    login: bool,

    /// Simulate a zoom gesture ending at this level once the map is ready
    #[arg(long)]
    zoom: Option<u8>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LocationMode {
    Grant,
    Deny,
    Timeout,
    Unavailable,
}

impl LocationMode {
    fn capability(self, lat: f64, lng: f64) -> SimulatedCapability {
        match self {
            LocationMode::Grant => SimulatedCapability::answering(lat, lng),
            LocationMode::Deny => SimulatedCapability::failing(LocationError::PermissionDenied),
            LocationMode::Timeout => SimulatedCapability::new(SimulatedOutcome::Hang),
            LocationMode::Unavailable => SimulatedCapability::default(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    screen: Screen,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<ViewSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_error: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let store = InMemorySessionStore::new();
    let mut session = Session::open(store)?;
    if args.login {
        session.login()?;
    }
    if session.screen() == Screen::Login {
        info!("not logged in; showing the login screen");
        return print(&Report {
            screen: Screen::Login,
            view: None,
            location_error: None,
        });
    }

    let source = config.mock_source()?;
    let provider = LocationProvider::new(args.location.capability(args.lat, args.lng))
        .with_options(config.location)
        .with_fallback(config.fallback.clone());

    let view = share(MapViewController::new(config.view.clone(), source));
    let mut renderer = RecordingRenderer::new();
    if let Err(err) = view.borrow_mut().create_view(&mut renderer) {
        warn!(error = %err, "continuing without a map");
    }
    bind_zoom_events(&view);

    let applied = mount_and_locate(&view, &provider).await?;
    info!(applied, "initial location handled");

    if let Some(zoom) = args.zoom {
        match renderer.last_probe() {
            Some(probe) => probe.fire_zoom(zoom),
            None => {
                view.borrow_mut().on_zoom_changed(zoom);
            }
        }
    }

    let snapshot = view.borrow().snapshot();
    let report = Report {
        screen: Screen::Map,
        view: Some(snapshot),
        location_error: provider.last_failure().map(|e| e.to_string()),
    };
    view.borrow_mut().teardown();
    print(&report)
}

fn resolve_config(args: &Args) -> Result<HearbyConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => HearbyConfig::load(path)?,
        None => HearbyConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.view.base_seed = seed;
    }
    if let Some(ms) = args.timeout_ms {
        config.location = config.location.with_timeout(Duration::from_millis(ms));
    }
    if let Some(raw) = &args.fallback {
        config.fallback = FallbackPolicy::MockUser(parse_lat_lng(raw)?);
    }
    Ok(config)
}

fn parse_lat_lng(raw: &str) -> Result<Coordinate, Box<dyn std::error::Error>> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lng but got {raw:?}"))?;
    let fix = Fix::new(lat.trim().parse()?, lng.trim().parse()?);
    Ok(fix.into_coordinate()?)
}

fn print(report: &Report) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
