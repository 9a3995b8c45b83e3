use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::Instant;
use tracing::{info, Level};

mod engine;
mod script;

use engine::{LogEngine, LogListener};
use script::{Action, Step};
use skyroute_core::transit::{RouteQuery, RouteSet, StaticRouteProvider};
use skyroute_core::{AnnotationConfig, MapEngine, MapSurface, SurfaceListener};

#[derive(Parser, Debug)]
#[command(
    name = "route-preview",
    author,
    version,
    about = "Drive the flight-map annotation layer headlessly from a route file",
    long_about = "Loads direct and multi-leg routes from a JSON file, mounts them on a map \
                  surface that logs instead of drawing, then replays a timeline of user \
                  gestures against it.\n\n\
                  Steps look like `5000:open:HND`, `5300:close:HND` or `6000:select:EK-1` \
                  (milliseconds since the search finished)."
)]
struct Args {
    /// Route set JSON (`direct_routes` and `multi_leg_routes`)
    #[arg(short, long)]
    routes: PathBuf,

    /// Origin airport code of the search
    #[arg(short, long)]
    origin: String,

    /// Destination airport code of the search
    #[arg(short, long, default_value = "HND")]
    destination: String,

    /// Annotation settings JSON; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay before the origin overlay reveals itself
    #[arg(long)]
    auto_reveal_ms: Option<u64>,

    /// Window after closing an origin overlay during which auto-reveal is off
    #[arg(long)]
    suppression_ms: Option<u64>,

    /// Also refuse manual opens during the suppression window
    #[arg(long)]
    strict_suppression: bool,

    /// Timeline step, repeatable
    #[arg(short, long = "step")]
    steps: Vec<Step>,

    /// How long to keep the surface alive after the search
    #[arg(long, default_value = "8000")]
    run_for_ms: u64,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn annotation_config(&self) -> Result<AnnotationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid annotation config {}", path.display()))?
            }
            None => AnnotationConfig::default(),
        };

        if let Some(ms) = self.auto_reveal_ms {
            config.auto_reveal_delay_ms = ms;
        }
        if let Some(ms) = self.suppression_ms {
            config.suppression_window_ms = ms;
        }
        if self.strict_suppression {
            config.suppression_blocks_manual_open = true;
        }
        Ok(config)
    }
}

fn read_routes(path: &Path) -> Result<RouteSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    let routes: RouteSet = serde_json::from_str(&text)
        .with_context(|| format!("Invalid route file {}", path.display()))?;
    Ok(routes)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .without_time()
        .init();

    let config = args.annotation_config()?;
    let routes = read_routes(&args.routes)?;
    let query = RouteQuery::new(args.origin.as_str(), args.destination.as_str());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;

    let mut steps = args.steps.clone();
    steps.sort_by_key(|step| step.at);

    LocalSet::new().block_on(
        &runtime,
        replay(config, query, routes, steps, Duration::from_millis(args.run_for_ms)),
    );
    Ok(())
}

async fn replay(
    config: AnnotationConfig,
    query: RouteQuery,
    routes: RouteSet,
    steps: Vec<Step>,
    run_for: Duration,
) {
    let engine: Rc<dyn MapEngine> = Rc::new(LogEngine);
    let listener: Rc<dyn SurfaceListener> = Rc::new(LogListener);
    let surface = MapSurface::mount(engine, listener, config);

    let provider = StaticRouteProvider::new().with_routes(query.clone(), routes);
    surface.search(&provider, query).await;

    let start = Instant::now();
    for step in steps {
        tokio::time::sleep_until(start + step.at).await;
        info!("t={}ms {}", step.at.as_millis(), step.action);
        let transition = match &step.action {
            Action::Open(code) => Some(surface.overlay_opened(code)),
            Action::Close(code) => Some(surface.overlay_closed(code)),
            Action::Select(id) => {
                surface.select_route(id.clone());
                None
            }
        };
        if let Some(transition) = transition {
            info!("  -> {transition:?}");
        }
    }
    tokio::time::sleep_until(start + run_for).await;

    let active = surface
        .active_overlay()
        .map_or_else(|| "none".to_string(), |code| code.to_string());
    let highlighted: Vec<String> = surface
        .segments()
        .into_iter()
        .filter(|segment| segment.highlighted)
        .map(|segment| segment.route_id.to_string())
        .collect();

    info!("=== After {}ms ===", run_for.as_millis());
    info!("Stations: {}", surface.stations().len());
    info!("Active overlay: {active}");
    info!("Highlighted segments: {}", highlighted.join(", "));
}
