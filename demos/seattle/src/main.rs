//! seattle — live demo of the fleetgrid dispatch simulator.
//!
//! Four vans leave a SODO depot on a 20 × 20-mile grid, deliver their
//! assigned packages and dodge one traffic jam.  Delivery notifications are
//! streamed from the store's `delivery` channel while the engine runs on its
//! own thread; per-tick summaries and delivery legs land in `./output`.
//!
//! ```text
//! cargo run --release -p seattle -- [config.json] [ticks]
//! RUST_LOG=debug cargo run -p seattle
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_core::{FleetConfig, Tick};
use fleet_dispatch::{draw_traffic_event, initialize};
use fleet_engine::EngineRunner;
use fleet_metrics::MetricsPublisher;
use fleet_output::{CsvWriter, FleetOutputObserver};
use fleet_store::SharedFleetStore;

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_TICKS: u64 = 60;
const OUTPUT_DIR:    &str = "output";
const MEMORY_LINES:  usize = 3;

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => FleetConfig::default(),
    };
    let ticks: u64 = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid tick count {n:?}"))?,
        None => DEFAULT_TICKS,
    };

    println!("=== seattle — fleetgrid live demo ===");
    println!(
        "Vehicles: {}  |  Orders: {}  |  Grid: {size}x{size}  |  Seed: {}",
        config.vehicle_count, config.order_count, config.seed,
        size = config.grid_size,
    );

    // 1. Fresh store, fleet and orders.
    let store = SharedFleetStore::in_memory(config.memory_retention);
    let orders = initialize(&config, &store)?;
    for order in &orders {
        let geo = config.projection.to_geo(order.position);
        println!("  {} at {} → {geo}", order.id, order.position);
    }

    // 2. Traffic jam for this run.
    let traffic = draw_traffic_event(&config)?;
    println!("Traffic jam at {} from step {}", traffic.zone, traffic.trigger_step.0);

    // 3. Engine with metrics and CSV output.
    let output_dir = PathBuf::from(OUTPUT_DIR);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let writer = CsvWriter::new(&output_dir)?;
    info!(dir = %output_dir.display(), "csv output enabled");

    let feed = store.subscribe_deliveries()?;
    let runner = EngineRunner::from_config(&config, store.clone(), traffic);
    runner.add_observer(MetricsPublisher::new(store.clone(), config.vehicle_count, config.metrics_interval_ticks));
    runner.add_observer(FleetOutputObserver::new(writer, config.projection));

    // 4. Run, streaming deliveries until the step budget is spent.
    let t0 = Instant::now();
    runner.start()?;
    while runner.current_step() < Tick(ticks) {
        if let Some(ev) = feed.next_timeout(Duration::from_millis(200)) {
            println!(
                "  [{:>6.1}s] {} delivered package #{} at {} ({} mi)",
                t0.elapsed().as_secs_f64(), ev.vehicle_id, ev.sequence, ev.position, ev.miles,
            );
        }
    }
    let final_step = runner.stop()?;
    for ev in feed.drain() {
        println!("  {} delivered package #{} at {}", ev.vehicle_id, ev.sequence, ev.position);
    }

    // 5. Report.
    println!();
    println!("Stopped at step {} after {:.1}s", final_step.0, t0.elapsed().as_secs_f64());
    let metrics = store.metrics();
    println!(
        "Deliveries: {}/{}  |  Total miles: {}  |  Avg miles/delivery: {:.2}",
        metrics.total_deliveries, orders.len(), metrics.total_miles, metrics.avg_delivery_miles,
    );

    runner.with_engine(|engine| {
        for &id in engine.vehicles() {
            let snap = store.snapshot(id, engine.depot());
            let prediction = if engine.heading_into_traffic(id) { "will hit traffic soon" } else { "clear" };
            println!(
                "{id}: {} at {} {}, {} delivered, {prediction}",
                engine.status(id), snap.position, config.projection.to_geo(snap.position), snap.delivered,
            );
            let path = config.projection.project_route(&snap.route);
            if let (Some(first), Some(last)) = (path.first(), path.last()) {
                println!("    route: {} stops, {first} → {last}", path.len());
            }
            for entry in store.recent_memory(id, MEMORY_LINES) {
                println!("    {}", entry.event);
            }
        }
    });
    println!("Output written to {}/", output_dir.display());
    Ok(())
}

fn load_config(path: &Path) -> Result<FleetConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    FleetConfig::from_json_str(&json).with_context(|| format!("parsing config {}", path.display()))
}
