//! CountKV load generator
//!
//! Hammers a counter store with increments from several threads and reports
//! throughput plus the final backend snapshot.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use countkv::backend::{self, CounterBackend};
use countkv::{BackendKind, Config, Coordinator};
use tracing_subscriber::{fmt, EnvFilter};

/// CountKV load generator
#[derive(Parser, Debug)]
#[command(name = "countkv-bench")]
#[command(about = "Throughput benchmark for CountKV counter backends")]
#[command(version)]
struct Args {
    /// Backend: dynamic, balanced or write_optimized
    #[arg(short, long, default_value = "dynamic")]
    backend: BackendKind,

    /// Slots per namespace (fixed-capacity backends)
    #[arg(short, long, default_value = "10000")]
    capacity: usize,

    /// Stripes per slot array (write-optimized backend)
    #[arg(long, default_value = "8")]
    stripes: usize,

    /// Worker threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Increments per worker thread
    #[arg(short, long, default_value = "100000")]
    ops: usize,

    /// Distinct keys per namespace
    #[arg(short, long, default_value = "64")]
    keys: usize,

    /// Namespaces to spread keys over
    #[arg(short, long, default_value = "1")]
    namespaces: usize,

    /// Sweep interval in milliseconds (0 disables the sweep)
    #[arg(long, default_value = "0")]
    sweep_ms: u64,

    /// Instance name
    #[arg(long)]
    name: Option<String>,

    /// Call the backend directly instead of going through the coordinator
    #[arg(long)]
    direct: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,countkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("CountKV bench v{}", countkv::VERSION);
    tracing::info!(
        "Backend: {}, threads: {}, ops/thread: {}, keys: {}, namespaces: {}",
        args.backend,
        args.threads,
        args.ops,
        args.keys,
        args.namespaces
    );

    // Build config from args
    let mut builder = Config::builder()
        .backend(args.backend)
        .capacity(args.capacity)
        .stripes(args.stripes);
    if args.sweep_ms > 0 {
        builder = builder.sweep_interval(Duration::from_millis(args.sweep_ms));
    }
    if let Some(name) = &args.name {
        builder = builder.name(name);
    }
    let config = builder.build();

    let result = if args.direct {
        run_direct(&args, &config)
    } else {
        run_coordinated(&args, config)
    };

    if let Err(e) = result {
        tracing::error!("Benchmark failed: {}", e);
        std::process::exit(1);
    }
}

/// Key and namespace for operation `i` of worker `t`
fn target(args: &Args, t: usize, i: usize) -> (String, String) {
    let n = (t + i) % args.namespaces.max(1);
    let k = i % args.keys.max(1);
    (format!("ns{}", n), format!("key{}", k))
}

fn report(label: &str, total_ops: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    tracing::info!(
        "{}: {} ops in {:.3}s ({:.0} ops/s)",
        label,
        total_ops,
        secs,
        total_ops as f64 / secs
    );
}

fn run_coordinated(args: &Args, config: Config) -> countkv::Result<()> {
    let store = Coordinator::start(config)?;

    let start = Instant::now();
    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let counters = store.counters();
        let targets: Vec<(String, String)> = (0..args.ops).map(|i| target(args, t, i)).collect();
        handles.push(thread::spawn(move || -> countkv::Result<()> {
            for (namespace, key) in targets {
                counters.namespace(namespace).increment(&key)?;
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().map_err(|_| countkv::CountError::Panicked)??;
    }
    report("coordinated", args.threads * args.ops, start.elapsed());

    let info = store.counters().info()?;
    match serde_json::to_string_pretty(&info) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Could not encode info: {}", e),
    }

    store.stop()
}

fn run_direct(args: &Args, config: &Config) -> countkv::Result<()> {
    let backend: Arc<dyn CounterBackend> = Arc::from(backend::init(config)?);

    let start = Instant::now();
    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let backend = Arc::clone(&backend);
        let targets: Vec<(String, String)> = (0..args.ops).map(|i| target(args, t, i)).collect();
        handles.push(thread::spawn(move || -> countkv::Result<()> {
            for (namespace, key) in targets {
                backend.increment(&namespace, &key, 1, 0)?;
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().map_err(|_| countkv::CountError::Panicked)??;
    }
    report("direct", args.threads * args.ops, start.elapsed());

    match serde_json::to_string_pretty(&backend.info()) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Could not encode info: {}", e),
    }
    Ok(())
}
