//! Load generator for the edge tier.
//!
//! Issues GET requests against the balancer at a fixed rate from a pool of
//! workers, then prints a latency and status summary.

use clap::Parser;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(name = "load-tester")]
#[command(about = "Generate steady HTTP load against the edge tier", long_about = None)]
struct Cli {
    /// Target URL.
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Test duration in seconds.
    #[arg(short, long, default_value_t = 60)]
    duration: u64,

    /// Requests per second.
    #[arg(short, long, default_value_t = 10)]
    rps: u32,

    /// Number of concurrent workers.
    #[arg(short, long, default_value_t = 5)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,
}

#[derive(Default)]
struct Stats {
    total: u64,
    succeeded: u64,
    failed: u64,
    min: Option<Duration>,
    max: Duration,
    sum: Duration,
    status_codes: BTreeMap<u16, u64>,
}

impl Stats {
    fn record(&mut self, latency: Duration, status: Option<u16>) {
        self.total += 1;
        self.sum += latency;
        self.max = self.max.max(latency);
        self.min = Some(self.min.map_or(latency, |min| min.min(latency)));

        match status {
            Some(code) => {
                *self.status_codes.entry(code).or_default() += 1;
                if (200..300).contains(&code) {
                    self.succeeded += 1;
                } else {
                    self.failed += 1;
                }
            }
            None => self.failed += 1,
        }
    }

    fn average(&self) -> Duration {
        match u32::try_from(self.total) {
            Ok(n) if n > 0 => self.sum / n,
            _ => Duration::ZERO,
        }
    }

    fn report(&self, elapsed: Duration, target_rps: u32) {
        println!("Load test finished in {:.1?}", elapsed);
        println!("  total requests: {}", self.total);
        println!(
            "  achieved rate:  {:.1} req/s (target {target_rps})",
            self.total as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
        println!("  succeeded:      {}", self.succeeded);
        println!("  failed:         {}", self.failed);
        println!(
            "  latency min/avg/max: {:?} / {:?} / {:?}",
            self.min.unwrap_or_default(),
            self.average(),
            self.max
        );
        println!("  status codes:");
        for (code, count) in &self.status_codes {
            println!("    {code}: {count}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if cli.rps == 0 || cli.concurrency == 0 {
        return Err("--rps and --concurrency must be greater than zero".into());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;

    println!(
        "Sending {} req/s to {} for {}s with {} workers",
        cli.rps, cli.url, cli.duration, cli.concurrency
    );

    let (tx, rx) = mpsc::channel::<()>(cli.concurrency * 2);
    let rx = Arc::new(Mutex::new(rx));
    let stats = Arc::new(Mutex::new(Stats::default()));

    let mut workers = Vec::with_capacity(cli.concurrency);
    for _ in 0..cli.concurrency {
        let client = client.clone();
        let url = cli.url.clone();
        let rx = rx.clone();
        let stats = stats.clone();
        workers.push(tokio::spawn(async move {
            loop {
                let next = rx.lock().await.recv().await;
                if next.is_none() {
                    break;
                }
                let start = Instant::now();
                let status = client.get(&url).send().await.ok().map(|res| res.status().as_u16());
                stats.lock().await.record(start.elapsed(), status);
            }
        }));
    }

    let started = Instant::now();
    let dispatched = dispatch(tx, cli.rps, Duration::from_secs(cli.duration)).await;

    for worker in workers {
        let _ = worker.await;
    }

    let stats = stats.lock().await;
    if stats.total != dispatched {
        eprintln!("warning: dispatched {dispatched} requests but recorded {}", stats.total);
    }
    stats.report(started.elapsed(), cli.rps);
    Ok(())
}

/// Feed one request per tick to the workers until `duration` elapses.
///
/// When every worker is busy the tick waits for a free slot instead of being
/// dropped, so the achieved rate falls below the target rather than the
/// summary hiding skipped requests. Returns the number dispatched.
async fn dispatch(tx: mpsc::Sender<()>, rps: u32, duration: Duration) -> u64 {
    let deadline = tokio::time::Instant::now() + duration;
    let mut ticker = tokio::time::interval(Duration::from_secs(1) / rps);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut dispatched = 0;

    loop {
        ticker.tick().await;
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        match tokio::time::timeout_at(deadline, tx.send(())).await {
            Ok(Ok(())) => dispatched += 1,
            _ => break,
        }
    }
    dispatched
}
