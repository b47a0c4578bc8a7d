//! Benchmark index build and point resolution at large scales.
//!
//! Run with: cargo run --release --bin bench_resolve
//!
//! Usage:
//!   bench_resolve               Run default size (100k subblocks)
//!   bench_resolve 100k 1m       Run multiple sizes
//!   bench_resolve --points 4    Resolve 4 points per subblock
//!   bench_resolve -n 10         Run 10 iterations (for profiling)
//!
//! Set RUST_LOG=debug for per-phase timings.

use clap::Parser;
use glam::DVec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use subblock_compare::{
    AttributeTable, BlockTransform, BoundsMode, IndexedModel, ModelGrid, ResolutionSummary,
    SubblockedModel,
};

fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.to_lowercase();
    let (num_str, multiplier) = if let Some(rest) = s.strip_suffix('m') {
        (rest, 1_000_000)
    } else if let Some(rest) = s.strip_suffix('k') {
        (rest, 1_000)
    } else {
        (s.as_str(), 1)
    };

    num_str
        .parse::<f64>()
        .map(|n| (n * multiplier as f64) as usize)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
}

#[derive(Parser)]
#[command(name = "bench_resolve")]
#[command(about = "Benchmark subblock index build and point resolution")]
struct Args {
    /// Approximate subblock counts to benchmark (e.g., 100k, 1m)
    #[arg(value_parser = parse_count)]
    sizes: Vec<usize>,

    /// Random seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Query points per subblock
    #[arg(long, default_value_t = 1.0)]
    points: f64,

    /// Resolve without grid bounds
    #[arg(long)]
    unbounded: bool,

    /// Number of iterations to run (useful for profiling)
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,
}

/// Parent cells split at random into 1, 2 (along one axis) or 8 subblocks.
fn generate_model(target: usize, seed: u64) -> SubblockedModel {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let res = DVec3::new(10.0, 10.0, 5.0);
    // Mean fan-out of the scheme below is (1 + 2 + 8) / 3.
    let parents = (target as f64 / (11.0 / 3.0)).max(1.0);
    let side = parents.cbrt().ceil() as u32;
    let grid = ModelGrid::new(res, [side, side, side]).expect("positive resolution");

    let mut centroids = Vec::with_capacity(target);
    let mut sizes = Vec::with_capacity(target);
    for i in 0..side {
        for j in 0..side {
            for k in 0..side {
                let center = DVec3::new(i as f64, j as f64, k as f64) * res;
                match rng.gen_range(0..3) {
                    0 => {
                        centroids.push(center);
                        sizes.push(res);
                    }
                    1 => {
                        let axis = rng.gen_range(0..3);
                        let mut half = res;
                        half[axis] *= 0.5;
                        let mut offset = DVec3::ZERO;
                        offset[axis] = res[axis] * 0.25;
                        for sign in [-1.0, 1.0] {
                            centroids.push(center + offset * sign);
                            sizes.push(half);
                        }
                    }
                    _ => {
                        let q = res * 0.25;
                        for dx in [-q.x, q.x] {
                            for dy in [-q.y, q.y] {
                                for dz in [-q.z, q.z] {
                                    centroids.push(center + DVec3::new(dx, dy, dz));
                                    sizes.push(res * 0.5);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    SubblockedModel::from_block_coordinates(
        "bench",
        grid,
        BlockTransform::translation(DVec3::new(500_000.0, 7_000_000.0, 200.0)),
        &centroids,
        sizes,
        AttributeTable::default(),
    )
    .expect("generated arrays are parallel")
}

/// Uniform random points over the model extent, padded by one parent cell.
fn generate_points(model: &SubblockedModel, n: usize, seed: u64) -> Vec<DVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9e37_79b9);
    let res = model.grid.resolution;
    let lo = -res;
    let hi = model.grid.total_extent() + res;
    (0..n)
        .map(|_| {
            let local = DVec3::new(
                rng.gen_range(lo.x..hi.x),
                rng.gen_range(lo.y..hi.y),
                rng.gen_range(lo.z..hi.z),
            );
            model.local_to_world(local)
        })
        .collect()
}

fn format_rate(count: usize, ms: f64) -> String {
    if ms <= 0.0 {
        return "N/A".to_string();
    }
    let per_sec = count as f64 / (ms / 1000.0);
    if per_sec >= 1_000_000.0 {
        format!("{:.2}M/s", per_sec / 1_000_000.0)
    } else if per_sec >= 1_000.0 {
        format!("{:.1}k/s", per_sec / 1000.0)
    } else {
        format!("{:.0}/s", per_sec)
    }
}

fn format_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{}k", n / 1_000)
    } else {
        format!("{}", n)
    }
}

struct BenchResult {
    subblocks: usize,
    points: usize,
    build_ms: f64,
    resolve_ms: f64,
    summary: ResolutionSummary,
}

fn run_benchmark(model: &SubblockedModel, points: &[DVec3], mode: BoundsMode) -> BenchResult {
    let t0 = Instant::now();
    let indexed = IndexedModel::build(model);
    let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let t1 = Instant::now();
    let records = indexed.resolve_points(points, mode);
    let resolve_ms = t1.elapsed().as_secs_f64() * 1000.0;

    BenchResult {
        subblocks: model.num_subblocks(),
        points: points.len(),
        build_ms,
        resolve_ms,
        summary: ResolutionSummary::from_records(&records),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("subblock resolve benchmark");
    println!("==========================\n");

    let sizes: Vec<usize> = if args.sizes.is_empty() {
        vec![100_000]
    } else {
        args.sizes
    };
    let mode = if args.unbounded {
        BoundsMode::Unbounded
    } else {
        BoundsMode::Enforced
    };

    println!("Configuration:");
    println!("  seed = {}", args.seed);
    println!("  points per subblock = {}", args.points);
    println!("  bounds = {:?}", mode);
    println!(
        "  sizes = {:?}",
        sizes.iter().map(|&n| format_num(n)).collect::<Vec<_>>()
    );
    if args.repeat > 1 {
        println!("  repeat = {}", args.repeat);
    }

    let mut results: Vec<BenchResult> = Vec::new();

    for &n in &sizes {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking n = {}", format_num(n));
        println!("{}", "=".repeat(60));

        let t_gen = Instant::now();
        let model = generate_model(n, args.seed);
        let num_points = (model.num_subblocks() as f64 * args.points).round() as usize;
        let points = generate_points(&model, num_points, args.seed);
        println!(
            "Generated {} subblocks, {} points in {:.1}ms",
            model.num_subblocks(),
            points.len(),
            t_gen.elapsed().as_secs_f64() * 1000.0
        );

        let mut best: Option<BenchResult> = None;
        for iter in 0..args.repeat {
            let result = run_benchmark(&model, &points, mode);
            if args.repeat > 1 {
                println!(
                    "  Iteration {}/{}: build {:.1}ms, resolve {:.1}ms",
                    iter + 1,
                    args.repeat,
                    result.build_ms,
                    result.resolve_ms
                );
            }
            let better = best
                .as_ref()
                .map_or(true, |b| result.build_ms + result.resolve_ms < b.build_ms + b.resolve_ms);
            if better {
                best = Some(result);
            }
        }

        if let Some(result) = best {
            let s = &result.summary;
            println!(
                "Index build: {:>8.1}ms ({})",
                result.build_ms,
                format_rate(result.subblocks, result.build_ms)
            );
            println!(
                "Resolve:     {:>8.1}ms ({})",
                result.resolve_ms,
                format_rate(result.points, result.resolve_ms)
            );
            println!(
                "Outcomes:    {} matched, {} outside, {} unresolved, {:.2} tests/point",
                s.matched,
                s.outside,
                s.unresolved,
                s.candidate_tests as f64 / s.total().max(1) as f64
            );
            results.push(result);
        }
    }

    if results.len() > 1 {
        println!("\n{}", "=".repeat(60));
        println!("Summary");
        println!("{}", "=".repeat(60));
        println!(
            "{:>10} {:>10} {:>12} {:>12} {:>12}",
            "subblocks", "points", "build", "resolve", "rate"
        );
        for r in &results {
            println!(
                "{:>10} {:>10} {:>10.1}ms {:>10.1}ms {:>12}",
                format_num(r.subblocks),
                format_num(r.points),
                r.build_ms,
                r.resolve_ms,
                format_rate(r.points, r.resolve_ms)
            );
        }
    }
}
