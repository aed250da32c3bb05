//! Raster Algebra CLI
//!
//! Runs the engine over synthetic constant-valued rasters, either the
//! built-in demo scenario or a job described in a JSON file.

use anyhow::{bail, Context};
use raster_algebra::prelude::*;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// A job file: engine and tiling configuration plus the sources to combine.
#[derive(Debug, Deserialize)]
struct JobSpec {
    config: AlgebraConfig,
    #[serde(default)]
    processing: ProcessingConfig,
    width: u32,
    height: u32,
    sources: Vec<SourceSpec>,
    #[serde(default)]
    roi: Option<Rect>,
}

/// One constant-valued source; `values` holds one entry per band.
#[derive(Debug, Deserialize)]
struct SourceSpec {
    data_type: DataType,
    values: Vec<f64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("Raster Algebra v{}", raster_algebra::VERSION);
    println!();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("raster-algebra");

    if args.len() < 2 {
        print_usage(program);
        return;
    }

    let result = match args[1].as_str() {
        "demo" => run_demo(),
        "run" => {
            if args.len() < 3 {
                eprintln!("Error: Please specify a job file");
                eprintln!("Usage: {} run <job.json>", program);
                return;
            }
            run_job(Path::new(&args[2]))
        }
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  demo              Sum two byte rasters, with and without no-data");
    println!("  run <job.json>    Execute a job file");
    println!("  help              Show this help message");
    println!();
    println!("Job file:");
    println!("  {{");
    println!("    \"config\": {{ \"operator\": \"sum\", \"nodata\": {{ \"min\": 0, \"max\": 0 }} }},");
    println!("    \"processing\": {{ \"tile_width\": 256, \"tile_height\": 256 }},");
    println!("    \"width\": 1024, \"height\": 1024,");
    println!("    \"sources\": [ {{ \"data_type\": \"byte\", \"values\": [50] }} ],");
    println!("    \"roi\": {{ \"x\": 0, \"y\": 0, \"width\": 512, \"height\": 512 }}");
    println!("  }}");
    println!();
    println!("Set RUST_LOG=debug to see construction decisions.");
}

fn run_demo() -> anyhow::Result<()> {
    let bounds = Rect::new(0, 0, 256, 256);
    let a = RasterImage::constant(bounds, DataType::Byte, &[50.0]);
    let b = RasterImage::constant(bounds, DataType::Byte, &[100.0]);
    let sources: [&dyn RasterSource; 2] = [&a, &b];
    let executor = TiledExecutor::new(ProcessingConfig::new().with_tile_size(64, 64));

    let plain = AlgebraConfig::new().with_operator(Operator::Sum);
    let engine = AlgebraEngine::new(&plain, &sources, None)?;
    let output = executor.execute(&engine, &sources, bounds, None)?;
    println!("sum(50, 100)                         = {:?}", output.image.get::<u8>(0, 0, 0));

    let masked = plain
        .with_nodata(NoDataRange::exact(50.0))
        .with_destination_nodata(100.0);
    let nodata_source = RasterImage::constant(bounds, DataType::Byte, &[50.0]);
    let all_nodata: [&dyn RasterSource; 2] = [&a, &nodata_source];
    let engine = AlgebraEngine::new(&masked, &all_nodata, None)?;
    let output = executor.execute(&engine, &all_nodata, bounds, None)?;
    println!("sum(50, 50), no-data 50, fill 100   = {:?}", output.image.get::<u8>(0, 0, 0));

    let engine = AlgebraEngine::new(&masked, &sources, None)?;
    let output = executor.execute(&engine, &sources, bounds, None)?;
    println!("sum(50, 100), no-data 50, fill 100  = {:?}", output.image.get::<u8>(0, 0, 0));

    Ok(())
}

fn run_job(path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read job file {}", path.display()))?;
    let job: JobSpec = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse job file {}", path.display()))?;

    if job.sources.is_empty() {
        bail!("job has no sources");
    }
    if job.sources.iter().any(|s| s.values.is_empty()) {
        bail!("every source needs at least one band value");
    }

    let bounds = Rect::new(0, 0, job.width, job.height);
    let rasters: Vec<RasterImage> = job
        .sources
        .iter()
        .map(|s| RasterImage::constant(bounds, s.data_type, &s.values))
        .collect();
    let sources: Vec<&dyn RasterSource> = rasters.iter().map(|r| r as &dyn RasterSource).collect();
    let roi = job.roi.map(|rect| Arc::new(RectRoi::new(rect)) as Arc<dyn Roi>);

    let engine = AlgebraEngine::new(&job.config, &sources, roi).context("invalid job configuration")?;
    println!(
        "⚙️  {} over {} source(s): {} band(s) of {}, {:?}",
        engine.state().operator(),
        sources.len(),
        engine.num_bands(),
        engine.data_type(),
        engine.state().path()
    );

    let executor = TiledExecutor::new(job.processing);
    let mut tracker = ProgressTracker::new(executor.tiles(bounds).tile_count()).with_callback(Box::new(
        |update| {
            if let ProgressUpdate::Completed {
                total_duration_ms,
                tiles_computed,
                tiles_outside_roi,
            } = update
            {
                println!(
                    "✅ Complete in {}ms ({} computed, {} outside ROI)",
                    total_duration_ms, tiles_computed, tiles_outside_roi
                );
            }
        },
    ));
    let output = executor.execute(&engine, &sources, bounds, Some(&mut tracker))?;

    for band in 0..engine.num_bands() {
        let (min, max, mean) = band_summary(&output.image, band);
        println!("band {}: min {} max {} mean {:.4}", band, min, max, mean);
    }
    Ok(())
}

fn band_summary(image: &RasterImage, band: usize) -> (f64, f64, f64) {
    let bounds = image.bounds();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0u64;
    for y in bounds.y..bounds.bottom() {
        for x in bounds.x..bounds.right() {
            if let Some(v) = image.get_f64(x, y, band) {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                count += 1;
            }
        }
    }
    let mean = if count > 0 { sum / count as f64 } else { f64::NAN };
    (min, max, mean)
}
