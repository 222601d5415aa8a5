//! Lumo - offline path tracer.
//!
//! Reads a `params.json`, loads the OBJ scene and environment map it names
//! and renders on a background thread. Every `wait_time` seconds the image
//! so far is written as `NN.png`; the finished image is `completion.png`.

mod params;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use lumo_core::{load_json, load_obj, Environment, Scene};
use lumo_renderer::{RenderInfo, RenderWorker};

use crate::params::Params;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Render parameter file.
    #[arg(value_name = "FILE", default_value = "res/params.json")]
    params: PathBuf,

    /// Directory receiving progress snapshots and the final image.
    #[arg(long, short = 'o', value_name = "DIR", default_value = "progress")]
    output: PathBuf,

    /// Number of rendering threads (defaults to all cores).
    #[arg(long, short = 't', value_name = "NUM")]
    threads: Option<usize>,

    /// Override the snapshot interval in seconds.
    #[arg(long, value_name = "SECONDS")]
    wait_time: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
    }

    let params: Params = load_json(&args.params)
        .with_context(|| format!("Failed to read parameters from {}", args.params.display()))?;
    let base = args.params.parent().unwrap_or_else(|| Path::new("."));

    let scene_path = params.scene_path(base);
    let model = load_obj(&scene_path).with_context(|| format!("Failed to load scene {}", scene_path.display()))?;

    let env_path = params.environment_path(base);
    let environment = Environment::load(&env_path)
        .with_context(|| format!("Failed to load environment {}", env_path.display()))?;

    let scene = Scene::new(model, params.camera.to_camera(), environment);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let info = RenderInfo::new(&scene, params.window_width, params.window_height, params.settings.clone())?;
    let wait_time = Duration::from_secs(args.wait_time.unwrap_or(params.wait_time));

    let render_begin = Instant::now();
    let mut worker = RenderWorker::spawn(info);
    let mut png_index = 1;

    while !worker.wait_for(wait_time) {
        let path = args.output.join(format!("{:02}.png", png_index));
        write_png(&path, worker.width(), worker.height(), &worker.snapshot())?;
        log::info!(
            "Progress {}/{} rows: {}",
            worker.rows_completed(),
            worker.height(),
            path.display()
        );
        png_index += 1;
    }

    let (width, height) = (worker.width(), worker.height());
    let pixels = worker.snapshot();
    let stats = worker.join()?;

    let path = args.output.join("completion.png");
    write_png(&path, width, height, &pixels)?;
    log::info!("Wrote {}", path.display());
    log::info!(
        "Render time: {:.3} s ({} samples)",
        render_begin.elapsed().as_secs_f32(),
        stats.samples
    );

    Ok(())
}

fn write_png(path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    image::save_buffer(path, pixels, width, height, image::ColorType::Rgb8)
        .with_context(|| format!("Failed to write {}", path.display()))
}
