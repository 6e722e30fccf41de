//! Load a point cloud or mesh and drive the drawing protocol without a window
//!
//! The load runs on a worker thread while progress is printed from the main
//! thread. The geometry is then drawn progressively at the quality that fits
//! the requested vertex budget, and a pick is made through the screen centre.

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use pointscope::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "pointscope-inspect", version, about = "Progressive drawing of large point clouds")]
struct Cli {
    /// Point cloud or mesh to load (las, laz, ply, xyz, csv, txt, obj)
    file: PathBuf,

    /// Maximum number of vertices kept resident
    #[arg(long, default_value = "10000000")]
    max_vertices: usize,

    /// JSON file overriding geometry settings
    #[arg(long, env = "POINTSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the maximum number of points per octree leaf
    #[arg(long)]
    leaf_points: Option<usize>,

    /// Override the distance below which leaves are drawn in full
    #[arg(long)]
    draw_all_distance: Option<f64>,

    /// Vertices drawn per frame
    #[arg(long, default_value = "1000000")]
    budget: f64,

    /// Maximum number of incremental frames to draw
    #[arg(long, default_value = "100")]
    frames: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => GeometryConfig::from_json_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => GeometryConfig::default(),
    };
    if let Some(leaf_points) = cli.leaf_points {
        config.leaf_point_count = leaf_points;
    }
    if let Some(distance) = cli.draw_all_distance {
        config.draw_all_distance = distance;
    }
    config.validate()?;
    let source = cli.file.to_string_lossy().to_string();
    let Some(geometry) = pointscope::render::create_with_config(&source, config.clone()) else {
        bail!("unsupported source: {}", source);
    };

    load(&geometry, &source, cli.max_vertices, config.progress_step_percent)?;

    let g = read_geometry(&geometry);
    let bbox = *g.bounding_box();
    info!(
        "{}: {} vertices, offset {:?}, extent {:?}",
        g.file_name(),
        g.point_count(),
        g.offset().as_slice(),
        bbox.size().as_slice()
    );
    drop(g);

    let transform = overview_camera(&bbox);
    let mut scene = Scene::new();
    scene.add(Arc::clone(&geometry));

    let quality = scene.find_quality(&transform, false, cli.budget, 6);
    info!("Quality {:.4} fits {} vertices per frame", quality, cli.budget);

    let mut shader = RecordingShader::counting();
    let mut count = scene.draw_points(&mut shader, &transform, quality, false);
    let mut frames = 1;
    while count.more_to_draw && frames < cli.frames {
        count = scene.draw_points(&mut shader, &transform, quality, true);
        frames += 1;
    }
    info!(
        "{} frames drew {} vertices{}",
        frames,
        shader.vertex_count(),
        if count.more_to_draw { ", incomplete" } else { "" }
    );
    scene.draw_edges(&mut shader, &transform);
    scene.draw_faces(&mut shader, &transform);
    if shader.triangles_drawn > 0 || shader.lines_drawn > 0 {
        info!("{} triangles, {} lines", shader.triangles_drawn, shader.lines_drawn);
    }

    let eye = transform.camera_position();
    match scene.pick_vertex(&eye, &(bbox.center() - eye), 0.1) {
        Some((_, hit)) => info!("Picked {:?} at distance {:.3}", hit.position.coords.as_slice(), hit.distance),
        None => warn!("Nothing under the screen centre"),
    }
    Ok(())
}

/// Load on a worker thread, printing progress as it arrives
fn load(geometry: &SharedGeometry, source: &str, max_vertices: usize, min_step: u8) -> Result<()> {
    let (reporter, events) = ProgressReporter::channel();
    let mut reporter = reporter.with_min_step(min_step);
    let worker = {
        let geometry = Arc::clone(geometry);
        let source = source.to_string();
        thread::spawn(move || {
            let result = write_geometry(&geometry).load_file(&source, max_vertices, &mut reporter);
            result
        })
    };

    for event in events.iter() {
        match event {
            LoadEvent::StepStarted(step) => info!("{}", step),
            LoadEvent::Progress(percent) => info!("  {}%", percent),
            LoadEvent::Finished(ok) => info!("Load {}", if ok { "finished" } else { "failed" }),
        }
    }

    match worker.join() {
        Ok(result) => result.with_context(|| format!("loading {}", source)),
        Err(_) => bail!("loader thread panicked"),
    }
}

/// Camera looking down at the box centre from outside the box
fn overview_camera(bbox: &Box3d) -> TransformState {
    if bbox.is_empty() {
        return TransformState::default();
    }
    let center = bbox.center();
    let reach = bbox.diagonal().max(1.0);
    TransformState::look_at(
        center + Vector3d::new(0.0, -0.6, 0.8) * reach,
        center,
        Vector3d::z(),
        std::f64::consts::FRAC_PI_4,
        [1920, 1080],
        reach * 0.01,
        reach * 10.0,
    )
}
