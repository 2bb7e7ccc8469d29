use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use raylace_assets::{AssetCache, AssetLocator, LocatingFetcher};
use raylace_core::hash::hash_frame;
use raylace_core::{Point2D, RaylaceConfig};
use raylace_render::{GradientEngine, ThreadWorkerPool};
use raylace_viewer::{
    CoordinatorSettings, DidHandle, LoggingGate, LoggingSink, RenderCoordinator,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "raylace.toml";

#[derive(Parser)]
#[command(
    name = "raylace",
    version,
    about = "Raylace: interlaced multi-worker ray tracing viewer",
    long_about = "Raylace drives a pool of render workers, each tracing an interlaced\nslice of the frame, and composites their slices into one image.\n\nThis binary runs a headless viewer session and writes the final frame."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless viewer session and write the final frame as PNG
    Render {
        /// Configuration file (default: ./raylace.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scene key to load (overrides viewer.initial_scene)
        #[arg(short, long)]
        scene: Option<String>,

        /// Viewport width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Viewport height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Number of render workers (0 = one per hardware thread)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Camera drag X0,Y0,X1,Y1 applied after the first frame (repeatable)
        #[arg(long = "turn", value_parser = parse_drag)]
        turns: Vec<(Point2D, Point2D)>,

        /// Resize the viewport to WxH after the camera drags
        #[arg(long, value_parser = parse_size)]
        resize: Option<(u32, u32)>,

        /// Output PNG path
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination path
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Render {
            config,
            scene,
            width,
            height,
            workers,
            turns,
            resize,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(scene) = scene {
                config.viewer.initial_scene = scene;
            }
            if let Some(width) = width {
                config.viewer.width = width;
            }
            if let Some(height) = height {
                config.viewer.height = height;
            }
            if let Some(workers) = workers {
                config.workers.count = workers;
            }
            run_async(cmd_render(config, turns, resize, output))
        }
        Commands::InitConfig { path } => cmd_init_config(&path),
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

fn load_config(path: Option<&Path>) -> Result<RaylaceConfig> {
    match path {
        Some(path) => RaylaceConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        // Best effort: a missing default config means built-in defaults.
        None => Ok(RaylaceConfig::load_from_file(Path::new(DEFAULT_CONFIG_FILE)).unwrap_or_default()),
    }
}

async fn cmd_render(
    config: RaylaceConfig,
    turns: Vec<(Point2D, Point2D)>,
    resize: Option<(u32, u32)>,
    output: PathBuf,
) -> Result<()> {
    let start = Instant::now();
    let amount_workers = config.worker_count();

    println!("🎬 Raylace headless session");
    println!("   Scene:    {}", config.viewer.initial_scene);
    println!("   Viewport: {}x{}", config.viewer.width, config.viewer.height);
    println!("   Workers:  {}", amount_workers);

    let fetcher = LocatingFetcher::new(AssetLocator::from_config(&config.assets));
    let cache = Arc::new(AssetCache::new(Arc::new(fetcher)));
    let pool = ThreadWorkerPool::spawn(amount_workers, GradientEngine::factory())
        .context("failed to start render workers")?;

    let mut coordinator = RenderCoordinator::start(
        cache,
        Box::new(pool),
        Box::new(LoggingGate::new()),
        Box::new(LoggingSink::new()),
        CoordinatorSettings::from_config(&config),
    )
    .await
    .with_context(|| format!("failed to load scene '{}'", config.viewer.initial_scene))?;
    coordinator.run_until_idle().await?;

    for (drag_begin, drag_end) in turns {
        println!("   ↻ Turning camera {} -> {}", drag_begin, drag_end);
        require_handled(
            coordinator.turn_camera(drag_begin, drag_end),
            format_args!("camera drag {} -> {}", drag_begin, drag_end),
        )?;
        coordinator.run_until_idle().await?;
    }
    if let Some((width, height)) = resize {
        println!("   ⤢ Resizing to {}x{}", width, height);
        require_handled(
            coordinator.resize(width, height),
            format_args!("resize to {}x{}", width, height),
        )?;
        coordinator.run_until_idle().await?;
    }

    let frame = coordinator.frame();
    image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame size does not match its pixel data")?
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stats = coordinator.stats();
    println!("✅ Wrote {} ({}x{})", output.display(), frame.width, frame.height);
    println!("   Frame hash: {}", hash_frame(frame));
    println!(
        "   Cycles: {} completed, {} abandoned",
        stats.completed_cycles, stats.abandoned_cycles
    );
    if let Some(last) = stats.last_render_time {
        println!("   Last render: {} ms", last.as_millis());
    }
    println!("   Total time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// The coordinator only rejects requests while busy, which a headless session never is.
fn require_handled(handled: DidHandle, request: std::fmt::Arguments<'_>) -> Result<()> {
    if !handled.is_handled() {
        anyhow::bail!("{} was not accepted", request);
    }
    Ok(())
}

fn cmd_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("'{}' already exists", path.display());
    }
    RaylaceConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("📝 Wrote default configuration to {}", path.display());
    Ok(())
}

fn parse_drag(value: &str) -> std::result::Result<(Point2D, Point2D), String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", value, e))?;
    match coords.as_slice() {
        [x0, y0, x1, y1] => Ok((Point2D::new(*x0, *y0), Point2D::new(*x1, *y1))),
        _ => Err(format!("expected X0,Y0,X1,Y1, got '{}'", value)),
    }
}

fn parse_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("bad width: {}", e))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("bad height: {}", e))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got '{}'", value));
    }
    Ok((width, height))
}
