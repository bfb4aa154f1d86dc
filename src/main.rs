//! ledframe CLI
//!
//! Command-line interface for converting videos to LED panel streams.

use clap::{Parser, Subcommand};
use ledframe::{
    config::{ConvertConfig, Mode},
    pipeline::{Pipeline, RateDecimator},
    processing::FrameProcessor,
    source::{FileSource, FrameSource, Pattern, SyntheticSource},
    types::Resolution,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

#[derive(Parser)]
#[command(name = "ledframe")]
#[command(about = "Convert video to LED display binary format (40x96 RGB24 @ 30 fps)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a video file to a .bin frame stream
    Convert {
        /// Input video file
        input: PathBuf,

        /// Output filename without extension (defaults to the input name)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory for the .bin file
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Enable high contrast mode for more dramatic black levels
        #[arg(long)]
        high_contrast: bool,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Transform worker threads (1 = single-threaded)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show stream properties and the resulting frame skip
    Probe {
        /// Input video file
        input: PathBuf,
    },

    /// Run the transform chain on synthetic frames
    Bench {
        /// Number of frames to process
        #[arg(short, long, default_value = "300")]
        frames: u64,

        /// Source width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Source height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Benchmark high contrast mode
        #[arg(long)]
        high_contrast: bool,
    },

    /// List mode parameter sets
    Modes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ledframe=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            output_dir,
            high_contrast,
            config,
            workers,
        } => cmd_convert(input, output, output_dir, high_contrast, config, workers).await,
        Commands::Probe { input } => cmd_probe(input),
        Commands::Bench {
            frames,
            width,
            height,
            high_contrast,
        } => cmd_bench(frames, width, height, high_contrast),
        Commands::Modes => cmd_modes(),
    }
}

async fn cmd_convert(
    input: PathBuf,
    output: Option<String>,
    output_dir: Option<PathBuf>,
    high_contrast: bool,
    config_path: Option<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };
    config = config.with_high_contrast(high_contrast);
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(n) = workers {
        config = config.with_workers(n);
    }

    let mut pipeline = Pipeline::new(config);
    let stop = pipeline.stop_handle();

    let mut task = tokio::task::spawn_blocking(move || {
        pipeline.convert_file(&input, output.as_deref())
    });

    let summary = tokio::select! {
        result = &mut task => result??,
        _ = tokio::signal::ctrl_c() => {
            println!("\nStopping after the frames in flight...");
            stop.store(true, Ordering::SeqCst);
            task.await??
        }
    };

    println!("\nConversion complete!");
    println!("  Frames decoded: {}", summary.stats.frames_decoded);
    println!("  Frames written: {}", summary.stats.frames_written);
    println!("  Bytes written: {}", summary.stats.bytes_written);
    println!("  Source FPS: {}, frame skip: {}", summary.source_fps, summary.skip);
    if let Some(err) = &summary.decode_error {
        println!("  Stream ended early: {}", err);
    }
    if let Some(path) = &summary.output_path {
        println!("Binary file generated: {}", path.display());
    }

    Ok(())
}

fn cmd_probe(input: PathBuf) -> anyhow::Result<()> {
    let source = FileSource::open(&input)?;
    let meta = source.metadata();
    let skip = RateDecimator::skip_interval(meta.source_fps, ledframe::TARGET_FPS);

    println!("Source: {}", input.display());
    println!("  Resolution: {}", meta.resolution);
    println!("  Frame rate: {} fps", meta.source_fps);
    println!("  Frames: {}", meta.total_frames);
    println!("  Frame skip for {} fps: {}", ledframe::TARGET_FPS, skip);
    let kept = meta.total_frames.div_ceil(skip);
    println!(
        "  Expected output: {} frames, {} bytes",
        kept,
        kept * Resolution::LED_MATRIX.frame_bytes() as u64
    );

    Ok(())
}

fn cmd_bench(frames: u64, width: u32, height: u32, high_contrast: bool) -> anyhow::Result<()> {
    println!("ledframe Transform Benchmark");
    println!("============================\n");

    let config = ConvertConfig::default().with_high_contrast(high_contrast);
    let processor = FrameProcessor::new(&config);
    let mut source = SyntheticSource::new(30, frames, Resolution::new(width, height), Pattern::Gradient);

    println!("Mode: {}", config.mode);
    println!("Frames: {}", frames);
    println!("Resolution: {}x{} -> {}", width, height, config.resolution());
    println!();

    let start = std::time::Instant::now();
    let mut processed = 0u64;
    while let Some(frame) = source.next_frame()? {
        let _ = processor.process(frame)?;
        processed += 1;
    }
    let elapsed = start.elapsed();

    let fps = processed as f64 / elapsed.as_secs_f64();
    println!("Results:");
    println!("  Total time: {:.2}s", elapsed.as_secs_f64());
    println!("  Frames/s: {:.1}", fps);
    println!(
        "  ms/frame: {:.2}",
        elapsed.as_secs_f64() * 1000.0 / processed.max(1) as f64
    );
    println!(
        "  Realtime capable (30fps): {}",
        if fps >= 30.0 { "Yes" } else { "No" }
    );

    Ok(())
}

fn cmd_modes() -> anyhow::Result<()> {
    println!("Available Modes");
    println!("===============\n");

    for mode in [Mode::Normal, Mode::HighContrast] {
        let p = mode.params();
        println!("  {}", mode);
        println!("    black threshold: {:.2}", p.threshold);
        match p.value_gamma {
            Some(g) => println!("    value gamma: {}", g),
            None => println!("    value gamma: none"),
        }
        match p.pre_mask_stretch {
            Some(s) => println!("    pre-mask stretch: x{} {:+}", s.alpha, s.beta),
            None => println!("    pre-mask stretch: none"),
        }
        println!(
            "    CLAHE: clip {:.1}, {}x{} tiles",
            p.clip_limit, p.tile_grid.0, p.tile_grid.1
        );
        match p.post_equalize_stretch {
            Some(s) => println!("    lightness stretch: x{} {:+}", s.alpha, s.beta),
            None => println!("    lightness stretch: none"),
        }
        println!();
    }

    println!("Usage: ledframe convert <INPUT> [--high-contrast]");

    Ok(())
}
