use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use video_watermark_removal::{
    default_output_path, is_supported_video, region::MIN_REGION_SIZE, ProcessOptions,
    ProcessResult, RemovalEngine, WatermarkRegion,
};

#[derive(Parser)]
#[command(
    name = "video-watermark",
    about = "Remove a static video watermark via frame-by-frame Telea inpainting",
    version,
    after_help = "Simple usage: video-watermark <video>  (inpaint the default 200x80 region at (20,20))\n\n\
                  Pick the rectangle so it covers the watermark on the first frame; the same\n\
                  rectangle is repaired on every frame. Requires ffmpeg and ffprobe on PATH."
)]
struct Cli {
    /// Input video file (.mp4, .mov, .avi)
    input: String,

    /// Output file (default: cleaned_{name}.mp4)
    #[arg(short, long)]
    output: Option<String>,

    /// Left edge of the watermark rectangle, in pixels
    #[arg(short = 'x', long, default_value = "20")]
    x: u32,

    /// Top edge of the watermark rectangle, in pixels
    #[arg(short = 'y', long, default_value = "20")]
    y: u32,

    /// Width of the watermark rectangle, in pixels (minimum 10)
    #[arg(short = 'W', long, default_value = "200")]
    width: u32,

    /// Height of the watermark rectangle, in pixels (minimum 10)
    #[arg(short = 'H', long, default_value = "80")]
    height: u32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.width < MIN_REGION_SIZE || cli.height < MIN_REGION_SIZE {
        eprintln!("Error: Rectangle width and height must be at least {MIN_REGION_SIZE} pixels");
        process::exit(1);
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }
    if !is_supported_video(input_path) {
        eprintln!("Error: Unsupported container (expected .mp4, .mov, or .avi)");
        process::exit(1);
    }

    let output_path = match &cli.output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(input_path),
    };

    let opts = ProcessOptions {
        region: WatermarkRegion::new(cli.x, cli.y, cli.width, cli.height),
        verbose: cli.verbose,
        quiet: cli.quiet,
        ..ProcessOptions::default()
    };

    if !opts.quiet {
        eprintln!(
            "Repairing {}x{} region at ({}, {})",
            cli.width, cli.height, cli.x, cli.y
        );
    }

    let bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames")
                .expect("progress template is valid"),
        );
        bar
    };

    let engine = {
        let bar = bar.clone();
        RemovalEngine::new().with_observer(Box::new(move |update| {
            if let Some(total) = update.total_frames {
                if bar.length() != Some(total) {
                    bar.set_length(total);
                }
            }
            bar.set_position(update.frames_done.min(bar.length().unwrap_or(u64::MAX)));
        }))
    };

    let result = engine.process_file(input_path, &output_path, &opts);
    bar.finish_and_clear();

    print_result(&result, &output_path, &opts);
    if !result.success {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, output: &Path, opts: &ProcessOptions) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !opts.quiet {
            eprintln!(
                "[OK] {filename}: {} ({} frames) -> {}",
                result.message,
                result.frames_processed,
                output.display()
            );
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && result.success && !result.has_audio {
        eprintln!("  -> output is video-only; the source carried no audio track");
    }
}
