use clap::Parser;
use croprow::core::parse_level;
use croprow::detect::{detect_crop_rows_with, draw_roi_outline, resize_to_frame, to_image_rgb};
use croprow::detector::{
    render_cluster_plot, CropRowDetectConfig, CropRowDetectReport, CropRowDetector,
    CropRowFrameReport,
};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const ROI_COLOR: [u8; 3] = [255, 255, 0];

#[derive(Parser)]
#[command(
    name = "croprow",
    version,
    about = "Detect crop rows in a directory of field images"
)]
struct Cli {
    /// Directory of input frames (processed in file name order).
    input_dir: PathBuf,
    /// Where overlays, plots and the report go (defaults to the config's `output_dir`).
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// JSON config with detector parameters.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Also write a bird's-eye cluster plot per frame.
    #[arg(long)]
    plot: bool,
    /// Only measure latency; write nothing.
    #[arg(long)]
    timing_only: bool,
    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Outline the ROI trapezoid on the overlays.
    #[arg(long)]
    draw_roi: bool,
}

/// Per-frame detection latencies of one run.
#[derive(Debug, Default)]
struct FrameTimings {
    samples: Vec<Duration>,
}

impl FrameTimings {
    fn record(&mut self, d: Duration) {
        self.samples.push(d);
    }

    fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or_default()
    }

    fn mean(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }
}

fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(level) = parse_level(level) else {
        return Err(format!("unknown log level `{level}`").into());
    };
    #[cfg(feature = "tracing")]
    {
        // RUST_LOG drives the filter here.
        let _ = level;
        let _ = tracing_log::LogTracer::init();
        croprow::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    croprow::core::init_with_level(level)?;
    Ok(())
}

fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(
    cli: &Cli,
    detector: &CropRowDetector,
    out_dir: &Path,
) -> Result<(Vec<CropRowFrameReport>, FrameTimings), Box<dyn std::error::Error>> {
    let params = detector.params();
    let mut reports = Vec::new();
    let mut timings = FrameTimings::default();

    for path in list_frames(&cli.input_dir)? {
        let name = file_name(&path);
        let img = match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                reports.push(CropRowFrameReport::failed(name, err));
                continue;
            }
        };
        let frame = resize_to_frame(&img, params.frame);

        let started = Instant::now();
        let result = detect_crop_rows_with(detector, &frame)?;
        let elapsed = started.elapsed();
        timings.record(elapsed);

        let latency_ms = elapsed.as_secs_f64() * 1e3;
        info!("{name}: {} rows in {latency_ms:.2} ms", result.lines.len());
        reports.push(CropRowFrameReport::from_result(&name, &result, latency_ms));

        if cli.timing_only {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());

        let mut overlay = result.overlay.clone();
        if cli.draw_roi {
            draw_roi_outline(&mut overlay, detector.rectifier(), ROI_COLOR);
        }
        to_image_rgb(&overlay)?.save(out_dir.join(format!("{stem}_rows.png")))?;

        if let Some(debug) = result.debug.as_ref().filter(|_| cli.plot) {
            to_image_rgb(&render_cluster_plot(debug))?
                .save(out_dir.join(format!("{stem}_clusters.png")))?;
        }
    }

    Ok((reports, timings))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = match &cli.config {
        Some(path) => CropRowDetectConfig::load_json(path)?,
        None => CropRowDetectConfig::default(),
    };
    config.image_dir = Some(cli.input_dir.display().to_string());
    if let Some(out) = &cli.output {
        config.output_dir = Some(out.display().to_string());
    }
    if cli.plot {
        config.params.debug = true;
    }

    let detector = config.build_detector()?;
    let out_dir = config.output_dir();
    if !cli.timing_only {
        fs::create_dir_all(&out_dir)?;
    }

    let (frames, timings) = run(&cli, &detector, &out_dir)?;
    let max_ms = timings.max().as_secs_f64() * 1e3;
    let mean_ms = timings.mean().as_secs_f64() * 1e3;
    println!(
        "processed {} frames: max latency {max_ms:.2} ms, mean latency {mean_ms:.2} ms",
        timings.samples.len()
    );

    if !cli.timing_only {
        let report = CropRowDetectReport {
            params: config.params.clone(),
            frames,
            max_latency_ms: max_ms,
            mean_latency_ms: mean_ms,
        };
        let report_path = out_dir.join("report.json");
        report.write_json(&report_path)?;
        info!("report written to {}", report_path.display());
    }

    Ok(())
}
