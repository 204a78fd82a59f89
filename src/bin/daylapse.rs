use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "daylapse", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a timelapse MP4 from one guide image (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Encode an ordered list of PNG frames into an MP4 (requires `ffmpeg` on PATH).
    Encode(EncodeArgs),
    /// Print the frame schedule as JSON.
    Schedule(ScheduleArgs),
}

#[derive(Parser, Debug)]
struct WindowArgs {
    /// Number of frames.
    #[arg(long, default_value_t = 48)]
    frames: usize,

    /// First hour of the window (0-23).
    #[arg(long, default_value_t = 6)]
    start_hour: u8,

    /// Last hour of the window (0-23); at or before the start wraps past midnight.
    #[arg(long, default_value_t = 18)]
    end_hour: u8,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Guide image (any format `image` can decode).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    window: WindowArgs,

    /// Guide lightness weight in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    /// Latent noise seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Fail instead of skipping frames the generator could not produce.
    #[arg(long)]
    strict: bool,

    /// Pipeline config JSON (encoder settings, image sizes).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface renderer.
    #[arg(long, value_enum, default_value_t = RendererChoice::Cpu)]
    renderer: RendererChoice,

    /// Also write every composited frame as a PNG into this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Move one frame before encoding, as `FROM:TO` (0-based).
    #[arg(long, value_parser = parse_reorder)]
    reorder: Option<(usize, usize)>,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Pipeline config JSON (only the encoder section is used).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface renderer.
    #[arg(long, value_enum, default_value_t = RendererChoice::Cpu)]
    renderer: RendererChoice,

    /// Frames in presentation order.
    #[arg(required = true)]
    frames: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RendererChoice {
    Cpu,
    Gpu,
}

impl From<RendererChoice> for daylapse::RendererKind {
    fn from(c: RendererChoice) -> Self {
        match c {
            RendererChoice::Cpu => daylapse::RendererKind::Cpu,
            RendererChoice::Gpu => daylapse::RendererKind::Gpu,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Encode(args) => cmd_encode(args),
        Command::Schedule(args) => cmd_schedule(args),
    }
}

fn parse_reorder(s: &str) -> Result<(usize, usize), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{s}'"))?;
    let from = from
        .trim()
        .parse()
        .map_err(|e| format!("bad FROM in '{s}': {e}"))?;
    let to = to
        .trim()
        .parse()
        .map_err(|e| format!("bad TO in '{s}': {e}"))?;
    Ok((from, to))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<daylapse::PipelineConfig> {
    match path {
        Some(p) => Ok(daylapse::PipelineConfig::from_json_file(p)?),
        None => Ok(daylapse::PipelineConfig::default()),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let request = daylapse::TimelapseRequest {
        frame_count: args.window.frames,
        start_hour: args.window.start_hour,
        end_hour: args.window.end_hour,
        alpha: args.alpha,
        seed: args.seed,
        require_all_frames: args.strict,
    };
    request.validate()?;

    let guide = daylapse::Frame::open_square(&args.in_path, cfg.guide_size)?;
    let mut generator = daylapse::GradeGenerator::new(cfg.inference_size);
    let backend = daylapse::SystemBackend::new(args.renderer.into());
    let cancel = daylapse::CancelFlag::new();

    if args.frames_dir.is_none() && args.reorder.is_none() {
        let summary = daylapse::render_timelapse(
            &guide,
            &request,
            &mut generator,
            &backend,
            &args.out,
            &cfg,
            &cancel,
        )?;
        if !summary.skipped.is_empty() {
            eprintln!(
                "skipped {} of {} frames: {:?}",
                summary.skipped.len(),
                summary.requested,
                summary.skipped
            );
        }
        match summary.video {
            Some(v) => eprintln!("wrote {} ({} frames)", v.path.display(), v.frames),
            None => anyhow::bail!("no frames were generated; nothing written"),
        }
        return Ok(());
    }

    let mut report =
        daylapse::generate_frames(&guide, &request, &mut generator, &cfg, &cancel)?;
    if let Some((from, to)) = args.reorder {
        daylapse::reorder_frames(&mut report.frames, from, to)?;
    }
    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create frames dir '{}'", dir.display()))?;
        for (pos, f) in report.frames.iter().enumerate() {
            let path = dir.join(format!("frame_{pos:03}_{:02}h.png", f.hour));
            f.frame.save_png(&path)?;
        }
        eprintln!("wrote {} frames to {}", report.frames.len(), dir.display());
    }

    let frames = report.frames.into_iter().map(|f| f.frame);
    match daylapse::encode_frames(frames, &args.out, &cfg.encoder, &backend)? {
        Some(v) => eprintln!("wrote {} ({} frames)", v.path.display(), v.frames),
        None => anyhow::bail!("no frames were generated; nothing written"),
    }
    Ok(())
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let backend = daylapse::SystemBackend::new(args.renderer.into());

    let mut frames = Vec::with_capacity(args.frames.len());
    for p in &args.frames {
        let img = image::open(p).with_context(|| format!("decode frame '{}'", p.display()))?;
        frames.push(daylapse::Frame::from_image(img.to_rgba8()));
    }

    match daylapse::encode_frames(frames, &args.out, &cfg.encoder, &backend)? {
        Some(v) => eprintln!("wrote {} ({} frames)", v.path.display(), v.frames),
        None => anyhow::bail!("no frames to encode"),
    }
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let entries = daylapse::schedule(
        args.window.frames,
        args.window.start_hour,
        args.window.end_hour,
    )?;
    let rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "index": e.index,
                "progress": e.progress,
                "model_time": e.model_time,
                "hour": e.hour,
                "time_of_day": e.time_of_day(),
                "label": daylapse::TimeOfDay::clock_label(e.hour),
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&rows).context("serialize schedule")?
    );
    Ok(())
}
