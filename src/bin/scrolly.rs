use std::io::{BufRead as _, Read as _, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scrolly", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the video track of an MP4 as JSON.
    Probe(ProbeArgs),
    /// Decode every frame of an MP4 (requires the `media-ffmpeg` feature and `ffmpeg` on PATH).
    Decode(DecodeArgs),
    /// Drive a headless engine through a script and print its state per frame as JSON lines.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input MP4.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Also list every sample.
    #[arg(long, default_value_t = false)]
    samples: bool,
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Input MP4.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Scale frames down to at most this width.
    #[arg(long)]
    max_width: Option<u32>,

    /// Write this frame index as a PNG.
    #[arg(long, requires = "out")]
    frame: Option<usize>,

    /// Output PNG path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Engine config JSON; `src` may be left out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Video the engine points at. Only opened with `--decode`.
    #[arg(long, default_value = "video.mp4")]
    src: String,

    /// Duration reported by the simulated media element, in seconds.
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// JSON lines of `{"at_ms", "percentage", "jump", "transition_speed"}`.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Simulated wall time in milliseconds.
    #[arg(long, default_value_t = 2000.0)]
    ms: f64,

    /// Display refresh interval in milliseconds.
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Simulate an element without smooth playback-rate control.
    #[arg(long, default_value_t = false)]
    no_rate_control: bool,

    /// Decode `src` with ffmpeg and paint into an in-memory surface.
    #[arg(long, default_value_t = false)]
    decode: bool,
}

#[derive(Debug, serde::Deserialize)]
struct ScriptStep {
    #[serde(default)]
    at_ms: f64,
    percentage: f64,
    #[serde(default)]
    jump: bool,
    #[serde(default)]
    transition_speed: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
struct FrameReport {
    t_ms: f64,
    mode: scrolly::EngineMode,
    current_time: f64,
    target_time: f64,
    transitioning: bool,
    presented: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Decode(args) => cmd_decode(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let mut bytes = Vec::new();
    std::fs::File::open(&args.in_path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .with_context(|| format!("read '{}'", args.in_path.display()))?;

    let mut demuxer = scrolly::Mp4Demuxer::new();
    demuxer.append(&bytes)?;
    demuxer.finish()?;
    let track = demuxer.track().context("no video track")?;

    let mut report = serde_json::json!({
        "codec": track.codec(),
        "track": track,
        "sample_count": track.samples.len(),
        "keyframes": track.samples.iter().filter(|s| s.is_sync).count(),
    });
    if args.samples {
        report["samples"] = serde_json::to_value(&track.samples)?;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(feature = "media-ffmpeg")]
fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    use scrolly::ByteSource as _;

    anyhow::ensure!(scrolly::is_ffmpeg_on_path(), "ffmpeg not found on PATH");
    let reader = scrolly::FileSource::new().open(&args.in_path.to_string_lossy())?;
    let decoder = scrolly::FfmpegDecoder::new(scrolly::FfmpegDecoderOpts {
        max_width: args.max_width,
    });
    let store = scrolly::decode(reader, Box::new(decoder), scrolly::DecodeOptions::default())?;

    let report = serde_json::json!({
        "frames": store.len(),
        "duration": store.duration(),
        "frame_rate": store.frame_rate(),
        "size": store.get(0).map(|f| (f.width(), f.height())),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let (Some(index), Some(out)) = (args.frame, args.out.as_deref()) {
        let frame = store
            .get(index)
            .with_context(|| format!("frame {index} out of range (0..{})", store.len()))?;
        write_png(out, frame.pixels(), frame.width(), frame.height())?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

#[cfg(not(feature = "media-ffmpeg"))]
fn cmd_decode(_args: DecodeArgs) -> anyhow::Result<()> {
    anyhow::bail!("built without the `media-ffmpeg` feature")
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn write_png(out: &Path, rgba: &[u8], width: u32, height: u32) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        out,
        rgba,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn read_script(path: Option<&Path>) -> anyhow::Result<Vec<ScriptStep>> {
    let Some(path) = path else {
        return Ok(vec![ScriptStep {
            at_ms: 0.0,
            percentage: 0.5,
            jump: false,
            transition_speed: Some(1000.0),
        }]);
    };
    let file = std::fs::File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    let mut steps = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let step: ScriptStep = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid step", path.display(), n + 1))?;
        steps.push(step);
    }
    steps.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
    Ok(steps)
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.frame_ms > 0.0, "--frame-ms must be > 0");
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read '{}'", path.display()))?;
            let mut value: serde_json::Value = serde_json::from_str(&text)?;
            if value.get("src").is_none() {
                value["src"] = serde_json::Value::String(args.src.clone());
            }
            scrolly::EngineConfig::from_json_str(&value.to_string())?
        }
        None => scrolly::EngineConfig::new(args.src.clone()),
    };
    config.track_scroll = false;
    config.use_decode_pipeline &= args.decode;

    let mut element = scrolly::SimulatedMediaElement::new(Some(args.duration));
    if args.no_rate_control {
        element = element.without_rate_control();
    }
    let surface = scrolly::MemorySurface::new();
    let mut mount = scrolly::Mount::new(Box::new(element.clone()))
        .with_surface(Box::new(surface.clone()))
        .on_ready(|| tracing::info!("engine ready"));
    if args.decode {
        mount = attach_decoder(mount)?;
    }
    let mut engine = scrolly::ScrollyVideo::new(config, mount)?;
    engine.media_metadata_ready(args.duration);

    let steps = read_script(args.script.as_deref())?;
    let mut next_step = steps.iter().peekable();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut t = 0.0;
    while t <= args.ms {
        while let Some(step) = next_step.next_if(|s| s.at_ms <= t) {
            let opts = scrolly::TransitionOpts {
                jump: step.jump,
                transition_speed_ms: step.transition_speed,
                easing: None,
            };
            engine.set_target_percentage(step.percentage, opts);
        }
        element.advance(args.frame_ms);
        engine.frame(t);
        let report = FrameReport {
            t_ms: t,
            mode: engine.mode(),
            current_time: engine.current_time(),
            target_time: engine.target_time(),
            transitioning: engine.is_transitioning(),
            presented: surface.log().presented.last().copied(),
        };
        serde_json::to_writer(&mut out, &report)?;
        out.write_all(b"\n")?;
        t += args.frame_ms;
    }
    engine.destroy();
    Ok(())
}

#[cfg(feature = "media-ffmpeg")]
fn attach_decoder(mount: scrolly::Mount) -> anyhow::Result<scrolly::Mount> {
    anyhow::ensure!(scrolly::is_ffmpeg_on_path(), "ffmpeg not found on PATH");
    Ok(mount
        .with_decoders(std::sync::Arc::new(scrolly::FfmpegDecoderFactory::default()))
        .with_sources(std::sync::Arc::new(scrolly::FileSource::new())))
}

#[cfg(not(feature = "media-ffmpeg"))]
fn attach_decoder(_mount: scrolly::Mount) -> anyhow::Result<scrolly::Mount> {
    anyhow::bail!("--decode needs the `media-ffmpeg` feature")
}
