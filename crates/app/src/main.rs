use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wavescope_core::export::{EncoderSettings, FfmpegEncoder};
use wavescope_core::{
    AppConfig, AudioClip, AudioTap, EffectVariant, ExportOutcome, ExportPipeline, ExportSettings,
    FrameScheduler, ResolutionPreset, SpectralSampler, Transport, VirtualClock, VizError,
};

fn main() -> wavescope_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_json_path(path)?,
        None => AppConfig::live_defaults(),
    };

    match cli.command {
        Commands::Export {
            input,
            effect,
            resolution,
            out_dir,
            avatar,
        } => run_export(&input, effect, resolution, &config, &out_dir, avatar),
        Commands::Preview {
            input,
            effect,
            frames,
            width,
            height,
            out_dir,
        } => run_preview(&input, effect, frames, width, height, &config, &out_dir),
        Commands::Effects => {
            list_effects();
            Ok(())
        }
    }
}

fn run_export(
    input: &Path,
    effect: EffectVariant,
    resolution: ResolutionPreset,
    config: &AppConfig,
    out_dir: &Path,
    avatar: Option<PathBuf>,
) -> wavescope_core::Result<()> {
    tracing::info!(?input, effect = effect.name(), preset = resolution.label(), "starting export");

    let clip = AudioClip::from_wav_path(input)?;
    let track_name = track_name_from(input);
    let mut transport = Transport::new();
    transport.load(track_name.clone(), &clip);
    let sampler = SpectralSampler::new(AudioTap::new(clip), config.render.spectrum_bins);

    let fps = config.render.fps;
    let (width, height) = resolution.dimensions();
    let mut pipeline = ExportPipeline::new(ExportSettings {
        preset: resolution,
        fps,
        out_dir: out_dir.to_path_buf(),
        avatar_path: avatar,
        avatar_timeout: Duration::from_secs(3),
    });

    let mut encoder = FfmpegEncoder::open(&EncoderSettings {
        width,
        height,
        fps,
        bitrate_bps: resolution.bitrate_bps(),
        track_name,
        out_dir: out_dir.to_path_buf(),
        audio_path: Some(input.to_path_buf()),
    })?;

    match pipeline.export(effect, &mut transport, &sampler, &mut encoder)? {
        ExportOutcome::Completed(path) => {
            tracing::info!(?path, "export finished");
        }
        ExportOutcome::Cancelled => {
            tracing::warn!("export cancelled");
        }
    }
    Ok(())
}

fn run_preview(
    input: &Path,
    effect: EffectVariant,
    frames: u32,
    width: u32,
    height: u32,
    config: &AppConfig,
    out_dir: &Path,
) -> wavescope_core::Result<()> {
    tracing::info!(?input, effect = effect.name(), frames, "rendering preview frames");

    let clip = AudioClip::from_wav_path(input)?;
    let sampler = SpectralSampler::new(AudioTap::new(clip), config.render.spectrum_bins);
    let mut scheduler = FrameScheduler::new(effect, width, height);
    let mut clock = VirtualClock::new(config.render.fps);

    std::fs::create_dir_all(out_dir)?;
    let mut save_error = None;
    scheduler.run(&mut clock, &sampler, |canvas, tick, _| {
        let path = out_dir.join(format!("{}_{tick:05}.png", effect.name()));
        let buffer = canvas.to_rgba8();
        match image::RgbaImage::from_raw(width, height, buffer) {
            Some(frame) => {
                if let Err(e) = frame.save(&path) {
                    save_error = Some(VizError::Image(e.to_string()));
                    return false;
                }
            }
            None => {
                save_error = Some(VizError::Image("frame buffer size mismatch".into()));
                return false;
            }
        }
        tick < frames as u64
    });
    if let Some(error) = save_error {
        return Err(error);
    }

    tracing::info!(?out_dir, "preview frames written");
    Ok(())
}

fn list_effects() {
    for variant in EffectVariant::ALL {
        println!("{:<16} {}", variant.name(), variant.label());
    }
}

fn track_name_from(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive visualizer and video exporter", long_about = None)]
struct Cli {
    /// Optional JSON config file overriding fps and spectrum resolution.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a track to video through ffmpeg.
    Export {
        /// Path to the WAV file to visualize.
        input: PathBuf,
        /// Effect to render, see `effects` for the list.
        #[arg(short, long, default_value = "bars")]
        effect: EffectVariant,
        /// Output resolution preset: 720p, 1080p or 2160p.
        #[arg(short, long, default_value = "1080p")]
        resolution: ResolutionPreset,
        /// Directory the finished file is written into.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Optional avatar image blended into effects that support one.
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Render the first frames of a track to PNG files.
    Preview {
        /// Path to the WAV file to visualize.
        input: PathBuf,
        /// Effect to render.
        #[arg(short, long, default_value = "bars")]
        effect: EffectVariant,
        /// Number of frames to write.
        #[arg(short, long, default_value_t = 60)]
        frames: u32,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 360)]
        height: u32,
        /// Directory the PNG frames are written into.
        #[arg(short, long, default_value = "preview")]
        out_dir: PathBuf,
    },
    /// List the available effects.
    Effects,
}
