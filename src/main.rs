mod audio;
mod cli;
mod clock;
mod config;
mod encode;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use config::{Resolution, VisualConfig};
use encode::ffmpeg;
use encode::session::{run_export, ExportProfile};
use render::background::Background;
use render::pipeline::RenderSession;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_visualizers {
        println!("Available visualizers:");
        for id in render::viz::ids() {
            println!("  {id}");
        }
        return Ok(());
    }

    // Load config: explicit --config path, or auto-detect resona.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("resona.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("resona").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("resona").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut cfg = match &config_path {
        Some(path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                VisualConfig::default()
            }
        },
        None => VisualConfig::default(),
    };

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    // CLI values win over the config file
    if let Some(viz) = &cli.viz {
        cfg.viz_type = viz.clone();
    }
    if let Some(res) = &cli.resolution {
        cfg.resolution = Resolution::parse(res)
            .with_context(|| format!("Unknown resolution {res}, expected 1920x1080, 1080x1920 or 1080x1080"))?;
    }
    if let Some(title) = &cli.title {
        cfg.title = title.clone();
    } else if cfg.title == VisualConfig::default().title {
        // Neither CLI nor config named the track; use the filename.
        if let Some(stem) = input.file_stem().and_then(|s| s.to_str()) {
            cfg.title = stem.to_string();
        }
    }
    if let Some(artist) = &cli.artist {
        cfg.artist = artist.clone();
    }

    let codec = match &cli.codec {
        Some(name) => ffmpeg::codec_by_name(name)
            .with_context(|| format!("Unsupported codec {name}"))?,
        None => ffmpeg::pick_codec(),
    };
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension(codec.container));

    let mut profile = ExportProfile::for_mode(cli.safe_mode);
    if let Some(bitrate) = &cli.bitrate {
        profile.bitrate = parse_bitrate(bitrate)
            .with_context(|| format!("Invalid bitrate {bitrate}"))?;
    }

    log::info!("Input: {}", input.display());
    log::info!("Output: {}", output.display());
    log::info!("Visualizer: {}", cfg.viz_type);
    let (width, height) = cfg.resolution.dims();
    log::info!("Resolution: {}x{} @ {}fps", width, height, profile.fps);

    log::info!("Decoding audio...");
    let track = audio::decode::decode_audio(input)?;
    log::info!("Duration: {:.1}s", track.duration());

    // A missing or broken background degrades to a black frame, never fatal.
    let background = match &cli.background {
        Some(path) => match Background::open(path, cfg.yoyo_mode) {
            Ok(bg) => bg,
            Err(err) => {
                log::warn!("Background unavailable, rendering without it: {err:#}");
                Background::none()
            }
        },
        None => Background::none(),
    };

    let mut session = RenderSession::new(cfg, track, background, cli.safe_mode);
    if session.background_processing() {
        log::info!("Extracting background frames for seamless looping...");
    }

    let total = ((session.duration() / profile.frame_interval()).ceil() as u64).max(1);
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap()
            .progress_chars("=>-"),
    );

    run_export(
        &mut session,
        input,
        &output,
        width,
        height,
        codec,
        profile,
        |done, _total| pb.set_position(done),
    )?;
    pb.finish_with_message("Rendering complete");

    log::info!("Done! Output: {}", output.display());
    Ok(())
}

/// Parse a bitrate like `8M`, `4000k` or a plain bit count.
fn parse_bitrate(s: &str) -> Option<u32> {
    let s = s.trim();
    let (digits, mult) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 1_000),
        'm' | 'M' => (&s[..s.len() - 1], 1_000_000),
        _ => (s, 1),
    };
    digits.parse::<u32>().ok()?.checked_mul(mult)
}
