use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resona", about = "Audio-reactive looping video renderer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Output video file (default: input name with the container extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (default: resona.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Background image or video
    #[arg(short, long)]
    pub background: Option<PathBuf>,

    /// Visualizer identifier (overrides config)
    #[arg(short, long)]
    pub viz: Option<String>,

    /// Output resolution: 1920x1080, 1080x1920 or 1080x1080
    #[arg(long)]
    pub resolution: Option<String>,

    /// Title text (default: track filename)
    #[arg(long)]
    pub title: Option<String>,

    /// Artist text
    #[arg(long)]
    pub artist: Option<String>,

    /// Reduced-fidelity export profile: 24fps, lower bitrate, light effects
    #[arg(long)]
    pub safe_mode: bool,

    /// Force a specific video codec instead of probing the preference list
    #[arg(long)]
    pub codec: Option<String>,

    /// Video bitrate (e.g. 8M). Defaults to the export profile's choice.
    #[arg(long)]
    pub bitrate: Option<String>,

    /// List visualizer identifiers and exit
    #[arg(long)]
    pub list_visualizers: bool,
}
