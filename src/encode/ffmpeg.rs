use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// One container/codec pairing in the probe preference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pub container: &'static str,
    pub video: &'static str,
    pub audio: &'static str,
    pub audio_bitrate: &'static str,
}

/// Ordered preference list; the first codec the local ffmpeg build supports
/// wins.
const PREFERENCES: &[Codec] = &[
    Codec { container: "mp4", video: "libx264", audio: "aac", audio_bitrate: "192k" },
    Codec { container: "webm", video: "libvpx-vp9", audio: "libopus", audio_bitrate: "128k" },
    Codec { container: "mp4", video: "mpeg4", audio: "aac", audio_bitrate: "192k" },
];

/// Pick the output codec by probing the encoders ffmpeg was built with.
/// An unreadable probe falls through to the first preference.
pub fn pick_codec() -> Codec {
    let probe = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output();
    match probe {
        Ok(out) => {
            let list = String::from_utf8_lossy(&out.stdout);
            for codec in PREFERENCES {
                if list.contains(codec.video) {
                    log::info!("Selected encoder {} ({})", codec.video, codec.container);
                    return *codec;
                }
            }
            log::warn!("No preferred encoder found, trying {}", PREFERENCES[0].video);
            PREFERENCES[0]
        }
        Err(err) => {
            log::warn!("Could not probe ffmpeg encoders: {err}");
            PREFERENCES[0]
        }
    }
}

/// Look up a preference entry by its video encoder name, for explicit
/// codec selection from the command line.
pub fn codec_by_name(name: &str) -> Option<Codec> {
    PREFERENCES.iter().copied().find(|c| c.video == name)
}

/// Raw RGBA frames piped into an ffmpeg child that muxes the source audio
/// alongside them.
pub struct FfmpegEncoder {
    child: Child,
}

/// stderr is kept error-only; progress chatter on a captured pipe would
/// eventually fill it and stall the frame writes.
fn encoder_args(
    output_path: &Path,
    input_audio: &Path,
    width: u32,
    height: u32,
    fps: u32,
    codec: Codec,
    bitrate: u32,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-v".into(), "error".into(),
        "-y".into(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-i".into(), input_audio.display().to_string(),
        "-c:v".into(), codec.video.into(),
        "-pix_fmt".into(), "yuv420p".into(),
        "-b:v".into(), bitrate.to_string(),
    ];
    if codec.video == "libx264" {
        args.extend(["-preset".to_string(), "medium".to_string()]);
    }
    args.extend([
        "-c:a".into(), codec.audio.into(),
        "-b:a".into(), codec.audio_bitrate.into(),
        "-shortest".into(),
        output_path.display().to_string(),
    ]);
    args
}

impl FfmpegEncoder {
    pub fn new(
        output_path: &Path,
        input_audio: &Path,
        width: u32,
        height: u32,
        fps: u32,
        codec: Codec,
        bitrate: u32,
    ) -> Result<Self> {
        let args = encoder_args(output_path, input_audio, width, height, fps, codec, bitrate);
        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "Encoder started: {}x{} @ {}fps, {} -> {}",
            width,
            height,
            fps,
            codec.video,
            output_path.display()
        );

        Ok(Self { child })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("ffmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    /// Close the frame pipe and wait for the muxer to flush.
    pub fn finish(mut self) -> Result<()> {
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg exited with error:\n{}", stderr);
        }

        log::info!("Encoding complete");
        Ok(())
    }
    /// Abort the session, discarding whatever was already muxed.
    pub fn abort(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_order_starts_with_h264() {
        assert_eq!(PREFERENCES[0].video, "libx264");
        assert_eq!(PREFERENCES[0].container, "mp4");
        assert!(PREFERENCES.iter().any(|c| c.container == "webm"));
    }

    #[test]
    fn encoder_runs_quiet_and_muxes_the_source_audio() {
        let args = encoder_args(
            Path::new("out.mp4"),
            Path::new("track.mp3"),
            1920,
            1080,
            30,
            PREFERENCES[0],
            8_000_000,
        );
        assert_eq!(&args[..3], ["-hide_banner", "-v", "error"]);
        assert!(args.contains(&"track.mp3".to_string()));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"medium".to_string()));
        // The vp9 path takes no x264 preset.
        let vp9 = encoder_args(
            Path::new("out.webm"),
            Path::new("track.mp3"),
            1280,
            720,
            24,
            PREFERENCES[1],
            4_000_000,
        );
        assert!(!vp9.contains(&"-preset".to_string()));
    }
}
