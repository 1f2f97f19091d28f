use serde::Deserialize;
use std::path::PathBuf;

/// Flat configuration record consumed verbatim by the render pipeline.
/// Values are assumed range-clamped upstream; nothing here re-validates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub resolution: Resolution,

    // Visualizer selection + shared transform/style
    pub viz_type: String,
    pub viz_offset_x: Option<f32>,
    pub viz_offset_y: Option<f32>,
    pub viz_rotation: f32,
    pub auto_rotate: bool,
    pub viz_scale: Option<f32>,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub viz_thickness: f32,
    pub viz_opacity: f32,
    pub color_start: String,
    pub color_end: String,
    pub use_gradient: bool,
    pub gradient_motion: bool,

    // Audio band cut + gain
    pub sensitivity: f32,
    pub smart_sensitivity: bool,
    pub low_cut: f32,
    pub high_cut: f32,
    pub smart_cut: bool,
    pub gain_target: f32,
    pub gain_window: usize,

    // Background transform + playback
    pub bg_zoom: f32,
    pub bg_offset_x: f32,
    pub bg_offset_y: f32,
    pub bg_rotation: f32,
    pub bg_speed: f32,
    pub bg_beat_response: f32,
    pub bg_loop_mode: LoopMode,
    pub bg_loop_duration: f32,
    pub yoyo_mode: bool,

    // Typography
    pub title: String,
    pub artist: String,
    pub font: Option<PathBuf>,
    pub font_size_scale: f32,
    pub text_color: String,
    pub text_color_end: String,
    pub use_text_gradient: bool,
    pub text_gradient_motion: bool,
    pub text_position: TextPosition,
    pub text_offset_x: f32,
    pub text_offset_y: f32,
    pub text_margin: f32,
    pub text_glow: bool,
    pub text_outline: bool,
    pub text_react: TextReact,
    pub text_sensitivity: f32,

    // Post-processing
    pub glitch_intensity: f32,
    pub shake_intensity: f32,
    pub rgb_shift_intensity: f32,
    pub pixelate: bool,
    pub vignette: bool,
    pub kaleidoscope: bool,
    pub scanlines: bool,
    pub noise: bool,
    pub invert: bool,

    // Fades
    pub fade_in_type: FadeKind,
    pub fade_in_duration: f32,
    pub fade_out_type: FadeKind,
    pub fade_out_duration: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Landscape,
            viz_type: "spectrum".into(),
            viz_offset_x: None,
            viz_offset_y: None,
            viz_rotation: 0.0,
            auto_rotate: false,
            viz_scale: None,
            mirror_x: false,
            mirror_y: false,
            viz_thickness: 2.0,
            viz_opacity: 1.0,
            color_start: "#ffffff".into(),
            color_end: "#8b5cf6".into(),
            use_gradient: false,
            gradient_motion: false,
            sensitivity: 1.0,
            smart_sensitivity: true,
            low_cut: 0.0,
            high_cut: 100.0,
            smart_cut: true,
            gain_target: 0.2,
            gain_window: 60,
            bg_zoom: 1.0,
            bg_offset_x: 50.0,
            bg_offset_y: 50.0,
            bg_rotation: 0.0,
            bg_speed: 1.0,
            bg_beat_response: 0.8,
            bg_loop_mode: LoopMode::Cut,
            bg_loop_duration: 1.0,
            yoyo_mode: false,
            title: "Unknown Track".into(),
            artist: "Never Ending Loop".into(),
            font: None,
            font_size_scale: 1.0,
            text_color: "#ffffff".into(),
            text_color_end: "#8b5cf6".into(),
            use_text_gradient: false,
            text_gradient_motion: false,
            text_position: TextPosition::Center,
            text_offset_x: 0.0,
            text_offset_y: 0.0,
            text_margin: 5.0,
            text_glow: false,
            text_outline: false,
            text_react: TextReact::Pulse,
            text_sensitivity: 1.0,
            glitch_intensity: 0.0,
            shake_intensity: 0.0,
            rgb_shift_intensity: 0.0,
            pixelate: false,
            vignette: false,
            kaleidoscope: false,
            scanlines: false,
            noise: false,
            invert: false,
            fade_in_type: FadeKind::None,
            fade_in_duration: 2.0,
            fade_out_type: FadeKind::None,
            fade_out_duration: 2.0,
        }
    }
}

/// One of three fixed output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1920x1080")]
    Landscape,
    #[serde(rename = "1080x1920")]
    Portrait,
    #[serde(rename = "1080x1080")]
    Square,
}

impl Resolution {
    pub fn dims(self) -> (u32, u32) {
        match self {
            Resolution::Landscape => (1920, 1080),
            Resolution::Portrait => (1080, 1920),
            Resolution::Square => (1080, 1080),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1920x1080" => Some(Resolution::Landscape),
            "1080x1920" => Some(Resolution::Portrait),
            "1080x1080" => Some(Resolution::Square),
            _ => None,
        }
    }
}

/// Treatment applied near a native video's loop boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    Cut,
    Fade,
    Blur,
    WashBlack,
    WashWhite,
    Zoom,
    Slide,
    Ghost,
    Glitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    Center,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Beat-driven typography modulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextReact {
    None,
    Pulse,
    Jitter,
    Bounce,
    Flash,
    Glow,
}

/// Fade treatment for the in/out windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeKind {
    None,
    Simple,
    Black,
    White,
    Pixel,
    Blur,
}

pub fn load_config(path: &PathBuf) -> Option<VisualConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Failed to parse config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trip() {
        let cfg: VisualConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.viz_type, "spectrum");
        assert_eq!(cfg.resolution, Resolution::Landscape);
        assert_eq!(cfg.fade_in_type, FadeKind::None);
        assert!(cfg.smart_cut);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: VisualConfig = toml::from_str(
            r#"
            resolution = "1080x1080"
            viz_type = "ring"
            bg_loop_mode = "wash_white"
            text_react = "bounce"
            fade_in_type = "pixel"
            glitch_intensity = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.resolution.dims(), (1080, 1080));
        assert_eq!(cfg.bg_loop_mode, LoopMode::WashWhite);
        assert_eq!(cfg.text_react, TextReact::Bounce);
        assert_eq!(cfg.fade_in_type, FadeKind::Pixel);
        assert!((cfg.glitch_intensity - 0.4).abs() < 1e-6);
        // untouched fields keep their defaults
        assert_eq!(cfg.title, "Unknown Track");
    }
}
