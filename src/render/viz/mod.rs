//! Audio-reactive drawing algorithms.
//!
//! Every algorithm is a plain function invoked once per frame inside a local
//! coordinate space the pipeline has already translated, rotated and scaled.
//! Selection goes through a lookup table keyed by identifier; each entry also
//! declares which sample domain it consumes, so the analyzer never has to
//! guess from the identifier string.

mod bars;
mod geometry;
mod organic;
mod particles;
mod radial;
mod waves;

use crate::audio::analyzer::SampleDomain;
use crate::render::canvas::{Canvas, Color, Paint};

/// Read-only per-frame inputs shared by every algorithm.
pub struct DrawCtx<'a> {
    pub bins: &'a [f32],
    pub bass: f32,
    pub volume: f32,
    /// Effective sensitivity, adaptive gain already folded in.
    pub sens: f32,
    /// Visual clock, seconds.
    pub t: f32,
    pub w: f32,
    pub h: f32,
    pub min_dim: f32,
    /// min_dim / 1000, used to keep stroke and particle sizes resolution
    /// independent.
    pub rs: f32,
    /// False while paused and during mirror re-dispatch; stateful
    /// algorithms must not step their particles when this is false.
    pub advancing: bool,
    pub paint: Paint,
    pub color_start: Color,
    pub color_end: Color,
    pub opacity: f32,
    pub font: Option<&'a fontdue::Font>,
}

impl DrawCtx<'_> {
    /// Smoothed sample by index, wrapping past the band length. Returns 0
    /// when no audio is loaded so every algorithm degrades to a still frame.
    pub fn v(&self, i: usize) -> f32 {
        if self.bins.is_empty() {
            0.0
        } else {
            self.bins[i % self.bins.len()]
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }
}

// Algorithm-local persistent buffers. One slot per render session; cleared
// whenever the active identifier changes.

pub struct MatrixDrop {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

pub struct Spark {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub size: f32,
}

pub struct Flame {
    pub x: f32,
    pub y: f32,
    pub life: f32,
}

pub struct Agent {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

pub struct Vine {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub length: f32,
    pub color: Color,
}

#[derive(Default)]
pub enum VizState {
    #[default]
    Empty,
    Matrix(Vec<MatrixDrop>),
    Sparks(Vec<Spark>),
    Flames(Vec<Flame>),
    Swarm(Vec<Agent>),
    Nodes(Vec<Agent>),
    Vines(Vec<Vine>),
}

pub type DrawFn = fn(&mut Canvas, &DrawCtx, &mut VizState);

pub struct VizEntry {
    pub id: &'static str,
    pub domain: SampleDomain,
    pub draw: DrawFn,
}

const fn freq(id: &'static str, draw: DrawFn) -> VizEntry {
    VizEntry { id, domain: SampleDomain::Frequency, draw }
}

const fn wav(id: &'static str, draw: DrawFn) -> VizEntry {
    VizEntry { id, domain: SampleDomain::Waveform, draw }
}

pub static REGISTRY: &[VizEntry] = &[
    // Bar families
    freq("spectrum", bars::spectrum),
    freq("mirror_spectrum", bars::mirror_spectrum),
    freq("bars_3d", bars::bars_3d),
    freq("bar_rain", bars::bar_rain),
    freq("cyber_city", bars::cyber_city),
    freq("pixel_blocks", bars::pixel_blocks),
    freq("led_wall", bars::led_wall),
    freq("led", bars::led_wall),
    freq("segmented_bar", bars::segmented_bar),
    freq("seismic", bars::seismic),
    // Waveforms and flowing lines
    wav("wave", waves::wave),
    wav("classic_wave", waves::wave),
    wav("dual_wave", waves::dual_wave),
    freq("spectrum_wave", waves::spectrum_wave),
    wav("ribbon", waves::ribbon),
    wav("lightning", waves::lightning),
    wav("cosmic_strings", waves::cosmic_strings),
    freq("dna", waves::dna),
    freq("heartbeat", waves::heartbeat),
    freq("deep_sea", waves::deep_sea),
    freq("liquid_flow", waves::liquid_flow),
    freq("aurora", waves::liquid_flow),
    freq("poly_world", waves::poly_world),
    // Radial
    freq("circle", radial::spoke_circle),
    freq("pulse", radial::spoke_circle),
    freq("ring", radial::ring),
    freq("shockwave", radial::shockwave),
    freq("radial_spectrum", radial::radial_spectrum),
    freq("audio_rings", radial::audio_rings),
    freq("rings_cyber", radial::rings_cyber),
    freq("spiral", radial::spiral),
    freq("orbitals", radial::orbitals),
    freq("radar", radial::radar),
    freq("mandala", radial::mandala),
    freq("vortex", radial::vortex),
    freq("gravity_well", radial::gravity_well),
    freq("solar_flare", radial::solar_flare),
    freq("kaleido_mesh", radial::kaleido_mesh),
    freq("tunnel_3d", radial::tunnel_3d),
    freq("sphere_3d", radial::sphere_3d),
    // Geometric
    freq("cubes_3d", geometry::cubes_3d),
    freq("neon_grid", geometry::neon_grid),
    freq("hexagon", geometry::hexagon),
    freq("pyramids", geometry::pyramids),
    freq("crystal", geometry::crystal),
    freq("vector_field", geometry::vector_field),
    freq("techno_wires", geometry::techno_wires),
    // Particles and agents
    freq("starfield", particles::starfield),
    freq("particles", particles::drift_particles),
    freq("star_burst", particles::star_burst),
    freq("fire", particles::fire),
    freq("matrix", particles::matrix),
    freq("digital_rain", particles::matrix),
    freq("swarm", particles::swarm),
    freq("neural_net", particles::neural_net),
    freq("glitch_vines", particles::glitch_vines),
    // Organic
    freq("lava", organic::lava),
    freq("floating_orbs", organic::blobs),
    freq("abstract_clouds", organic::blobs),
    freq("plasma", organic::plasma),
    freq("fractal_tree", organic::fractal_tree),
];

static FALLBACK: VizEntry = freq("bars", bars::plain_bars);

/// Entry for the identifier, or the plain-bars fallback for anything
/// unrecognized.
pub fn resolve(id: &str) -> &'static VizEntry {
    REGISTRY.iter().find(|e| e.id == id).unwrap_or(&FALLBACK)
}

pub fn ids() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|e| e.id)
}

/// Anchor and scale a freshly selected algorithm starts with unless the
/// configuration pins them explicitly.
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

pub fn default_placement(id: &str) -> Placement {
    let mut p = Placement { x: 50.0, y: 50.0, scale: 1.0 };
    const BOTTOM: &[&str] = &[
        "spectrum", "bars_3d", "matrix", "ribbon", "bar_rain", "spectrum_wave",
        "cyber_city", "pixel_blocks", "aurora", "deep_sea", "abstract_clouds",
        "led_wall", "segmented_bar", "seismic", "fire",
    ];
    if BOTTOM.contains(&id) {
        p.y = 95.0;
    }
    if ["starfield", "neon_grid", "star_burst", "solar_flare"].contains(&id) {
        p.scale = 1.5;
    }
    if [
        "particles", "plasma", "floating_orbs", "gravity_well", "techno_wires",
        "neural_net", "vector_field", "swarm",
    ]
    .contains(&id)
    {
        p.scale = 1.2;
    }
    if ["fractal_tree", "abstract_clouds"].contains(&id) {
        p.y = 85.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(bins: &'a [f32]) -> DrawCtx<'a> {
        DrawCtx {
            bins,
            bass: 0.3,
            volume: 0.2,
            sens: 1.0,
            t: 1.5,
            w: 640.0,
            h: 360.0,
            min_dim: 360.0,
            rs: 0.36,
            advancing: true,
            paint: Paint::Solid(Color::WHITE),
            color_start: Color::WHITE,
            color_end: Color::from_hex("#8b5cf6"),
            opacity: 1.0,
            font: None,
        }
    }

    #[test]
    fn unknown_identifier_falls_back_to_bars() {
        assert_eq!(resolve("no_such_thing").id, "bars");
        assert_eq!(resolve("spectrum").id, "spectrum");
    }

    #[test]
    fn waveform_domain_is_explicit_per_entry() {
        assert_eq!(resolve("wave").domain, SampleDomain::Waveform);
        assert_eq!(resolve("dual_wave").domain, SampleDomain::Waveform);
        assert_eq!(resolve("ribbon").domain, SampleDomain::Waveform);
        // Contains "wave" in the name but consumes magnitudes.
        assert_eq!(resolve("spectrum_wave").domain, SampleDomain::Frequency);
        assert_eq!(resolve("shockwave").domain, SampleDomain::Frequency);
        // Renders unsigned [0, 1] trace heights, so magnitudes as well.
        assert_eq!(resolve("seismic").domain, SampleDomain::Frequency);
    }

    #[test]
    fn sample_accessor_wraps_and_degrades() {
        let c = ctx(&[0.1, 0.2, 0.3]);
        assert_eq!(c.v(0), 0.1);
        assert_eq!(c.v(4), 0.2);
        let empty = ctx(&[]);
        assert_eq!(empty.v(7), 0.0);
    }

    #[test]
    fn every_algorithm_draws_without_panicking() {
        let bins: Vec<f32> = (0..512).map(|i| (i as f32 / 512.0) * 0.8).collect();
        let c = ctx(&bins);
        for entry in REGISTRY {
            let mut canvas = Canvas::new(160, 90);
            let mut state = VizState::Empty;
            canvas.translate(80.0, 45.0);
            (entry.draw)(&mut canvas, &c, &mut state);
            // A second frame exercises the stateful step paths.
            (entry.draw)(&mut canvas, &c, &mut state);
        }
    }

    #[test]
    fn algorithms_survive_an_empty_snapshot() {
        let c = ctx(&[]);
        for entry in REGISTRY {
            let mut canvas = Canvas::new(64, 64);
            let mut state = VizState::Empty;
            (entry.draw)(&mut canvas, &c, &mut state);
        }
    }

    #[test]
    fn bottom_family_defaults_to_low_anchor() {
        assert_eq!(default_placement("spectrum").y, 95.0);
        assert_eq!(default_placement("starfield").scale, 1.5);
        assert_eq!(default_placement("swarm").scale, 1.2);
        assert_eq!(default_placement("circle").y, 50.0);
    }
}
