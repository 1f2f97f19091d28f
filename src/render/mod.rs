pub mod background;
pub mod canvas;
pub mod fade;
pub mod pipeline;
pub mod postprocess;
pub mod text;
pub mod viz;
