pub mod ffmpeg;
pub mod session;
