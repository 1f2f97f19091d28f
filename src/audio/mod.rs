pub mod analyzer;
pub mod decode;
