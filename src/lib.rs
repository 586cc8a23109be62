// Thumbmark Library
// Watermarked thumbnail resolution with create-once caching per file name

pub mod config;
pub mod logging;
pub mod storage;
pub mod thumbnail;
pub mod watermark;
