//! Sprite archive tooling built on top of the `sff` decoder.
pub mod config;
pub mod modules;
pub mod utils;

pub use sff;
