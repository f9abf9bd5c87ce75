#![deny(bare_trait_objects)]

pub mod camera;
pub mod capture;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod light;
pub mod materials;
pub mod math;
pub mod ppm;
pub mod render;
pub mod scene;

pub use error::{Error, Result};
