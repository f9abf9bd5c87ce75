use serde::{Deserialize, Serialize};

use super::math::{Colour, Vec3};

/// A point light source that has position and colour.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Light {
    pub position: Vec3,
    #[serde(default = "white")]
    pub colour: Colour,
}

fn white() -> Colour {
    Vec3::splat(1.0)
}

impl Light {
    pub fn white(position: Vec3) -> Light {
        Light { position, colour: white() }
    }
}
