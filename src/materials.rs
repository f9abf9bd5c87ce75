use std::path::Path;
use std::sync::Arc;

use noise::{NoiseFn, SuperSimplex};

use super::error::Result;
use super::light::Light;
use super::math::*;

pub trait Texture: Send + Sync {
    fn value(&self, u: f32, v: f32, p: Vec3) -> Colour;
}

pub struct ConstantTexture {
    pub colour: Colour,
}

impl Texture for ConstantTexture {
    fn value(&self, _u: f32, _v: f32, _p: Vec3) -> Colour {
        self.colour
    }
}

/// Alternating squares in (u, v) space, one square per half unit
pub struct CheckerTexture {
    pub odd: Colour,
    pub even: Colour,
}

impl Texture for CheckerTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Colour {
        let u_low = u.rem_euclid(1.0) < 0.5;
        let v_low = v.rem_euclid(1.0) < 0.5;
        if u_low == v_low {
            self.odd
        }
        else {
            self.even
        }
    }
}

/// Radial blend from `inner` at the centre of each unit (u, v) tile to `outer` at `radius`
pub struct GradientTexture {
    pub radius: f32,
    pub inner: Colour,
    pub outer: Colour,
}

impl Texture for GradientTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Colour {
        let du = u.rem_euclid(1.0) - 0.5;
        let dv = v.rem_euclid(1.0) - 0.5;
        let t = ((du * du + dv * dv).sqrt() / self.radius).min(1.0);
        lerp(self.inner, self.outer, t)
    }
}

/// Marble-like veins from gradient-noise turbulence, sampled in world space
pub struct NoiseTexture {
    scale: f32,
    colour: Colour,
    noise: SuperSimplex,
}

impl NoiseTexture {
    pub fn new(scale: f32, colour: Colour) -> NoiseTexture {
        NoiseTexture { scale, colour, noise: SuperSimplex::new() }
    }

    fn turbulence(&self, p: Vec3) -> f32 {
        let mut accum = 0.0;
        let mut p = p;
        let mut weight = 1.0;
        for _ in 0..7 {
            accum += weight * self.noise.get([p.x as f64, p.y as f64, p.z as f64]) as f32;
            weight *= 0.5;
            p = p * 2.0;
        }
        accum.abs()
    }
}

impl Texture for NoiseTexture {
    fn value(&self, _u: f32, _v: f32, p: Vec3) -> Colour {
        let phase = self.scale * p.z + 10.0 * self.turbulence(p);
        self.colour * (0.5 * (1.0 + phase.sin()))
    }
}

/// A bitmap wrapped over (u, v); v runs bottom to top
pub struct ImageTexture {
    image: image::RgbImage,
}

impl ImageTexture {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ImageTexture> {
        let image = image::open(path)?.to_rgb8();
        Ok(ImageTexture { image })
    }

    pub fn from_image(image: image::RgbImage) -> ImageTexture {
        ImageTexture { image }
    }
}

impl Texture for ImageTexture {
    fn value(&self, u: f32, v: f32, _p: Vec3) -> Colour {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Vec3::zero();
        }
        let x = ((u.rem_euclid(1.0) * width as f32) as u32).min(width - 1);
        let y = (((1.0 - v.rem_euclid(1.0)) * height as f32) as u32).min(height - 1);
        let px = self.image.get_pixel(x, y);
        Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 255.0
    }
}

/// Phong surface description plus the weights of the recursive reflection and
/// transmission terms.
#[derive(Clone)]
pub struct Material {
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    pub exponent: f32,
    pub ambient_colour: Colour,
    pub diffuse_colour: Colour,
    pub specular_colour: Colour,
    /// Modulates the ambient and diffuse colours
    pub texture: Arc<dyn Texture>,
    pub reflectivity: f32,
    pub transparency: f32,
    pub refraction_index: f32,
}

impl Default for Material {
    fn default() -> Material {
        Material {
            ambient_strength: 0.0,
            diffuse_strength: 0.0,
            specular_strength: 0.0,
            exponent: 1.0,
            ambient_colour: Vec3::zero(),
            diffuse_colour: Vec3::zero(),
            specular_colour: Vec3::splat(1.0),
            texture: Arc::new(ConstantTexture { colour: Vec3::splat(1.0) }),
            reflectivity: 0.0,
            transparency: 0.0,
            refraction_index: 1.0,
        }
    }
}

impl Material {
    pub fn ambient(&self, ambient_light: Colour, u: f32, v: f32, p: Vec3) -> Colour {
        self.ambient_strength * self.ambient_colour * self.texture.value(u, v, p) * ambient_light
    }

    /// Unscaled Lambert term; `l` points from the surface to the light
    pub fn diffuse(&self, light: &Light, normal: Vec3, l: Vec3, u: f32, v: f32, p: Vec3) -> Colour {
        let amount = dot(normal, l).max(0.0);
        light.colour * self.diffuse_colour * self.texture.value(u, v, p) * amount
    }

    /// Unscaled Phong highlight; `view` points from the surface to the eye
    pub fn specular(&self, light: &Light, normal: Vec3, l: Vec3, view: Vec3) -> Colour {
        let r = reflect(-l, normal);
        let amount = dot(r, view).max(0.0);
        if amount <= 0.0 {
            return Vec3::zero();
        }
        light.colour * self.specular_colour * amount.powf(self.exponent)
    }

    pub fn matte(colour: Colour) -> Material {
        Material {
            ambient_strength: 1.0,
            diffuse_strength: 1.0,
            ambient_colour: colour,
            diffuse_colour: colour,
            ..Material::default()
        }
    }

    pub fn glass() -> Material {
        Material {
            ambient_strength: 0.075,
            diffuse_strength: 0.075,
            specular_strength: 0.2,
            exponent: 20.0,
            ambient_colour: Vec3::splat(1.0),
            diffuse_colour: Vec3::splat(1.0),
            specular_colour: Vec3::splat(1.0),
            reflectivity: 0.01,
            transparency: 0.99,
            refraction_index: 1.5,
            ..Material::default()
        }
    }

    pub fn mirror() -> Material {
        Material {
            ambient_strength: 0.15,
            diffuse_strength: 0.25,
            specular_strength: 1.0,
            exponent: 20.0,
            ambient_colour: Vec3::splat(0.7),
            diffuse_colour: Vec3::splat(0.7),
            specular_colour: Vec3::splat(1.0),
            reflectivity: 0.75,
            ..Material::default()
        }
    }

    /// Red and yellow floor tiles
    pub fn checkered() -> Material {
        Material {
            texture: Arc::new(CheckerTexture { odd: Vec3::new(1.0, 0.0, 0.0), even: Vec3::new(1.0, 1.0, 0.0) }),
            ..Material::matte(Vec3::splat(1.0))
        }
    }
}
