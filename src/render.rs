//! The recursive ray tracer.
//!
//! Every pixel's ray is followed into the scene; at the nearest hit the surface
//! is lit by an ambient term plus a Phong term for each light that a shadow ray
//! can reach, and reflective or transparent surfaces spawn further rays until
//! the recursion depth is used up.

use std::ops::AddAssign;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::camera::{Camera, CameraSettings, RayTable};
use super::error::{Error, Result};
use super::frame::Frame;
use super::geometry::{any_hit, closest_hit, HitRecord};
use super::math::*;
use super::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: usize,
    pub height: usize,
    /// How many reflection/refraction bounces follow a primary ray
    pub recursion_depth: u32,
    /// Jittered rays per pixel; 1 traces the pixel centre only
    pub samples: u32,
    pub ambient_light: Colour,
    pub background: Colour,
    /// Start offset of secondary and shadow rays, against self-intersection
    pub epsilon: f32,
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> RenderSettings {
        RenderSettings {
            width: 800,
            height: 600,
            recursion_depth: 5,
            samples: 1,
            ambient_light: Vec3::splat(0.2),
            background: Vec3::zero(),
            epsilon: 1e-3,
            seed: 0,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidSettings(format!("image size must be non-zero, got {}x{}", self.width, self.height)));
        }
        if self.samples == 0 {
            return Err(Error::InvalidSettings("samples per pixel must be at least 1".to_owned()));
        }
        if !(self.epsilon >= 0.0) {
            return Err(Error::InvalidSettings(format!("epsilon must be non-negative, got {}", self.epsilon)));
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RayCounters {
    pub primary: u64,
    pub shadow: u64,
    pub secondary: u64,
}

impl AddAssign for RayCounters {
    fn add_assign(&mut self, other: RayCounters) {
        self.primary += other.primary;
        self.shadow += other.shadow;
        self.secondary += other.secondary;
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderStats {
    pub rays: RayCounters,
    pub elapsed: Duration,
}

pub struct Renderer {
    scene: Scene,
    camera: Camera,
    ray_table: RayTable,
}

impl Renderer {
    pub fn new(scene: Scene) -> Result<Renderer> {
        scene.settings.validate()?;
        let camera = Camera::new(&scene.camera, scene.settings.aspect_ratio())?;
        let ray_table = RayTable::build(&camera, scene.settings.width, scene.settings.height);
        Ok(Renderer { scene, camera, ray_table })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Move the camera; the ray table is rebuilt
    pub fn update_camera(&mut self, settings: CameraSettings) -> Result<()> {
        self.camera = Camera::new(&settings, self.scene.settings.aspect_ratio())?;
        self.scene.camera = settings;
        self.ray_table = RayTable::build(&self.camera, self.scene.settings.width, self.scene.settings.height);
        Ok(())
    }

    /// Change the output size; the camera and ray table are rebuilt
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let settings = RenderSettings { width, height, ..self.scene.settings };
        settings.validate()?;
        self.scene.settings = settings;
        self.update_camera(self.scene.camera)
    }

    /// Trace the whole frame from scratch
    pub fn render(&self) -> (Frame, RenderStats) {
        let settings = &self.scene.settings;
        info!(
            "Tracing {}x{} at depth {} with {} sample(s) per pixel, {} objects, {} lights",
            settings.width, settings.height, settings.recursion_depth, settings.samples,
            self.scene.objects.len(), self.scene.lights.len()
        );

        let start = Instant::now();
        let rows: Vec<(Vec<Colour>, RayCounters)> = (0..settings.height)
            .into_par_iter()
            .map(|y| self.render_row(y))
            .collect();

        let mut rays = RayCounters::default();
        let mut pixels = Vec::with_capacity(settings.height);
        for (row, counters) in rows {
            rays += counters;
            pixels.push(row);
        }
        let stats = RenderStats { rays, elapsed: start.elapsed() };
        info!(
            "Raytrace time: {:.3}s ({} primary, {} shadow, {} secondary rays)",
            stats.elapsed.as_secs_f64(), rays.primary, rays.shadow, rays.secondary
        );

        (Frame::from_rows(settings.width, settings.height, pixels), stats)
    }

    fn render_row(&self, y: usize) -> (Vec<Colour>, RayCounters) {
        let settings = &self.scene.settings;
        let mut counters = RayCounters::default();

        if settings.samples == 1 {
            let row = self.ray_table.row(y).iter()
                .map(|ray| self.trace_primary(ray, &mut counters))
                .collect();
            return (row, counters);
        }

        // Seeded per row so the frame does not depend on thread scheduling
        let mut rng = StdRng::seed_from_u64(settings.seed ^ (y as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let scale = 1.0 / settings.samples as f32;
        let row = (0..settings.width)
            .map(|x| {
                let mut colour = Vec3::zero();
                for _ in 0..settings.samples {
                    let jitter = (rng.gen::<f32>(), rng.gen::<f32>());
                    let ray = self.camera.primary_ray(x, y, settings.width, settings.height, jitter);
                    colour += self.trace_primary(&ray, &mut counters);
                }
                colour * scale
            })
            .collect();
        (row, counters)
    }

    fn trace_primary(&self, ray: &Ray, counters: &mut RayCounters) -> Colour {
        counters.primary += 1;
        self.illuminate(ray, 0, self.camera.near, self.camera.far, counters)
    }

    /// Colour seen along a single camera ray
    pub fn trace(&self, ray: &Ray) -> Colour {
        let mut counters = RayCounters::default();
        self.trace_primary(ray, &mut counters)
    }

    pub fn illuminate(&self, ray: &Ray, depth: u32, t_min: f32, t_max: f32, counters: &mut RayCounters) -> Colour {
        let settings = &self.scene.settings;
        let hit = match closest_hit(ray, t_min, t_max, &self.scene.objects) {
            Some(hit) => hit,
            None => return settings.background,
        };
        let material = hit.material;
        let view = -ray.direction;

        let mut total = material.ambient(settings.ambient_light, hit.u, hit.v, hit.p);
        total += self.direct_light(&hit, view, counters);

        if depth < settings.recursion_depth {
            let incident = ray.direction;
            if material.reflectivity > 0.0 {
                let reflected = Ray::new(hit.p, reflect(incident, hit.normal));
                counters.secondary += 1;
                total += material.reflectivity * self.illuminate(&reflected, depth + 1, settings.epsilon, f32::INFINITY, counters);
            }
            if material.transparency > 0.0 {
                let direction = if hit.thin {
                    incident
                } else {
                    // Entering when the ray opposes the normal, leaving otherwise
                    let (normal, eta) = if dot(incident, hit.normal) < 0.0 {
                        (hit.normal, 1.0 / material.refraction_index)
                    } else {
                        (-hit.normal, material.refraction_index)
                    };
                    refract(incident, normal, eta).unwrap_or_else(|| reflect(incident, normal))
                };
                let transmitted = Ray::new(hit.p, direction);
                counters.secondary += 1;
                total += material.transparency * self.illuminate(&transmitted, depth + 1, settings.epsilon, f32::INFINITY, counters);
            }
        }

        total
    }

    /// Diffuse and specular light from every light visible from the hit point
    pub fn direct_light(&self, hit: &HitRecord, view: Vec3, counters: &mut RayCounters) -> Colour {
        let material = hit.material;
        let normal = if dot(hit.normal, view) < 0.0 { -hit.normal } else { hit.normal };

        let mut diffuse_total = Vec3::zero();
        let mut specular_total = Vec3::zero();
        for light in &self.scene.lights {
            let to_light = light.position - hit.p;
            let distance = to_light.length();
            if distance == 0.0 {
                continue;
            }
            let l = to_light / distance;

            // Only surfaces facing the light can receive it
            if dot(normal, l) <= 0.0 {
                continue;
            }

            counters.shadow += 1;
            let shadow_ray = Ray { origin: hit.p, direction: l };
            if any_hit(&shadow_ray, self.scene.settings.epsilon, distance, &self.scene.objects) {
                debug!("Light at {:?} blocked from {:?}", light.position, hit.p);
                continue;
            }

            diffuse_total += material.diffuse(light, normal, l, hit.u, hit.v, hit.p);
            specular_total += material.specular(light, normal, l, view);
        }

        material.diffuse_strength * diffuse_total + material.specular_strength * specular_total
    }
}
