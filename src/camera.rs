use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use super::math::*;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Degrees
    pub vertical_fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> CameraSettings {
        CameraSettings {
            position: Vec3::zero(),
            target: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            vertical_fov: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Pinhole camera; pixel rays leave the eye through a grid laid on the near plane
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub origin: Vec3,
    pub near: f32,
    pub far: f32,
    near_centre: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect_ratio: f32) -> Result<Camera> {
        if !(settings.vertical_fov > 0.0 && settings.vertical_fov < 180.0) {
            return Err(Error::InvalidSettings(format!("vertical_fov must be within (0, 180) degrees, got {}", settings.vertical_fov)));
        }
        if !(settings.near > 0.0 && settings.near < settings.far) {
            return Err(Error::InvalidSettings(format!("need 0 < near < far, got near {} far {}", settings.near, settings.far)));
        }
        if !(aspect_ratio > 0.0) {
            return Err(Error::InvalidSettings(format!("aspect ratio must be positive, got {}", aspect_ratio)));
        }

        // Compute basis
        let forward = settings.position - settings.target;
        if forward.len_sq() == 0.0 {
            return Err(Error::InvalidSettings("camera position and target coincide".to_owned()));
        }
        let w = forward.normalise();
        let side = cross(settings.up, w);
        if side.len_sq() < 1e-12 {
            return Err(Error::InvalidSettings("camera up vector is parallel to the view direction".to_owned()));
        }
        let u = side.normalise();
        let v = cross(w, u);

        // Compute Field of View
        let theta = settings.vertical_fov.to_radians();
        let half_height = (0.5 * theta).tan() * settings.near;
        let half_width = aspect_ratio * half_height;

        Ok(Camera {
            origin: settings.position,
            near: settings.near,
            far: settings.far,
            near_centre: settings.position - w * settings.near,
            horizontal: u * half_width,
            vertical: v * half_height,
        })
    }

    /// Ray through pixel (x, y), row 0 at the top, offset inside the pixel by `jitter`
    /// (`(0.5, 0.5)` is the pixel centre).
    pub fn primary_ray(&self, x: usize, y: usize, width: usize, height: usize, jitter: (f32, f32)) -> Ray {
        let sx = 2.0 * (x as f32 + jitter.0) / width as f32 - 1.0;
        let sy = 1.0 - 2.0 * (y as f32 + jitter.1) / height as f32;
        let through = self.near_centre + self.horizontal * sx + self.vertical * sy;
        Ray::new(self.origin, through - self.origin)
    }
}

/// Centre rays for every pixel, kept until the camera or the resolution changes
pub struct RayTable {
    pub width: usize,
    pub height: usize,
    rays: Vec<Ray>,
}

impl RayTable {
    pub fn build(camera: &Camera, width: usize, height: usize) -> RayTable {
        let mut rays = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                rays.push(camera.primary_ray(x, y, width, height, (0.5, 0.5)));
            }
        }
        RayTable { width, height, rays }
    }

    pub fn get(&self, x: usize, y: usize) -> &Ray {
        &self.rays[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[Ray] {
        &self.rays[y * self.width..(y + 1) * self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_z() -> CameraSettings {
        CameraSettings { position: Vec3::new(0.0, 0.0, 5.0), target: Vec3::zero(), ..CameraSettings::default() }
    }

    #[test]
    fn centre_pixel_looks_at_target() {
        let camera = Camera::new(&looking_down_z(), 1.0).unwrap();
        let ray = camera.primary_ray(1, 1, 3, 3, (0.5, 0.5));
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn top_left_ray_points_up_and_left() {
        let camera = Camera::new(&looking_down_z(), 2.0).unwrap();
        let ray = camera.primary_ray(0, 0, 4, 2, (0.0, 0.0));
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
        // 45 degree vertical field: top edge sits at 22.5 degrees
        let expected = (22.5f32).to_radians().tan();
        assert!((ray.direction.y / -ray.direction.z - expected).abs() < 1e-5);
        assert!((ray.direction.x / ray.direction.z - 2.0 * expected).abs() < 1e-5);
    }

    #[test]
    fn rejects_bad_settings() {
        let mut settings = looking_down_z();
        settings.vertical_fov = 0.0;
        assert!(Camera::new(&settings, 1.0).is_err());

        let mut settings = looking_down_z();
        settings.near = 200.0;
        assert!(Camera::new(&settings, 1.0).is_err());

        let mut settings = looking_down_z();
        settings.up = Vec3::new(0.0, 0.0, 1.0);
        assert!(Camera::new(&settings, 1.0).is_err());

        let mut settings = looking_down_z();
        settings.target = settings.position;
        assert!(Camera::new(&settings, 1.0).is_err());
    }

    #[test]
    fn ray_table_matches_direct_rays() {
        let camera = Camera::new(&looking_down_z(), 1.5).unwrap();
        let table = RayTable::build(&camera, 6, 4);
        assert_eq!(table.row(2).len(), 6);
        assert_eq!(*table.get(5, 3), camera.primary_ray(5, 3, 6, 4, (0.5, 0.5)));
        assert_eq!(table.row(3)[5], *table.get(5, 3));
    }
}
