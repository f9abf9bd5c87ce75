use std::f32::consts::PI;

use super::error::{Error, Result};
use super::materials::Material;
use super::math::*;

/// A record of where a ray hit an object, including a reference to the material
pub struct HitRecord<'a> {
    pub t: f32,
    pub p: Vec3,
    pub normal: Vec3,
    pub u: f32,
    pub v: f32,
    pub material: &'a Material,
    /// Zero-thickness surface with no inside, so transmitted light leaves unbent
    pub thin: bool,
}

pub trait Hitable: Send + Sync {
    fn hit<'a>(&'a self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord<'a>>;
}

/// Bounding sphere used to skip whole meshes
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub centre: Vec3,
    pub radius: f32,
}

impl Bounds {
    fn may_hit(&self, ray: &Ray, t_max: f32) -> bool {
        // Always test the contents when starting inside
        if (ray.origin - self.centre).len_sq() <= self.radius * self.radius {
            return true;
        }
        sphere_ray_intersect(ray, 0.0, t_max, self.centre, self.radius).is_some()
    }
}

fn sphere_ray_intersect(ray: &Ray, t_min: f32, t_max: f32, centre: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - centre;
    let a = ray.direction.len_sq();
    let b = 2.0 * dot(oc, ray.direction);
    let c = oc.len_sq() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None
    }

    let d_sqrt = discriminant.sqrt();
    let t1 = (-b - d_sqrt) / (2.0 * a);
    if t1 < t_max && t1 > t_min {
        return Some(t1);
    }

    let t2 = (-b + d_sqrt) / (2.0 * a);
    if t2 < t_max && t2 > t_min {
        return Some(t2);
    }

    None
}

pub struct Sphere {
    pub centre: Vec3,
    pub radius: f32,
    pub material: Material,
}

impl Sphere {
    pub fn new(centre: Vec3, radius: f32, material: Material) -> Result<Sphere> {
        if !(radius > 0.0) {
            return Err(Error::InvalidGeometry(format!("sphere radius must be positive, got {}", radius)));
        }
        Ok(Sphere { centre, radius, material })
    }
}

impl Hitable for Sphere {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let t = sphere_ray_intersect(ray, t_min, t_max, self.centre, self.radius)?;
        let p = ray.at_t(t);
        let normal = (p - self.centre) * (1.0 / self.radius);
        let u = 0.5 + normal.z.atan2(normal.x) / (2.0 * PI);
        let v = 0.5 + normal.y.max(-1.0).min(1.0).asin() / PI;
        Some(HitRecord { t, p, normal, u, v, material: &self.material, thin: false })
    }
}

/// Two unit vectors spanning the plane with normal `n`
fn tangent_basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() > 0.9 { Vec3::new(0.0, 1.0, 0.0) } else { Vec3::new(1.0, 0.0, 0.0) };
    let e1 = cross(helper, n).normalise();
    let e2 = cross(n, e1);
    (e1, e2)
}

fn unit_normal(n: Vec3, what: &str) -> Result<Vec3> {
    let len = n.length();
    if !(len > 1e-8) {
        return Err(Error::InvalidGeometry(format!("{} has no well-defined normal", what)));
    }
    Ok(n / len)
}

/// Returns `t` where the ray meets the plane, if in range and not parallel
fn plane_ray_intersect(ray: &Ray, t_min: f32, t_max: f32, point: Vec3, normal: Vec3) -> Option<f32> {
    let denom = dot(normal, ray.direction);
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = dot(point - ray.origin, normal) / denom;
    if t <= t_min || t >= t_max {
        return None;
    }
    Some(t)
}

/// Flat surfaces are two-sided: the reported normal faces the incoming ray
fn facing(normal: Vec3, ray: &Ray) -> Vec3 {
    if dot(normal, ray.direction) > 0.0 { -normal } else { normal }
}

/// An infinite plane
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
    pub uv_scale: f32,
    pub material: Material,
    basis: (Vec3, Vec3),
}

impl Plane {
    pub fn new(point: Vec3, normal: Vec3, uv_scale: f32, material: Material) -> Result<Plane> {
        let normal = unit_normal(normal, "plane")?;
        Ok(Plane { point, normal, uv_scale, material, basis: tangent_basis(normal) })
    }
}

impl Hitable for Plane {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let t = plane_ray_intersect(ray, t_min, t_max, self.point, self.normal)?;
        let p = ray.at_t(t);
        let local = p - self.point;
        let u = dot(local, self.basis.0) * self.uv_scale;
        let v = dot(local, self.basis.1) * self.uv_scale;
        Some(HitRecord { t, p, normal: facing(self.normal, ray), u, v, material: &self.material, thin: true })
    }
}

/// A planar four-cornered patch, clipped to the bounding box of its corners.
/// Texture coordinates run across the two box axes the patch spans and repeat
/// `max_u` by `max_v` times.
pub struct Quad {
    pub corners: [Vec3; 4],
    pub normal: Vec3,
    pub min: Vec3,
    pub max: Vec3,
    pub max_u: f32,
    pub max_v: f32,
    pub material: Material,
    // Indices of the box axes that u and v run along
    axes: (usize, usize),
}

const QUAD_PAD: f32 = 1e-4;

fn component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

impl Quad {
    pub fn new(corners: [Vec3; 4], max_u: f32, max_v: f32, material: Material) -> Result<Quad> {
        let [a, b, c, d] = corners;
        let normal = unit_normal(cross(b - a, c - a), "quad")?;
        let off_plane = dot(d - a, normal);
        if off_plane.abs() > QUAD_PAD * (1.0 + (d - a).length()) {
            return Err(Error::InvalidGeometry(format!("quad's fourth corner lies {} off the plane of the other three", off_plane)));
        }
        let (min, max) = corners.iter().skip(1).fold((a, a), |(lo, hi), &p| (lo.min_by_component(p), hi.max_by_component(p)));

        // Drop the axis the normal leans on most; u and v run along the remaining two
        let n_abs = normal.map(f32::abs);
        let axes = if n_abs.x >= n_abs.y && n_abs.x >= n_abs.z {
            (2, 1)
        } else if n_abs.y >= n_abs.z {
            (0, 2)
        } else {
            (0, 1)
        };
        let extent = max - min;
        if component(extent, axes.0) <= 0.0 || component(extent, axes.1) <= 0.0 {
            return Err(Error::InvalidGeometry("quad corners span no area".to_owned()));
        }
        Ok(Quad { corners, normal, min, max, max_u, max_v, material, axes })
    }
}

impl Hitable for Quad {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let t = plane_ray_intersect(ray, t_min, t_max, self.corners[0], self.normal)?;
        let p = ray.at_t(t);
        if p.x < self.min.x - QUAD_PAD || p.x > self.max.x + QUAD_PAD ||
           p.y < self.min.y - QUAD_PAD || p.y > self.max.y + QUAD_PAD ||
           p.z < self.min.z - QUAD_PAD || p.z > self.max.z + QUAD_PAD {
            return None;
        }

        let (ua, va) = self.axes;
        let u = (component(p, ua) - component(self.min, ua)) / (component(self.max, ua) - component(self.min, ua)) * self.max_u;
        let v = (component(p, va) - component(self.min, va)) / (component(self.max, va) - component(self.min, va)) * self.max_v;
        Some(HitRecord { t, p, normal: facing(self.normal, ray), u, v, material: &self.material, thin: true })
    }
}

/// Möller-Trumbore; returns (t, barycentric u, barycentric v)
fn triangle_ray_intersect(ray: &Ray, t_min: f32, t_max: f32, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, f32, f32)> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = cross(ray.direction, e2);
    let det = dot(e1, pvec);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = dot(tvec, pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }
    let qvec = cross(tvec, e1);
    let v = dot(ray.direction, qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = dot(e2, qvec) * inv_det;
    if t <= t_min || t >= t_max {
        return None;
    }
    Some((t, u, v))
}

/// A single triangle; the normal follows counter-clockwise winding of a, b, c
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub material: Material,
    normal: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3, material: Material) -> Result<Triangle> {
        let normal = unit_normal(cross(b - a, c - a), "triangle")?;
        Ok(Triangle { a, b, c, material, normal })
    }
}

impl Hitable for Triangle {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let (t, u, v) = triangle_ray_intersect(ray, t_min, t_max, self.a, self.b, self.c)?;
        Some(HitRecord { t, p: ray.at_t(t), normal: self.normal, u, v, material: &self.material, thin: false })
    }
}

/// Caps a geodesic sphere at 20 * 4^8 triangles
pub const MAX_SUBDIVISIONS: u32 = 8;

/// Triangles sharing one material, skipped wholesale when the ray misses the bounds
pub struct Mesh {
    pub triangles: Vec<[Vec3; 3]>,
    pub bounds: Bounds,
    pub material: Material,
    normals: Vec<Vec3>,
}

impl Mesh {
    pub fn new(triangles: Vec<[Vec3; 3]>, material: Material) -> Result<Mesh> {
        if triangles.is_empty() {
            return Err(Error::InvalidGeometry("mesh has no triangles".to_owned()));
        }
        let normals = triangles.iter()
            .map(|[a, b, c]| unit_normal(cross(*b - *a, *c - *a), "mesh triangle"))
            .collect::<Result<Vec<_>>>()?;

        let count = (triangles.len() * 3) as f32;
        let centre = triangles.iter().flatten().fold(Vec3::zero(), |acc, &p| acc + p) / count;
        let radius = triangles.iter().flatten().map(|&p| p.distance(centre)).fold(0.0, f32::max);
        Ok(Mesh { triangles, bounds: Bounds { centre, radius }, material, normals })
    }

    /// Icosahedron split `subdivisions` times, each pass turning every triangle into
    /// four with midpoints pushed out onto the sphere.
    pub fn geodesic_sphere(centre: Vec3, radius: f32, subdivisions: u32, material: Material) -> Result<Mesh> {
        if !(radius > 0.0) {
            return Err(Error::InvalidGeometry(format!("geodesic radius must be positive, got {}", radius)));
        }
        if subdivisions > MAX_SUBDIVISIONS {
            return Err(Error::InvalidGeometry(format!("geodesic subdivisions must be at most {}, got {}", MAX_SUBDIVISIONS, subdivisions)));
        }
        let mut faces = icosahedron();
        for _ in 0..subdivisions {
            let mut next = Vec::with_capacity(faces.len() * 4);
            for [p1, p2, p3] in faces {
                let m12 = ((p1 + p2) * 0.5).normalise();
                let m23 = ((p2 + p3) * 0.5).normalise();
                let m13 = ((p1 + p3) * 0.5).normalise();
                next.push([p1, m12, m13]);
                next.push([p2, m23, m12]);
                next.push([p3, m13, m23]);
                next.push([m12, m23, m13]);
            }
            faces = next;
        }

        let triangles = faces.into_iter()
            .map(|[a, b, c]| {
                // Wind outward so refraction sees the right side
                let (b, c) = if dot(cross(b - a, c - a), a + b + c) < 0.0 { (c, b) } else { (b, c) };
                [centre + a * radius, centre + b * radius, centre + c * radius]
            })
            .collect();
        Mesh::new(triangles, material)
    }
}

/// The twenty faces of a unit icosahedron
fn icosahedron() -> Vec<[Vec3; 3]> {
    let a = 2.0 / (1.0 + 5.0f32.sqrt());
    let v = [
        Vec3::new(0.0, a, -1.0),
        Vec3::new(-a, 1.0, 0.0),
        Vec3::new(a, 1.0, 0.0),
        Vec3::new(0.0, a, 1.0),
        Vec3::new(-1.0, 0.0, a),
        Vec3::new(0.0, -a, 1.0),
        Vec3::new(1.0, 0.0, a),
        Vec3::new(1.0, 0.0, -a),
        Vec3::new(0.0, -a, -1.0),
        Vec3::new(-1.0, 0.0, -a),
        Vec3::new(-a, -1.0, 0.0),
        Vec3::new(a, -1.0, 0.0),
    ];
    const FACES: [[usize; 3]; 20] = [
        [2, 1, 0], [1, 2, 3], [5, 4, 3], [6, 5, 3], [8, 7, 0],
        [9, 8, 0], [11, 10, 5], [10, 11, 8], [4, 9, 1], [9, 4, 10],
        [7, 6, 2], [6, 7, 11], [4, 1, 3], [2, 6, 3], [1, 9, 0],
        [7, 2, 0], [9, 10, 8], [11, 7, 8], [10, 4, 5], [6, 11, 5],
    ];
    FACES.iter()
        .map(|f| [v[f[0]].normalise(), v[f[1]].normalise(), v[f[2]].normalise()])
        .collect()
}

impl Hitable for Mesh {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        if !self.bounds.may_hit(ray, t_max) {
            return None;
        }

        let mut result = None;
        let mut closest_so_far = t_max;
        for (i, [a, b, c]) in self.triangles.iter().enumerate() {
            if let Some((t, u, v)) = triangle_ray_intersect(ray, t_min, closest_so_far, *a, *b, *c) {
                closest_so_far = t;
                result = Some(HitRecord { t, p: ray.at_t(t), normal: self.normals[i], u, v, material: &self.material, thin: false });
            }
        }

        result
    }
}

pub fn closest_hit<'a>(ray: &Ray, t_min: f32, t_max: f32, objects: &'a [Box<dyn Hitable>]) -> Option<HitRecord<'a>> {
    let mut result = None;
    let mut closest_so_far = t_max;
    for obj in objects {
        if let Some(record) = obj.hit(ray, t_min, closest_so_far) {
            closest_so_far = record.t;
            result = Some(record);
        }
    }

    result
}

/// Occlusion query: true as soon as anything is hit inside (t_min, t_max)
pub fn any_hit(ray: &Ray, t_min: f32, t_max: f32, objects: &[Box<dyn Hitable>]) -> bool {
    objects.iter().any(|obj| obj.hit(ray, t_min, t_max).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_sphere_works() {
        let origin = Vec3::new(0.0, 0.0, 0.0);
        let left = Vec3::new(-1.0, 0.0, 0.0);
        let down_y = Ray { origin, direction: Vec3::new(0.0, -1.0, 0.0) };
        let down_y_parallel = Ray { origin: 2.0 * left, direction: Vec3::new(0.0, -1.0, 0.0) };
        // Expected hit: ray along y axis and sphere 2 units down y axis
        let sphere = Sphere::new(Vec3::new(0.0, -2.0, 0.0), 1.0, Material::default()).unwrap();
        match sphere.hit(&down_y, 0.0, 1000.0) {
            None => panic!("This ray and sphere were supposed to hit"),
            Some(record) => {
                assert_eq!(record.t, 1.0);
                assert_eq!(record.normal, Vec3::new(0.0, 1.0, 0.0));
            }
        };
        // Expected miss: ray parallel to y axis and sphere 2 units down y axis
        assert!(sphere.hit(&down_y_parallel, 0.0, 1000.0).is_none());
    }

    #[test]
    fn hit_sphere_from_inside_takes_far_root() {
        let sphere = Sphere::new(Vec3::zero(), 2.0, Material::default()).unwrap();
        let ray = Ray { origin: Vec3::zero(), direction: Vec3::new(1.0, 0.0, 0.0) };
        let record = sphere.hit(&ray, 0.001, 1000.0).unwrap();
        assert_eq!(record.t, 2.0);
        // Outward normal, same side as the ray
        assert!(dot(record.normal, ray.direction) > 0.0);
    }

    #[test]
    fn sphere_rejects_bad_radius() {
        assert!(Sphere::new(Vec3::zero(), 0.0, Material::default()).is_err());
        assert!(Sphere::new(Vec3::zero(), f32::NAN, Material::default()).is_err());
    }

    #[test]
    fn plane_hits_and_faces_ray() {
        let plane = Plane::new(Vec3::zero(), Vec3::new(0.0, -1.0, 0.0), 1.0, Material::default()).unwrap();
        let down = Ray { origin: Vec3::new(0.0, 3.0, 0.0), direction: Vec3::new(0.0, -1.0, 0.0) };
        let record = plane.hit(&down, 0.001, 100.0).unwrap();
        assert_eq!(record.t, 3.0);
        assert_eq!(record.normal, Vec3::new(0.0, 1.0, 0.0));

        let parallel = Ray { origin: Vec3::new(0.0, 3.0, 0.0), direction: Vec3::new(1.0, 0.0, 0.0) };
        assert!(plane.hit(&parallel, 0.001, 100.0).is_none());
        assert!(plane.hit(&down, 0.001, 2.0).is_none());
    }

    #[test]
    fn quad_clips_to_corners() {
        let corners = [
            Vec3::new(8.0, 0.0, 16.0),
            Vec3::new(-8.0, 0.0, -16.0),
            Vec3::new(8.0, 0.0, -16.0),
            Vec3::new(-8.0, 0.0, 16.0),
        ];
        let quad = Quad::new(corners, 10.0, 15.0, Material::default()).unwrap();
        let inside = Ray { origin: Vec3::new(0.0, 5.0, 0.0), direction: Vec3::new(0.0, -1.0, 0.0) };
        let record = quad.hit(&inside, 0.001, 100.0).unwrap();
        assert_eq!(record.t, 5.0);
        assert_eq!(record.normal, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(record.u, 5.0);
        assert_eq!(record.v, 7.5);

        let outside = Ray { origin: Vec3::new(9.0, 5.0, 0.0), direction: Vec3::new(0.0, -1.0, 0.0) };
        assert!(quad.hit(&outside, 0.001, 100.0).is_none());
    }

    #[test]
    fn quad_rejects_collinear_corners() {
        let line = [Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        assert!(Quad::new(line, 1.0, 1.0, Material::default()).is_err());
    }

    #[test]
    fn quad_rejects_warped_fourth_corner() {
        let warped = [
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(-1.0, 2.0, 1.0),
        ];
        match Quad::new(warped, 1.0, 1.0, Material::default()) {
            Err(Error::InvalidGeometry(_)) => {},
            _ => panic!("expected an invalid geometry error"),
        }
    }

    #[test]
    fn flat_shapes_are_thin_and_solids_are_not() {
        let down = Ray { origin: Vec3::new(0.0, 3.0, 0.0), direction: Vec3::new(0.0, -1.0, 0.0) };
        let plane = Plane::new(Vec3::zero(), Vec3::new(0.0, 1.0, 0.0), 1.0, Material::default()).unwrap();
        assert!(plane.hit(&down, 0.001, 100.0).unwrap().thin);

        let sphere = Sphere::new(Vec3::zero(), 1.0, Material::default()).unwrap();
        assert!(!sphere.hit(&down, 0.001, 100.0).unwrap().thin);
    }

    #[test]
    fn triangle_hit_and_miss() {
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Material::default(),
        ).unwrap();
        let towards = Ray { origin: Vec3::new(0.25, 0.25, 2.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        let record = tri.hit(&towards, 0.001, 100.0).unwrap();
        assert_eq!(record.t, 2.0);
        assert_eq!(record.normal, Vec3::new(0.0, 0.0, 1.0));

        let beside = Ray { origin: Vec3::new(0.75, 0.75, 2.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        assert!(tri.hit(&beside, 0.001, 100.0).is_none());
    }

    #[test]
    fn geodesic_sphere_subdivides_and_points_outward() {
        let centre = Vec3::new(1.0, 2.0, 3.0);
        let mesh = Mesh::geodesic_sphere(centre, 2.0, 2, Material::default()).unwrap();
        assert_eq!(mesh.triangles.len(), 20 * 4 * 4);
        for (tri, n) in mesh.triangles.iter().zip(mesh.normals.iter()) {
            for p in tri {
                assert!((p.distance(centre) - 2.0).abs() < 1e-4);
            }
            assert!(dot(*n, tri[0] - centre) > 0.0);
        }

        let ray = Ray { origin: Vec3::new(1.0, 2.0, 10.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        let record = mesh.hit(&ray, 0.001, 100.0).unwrap();
        assert!(record.t > 4.99 && record.t < 5.3);
        assert!(record.normal.z > 0.0);

        let miss = Ray { origin: Vec3::new(5.0, 2.0, 10.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        assert!(mesh.hit(&miss, 0.001, 100.0).is_none());
    }

    #[test]
    fn geodesic_sphere_caps_subdivisions() {
        let too_fine = Mesh::geodesic_sphere(Vec3::zero(), 1.0, MAX_SUBDIVISIONS + 1, Material::default());
        assert!(matches!(too_fine, Err(Error::InvalidGeometry(_))));
        assert!(matches!(Mesh::geodesic_sphere(Vec3::zero(), 1.0, 16, Material::default()), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn closest_hit_picks_nearest() {
        let objects: Vec<Box<dyn Hitable>> = vec![
            Box::new(Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, Material::default()).unwrap()),
            Box::new(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, Material::default()).unwrap()),
        ];
        let ray = Ray { origin: Vec3::zero(), direction: Vec3::new(0.0, 0.0, -1.0) };
        assert_eq!(closest_hit(&ray, 0.001, 100.0, &objects).unwrap().t, 4.0);
        assert!(closest_hit(&ray, 0.001, 3.0, &objects).is_none());
        assert!(any_hit(&ray, 0.001, 4.5, &objects));
        assert!(!any_hit(&ray, 0.001, 3.5, &objects));
    }
}
