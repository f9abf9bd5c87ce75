// Needed for using 'cargo bench', though I don't fully follow why
#![feature(test)]
extern crate test;

use phongray::geometry::*;
use phongray::materials::Material;
use phongray::math::*;

use test::Bencher;

#[bench]
fn bench_ray_sphere_hit(b: &mut Bencher) {
    let sphere = Sphere::new(Vec3::new(0.0, -2.0, 0.0), 1.0, Material::default()).unwrap();
    let down_y = Ray { origin: Vec3::zero(), direction: Vec3::new(0.0, -1.0, 0.0) };

    b.iter(|| {
        sphere.hit(&down_y, 0.0, 1000.0).unwrap();
    });
}

#[bench]
fn bench_ray_sphere_miss(b: &mut Bencher) {
    let sphere = Sphere::new(Vec3::new(0.0, -2.0, 0.0), 1.0, Material::default()).unwrap();
    let parallel_y = Ray { origin: Vec3::zero(), direction: Vec3::new(2.0, -1.0, 0.0) };

    b.iter(|| {
        sphere.hit(&parallel_y, 0.0, 1000.0).is_none();
    });
}

#[bench]
fn bench_hit_quad(b: &mut Bencher) {
    let corners = [
        Vec3::new(-2.0, -2.0, -2.0),
        Vec3::new(2.0, -2.0, 2.0),
        Vec3::new(2.0, -2.0, -2.0),
        Vec3::new(-2.0, -2.0, 2.0),
    ];
    let quad = Quad::new(corners, 1.0, 1.0, Material::default()).unwrap();
    let down_y = Ray { origin: Vec3::zero(), direction: Vec3::new(0.0, -1.0, 0.0) };

    b.iter(|| {
        quad.hit(&down_y, 0.0, 1000.0).unwrap();
    });
}

#[bench]
fn bench_hit_triangle(b: &mut Bencher) {
    let tri = Triangle::new(Vec3::new(-1.0, -1.0, -2.0), Vec3::new(1.0, -1.0, -2.0), Vec3::new(0.0, 1.0, -2.0), Material::default()).unwrap();
    let forward = Ray { origin: Vec3::zero(), direction: Vec3::new(0.0, 0.0, -1.0) };

    b.iter(|| {
        tri.hit(&forward, 0.0, 1000.0).unwrap();
    });
}

#[bench]
fn bench_hit_geodesic(b: &mut Bencher) {
    let mesh = Mesh::geodesic_sphere(Vec3::new(0.0, 0.0, -4.0), 1.0, 3, Material::default()).unwrap();
    let forward = Ray { origin: Vec3::zero(), direction: Vec3::new(0.0, 0.0, -1.0) };

    b.iter(|| {
        mesh.hit(&forward, 0.0, 1000.0).unwrap();
    });
}
