use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::camera::CameraSettings;
use super::error::{Error, Result};
use super::geometry::*;
use super::light::Light;
use super::materials::*;
use super::math::*;
use super::render::RenderSettings;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TextureDeclaration {
    Constant { colour: Vec3 },
    Checker { odd: Vec3, even: Vec3 },
    Gradient { radius: f32, inner: Vec3, outer: Vec3 },
    Marble { scale: f32, colour: Vec3 },
    /// Relative paths are resolved against the scene file's directory
    Image { path: PathBuf },
}

impl Default for TextureDeclaration {
    fn default() -> TextureDeclaration {
        TextureDeclaration::Constant { colour: Vec3::splat(1.0) }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaterialDeclaration {
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    pub exponent: f32,
    pub ambient_colour: Vec3,
    pub diffuse_colour: Vec3,
    pub specular_colour: Vec3,
    pub texture: TextureDeclaration,
    pub reflectivity: f32,
    pub transparency: f32,
    pub refraction_index: f32,
}

impl Default for MaterialDeclaration {
    fn default() -> MaterialDeclaration {
        MaterialDeclaration {
            ambient_strength: 1.0,
            diffuse_strength: 1.0,
            specular_strength: 0.0,
            exponent: 20.0,
            ambient_colour: Vec3::splat(1.0),
            diffuse_colour: Vec3::splat(1.0),
            specular_colour: Vec3::splat(1.0),
            texture: TextureDeclaration::default(),
            reflectivity: 0.0,
            transparency: 0.0,
            refraction_index: 1.0,
        }
    }
}

impl MaterialDeclaration {
    fn build(&self, base_dir: &Path) -> Result<Material> {
        let texture: Arc<dyn Texture> = match &self.texture {
            TextureDeclaration::Constant { colour } => Arc::new(ConstantTexture { colour: *colour }),
            TextureDeclaration::Checker { odd, even } => Arc::new(CheckerTexture { odd: *odd, even: *even }),
            TextureDeclaration::Gradient { radius, inner, outer } => {
                if !(*radius > 0.0) {
                    return Err(Error::InvalidGeometry(format!("gradient radius must be positive, got {}", radius)));
                }
                Arc::new(GradientTexture { radius: *radius, inner: *inner, outer: *outer })
            },
            TextureDeclaration::Marble { scale, colour } => Arc::new(NoiseTexture::new(*scale, *colour)),
            TextureDeclaration::Image { path } => Arc::new(ImageTexture::open(base_dir.join(path))?),
        };
        Ok(Material {
            ambient_strength: self.ambient_strength,
            diffuse_strength: self.diffuse_strength,
            specular_strength: self.specular_strength,
            exponent: self.exponent,
            ambient_colour: self.ambient_colour,
            diffuse_colour: self.diffuse_colour,
            specular_colour: self.specular_colour,
            texture,
            reflectivity: self.reflectivity,
            transparency: self.transparency,
            refraction_index: self.refraction_index,
        })
    }
}

fn one() -> f32 {
    1.0
}

fn two() -> u32 {
    2
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", tag = "shape")]
pub enum ShapeDeclaration {
    Sphere {
        centre: Vec3,
        radius: f32,
        material: String,
    },
    Plane {
        point: Vec3,
        normal: Vec3,
        #[serde(default = "one")]
        uv_scale: f32,
        material: String,
    },
    Quad {
        corners: [Vec3; 4],
        #[serde(default = "one")]
        max_u: f32,
        #[serde(default = "one")]
        max_v: f32,
        material: String,
    },
    Triangle {
        a: Vec3,
        b: Vec3,
        c: Vec3,
        material: String,
    },
    Geodesic {
        centre: Vec3,
        radius: f32,
        #[serde(default = "two")]
        subdivisions: u32,
        material: String,
    },
}

impl ShapeDeclaration {
    fn material(&self) -> &str {
        match self {
            ShapeDeclaration::Sphere { material, .. } |
            ShapeDeclaration::Plane { material, .. } |
            ShapeDeclaration::Quad { material, .. } |
            ShapeDeclaration::Triangle { material, .. } |
            ShapeDeclaration::Geodesic { material, .. } => material,
        }
    }

    fn build(&self, material: Material) -> Result<Box<dyn Hitable>> {
        let shape: Box<dyn Hitable> = match self {
            ShapeDeclaration::Sphere { centre, radius, .. } =>
                Box::new(Sphere::new(*centre, *radius, material)?),
            ShapeDeclaration::Plane { point, normal, uv_scale, .. } =>
                Box::new(Plane::new(*point, *normal, *uv_scale, material)?),
            ShapeDeclaration::Quad { corners, max_u, max_v, .. } =>
                Box::new(Quad::new(*corners, *max_u, *max_v, material)?),
            ShapeDeclaration::Triangle { a, b, c, .. } =>
                Box::new(Triangle::new(*a, *b, *c, material)?),
            ShapeDeclaration::Geodesic { centre, radius, subdivisions, .. } =>
                Box::new(Mesh::geodesic_sphere(*centre, *radius, *subdivisions, material)?),
        };
        Ok(shape)
    }
}

/// On-disk description of a scene
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneDeclaration {
    pub camera: CameraSettings,
    pub settings: RenderSettings,
    pub materials: BTreeMap<String, MaterialDeclaration>,
    pub objects: Vec<ShapeDeclaration>,
    pub lights: Vec<Light>,
}

/// A scene ready to be traced
pub struct Scene {
    pub objects: Vec<Box<dyn Hitable>>,
    pub lights: Vec<Light>,
    pub camera: CameraSettings,
    pub settings: RenderSettings,
}

fn preset(name: &str) -> Option<Material> {
    Some(match name {
        "glass" => Material::glass(),
        "mirror" => Material::mirror(),
        "checker" | "checkered" => Material::checkered(),
        "white" => Material::matte(Vec3::splat(1.0)),
        "black" => Material::matte(Vec3::splat(0.0)),
        "red" => Material::matte(Vec3::new(1.0, 0.0, 0.0)),
        "green" => Material::matte(Vec3::new(0.0, 1.0, 0.0)),
        "blue" => Material::matte(Vec3::new(0.0, 0.0, 1.0)),
        _ => return None,
    })
}

impl SceneDeclaration {
    pub fn from_json(text: &str) -> Result<SceneDeclaration> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve materials and construct every shape. Declared materials shadow the
    /// built-in presets of the same name.
    pub fn build(&self, base_dir: &Path) -> Result<Scene> {
        let mut resolved: HashMap<&str, Material> = HashMap::new();
        let mut objects: Vec<Box<dyn Hitable>> = Vec::with_capacity(self.objects.len());

        for obj in &self.objects {
            let name = obj.material();
            if !resolved.contains_key(name) {
                let material = match self.materials.get(name) {
                    Some(decl) => decl.build(base_dir)?,
                    None => preset(name).ok_or_else(|| Error::UnknownMaterial(name.to_owned()))?,
                };
                debug!("Resolved material `{}`", name);
                resolved.insert(name, material);
            }
            let material = resolved[name].clone();
            objects.push(obj.build(material)?);
        }

        info!("Built scene with {} objects and {} lights", objects.len(), self.lights.len());
        Ok(Scene { objects, lights: self.lights.clone(), camera: self.camera, settings: self.settings })
    }
}

pub fn read_declaration<P: AsRef<Path>>(path: P) -> Result<SceneDeclaration> {
    // Open the file in read-only mode with buffer.
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    Ok(serde_json::from_reader(reader)?)
}

pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene> {
    let path = path.as_ref();
    info!("Loading scene from {}", path.display());
    let declaration = read_declaration(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    declaration.build(base_dir)
}

pub fn parse_scene(text: &str) -> Result<Scene> {
    SceneDeclaration::from_json(text)?.build(Path::new("."))
}

const CORNFLOWER_BLUE: Vec3 = Vec3::new(100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0);

/// Checkered floor with a glass sphere in front of a mirrored one, lit from above
/// and behind the camera.
pub fn demo_declaration() -> SceneDeclaration {
    let floor = MaterialDeclaration {
        texture: TextureDeclaration::Checker { odd: Vec3::new(1.0, 0.0, 0.0), even: Vec3::new(1.0, 1.0, 0.0) },
        ..MaterialDeclaration::default()
    };
    let mut materials = BTreeMap::new();
    materials.insert("floor".to_owned(), floor);

    SceneDeclaration {
        camera: CameraSettings {
            position: Vec3::new(3.0, 4.0, 15.0),
            target: Vec3::new(3.0, 0.0, -70.0),
            ..CameraSettings::default()
        },
        settings: RenderSettings {
            recursion_depth: 5,
            background: CORNFLOWER_BLUE,
            ..RenderSettings::default()
        },
        materials,
        objects: vec![
            ShapeDeclaration::Quad {
                corners: [
                    Vec3::new(8.0, 0.0, 16.0),
                    Vec3::new(-8.0, 0.0, -16.0),
                    Vec3::new(8.0, 0.0, -16.0),
                    Vec3::new(-8.0, 0.0, 16.0),
                ],
                max_u: 10.0,
                max_v: 15.0,
                material: "floor".to_owned(),
            },
            ShapeDeclaration::Sphere { centre: Vec3::new(3.0, 4.0, 11.0), radius: 1.0, material: "glass".to_owned() },
            ShapeDeclaration::Sphere { centre: Vec3::new(1.5, 3.0, 9.0), radius: 1.0, material: "mirror".to_owned() },
        ],
        lights: vec![Light::white(Vec3::new(5.0, 8.0, 15.0))],
    }
}

pub fn demo_scene() -> Result<Scene> {
    demo_declaration().build(Path::new("."))
}

/// A grid of small random spheres on a large grey floor, reproducible from `seed`
pub fn random_spheres(count: usize, seed: u64) -> SceneDeclaration {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut materials = BTreeMap::new();
    let mut objects = vec![ShapeDeclaration::Plane {
        point: Vec3::zero(),
        normal: Vec3::new(0.0, 1.0, 0.0),
        uv_scale: 1.0,
        material: "floor".to_owned(),
    }];
    materials.insert("floor".to_owned(), MaterialDeclaration {
        ambient_colour: Vec3::splat(0.5),
        diffuse_colour: Vec3::splat(0.5),
        ..MaterialDeclaration::default()
    });

    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    for i in 0..count {
        let (a, b) = ((i % side) as f32, (i / side) as f32);
        let radius = 0.15 + 0.1 * rng.gen::<f32>();
        let centre = Vec3::new(
            a - 0.5 * side as f32 + 0.9 * rng.gen::<f32>(),
            radius,
            -b - 0.9 * rng.gen::<f32>(),
        );
        let material = match rng.gen::<f32>() {
            d if d < 0.65 => {
                let name = format!("matte_{}", i);
                let colour = Vec3::new(rng.gen::<f32>() * rng.gen::<f32>(), rng.gen::<f32>() * rng.gen::<f32>(), rng.gen::<f32>() * rng.gen::<f32>());
                materials.insert(name.clone(), MaterialDeclaration {
                    ambient_colour: colour,
                    diffuse_colour: colour,
                    specular_strength: 0.3,
                    ..MaterialDeclaration::default()
                });
                name
            },
            d if d < 0.85 => "mirror".to_owned(),
            _ => "glass".to_owned(),
        };
        objects.push(ShapeDeclaration::Sphere { centre, radius, material });
    }

    SceneDeclaration {
        camera: CameraSettings {
            position: Vec3::new(0.0, 2.0, 4.0),
            target: Vec3::new(0.0, 0.0, -0.5 * side as f32),
            ..CameraSettings::default()
        },
        settings: RenderSettings { background: CORNFLOWER_BLUE, ..RenderSettings::default() },
        materials,
        objects,
        lights: vec![Light::white(Vec3::new(-4.0, 8.0, 6.0)), Light { position: Vec3::new(5.0, 6.0, 2.0), colour: Vec3::splat(0.5) }],
    }
}
