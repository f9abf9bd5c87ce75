use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use phongray::capture;
use phongray::render::Renderer;
use phongray::scene::{self, SceneDeclaration};

/// Render a scene with the Whitted-style ray tracer and write the image to disk
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON scene file; the built-in demo scene is used when omitted
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Generate a scene of this many random spheres instead of loading one
    #[arg(long, conflicts_with = "scene")]
    random_spheres: Option<usize>,

    /// Output image; `.ppm` writes plain text, other extensions go through the image encoder.
    /// Defaults to the next free CaptureN.png in the working directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Reflection/refraction recursion depth
    #[arg(short, long)]
    depth: Option<u32>,

    /// Jittered samples per pixel
    #[arg(long)]
    samples: Option<u32>,

    /// Seed for random scenes and sample jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the resolved scene declaration as JSON
    #[arg(long)]
    write_scene: Option<PathBuf>,
}

impl Args {
    fn declaration(&self) -> Result<SceneDeclaration> {
        if let Some(path) = &self.scene {
            return scene::read_declaration(path).with_context(|| format!("Failed to read scene {}", path.display()));
        }
        if let Some(count) = self.random_spheres {
            return Ok(scene::random_spheres(count, self.seed.unwrap_or(0)));
        }
        Ok(scene::demo_declaration())
    }

    fn apply_overrides(&self, declaration: &mut SceneDeclaration) {
        let settings = &mut declaration.settings;
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(depth) = self.depth {
            settings.recursion_depth = depth;
        }
        if let Some(samples) = self.samples {
            settings.samples = samples;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut declaration = args.declaration()?;
    args.apply_overrides(&mut declaration);

    if let Some(path) = &args.write_scene {
        fs::write(path, declaration.to_json()?).with_context(|| format!("Failed to write scene {}", path.display()))?;
        info!("Wrote scene declaration to {}", path.display());
    }

    let base_dir = args.scene.as_ref()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let scene = declaration.build(&base_dir).context("Failed to build scene")?;
    let renderer = Renderer::new(scene).context("Invalid render settings")?;
    let (frame, _stats) = renderer.render();

    let output = args.output.clone().unwrap_or_else(|| capture::next_capture_path("."));
    capture::save(&frame, &output).with_context(|| format!("Failed to save {}", output.display()))?;
    Ok(())
}
