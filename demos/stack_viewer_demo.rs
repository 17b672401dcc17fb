//! Headless walkthrough of a stackscope session.
//!
//! Usage: `cargo run --example stack_viewer_demo [DATASET_DIR]`
//!
//! Without a directory, a synthetic stack (a shaded sphere) is generated in a
//! temporary directory. Set `RUST_LOG=debug` to see the engine's logging.

use std::path::Path;

use stackscope::*;

const SIZE: u32 = 96;
const LAYERS: u32 = 48;

/// Writes a stack of layers cutting through a sphere.
fn write_sphere_stack(dir: &Path) -> Result<()> {
    let center = SIZE as f32 / 2.0;
    for layer in 0..LAYERS {
        let dy = (layer as f32 / (LAYERS - 1) as f32 - 0.5) * SIZE as f32;
        let img = RgbaImage::from_fn(SIZE, SIZE, |c, r| {
            let (dx, dz) = (c as f32 - center, r as f32 - center);
            let dist = (dx * dx + dy * dy + dz * dz).sqrt() / center;
            if dist < 1.0 {
                let shade = (255.0 * (1.0 - dist)) as u8;
                Rgba([shade, 64, 255 - shade, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        img.save(dir.join(format!("slice_{layer:03}.png")))
            .map_err(std::io::Error::other)?;
    }
    std::fs::write(dir.join(ASPECT_RATIO_FILE), "2.0")?;
    Ok(())
}

fn run(dir: &Path) -> Result<()> {
    let options = VolumeOptions {
        subcube_size: 16,
        ..VolumeOptions::default()
    };
    let mut viewer = VolumeViewer::open(dir, options)?;

    if let Some(mesh) = viewer.mesh() {
        println!(
            "cells {}, partitions {}, vertices {}, submeshes {}",
            mesh.cell_counts(),
            mesh.partitions().len(),
            mesh.num_vertices(),
            mesh.num_submeshes()
        );
    }

    // Look at the volume from the front, then peel the two front layers
    let camera = Vec3::new(0.2, -0.3, 1.0).normalize();
    viewer.update_camera(camera);
    viewer.scroll_toward_view(camera, 2);

    let draws = viewer.sorted_draws();
    println!("{} submeshes to draw", draws.len());
    for draw in draws.iter().take(5) {
        let texture = viewer.submesh_texture(draw.partition, draw.submesh)?;
        println!(
            "  priority {:>5}: {:?} layer {:>2} -> {}x{} texture",
            draw.priority,
            draw.axis,
            draw.layer,
            texture.width(),
            texture.height()
        );
    }

    let carved = viewer.carve_sphere(Vec3::ZERO, 0.3)?;
    println!("carved {} cells around the center", carved.len());

    viewer.set_quality(1)?;
    if let Some(mesh) = viewer.mesh() {
        println!("coarse rebuild: {} cells", mesh.cell_counts());
    }
    println!(
        "slice cache: {} textures, {} hits, {} misses",
        viewer.cache().len(),
        viewer.cache().hits(),
        viewer.cache().misses()
    );
    Ok(())
}

fn main() -> Result<()> {
    init_logging_with_default("info");

    match std::env::args().nth(1) {
        Some(dir) => run(Path::new(&dir)),
        None => {
            let dir = tempfile::tempdir()?;
            write_sphere_stack(dir.path())?;
            run(dir.path())
        }
    }
}
