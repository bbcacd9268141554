//! Renders a vertical slice of the irradiance field of a simple scene (a
//! ground plane lit by a blue sky) into a PNG file.
//!
//! Usage: cargo run --example slice [output.png]

use std::env;

use ddgi::{
    gpu, DdgiSettings, DdgiVolumeScroller, IrradianceField, ProbeAtlas,
    SamplePoint,
};
use glam::{uvec2, uvec3, vec3, vec4, Vec3};

const SKY: Vec3 = Vec3::new(0.3, 0.5, 1.0);
const GROUND: Vec3 = Vec3::new(0.4, 0.25, 0.1);
const SIZE: u32 = 256;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = env::args().nth(1).unwrap_or_else(|| "slice.png".into());

    let settings = DdgiSettings {
        probes_counts: uvec3(8, 8, 8),
        cascades_count: 2,
        probe_spacing: 1.0,
        gamma_blending: false,
        ..Default::default()
    };

    let mut scroller = DdgiVolumeScroller::new(settings)?;
    let volume = scroller.update(vec3(0.0, 2.0, 0.0), -Vec3::Z).volume;

    let mut states = ProbeAtlas::probe_states(&volume, Default::default());
    let mut distances = ProbeAtlas::probe_distances(&volume);
    let mut irradiance = ProbeAtlas::probe_irradiance(&volume);

    let grid = volume.grid();
    let distance_layout = gpu::AtlasLayout::distance(&volume);
    let irradiance_layout = gpu::AtlasLayout::irradiance(&volume);
    let ray_max_distance = volume.ray_max_distance();

    for cascade_idx in 0..volume.cascades_count() {
        let cascade = volume.cascade(cascade_idx);

        for idx in 0..grid.len() {
            let coords = grid.index_to_coords(idx);
            let slot = cascade.probe_index(coords);
            let height = cascade.probe_world_position(coords).y;

            if height <= 0.0 {
                states.write_probe_data(
                    grid,
                    cascade_idx,
                    slot,
                    gpu::ProbeData::inactive(),
                );

                continue;
            }

            states.write_probe_data(
                grid,
                cascade_idx,
                slot,
                gpu::ProbeData::active(Vec3::ZERO),
            );

            distances.write_probe(distance_layout, cascade_idx, slot, |dir| {
                let distance = if dir.y < 0.0 {
                    (height / -dir.y).min(ray_max_distance)
                } else {
                    ray_max_distance
                };

                // Stored at half-scale
                vec4(distance * 0.5, distance * distance * 0.5, 0.0, 0.0)
            });

            irradiance.write_probe(
                irradiance_layout,
                cascade_idx,
                slot,
                |dir| {
                    let sky = (dir.y * 0.5 + 0.5).clamp(0.0, 1.0);

                    GROUND.lerp(SKY, sky).extend(1.0)
                },
            );
        }
    }

    let field =
        IrradianceField::new(&volume, &states, &distances, &irradiance)?
            .with_bias(scroller.settings().surface_bias);

    let mut rng = rand::thread_rng();

    let points: Vec<_> = (0..SIZE * SIZE)
        .map(|idx| {
            let pixel = uvec2(idx % SIZE, idx / SIZE).as_vec2() / SIZE as f32;

            let position =
                vec3(pixel.x * 16.0 - 8.0, 8.0 - pixel.y * 10.0, 0.0);

            SamplePoint::new(position, Vec3::Z).with_random_dither(&mut rng)
        })
        .collect();

    let mut colors = vec![Vec3::ZERO; points.len()];

    field.sample_batch_parallel(&points, &mut colors)?;

    let colors: Vec<_> = colors.into_iter().map(|c| c.extend(1.0)).collect();

    ProbeAtlas::from_texels(uvec2(SIZE, SIZE), colors)?
        .to_preview(2.0 * std::f32::consts::PI)
        .save(&output)?;

    println!("Saved {output}");

    Ok(())
}
