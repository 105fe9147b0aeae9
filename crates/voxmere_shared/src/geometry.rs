use glam::{IVec3, Vec3};

/// Raycast samples taken per unit of travel.
const RAYCAST_STEPS_PER_UNIT: u32 = 128;

/// Cells inside an axis-scaled sphere around `centre`.
///
/// A cell at offset `(x, y, z)` is included when
/// `x²/sx + y²/sy + z²/sz < radius²`. The scan box extends one diameter
/// (scaled per axis) in every direction; an axis scaled to zero yields nothing.
pub fn sphere_blocks(centre: IVec3, radius: f64, scale: [f64; 3]) -> Vec<IVec3> {
    let diameter = (radius * 2.0).ceil();
    let bounds = |s: f64| ((-diameter * s).ceil() as i32, (diameter * s).ceil() as i32);
    let (bx, mx) = bounds(scale[0]);
    let (by, my) = bounds(scale[1]);
    let (bz, mz) = bounds(scale[2]);
    let r2 = radius * radius;

    let mut cells = Vec::new();
    for x in bx..mx {
        for y in by..my {
            for z in bz..mz {
                let (fx, fy, fz) = (f64::from(x), f64::from(y), f64::from(z));
                if fx * fx / scale[0] + fy * fy / scale[1] + fz * fz / scale[2] < r2 {
                    cells.push(centre + IVec3::new(x, y, z));
                }
            }
        }
    }
    cells
}

pub fn unit_sphere_blocks(centre: IVec3, radius: f64) -> Vec<IVec3> {
    sphere_blocks(centre, radius, [1.0, 1.0, 1.0])
}

/// View direction for a yaw/pitch pair in degrees.
pub fn sight_vector(yaw_degrees: f32, pitch_degrees: f32) -> Vec3 {
    let rx = -yaw_degrees.to_radians();
    let ry = pitch_degrees.to_radians();
    Vec3::new(ry.cos() * rx.sin(), ry.sin(), ry.cos() * rx.cos())
}

/// Cells crossed by a ray from `origin`, in hit order, starting with the
/// origin's own cell. Consecutive duplicates are collapsed.
pub fn raycast_blocks(origin: Vec3, yaw_degrees: f32, pitch_degrees: f32, max_distance: u32) -> Vec<IVec3> {
    let step = sight_vector(yaw_degrees, pitch_degrees) / RAYCAST_STEPS_PER_UNIT as f32;
    let mut pos = origin;
    let mut last = pos.round().as_ivec3();
    let mut hits = vec![last];

    for _ in 0..max_distance * RAYCAST_STEPS_PER_UNIT {
        let key = pos.round().as_ivec3();
        if key != last {
            hits.push(key);
            last = key;
        }
        pos += step;
    }
    hits
}
