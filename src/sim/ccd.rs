//! Swept sphere-sphere time of impact
//!
//! Two spheres moving linearly over a window `[0, dt]` touch when
//! `|relPos + relVel * t| = r1 + r2`. Squaring gives a quadratic in `t`:
//!
//! ```text
//! a = relVel·relVel
//! b = 2 (relPos·relVel)
//! c = relPos·relPos - (r1 + r2)²
//! ```
//!
//! The smallest root inside the window is the time of impact. The maths runs
//! in f64 so the near-zero thresholds stay meaningful for f32 inputs.

use glam::{DVec3, Vec3};

use crate::is_finite_vec;

/// Below this `a` (or `b`) is treated as zero
const EPSILON: f64 = 1e-9;

/// A sphere moving at constant velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingSphere {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
}

impl MovingSphere {
    pub fn new(position: Vec3, velocity: Vec3, radius: f32) -> Self {
        Self {
            position,
            velocity,
            radius,
        }
    }

    /// Centre after `t` seconds
    #[inline]
    pub fn position_at(&self, t: f32) -> Vec3 {
        self.position + self.velocity * t
    }

    fn is_valid(&self) -> bool {
        is_finite_vec(self.position)
            && is_finite_vec(self.velocity)
            && self.radius.is_finite()
            && self.radius > 0.0
    }
}

/// Earliest time in `[0, dt]` at which `a` and `b` touch
///
/// Returns `Some(0.0)` if they already overlap, `None` if they never touch
/// inside the window. Invalid input (non-finite values, non-positive radius
/// or `dt`) is reported as no collision.
pub fn first_hit_time(a: &MovingSphere, b: &MovingSphere, dt: f32) -> Option<f32> {
    if !a.is_valid() || !b.is_valid() || !dt.is_finite() || dt <= 0.0 {
        log::debug!("Rejected swept test input: {:?} {:?} dt={}", a, b, dt);
        return None;
    }

    let rel_pos = a.position.as_dvec3() - b.position.as_dvec3();
    let rel_vel = a.velocity.as_dvec3() - b.velocity.as_dvec3();
    let combined = a.radius as f64 + b.radius as f64;
    let dt = dt as f64;

    if rel_pos.length() <= combined {
        return Some(0.0);
    }

    solve_quadratic(rel_pos, rel_vel, combined, dt).map(|t| t as f32)
}

/// Positional form of [`first_hit_time`]
#[allow(clippy::too_many_arguments)]
pub fn solve(p1: Vec3, v1: Vec3, r1: f32, p2: Vec3, v2: Vec3, r2: f32, dt: f32) -> Option<f32> {
    first_hit_time(
        &MovingSphere::new(p1, v1, r1),
        &MovingSphere::new(p2, v2, r2),
        dt,
    )
}

fn solve_quadratic(rel_pos: DVec3, rel_vel: DVec3, combined: f64, dt: f64) -> Option<f64> {
    let a = rel_vel.dot(rel_vel);
    let b = 2.0 * rel_pos.dot(rel_vel);
    let c = rel_pos.dot(rel_pos) - combined * combined;

    let in_window = |t: f64| (0.0..=dt).contains(&t);

    if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return None;
        }
        // Degenerate linear case: b*t + c = 0
        let t = -c / b;
        return in_window(t).then_some(t);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);
    let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };

    if in_window(lo) {
        Some(lo)
    } else if in_window(hi) {
        Some(hi)
    } else {
        None
    }
}

/// True when the spheres touch within `[0, dt]`
pub fn will_collide(a: &MovingSphere, b: &MovingSphere, dt: f32) -> bool {
    first_hit_time(a, b, dt).is_some()
}

/// Centres of both spheres at the moment of impact
pub fn contact_positions(a: &MovingSphere, b: &MovingSphere, dt: f32) -> Option<(Vec3, Vec3)> {
    first_hit_time(a, b, dt).map(|t| (a.position_at(t), b.position_at(t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sphere(p: [f32; 3], v: [f32; 3], r: f32) -> MovingSphere {
        MovingSphere::new(Vec3::from(p), Vec3::from(v), r)
    }

    #[test]
    fn test_head_on() {
        let t = solve(
            Vec3::new(-5.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            1.0,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            1.0,
            10.0,
        )
        .unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_head_on_outside_window() {
        let a = sphere([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
        let b = sphere([5.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 1.0);
        assert_eq!(first_hit_time(&a, &b, 3.9), None);
        assert!(will_collide(&a, &b, 4.0));
    }

    #[test]
    fn test_already_overlapping_is_zero() {
        let a = sphere([0.0, 0.0, 0.0], [5.0, 0.0, 0.0], 1.0);
        let b = sphere([1.5, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(first_hit_time(&a, &b, 1.0), Some(0.0));
    }

    #[test]
    fn test_touching_counts_as_overlap() {
        let a = sphere([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        let b = sphere([2.0, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(first_hit_time(&a, &b, 1.0), Some(0.0));
    }

    #[test]
    fn test_glancing_miss() {
        // Closest approach is 3 units apart, combined radius 2
        let a = sphere([-10.0, 3.0, 0.0], [4.0, 0.0, 0.0], 1.0);
        let b = sphere([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(first_hit_time(&a, &b, 10.0), None);
    }

    #[test]
    fn test_moving_apart_never_hits() {
        let a = sphere([-3.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 1.0);
        let b = sphere([3.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
        assert_eq!(first_hit_time(&a, &b, 100.0), None);
    }

    #[test]
    fn test_one_sphere_static() {
        let a = sphere([0.0, 0.0, -10.0], [0.0, 0.0, 0.0], 0.5);
        let b = sphere([0.0, 0.0, 0.0], [0.0, 0.0, -2.0], 0.5);
        let t = first_hit_time(&a, &b, 10.0).unwrap();
        assert!((t - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_contact_positions() {
        let a = sphere([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
        let b = sphere([5.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 1.0);
        let (pa, pb) = contact_positions(&a, &b, 10.0).unwrap();
        assert!((pa.x - (-1.0)).abs() < 1e-4);
        assert!((pb.x - 1.0).abs() < 1e-4);
        assert!(((pb - pa).length() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_input_is_no_collision() {
        let good = sphere([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        let nan = sphere([f32::NAN, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        let inf_vel = sphere([5.0, 0.0, 0.0], [f32::INFINITY, 0.0, 0.0], 1.0);
        let zero_r = sphere([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 0.0);

        assert_eq!(first_hit_time(&good, &nan, 1.0), None);
        assert_eq!(first_hit_time(&good, &inf_vel, 1.0), None);
        assert_eq!(first_hit_time(&good, &zero_r, 1.0), None);
        assert_eq!(first_hit_time(&good, &good, 0.0), None);
        assert_eq!(first_hit_time(&good, &good, -1.0), None);
        assert_eq!(first_hit_time(&good, &good, f32::NAN), None);
    }

    #[test]
    fn test_tiny_relative_velocity_takes_linear_branch() {
        // a = 1e-10 is below the threshold, so t = -c / b with b = -6e-5, c = 5
        let a = sphere([-3.0, 0.0, 0.0], [1e-5, 0.0, 0.0], 1.0);
        let b = sphere([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        let expected = 5.0 / 6e-5;

        let t = first_hit_time(&a, &b, 1.0e6).unwrap();
        assert!(((t as f64) - expected).abs() / expected < 1e-4, "t = {}", t);

        assert_eq!(first_hit_time(&a, &b, 80_000.0), None);
    }

    fn coord() -> impl Strategy<Value = f32> {
        -50.0f32..50.0
    }

    fn vec3() -> impl Strategy<Value = Vec3> {
        (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_zero_relative_velocity_without_overlap_is_none(
            p1 in vec3(), p2 in vec3(), v in vec3(),
            r1 in 0.1f32..3.0, r2 in 0.1f32..3.0, dt in 0.01f32..100.0,
        ) {
            prop_assume!((p1 - p2).length() > r1 + r2 + 1e-3);
            prop_assert_eq!(solve(p1, v, r1, p2, v, r2, dt), None);
        }

        #[test]
        fn prop_overlap_is_exactly_zero(
            p1 in vec3(), offset in vec3(), v1 in vec3(), v2 in vec3(),
            r1 in 0.1f32..3.0, r2 in 0.1f32..3.0, dt in 0.01f32..100.0,
        ) {
            // Scale the offset into the overlap region
            let reach = (r1 + r2) * 0.99;
            let p2 = p1 + offset.clamp_length_max(reach);
            prop_assert_eq!(solve(p1, v1, r1, p2, v2, r2, dt), Some(0.0));
        }

        #[test]
        fn prop_result_is_inside_window_and_deterministic(
            p1 in vec3(), p2 in vec3(), v1 in vec3(), v2 in vec3(),
            r1 in 0.1f32..3.0, r2 in 0.1f32..3.0, dt in 0.01f32..10.0,
        ) {
            let first = solve(p1, v1, r1, p2, v2, r2, dt);
            let second = solve(p1, v1, r1, p2, v2, r2, dt);
            prop_assert_eq!(first, second);
            if let Some(t) = first {
                prop_assert!(t >= 0.0 && t <= dt);
            }
        }

        #[test]
        fn prop_hit_time_puts_spheres_in_contact(
            p1 in vec3(), p2 in vec3(), v1 in vec3(), v2 in vec3(),
            r1 in 0.1f32..3.0, r2 in 0.1f32..3.0, dt in 0.01f32..10.0,
        ) {
            let a = MovingSphere::new(p1, v1, r1);
            let b = MovingSphere::new(p2, v2, r2);
            if let Some((pa, pb)) = contact_positions(&a, &b, dt) {
                let gap = (pa - pb).length() - (r1 + r2);
                // Relative tolerance: coordinates reach a few hundred units
                prop_assert!(gap <= 1e-2, "gap {}", gap);
            }
        }
    }
}
