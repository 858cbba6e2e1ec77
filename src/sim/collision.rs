//! Swept collision geometry for a circular ball against axis-aligned bricks
//!
//! The ball is tested as a point against each brick expanded by the ball
//! radius (Minkowski sum), using the slab method to find the first time of
//! contact along this step's displacement. A Liang-Barsky line clip backs it
//! up when float error makes the slab test miss a path that plainly crosses
//! the brick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Tuning;
use crate::consts::{FALLBACK_CONTACT_T, SWEEP_EPSILON};

/// Axis-aligned rectangle, `y` grows downward
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expand(&self, margin: f32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.w + 2.0 * margin,
            self.h + 2.0 * margin,
        )
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether a circle overlaps this rectangle
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = Vec2::new(
            center.x.clamp(self.x, self.right()),
            center.y.clamp(self.y, self.bottom()),
        );
        center.distance_squared(closest) < radius * radius
    }
}

/// Playable region: bricks and balls live between `left` and `right`,
/// from the top of the canvas (y = 0) down to `height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub left: f32,
    pub right: f32,
    pub height: f32,
}

impl ArenaBounds {
    /// Center the brick column grid on a canvas of the given size
    pub fn from_canvas(width: f32, height: f32, tuning: &Tuning) -> Self {
        let columns = tuning.columns as f32;
        let total = columns * (tuning.brick_width + tuning.column_spacing);
        let left = (width - total) / 2.0;
        let right = left + columns * tuning.brick_width + (columns - 1.0) * tuning.column_spacing;
        Self {
            left,
            right,
            height,
        }
    }

    /// Left edge of brick column `index`
    pub fn column_x(&self, index: usize, tuning: &Tuning) -> f32 {
        self.left + index as f32 * (tuning.brick_width + tuning.column_spacing)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

/// First contact along a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the displacement at which contact happens, in [0, 1]
    pub t: f32,
    /// Surface normal at contact, pointing back toward the ball
    pub normal: Vec2,
}

/// Entry/exit times along one axis. `None` means the path never overlaps
/// this slab, so no contact is possible at all.
fn slab(origin: f32, delta: f32, min: f32, max: f32) -> Option<(f32, f32)> {
    if delta.abs() < SWEEP_EPSILON {
        // Stationary on this axis: either always inside the slab or never
        if origin < min || origin > max {
            None
        } else {
            Some((f32::NEG_INFINITY, f32::INFINITY))
        }
    } else {
        let t1 = (min - origin) / delta;
        let t2 = (max - origin) / delta;
        Some((t1.min(t2), t1.max(t2)))
    }
}

/// Sweep a circle of `radius` from `origin` by `disp` against `rect`
///
/// Returns the contact time as a fraction of `disp` and the normal of the
/// face that was struck. Paths that start inside the expanded rectangle,
/// or reach it only after the full displacement, report no contact.
pub fn sweep_circle_vs_rect(origin: Vec2, disp: Vec2, radius: f32, rect: &Rect) -> Option<SweepHit> {
    let grown = rect.expand(radius);
    let (entry_x, exit_x) = slab(origin.x, disp.x, grown.x, grown.right())?;
    let (entry_y, exit_y) = slab(origin.y, disp.y, grown.y, grown.bottom())?;

    let entry = entry_x.max(entry_y);
    let exit = exit_x.min(exit_y);

    if entry < 0.0 || entry > exit || entry > 1.0 {
        return None;
    }

    // The axis that entered last is the one that blocked the ball
    let normal = if entry_x >= entry_y {
        Vec2::new(-disp.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, -disp.y.signum())
    };

    Some(SweepHit { t: entry, normal })
}

/// Liang-Barsky clip: does the segment `a -> b` touch `rect`?
pub fn line_intersects_rect(a: Vec2, b: Vec2, rect: &Rect) -> bool {
    let d = b - a;
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;

    let edges = [
        (-d.x, a.x - rect.x),
        (d.x, rect.right() - a.x),
        (-d.y, a.y - rect.y),
        (d.y, rect.bottom() - a.y),
    ];

    for (p, q) in edges {
        if p.abs() < SWEEP_EPSILON {
            // Parallel to this edge: reject if outside it
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return false;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return false;
            }
            t1 = t1.min(r);
        }
    }

    true
}

/// Estimate a face normal from where the path ends relative to the brick
/// center. The dominant axis of the offset wins.
pub fn fallback_normal(rect: &Rect, end: Vec2) -> Vec2 {
    let offset = end - rect.center();
    if offset.x.abs() < SWEEP_EPSILON && offset.y.abs() < SWEEP_EPSILON {
        // Dead center: push the ball back up
        return Vec2::new(0.0, -1.0);
    }
    if offset.x.abs() > offset.y.abs() {
        Vec2::new(offset.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, offset.y.signum())
    }
}

/// Sweep test with the line-clip fallback
pub fn sweep_with_fallback(origin: Vec2, disp: Vec2, radius: f32, rect: &Rect) -> Option<SweepHit> {
    if let Some(hit) = sweep_circle_vs_rect(origin, disp, radius, rect) {
        return Some(hit);
    }
    if disp.length_squared() < SWEEP_EPSILON {
        return None;
    }
    if line_intersects_rect(origin, origin + disp, rect) {
        return Some(SweepHit {
            t: FALLBACK_CONTACT_T,
            normal: fallback_normal(rect, origin + disp),
        });
    }
    None
}

/// Earliest contact with the left, right or top wall along `disp`
///
/// The floor is not a wall: crossing it turns the ball around instead
/// (see `floor_crossing`).
pub fn wall_contact(origin: Vec2, disp: Vec2, radius: f32, bounds: &ArenaBounds) -> Option<SweepHit> {
    let mut best: Option<SweepHit> = None;
    let mut consider = |t: f32, normal: Vec2| {
        if t > 1.0 {
            return;
        }
        let t = t.max(0.0);
        if best.is_none_or(|b| t < b.t) {
            best = Some(SweepHit { t, normal });
        }
    };

    if disp.x < -SWEEP_EPSILON {
        consider((bounds.left + radius - origin.x) / disp.x, Vec2::X);
    } else if disp.x > SWEEP_EPSILON {
        consider((bounds.right - radius - origin.x) / disp.x, Vec2::NEG_X);
    }
    if disp.y < -SWEEP_EPSILON {
        consider((radius - origin.y) / disp.y, Vec2::Y);
    }

    best
}

/// Fraction of `disp` at which the ball's lower edge reaches the floor
pub fn floor_crossing(origin: Vec2, disp: Vec2, radius: f32, floor: f32) -> Option<f32> {
    if disp.y <= SWEEP_EPSILON || origin.y + disp.y + radius <= floor {
        return None;
    }
    Some(((floor - radius - origin.y) / disp.y).clamp(0.0, 1.0))
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tall_brick() -> Rect {
        // Left edge at x = 115, 20 wide, spanning y 50..150
        Rect::new(115.0, 50.0, 20.0, 100.0)
    }

    #[test]
    fn test_sweep_contact_at_step_boundary() {
        let hit = sweep_circle_vs_rect(Vec2::new(100.0, 100.0), Vec2::new(10.0, 0.0), 5.0, &tall_brick())
            .expect("contact at t = 1");
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_sweep_misses_beyond_step() {
        let hit = sweep_circle_vs_rect(Vec2::new(90.0, 100.0), Vec2::new(10.0, 0.0), 5.0, &tall_brick());
        assert!(hit.is_none());
    }

    #[test]
    fn test_sweep_vertical_normal() {
        let brick = Rect::new(0.0, 100.0, 70.0, 30.0);
        let hit = sweep_circle_vs_rect(Vec2::new(35.0, 50.0), Vec2::new(0.0, 100.0), 8.0, &brick).unwrap();
        assert!((hit.t - 0.42).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_stationary_axis_outside_slab_never_hits() {
        // Moving right, but well above the brick
        let hit = sweep_circle_vs_rect(Vec2::new(100.0, 0.0), Vec2::new(50.0, 0.0), 5.0, &tall_brick());
        assert!(hit.is_none());
    }

    #[test]
    fn test_start_inside_is_not_a_contact() {
        let hit = sweep_circle_vs_rect(Vec2::new(125.0, 100.0), Vec2::new(10.0, 0.0), 5.0, &tall_brick());
        assert!(hit.is_none());
    }

    #[test]
    fn test_no_tunneling_through_thin_brick() {
        // Brick 2px tall, ball covers 200px in one step
        let thin = Rect::new(0.0, 100.0, 70.0, 2.0);
        let start = Vec2::new(35.0, 0.0);
        let disp = Vec2::new(0.0, 200.0);
        let end = start + disp;
        assert!(!thin.overlaps_circle(start, 4.0));
        assert!(!thin.overlaps_circle(end, 4.0));
        let hit = sweep_circle_vs_rect(start, disp, 4.0, &thin).unwrap();
        assert!(hit.t > 0.0 && hit.t < 1.0);
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_line_intersects_rect() {
        let rect = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert!(line_intersects_rect(Vec2::new(0.0, 15.0), Vec2::new(30.0, 15.0), &rect));
        assert!(line_intersects_rect(Vec2::new(15.0, 15.0), Vec2::new(16.0, 16.0), &rect));
        assert!(!line_intersects_rect(Vec2::new(0.0, 0.0), Vec2::new(30.0, 0.0), &rect));
        assert!(!line_intersects_rect(Vec2::new(0.0, 15.0), Vec2::new(5.0, 15.0), &rect));
    }

    #[test]
    fn test_fallback_normal_uses_dominant_axis() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(fallback_normal(&rect, Vec2::new(20.0, 6.0)), Vec2::X);
        assert_eq!(fallback_normal(&rect, Vec2::new(4.0, -9.0)), Vec2::NEG_Y);
        assert_eq!(fallback_normal(&rect, rect.center()), Vec2::NEG_Y);
    }

    #[test]
    fn test_fallback_fires_when_path_starts_in_brick() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let hit = sweep_with_fallback(Vec2::new(5.0, 5.0), Vec2::new(20.0, 0.0), 2.0, &rect).unwrap();
        assert_eq!(hit.t, FALLBACK_CONTACT_T);
        assert_eq!(hit.normal, Vec2::X);
    }

    #[test]
    fn test_wall_contact_picks_earliest() {
        let bounds = ArenaBounds {
            left: 0.0,
            right: 100.0,
            height: 500.0,
        };
        // Heading up-right, reaches the right wall (t=0.5) before the top (t=0.8)
        let hit = wall_contact(Vec2::new(80.0, 50.0), Vec2::new(24.0, -52.5), 8.0, &bounds).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::NEG_X);
    }

    #[test]
    fn test_floor_crossing() {
        assert_eq!(floor_crossing(Vec2::new(0.0, 480.0), Vec2::new(0.0, 20.0), 8.0, 500.0), Some(0.6));
        assert_eq!(floor_crossing(Vec2::new(0.0, 400.0), Vec2::new(0.0, 20.0), 8.0, 500.0), None);
        assert_eq!(floor_crossing(Vec2::new(0.0, 495.0), Vec2::new(0.0, -20.0), 8.0, 500.0), None);
    }

    #[test]
    fn test_reflect_velocity() {
        // Ball moving right, hits vertical wall (normal pointing left)
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_arena_bounds_from_canvas() {
        let tuning = Tuning::default();
        let bounds = ArenaBounds::from_canvas(1000.0, 700.0, &tuning);
        assert_eq!(bounds.left, 188.0);
        assert_eq!(bounds.right, 188.0 + 8.0 * 70.0 + 7.0 * 8.0);
        assert_eq!(bounds.column_x(7, &tuning) + tuning.brick_width, bounds.right);
    }

    proptest! {
        #[test]
        fn prop_sweep_time_in_unit_range(
            ox in -200.0f32..200.0,
            oy in -200.0f32..200.0,
            dx in -300.0f32..300.0,
            dy in -300.0f32..300.0,
            radius in 1.0f32..20.0,
        ) {
            let rect = Rect::new(-20.0, -10.0, 40.0, 20.0);
            if let Some(hit) = sweep_circle_vs_rect(Vec2::new(ox, oy), Vec2::new(dx, dy), radius, &rect) {
                prop_assert!((0.0..=1.0).contains(&hit.t));
                prop_assert!((hit.normal.length() - 1.0).abs() < 1e-6);
                // The struck face opposes the motion
                prop_assert!(hit.normal.dot(Vec2::new(dx, dy)) < 0.0);
            }
        }

        #[test]
        fn prop_contact_point_touches_expanded_rect(
            ox in -200.0f32..-40.0,
            oy in -5.0f32..5.0,
            dx in 50.0f32..400.0,
        ) {
            let rect = Rect::new(-20.0, -10.0, 40.0, 20.0);
            let radius = 6.0;
            let hit = sweep_circle_vs_rect(Vec2::new(ox, oy), Vec2::new(dx, 0.0), radius, &rect);
            if let Some(hit) = hit {
                let contact_x = ox + dx * hit.t;
                prop_assert!((contact_x - (rect.x - radius)).abs() < 1e-2);
            } else {
                prop_assert!(ox + dx < rect.x - radius);
            }
        }
    }
}
