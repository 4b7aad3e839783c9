//! Shared numeric primitives for the shadow transforms.

use core::f64::consts::PI;

/// Axis period in degrees. Astigmatism axes are undirected.
pub const AXIS_PERIOD_DEG: f64 = 180.0;

/// Full turn in degrees, the period of directional angles (coma).
pub const FULL_TURN_DEG: f64 = 360.0;

/// Clamp `value` into `[min, max]`.
///
/// Non-finite input saturates instead of propagating: `NaN` maps to `min`,
/// infinities map to the bound on their side.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Fold an undirected axis into `[0, 180)` so that `0° ≡ 180°`.
pub fn normalize_axis(axis_deg: f64) -> f64 {
    if !axis_deg.is_finite() {
        return 0.0;
    }
    let folded = ((axis_deg % AXIS_PERIOD_DEG) + AXIS_PERIOD_DEG) % AXIS_PERIOD_DEG;
    // `-0.0 % 180` and tiny negatives can land exactly on the period.
    if folded >= AXIS_PERIOD_DEG {
        0.0
    } else {
        folded
    }
}

/// Fold a directional angle into `[0, 360)`.
pub fn normalize_direction(angle_deg: f64) -> f64 {
    if !angle_deg.is_finite() {
        return 0.0;
    }
    let folded = ((angle_deg % FULL_TURN_DEG) + FULL_TURN_DEG) % FULL_TURN_DEG;
    if folded >= FULL_TURN_DEG {
        0.0
    } else {
        folded
    }
}

/// Degrees to radians.
pub fn to_radians(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Project `distance` along `angle_deg` into a Cartesian `(x, y)` offset.
pub fn polar_to_cartesian(angle_deg: f64, distance: f64) -> (f64, f64) {
    let rad = to_radians(angle_deg);
    (rad.cos() * distance, rad.sin() * distance)
}

/// Round to a fixed number of decimals, normalizing `-0` to `0`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// One `text-shadow` layer: pixel offset, blur radius and black-ink opacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowVector {
    /// Horizontal offset in px.
    pub x: f64,
    /// Vertical offset in px.
    pub y: f64,
    /// Blur radius in px.
    pub blur: f64,
    /// Opacity of the black shadow ink.
    pub opacity: f64,
}

impl ShadowVector {
    /// Build a vector rounded the way it is written to CSS
    /// (offsets/blur to 2 decimals, opacity to 3).
    pub fn rounded(x: f64, y: f64, blur: f64, opacity: f64) -> Self {
        Self {
            x: round_to(x, 2),
            y: round_to(y, 2),
            blur: round_to(blur, 2),
            opacity: round_to(opacity, 3),
        }
    }

    /// Offset magnitude in px.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_is_undirected_with_period_180() {
        for axis in [-725.5, -180.0, -1.0, 0.0, 12.25, 90.0, 179.9, 181.0, 1e6] {
            let a = normalize_axis(axis);
            let b = normalize_axis(axis + 180.0);
            assert!((a - b).abs() < 1e-9, "axis {} folded to {} vs {}", axis, a, b);
            assert!((0.0..180.0).contains(&a));
        }
        assert_eq!(normalize_axis(180.0), 0.0);
        assert_eq!(normalize_axis(-90.0), 90.0);
    }

    #[test]
    fn non_finite_input_saturates() {
        assert_eq!(normalize_axis(f64::NAN), 0.0);
        assert_eq!(normalize_direction(f64::INFINITY), 0.0);
        assert_eq!(clamp(f64::NAN, 16.0, 30.0), 16.0);
        assert_eq!(clamp(f64::INFINITY, 16.0, 30.0), 30.0);
        assert_eq!(clamp(f64::NEG_INFINITY, 0.0, 5.0), 0.0);
    }

    #[test]
    fn direction_keeps_full_turn() {
        assert_eq!(normalize_direction(270.0), 270.0);
        assert_eq!(normalize_direction(-90.0), 270.0);
        assert_eq!(normalize_direction(360.0), 0.0);
    }

    #[test]
    fn round_to_drops_negative_zero() {
        let v = round_to(-0.0001, 2);
        assert_eq!(v, 0.0);
        assert!(v.is_sign_positive());
        assert_eq!(round_to(2.399_999, 2), 2.4);
    }

    #[test]
    fn polar_projection_points_left_at_half_turn() {
        let (x, y) = polar_to_cartesian(180.0, 2.4);
        assert!((x + 2.4).abs() < 1e-12);
        assert!(y.abs() < 1e-12);
    }
}
