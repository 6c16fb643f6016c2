//! Engine-style integer angle math.
//!
//! Angles are whole degrees measured clockwise from "up" (negative y), the
//! convention the host engine uses for aiming and object placement. Aim
//! coordinates are always relative to the shooter.

/// Angle of the vector from `(x1, y1)` to `(x2, y2)` in degrees, `0..360`.
///
/// `0` points up, `90` right, `180` down and `270` left. The fractional part
/// of the underlying arc tangent is truncated.
#[must_use]
pub fn angle(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    angle_prec(x1, y1, x2, y2, 1)
}

/// Like [`angle`], scaled by `precision` (e.g. `100` for centi-degrees).
#[must_use]
pub fn angle_prec(x1: i32, y1: i32, x2: i32, y2: i32, precision: i32) -> i32 {
    let dx = x2 - x1;
    let dy = y2 - y1;

    if dx == 0 {
        return if dy > 0 { 180 * precision } else { 0 };
    }
    if dy == 0 {
        return if dx > 0 { 90 * precision } else { 270 * precision };
    }

    let slope = (f64::from(dy.abs())).atan2(f64::from(dx.abs()));
    let offset = (180.0 * f64::from(precision) * slope / std::f64::consts::PI) as i32;

    match (x2 > x1, y2 < y1) {
        (true, true) => 90 * precision - offset,
        (true, false) => 90 * precision + offset,
        (false, true) => 270 * precision + offset,
        (false, false) => 270 * precision - offset,
    }
}

/// Wraps `angle` into the half-open range `[start, start + 360)`.
#[must_use]
pub fn normalize(angle: i32, start: i32) -> i32 {
    normalize_prec(angle, start, 1)
}

/// Like [`normalize`] for angles scaled by `precision`.
#[must_use]
pub fn normalize_prec(angle: i32, start: i32, precision: i32) -> i32 {
    let full = 360 * precision;
    start + (angle - start).rem_euclid(full)
}

/// `radius * sin(angle)` rounded to the nearest integer.
#[must_use]
pub fn sin(angle: i32, radius: i32) -> i32 {
    sin_prec(angle, radius, 1)
}

/// `radius * cos(angle)` rounded to the nearest integer.
#[must_use]
pub fn cos(angle: i32, radius: i32) -> i32 {
    cos_prec(angle, radius, 1)
}

/// `radius * sin(angle / precision)` rounded to the nearest integer.
#[must_use]
pub fn sin_prec(angle: i32, radius: i32, precision: i32) -> i32 {
    (f64::from(radius) * to_radians(angle, precision).sin()).round() as i32
}

/// `radius * cos(angle / precision)` rounded to the nearest integer.
#[must_use]
pub fn cos_prec(angle: i32, radius: i32, precision: i32) -> i32 {
    (f64::from(radius) * to_radians(angle, precision).cos()).round() as i32
}

/// Aiming angle for relative target `(x, y)` seen from a pivot `offset_y`
/// pixels above (negative) or below the shooter's center, in `[-180, 180)`.
#[must_use]
pub fn aim_angle(offset_y: i32, x: i32, y: i32) -> i32 {
    normalize(angle(0, offset_y, x, y), -180)
}

/// Relative aim coordinates `(x, y)` pointing at `angle` from the origin.
#[must_use]
pub fn aim_vector(angle: i32, length: i32) -> (i32, i32) {
    (sin(angle, length), -cos(angle, length))
}

/// Euclidean distance between two points, truncated.
#[must_use]
pub fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    let dx = f64::from(x2 - x1);
    let dy = f64::from(y2 - y1);
    dx.hypot(dy) as i32
}

fn to_radians(angle: i32, precision: i32) -> f64 {
    f64::from(angle) / f64::from(precision.max(1)) * std::f64::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_angle_cardinal_directions() {
        assert_eq!(angle(0, 0, 0, -10), 0);
        assert_eq!(angle(0, 0, 10, 0), 90);
        assert_eq!(angle(0, 0, 0, 10), 180);
        assert_eq!(angle(0, 0, -10, 0), 270);
    }

    #[test]
    fn test_angle_diagonals() {
        assert_eq!(angle(0, 0, 1000, -1000), 45);
        assert_eq!(angle(0, 0, 1000, 1000), 135);
        assert_eq!(angle(0, 0, -1000, 1000), 225);
        assert_eq!(angle(0, 0, -1000, -1000), 315);
    }

    #[test]
    fn test_angle_with_pivot_offset() {
        // Pivot 5 pixels above the center shifts the diagonal slightly.
        assert_eq!(angle(0, -5, 1000, -1000), 46);
        assert_eq!(aim_angle(-5, 1000, -1000), 46);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(270, -180), -90);
        assert_eq!(normalize(180, -180), -180);
        assert_eq!(normalize(-190, -180), 170);
        assert_eq!(normalize(45, -180), 45);
        assert_eq!(normalize_prec(27_000, -18_000, 100), -9_000);
    }

    #[test]
    fn test_aim_vector() {
        assert_eq!(aim_vector(0, 1000), (0, -1000));
        assert_eq!(aim_vector(90, 1000), (1000, 0));
        assert_eq!(aim_vector(-90, 1000), (-1000, 0));
    }

    #[test]
    fn test_sin_cos_precision() {
        assert_eq!(sin_prec(4500, 100, 100), 71);
        assert_eq!(cos_prec(18_000, 100, 100), -100);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(0, 0, 3, 4), 5);
        assert_eq!(distance(10, 10, 10, 10), 0);
    }

    proptest! {
        #[test]
        fn test_normalize_stays_in_range(angle in -100_000i32..100_000, start in -720i32..720) {
            let wrapped = normalize(angle, start);
            prop_assert!(wrapped >= start && wrapped < start + 360);
            prop_assert_eq!((wrapped - angle).rem_euclid(360), 0);
        }

        #[test]
        fn test_angle_is_a_full_turn(x in -5000i32..5000, y in -5000i32..5000) {
            prop_assert!((0..360).contains(&angle(0, 0, x, y)));
        }
    }
}
