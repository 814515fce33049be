//! Utility maths functions
//!
//! Angles are handled in the degrees domain since both the position sensor
//! and the motion primitives speak degrees.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle in degrees into the range [0, 360).
pub fn wrap_360<T>(angle_deg: T) -> T
where
    T: Float
{
    rem_euclid(angle_deg, T::from(360.0).unwrap())
}

/// Wrap an angle in degrees into the range [-180, 180).
///
/// Used to express a heading error as the shortest signed rotation that will
/// null it.
pub fn limit_angle<T>(angle_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    rem_euclid(angle_deg + half_turn, T::from(360.0).unwrap()) - half_turn
}

/// Rotate a 2D vector by an angle in radians.
pub fn rotate_2d<T>(x: T, y: T, angle_rad: T) -> (T, T)
where
    T: Float
{
    let (sin, cos) = angle_rad.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Clamp a value into the inclusive range [min, max].
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_360() {
        assert_eq!(wrap_360(0f64), 0f64);
        assert_eq!(wrap_360(360f64), 0f64);
        assert_eq!(wrap_360(370f64), 10f64);
        assert_eq!(wrap_360(-10f64), 350f64);
        assert_eq!(wrap_360(725f64), 5f64);
    }

    #[test]
    fn test_limit_angle() {
        assert_eq!(limit_angle(370f64), 10f64);
        assert_eq!(limit_angle(-190f64), 170f64);
        assert_eq!(limit_angle(0f64), 0f64);
        assert_eq!(limit_angle(180f64), -180f64);
        assert_eq!(limit_angle(-180f64), -180f64);
        assert_eq!(limit_angle(90f64), 90f64);
    }

    #[test]
    fn test_rotate_2d() {
        let (x, y) = rotate_2d(1f64, 0f64, std::f64::consts::FRAC_PI_2);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }
}
