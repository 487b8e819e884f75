//! # Input Shaping Primitives
//!
//! Small pure functions used to condition operator input before kinematics.
//!
//! ## Deadzone
//!
//! [`deadzone`] forces inputs with a magnitude below the threshold to exactly
//! zero and passes everything else through untouched. The output jumps from 0
//! to the threshold value at the boundary; there is no smoothing.
//!
//! [`apply_deadband`] is the continuous alternative: the deadband edge maps to
//! zero and the remaining range is stretched back out to the full magnitude.
//!
//! ## Sensitivity
//!
//! [`signed_square`] returns `|x| * x`, which keeps the sign and the endpoints
//! while flattening the response near zero.

/// Returns 0 when `|x| < threshold`, otherwise `x` unchanged
///
/// # Examples
///
/// ```
/// use vesc_drive::drive::shaping::deadzone;
///
/// assert_eq!(deadzone(0.04, 0.05), 0.0);
/// assert_eq!(deadzone(0.05, 0.05), 0.05);
/// assert_eq!(deadzone(-0.5, 0.05), -0.5);
/// ```
#[inline]
pub fn deadzone(x: f32, threshold: f32) -> f32 {
    if x.abs() < threshold {
        0.0
    } else {
        x
    }
}

/// Squares the value while keeping its sign
///
/// # Examples
///
/// ```
/// use vesc_drive::drive::shaping::signed_square;
///
/// assert_eq!(signed_square(0.5), 0.25);
/// assert_eq!(signed_square(-0.5), -0.25);
/// assert_eq!(signed_square(1.0), 1.0);
/// ```
#[inline]
pub fn signed_square(x: f32) -> f32 {
    x.abs() * x
}

/// Linearly rescales `x` from `[in_min, in_max]` to `[out_min, out_max]`
///
/// Real-valued; callers converting to an integral unit truncate the result
/// themselves.
///
/// # Examples
///
/// ```
/// use vesc_drive::drive::shaping::map_range;
///
/// assert_eq!(map_range(0.0, -1.0, 1.0, -20000.0, 20000.0), 0.0);
/// assert_eq!(map_range(1.0, -1.0, 1.0, -20000.0, 20000.0), 20000.0);
/// assert_eq!(map_range(0.5, 0.0, 1.0, 0.0, 100.0), 50.0);
/// ```
#[inline]
pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Clamps `x` to `[lo, hi]`
///
/// NaN maps to `lo`, so a corrupt reading never reaches a controller.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x.is_nan() {
        return lo;
    }
    x.max(lo).min(hi)
}

/// Continuous deadband: 0 inside `deadband`, the rest rescaled to reach
/// `max_magnitude`
///
/// When `max_magnitude / deadband` exceeds 1e12 the rescale degenerates into
/// rounding noise, so the limiting form `value ∓ deadband` is used instead.
///
/// # Examples
///
/// ```
/// use vesc_drive::drive::shaping::apply_deadband;
///
/// assert_eq!(apply_deadband(0.1, 0.2, 1.0), 0.0);
/// assert!((apply_deadband(0.6, 0.2, 1.0) - 0.5).abs() < 1e-6);
/// assert!((apply_deadband(1.0, 0.2, 1.0) - 1.0).abs() < 1e-6);
/// ```
pub fn apply_deadband(value: f32, deadband: f32, max_magnitude: f32) -> f32 {
    if value.abs() <= deadband {
        return 0.0;
    }

    if (max_magnitude as f64) / (deadband as f64) > 1.0e12 {
        return if value > 0.0 { value - deadband } else { value + deadband };
    }

    if value > 0.0 {
        max_magnitude * (value - deadband) / (max_magnitude - deadband)
    } else {
        max_magnitude * (value + deadband) / (max_magnitude - deadband)
    }
}
