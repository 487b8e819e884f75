//! # Differential Drive Inverse Kinematics
//!
//! Converts an operator sample `{speed, rotation}` into normalized
//! `{left, right}` wheel commands.
//!
//! ## Models
//!
//! | Model | Left | Right | Turning authority |
//! |-------|------|-------|-------------------|
//! | Curvature | `s + |s|·r` | `s - |s|·r` | Scales with forward speed |
//! | Arcade | `s + r` | `s - r` | Independent of speed |
//!
//! Curvature drive cannot pivot in place: with `s = 0` both wheels stay at 0.
//!
//! ## Shaping Order
//!
//! Each shaped axis has the deadzone applied first and the signed square
//! second, so the deadzone threshold is measured in raw stick travel.
//!
//! ## Desaturation
//!
//! Both models produce a forward term `f` and a turn term `t`, with
//! `left = f + t` and `right = f - t`.
//!
//! | Policy | Rule |
//! |--------|------|
//! | `max` | If `max(|left|,|right|) > 1`, divide both wheels by it |
//! | `sum` | With `g = max(|f|,|t|)`, `l = min(|f|,|t|)`, divide both wheels by `(g + l) / g`; `(0, 0)` when `g = 0` |
//!
//! The `sum` law rescales whenever both terms are non-zero, keeping each
//! wheel within the magnitude of the larger term.

use serde::Deserialize;

use super::shaping::{apply_deadband, deadzone, signed_square};

/// One sample of the operator's joystick axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveInput {
    /// Forward speed, positive forward. Nominally -1.0 to 1.0.
    pub speed: f32,
    /// Rotation, positive counter-clockwise. Nominally -1.0 to 1.0.
    pub rotation: f32,
}

impl DriveInput {
    pub fn new(speed: f32, rotation: f32) -> Self {
        Self { speed, rotation }
    }
}

/// Normalized left/right wheel commands.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommand {
    pub left: f32,
    pub right: f32,
}

impl WheelCommand {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Larger of the two wheel magnitudes
    pub fn max_magnitude(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }

    /// Scales both wheels by the same factor
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// Which inverse-kinematics transform to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveModel {
    #[default]
    Curvature,
    Arcade,
}

/// Desaturation law applied after the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Desaturation {
    /// Divide by the larger magnitude only when it exceeds 1
    #[default]
    Max,
    /// Always divide by `(g + l) / g`
    Sum,
}

/// Kinematics parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub model: DriveModel,
    /// Deadzone threshold in raw stick units
    pub deadzone: f32,
    /// Use the continuous deadband instead of the hard deadzone
    pub rescale_deadzone: bool,
    /// Square the rotation axis in curvature mode
    pub square_rotation: bool,
    pub desaturation: Desaturation,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            model: DriveModel::Curvature,
            deadzone: 0.05,
            rescale_deadzone: false,
            square_rotation: false,
            desaturation: Desaturation::Max,
        }
    }
}

impl Kinematics {
    /// Runs the configured transform and desaturation
    ///
    /// # Examples
    ///
    /// ```
    /// use vesc_drive::drive::kinematics::{DriveInput, Kinematics};
    ///
    /// let ik = Kinematics::default();
    /// let wheels = ik.compute(DriveInput::new(0.5, 0.0));
    /// assert_eq!(wheels.left, 0.25);
    /// assert_eq!(wheels.right, 0.25);
    /// ```
    #[must_use]
    pub fn compute(&self, input: DriveInput) -> WheelCommand {
        let terms = match self.model {
            DriveModel::Curvature => self.curvature(input),
            DriveModel::Arcade => self.arcade(input),
        };
        desaturate(terms, self.desaturation)
    }

    /// Deadzone followed by signed square
    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let x = if self.rescale_deadzone {
            apply_deadband(x, self.deadzone, 1.0)
        } else {
            deadzone(x, self.deadzone)
        };
        signed_square(x)
    }

    fn curvature(&self, input: DriveInput) -> DriveTerms {
        let speed = self.shape(input.speed);
        let rotation = if self.square_rotation {
            signed_square(input.rotation)
        } else {
            input.rotation
        };

        DriveTerms {
            forward: speed,
            turn: speed.abs() * rotation,
        }
    }

    fn arcade(&self, input: DriveInput) -> DriveTerms {
        DriveTerms {
            forward: self.shape(input.speed),
            turn: self.shape(input.rotation),
        }
    }
}

/// Forward and turn contributions before they are mixed into wheels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveTerms {
    pub forward: f32,
    pub turn: f32,
}

impl DriveTerms {
    pub fn new(forward: f32, turn: f32) -> Self {
        Self { forward, turn }
    }

    /// Unsaturated wheel mix: `(f + t, f - t)`
    pub fn mix(&self) -> WheelCommand {
        WheelCommand::new(self.forward + self.turn, self.forward - self.turn)
    }
}

/// Mixes the terms into wheels, rescaled so neither exceeds magnitude 1
#[must_use]
pub fn desaturate(terms: DriveTerms, policy: Desaturation) -> WheelCommand {
    let wheels = terms.mix();

    match policy {
        Desaturation::Max => {
            let max_magnitude = wheels.max_magnitude();
            if max_magnitude > 1.0 {
                wheels.scaled(1.0 / max_magnitude)
            } else {
                wheels
            }
        }
        Desaturation::Sum => {
            let greater = terms.forward.abs().max(terms.turn.abs());
            if greater == 0.0 {
                return WheelCommand::default();
            }
            let lesser = terms.forward.abs().min(terms.turn.abs());
            let saturated = (greater + lesser) / greater;
            wheels.scaled(1.0 / saturated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn grid() -> Vec<DriveInput> {
        let steps: Vec<f32> = (0..=20).map(|i| -1.0 + i as f32 * 0.1).collect();
        steps
            .iter()
            .flat_map(|&s| steps.iter().map(move |&r| DriveInput::new(s, r)))
            .collect()
    }

    fn all_configs() -> Vec<Kinematics> {
        let mut configs = Vec::new();
        for model in [DriveModel::Curvature, DriveModel::Arcade] {
            for desaturation in [Desaturation::Max, Desaturation::Sum] {
                for square_rotation in [false, true] {
                    configs.push(Kinematics {
                        model,
                        desaturation,
                        square_rotation,
                        ..Kinematics::default()
                    });
                }
            }
        }
        configs
    }

    #[test]
    fn test_outputs_bounded_for_unit_square_inputs() {
        for ik in all_configs() {
            for input in grid() {
                let wheels = ik.compute(input);
                assert!(
                    wheels.max_magnitude() <= 1.0 + EPS,
                    "{:?} with {:?} produced {:?}",
                    input,
                    ik,
                    wheels
                );
            }
        }
    }

    #[test]
    fn test_curvature_no_pivot_at_zero_speed() {
        let ik = Kinematics::default();
        for rotation in [-1.0, -0.5, 0.0, 0.3, 1.0] {
            let wheels = ik.compute(DriveInput::new(0.0, rotation));
            assert_eq!(wheels, WheelCommand::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_curvature_deadzone_suppresses_small_speed() {
        let ik = Kinematics::default();
        let wheels = ik.compute(DriveInput::new(0.04, 1.0));
        assert_eq!(wheels, WheelCommand::new(0.0, 0.0));
    }

    #[test]
    fn test_curvature_turn_scales_with_speed() {
        let ik = Kinematics::default();

        // s = 0.25 after squaring, r = 0.5 unsquared
        let wheels = ik.compute(DriveInput::new(0.5, 0.5));
        assert!((wheels.left - 0.375).abs() < EPS);
        assert!((wheels.right - 0.125).abs() < EPS);
    }

    #[test]
    fn test_curvature_square_rotation_flag() {
        let ik = Kinematics {
            square_rotation: true,
            ..Kinematics::default()
        };

        // s = 0.25, r = 0.25
        let wheels = ik.compute(DriveInput::new(0.5, 0.5));
        assert!((wheels.left - 0.3125).abs() < EPS);
        assert!((wheels.right - 0.1875).abs() < EPS);
    }

    #[test]
    fn test_curvature_full_turn_desaturates_max() {
        let ik = Kinematics::default();
        let wheels = ik.compute(DriveInput::new(1.0, 1.0));

        // Raw (2, 0) scaled by 1/2
        assert!((wheels.left - 1.0).abs() < EPS);
        assert!(wheels.right.abs() < EPS);
    }

    #[test]
    fn test_arcade_full_input_desaturates() {
        let ik = Kinematics {
            model: DriveModel::Arcade,
            ..Kinematics::default()
        };

        let wheels = ik.compute(DriveInput::new(1.0, 1.0));
        assert!(wheels.right.abs() <= wheels.left.abs());
        assert!(wheels.left.abs() <= 1.0 && wheels.right.abs() <= 1.0);
        assert!((wheels.left - 1.0).abs() < EPS);
    }

    #[test]
    fn test_arcade_pivots_in_place() {
        let ik = Kinematics {
            model: DriveModel::Arcade,
            ..Kinematics::default()
        };

        let wheels = ik.compute(DriveInput::new(0.0, 0.5));
        assert!((wheels.left - 0.25).abs() < EPS);
        assert!((wheels.right + 0.25).abs() < EPS);
    }

    #[test]
    fn test_arcade_deadzone_on_rotation() {
        let ik = Kinematics {
            model: DriveModel::Arcade,
            ..Kinematics::default()
        };

        let wheels = ik.compute(DriveInput::new(0.0, 0.03));
        assert_eq!(wheels, WheelCommand::new(0.0, 0.0));
    }

    #[test]
    fn test_rescaled_deadzone_is_continuous() {
        let ik = Kinematics {
            rescale_deadzone: true,
            ..Kinematics::default()
        };

        let wheels = ik.compute(DriveInput::new(0.06, 0.0));
        assert!(wheels.left > 0.0 && wheels.left < 0.001);

        let wheels = ik.compute(DriveInput::new(1.0, 0.0));
        assert!((wheels.left - 1.0).abs() < EPS);
    }

    #[test]
    fn test_max_desaturation_leaves_unsaturated_pairs() {
        let wheels = desaturate(DriveTerms::new(0.25, 0.125), Desaturation::Max);
        assert_eq!(wheels, WheelCommand::new(0.375, 0.125));
    }

    #[test]
    fn test_max_desaturation_preserves_ratio() {
        let wheels = desaturate(DriveTerms::new(1.0, 0.5), Desaturation::Max);
        assert!((wheels.left - 1.0).abs() < EPS);
        assert!((wheels.right - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_sum_desaturation_zero_input() {
        let wheels = desaturate(DriveTerms::new(0.0, 0.0), Desaturation::Sum);
        assert_eq!(wheels, WheelCommand::new(0.0, 0.0));

        let wheels = desaturate(DriveTerms::new(-0.0, 0.0), Desaturation::Sum);
        assert_eq!(wheels, WheelCommand::new(0.0, 0.0));
    }

    #[test]
    fn test_sum_desaturation_law() {
        // g = 1.0, l = 0.5 -> divide by 1.5
        let wheels = desaturate(DriveTerms::new(1.0, -0.5), Desaturation::Sum);
        assert!((wheels.left - 0.5 / 1.5).abs() < EPS);
        assert!((wheels.right - 1.0).abs() < EPS);

        // No turn: nothing to trade, unchanged
        let wheels = desaturate(DriveTerms::new(0.8, 0.0), Desaturation::Sum);
        assert!((wheels.left - 0.8).abs() < EPS);
        assert!((wheels.right - 0.8).abs() < EPS);
    }

    #[test]
    fn test_sum_desaturation_equal_magnitude_terms() {
        let wheels = desaturate(DriveTerms::new(0.5, -0.5), Desaturation::Sum);
        assert!(wheels.left.abs() < EPS);
        assert!((wheels.right - 0.5).abs() < EPS);
    }

    #[test]
    fn test_drive_model_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            model: DriveModel,
            desaturation: Desaturation,
        }

        let parsed: Wrapper = toml::from_str("model = \"arcade\"\ndesaturation = \"sum\"").unwrap();
        assert_eq!(parsed.model, DriveModel::Arcade);
        assert_eq!(parsed.desaturation, Desaturation::Sum);
    }
}
