//! Planar geometry types shared by every engine.
//!
//! Distances are in millimetres, angles in degrees. Orientations are kept
//! normalized into `(-180, 180]` at every write so that two poses that
//! describe the same heading always compare equal.

use serde::{Deserialize, Serialize};

/// Normalize an angle in degrees into `(-180, 180]`.
#[inline]
pub fn normalize_angle_deg(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

// ─── Pose ───────────────────────────────────────────────────────────

/// Robot position plus orientation in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawPose")]
pub struct Pose {
    x: f64,
    y: f64,
    orientation: f64,
}

/// Deserialization shim so that poses read from TOML are normalized too.
#[derive(Deserialize)]
struct RawPose {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    orientation: f64,
}

impl From<RawPose> for Pose {
    fn from(raw: RawPose) -> Self {
        Pose::new(raw.x, raw.y, raw.orientation)
    }
}

impl Pose {
    pub fn new(x: f64, y: f64, orientation: f64) -> Self {
        Self {
            x,
            y,
            orientation: normalize_angle_deg(orientation),
        }
    }

    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Heading in degrees, always within `(-180, 180]`.
    #[inline]
    pub const fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.y = y;
    }

    pub fn set_orientation(&mut self, orientation: f64) {
        self.orientation = normalize_angle_deg(orientation);
    }

    /// Euclidean distance between the two positions [mm].
    #[inline]
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Smallest signed rotation taking this heading to `other`'s [deg].
    #[inline]
    pub fn heading_error_to(&self, other: &Pose) -> f64 {
        normalize_angle_deg(other.orientation - self.orientation)
    }

    /// Polar error from this pose to `target`.
    ///
    /// `distance` is the straight-line distance, `angle` the bearing of the
    /// target relative to the current heading.
    pub fn polar_error_to(&self, target: &Pose) -> PolarVector {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let bearing = dy.atan2(dx).to_degrees();
        PolarVector::new(dx.hypot(dy), bearing - self.orientation)
    }
}

// ─── PolarVector ────────────────────────────────────────────────────

/// Planar displacement or speed in polar form.
///
/// Used both for position errors (`distance` [mm], `angle` [deg]) and for
/// speeds (`distance` = linear [mm/s], `angle` = angular [deg/s]).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarVector {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub angle: f64,
}

impl PolarVector {
    /// Build a polar vector, normalizing the angle.
    pub fn new(distance: f64, angle: f64) -> Self {
        Self {
            distance,
            angle: normalize_angle_deg(angle),
        }
    }

    /// Polar speed; angular components are not wrapped.
    pub const fn speed(linear: f64, angular: f64) -> Self {
        Self {
            distance: linear,
            angle: angular,
        }
    }

    pub const fn zero() -> Self {
        Self {
            distance: 0.0,
            angle: 0.0,
        }
    }

    /// Same displacement driven backwards: negated distance, bearing rotated
    /// by half a turn.
    pub fn reverse(&mut self) {
        self.distance = -self.distance;
        self.angle = if self.angle < 0.0 {
            self.angle + 180.0
        } else {
            self.angle - 180.0
        };
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.distance.is_finite() && self.angle.is_finite()
    }
}

// ─── PathPose ───────────────────────────────────────────────────────

/// A pose annotated with the motion constraints used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPose {
    pub pose: Pose,
    /// The robot may drive backwards to reach this pose.
    #[serde(default)]
    pub allow_reverse: bool,
    /// Fraction of the configured maximum linear speed, in `[0, 1]`.
    #[serde(default = "full_ratio")]
    pub max_speed_ratio_linear: f64,
    /// Fraction of the configured maximum angular speed, in `[0, 1]`.
    #[serde(default = "full_ratio")]
    pub max_speed_ratio_angular: f64,
    /// Waypoint that is not the final pose of its path.
    #[serde(default)]
    pub intermediate: bool,
}

fn full_ratio() -> f64 {
    1.0
}

impl Default for PathPose {
    fn default() -> Self {
        Self::new(Pose::default())
    }
}

impl PathPose {
    /// Final pose, forward only, full speed.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            allow_reverse: false,
            max_speed_ratio_linear: 1.0,
            max_speed_ratio_angular: 1.0,
            intermediate: false,
        }
    }

    pub fn with_reverse(mut self, allow: bool) -> Self {
        self.allow_reverse = allow;
        self
    }

    pub fn with_speed_ratios(mut self, linear: f64, angular: f64) -> Self {
        self.max_speed_ratio_linear = clamp_ratio(linear);
        self.max_speed_ratio_angular = clamp_ratio(angular);
        self
    }

    pub fn with_intermediate(mut self, intermediate: bool) -> Self {
        self.intermediate = intermediate;
        self
    }

    /// Ratios clamped into `[0, 1]` (NaN counts as 0).
    pub fn clamped_ratios(&self) -> (f64, f64) {
        (
            clamp_ratio(self.max_speed_ratio_linear),
            clamp_ratio(self.max_speed_ratio_angular),
        )
    }
}

#[inline]
fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}
