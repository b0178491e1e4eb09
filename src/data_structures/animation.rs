use std::f32::consts::TAU;

use cgmath::Vector3;

/// Rotation driven by the node's accumulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Animation {
    /// Constant angular velocity in radians per second around x, y and z.
    Spin { rates: Vector3<f32> },
    /// Rocks around x and y with `sin(2π · t / period)` radians.
    Wobble { period: f32 },
}

impl Animation {
    /// Applies one step to `rotation`. `time` already includes `dt`.
    pub fn apply(&self, rotation: &mut Vector3<f32>, time: f32, dt: f32) {
        match *self {
            Self::Spin { rates } => *rotation += rates * dt,
            Self::Wobble { period } => {
                if period > 0.0 {
                    let angle = (time * TAU / period).sin();
                    rotation.x = angle;
                    rotation.y = angle;
                }
            }
        }
    }
}
