//! Small math helpers shared by the cameras, lights and shape generators.

use cgmath::{Matrix3, Matrix4, Vector3, Vector4};

/// Polar coordinates: radius, inclination and azimuth in degrees.
///
/// Theta runs from the +y pole (0°) to the -y pole (180°); phi is the angle
/// around the y axis in the xz plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    pub r: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Polar {
    pub fn new(r: f32, theta: f32, phi: f32) -> Self {
        Polar { r, theta, phi }
    }

    /// Bring phi into the range 0..360 and theta into 1..179 degrees so the
    /// view never flips over the poles.
    pub fn clamp(&mut self) {
        self.theta = self.theta.clamp(1.0, 179.0);
        if self.phi > 360.0 {
            self.phi -= (self.phi / 360.0).trunc() * 360.0;
        }
        if self.phi < 0.0 {
            self.phi += (1.0 - self.phi / 360.0).trunc() * 360.0;
        }
    }

    pub fn vec3(&self) -> Vector3<f32> {
        let (sin_p, cos_p) = self.phi.to_radians().sin_cos();
        let (sin_t, cos_t) = self.theta.to_radians().sin_cos();
        Vector3::new(self.r * sin_t * cos_p, self.r * cos_t, self.r * sin_t * sin_p)
    }

    pub fn vec4(&self, w: f32) -> Vector4<f32> {
        self.vec3().extend(w)
    }

    pub fn from_vec3(v: Vector3<f32>) -> Self {
        let r = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
        Polar {
            r,
            theta: (v.y / r).acos().to_degrees(),
            phi: v.z.atan2(v.x).to_degrees(),
        }
    }
}

/// Upper-left 3x3 of a transform, used for normal matrices.
pub fn upper_left3(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn polar_round_trip() {
        let p = Polar::new(2.0, 70.0, 45.0);
        let q = Polar::from_vec3(p.vec3());
        assert!((p.r - q.r).abs() < EPS);
        assert!((p.theta - q.theta).abs() < 1e-3);
        assert!((p.phi - q.phi).abs() < 1e-3);
    }

    #[test]
    fn polar_clamp_wraps_phi() {
        let mut p = Polar::new(1.0, 90.0, 725.0);
        p.clamp();
        assert!((p.phi - 5.0).abs() < 1e-3);

        let mut p = Polar::new(1.0, 90.0, -10.0);
        p.clamp();
        assert!((p.phi - 350.0).abs() < 1e-3);
    }

    #[test]
    fn polar_clamp_limits_theta() {
        let mut p = Polar::new(1.0, 200.0, 0.0);
        p.clamp();
        assert_eq!(p.theta, 179.0);
    }
}
