use nalgebra::Vector3;
use std::f64::consts::PI;

const POLE_EPS: f64 = 1e-12;

/// Real spherical harmonics up to a fixed `lmax`, evaluated on unit vectors.
///
/// Components are flattened in `(l, m)` order with `m` running from `-l` to
/// `l`, so component `l*l + l + m` is `Y_lm` and there are `(lmax + 1)^2`
/// components in total. Normalization constants are precomputed once.
pub struct RealSphericalHarmonics {
    lmax: usize,
    // K_lm = sqrt((2l+1)/(4 pi) * (l-m)!/(l+m)!) for m >= 0.
    norm: Vec<f64>,
}

impl RealSphericalHarmonics {
    pub fn new(lmax: usize) -> Self {
        let mut norm = Vec::with_capacity((lmax + 1) * (lmax + 2) / 2);
        for l in 0..=lmax {
            for m in 0..=l {
                let ratio = factorial(l - m) / factorial(l + m);
                norm.push(((2 * l + 1) as f64 / (4.0 * PI) * ratio).sqrt());
            }
        }
        Self { lmax, norm }
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    pub fn n_components(&self) -> usize {
        (self.lmax + 1) * (self.lmax + 1)
    }

    fn k(&self, l: usize, m: usize) -> f64 {
        self.norm[l * (l + 1) / 2 + m]
    }

    /// Evaluates all components for a unit direction vector.
    pub fn evaluate(&self, direction: &Vector3<f64>) -> Vec<f64> {
        let frame = SphericalFrame::from_unit(direction);
        let legendre = associated_legendre(self.lmax, frame.cos_theta, frame.sin_theta);
        let (cos_m, sin_m) = azimuthal_terms(self.lmax, frame.cos_phi, frame.sin_phi);

        let mut values = vec![0.0; self.n_components()];
        for l in 0..=self.lmax {
            let base = l * l + l;
            values[base] = self.k(l, 0) * legendre.get(l, 0);
            for m in 1..=l {
                let knm = std::f64::consts::SQRT_2 * self.k(l, m) * legendre.get(l, m);
                values[base + m] = knm * cos_m[m];
                values[base - m] = knm * sin_m[m];
            }
        }
        values
    }

    /// Evaluates all components and their angular gradients for a unit
    /// direction vector.
    ///
    /// The gradient is the surface gradient on the unit sphere, expressed in
    /// Cartesian coordinates (tangent to the sphere). Callers differentiating
    /// `f(r) Y_lm(r_hat)` scale it by `1/r`. Azimuthal terms at the poles
    /// (`sin theta -> 0`) are suppressed rather than extrapolated.
    pub fn evaluate_with_gradients(
        &self,
        direction: &Vector3<f64>,
    ) -> (Vec<f64>, Vec<Vector3<f64>>) {
        let frame = SphericalFrame::from_unit(direction);
        let legendre = associated_legendre(self.lmax, frame.cos_theta, frame.sin_theta);
        let (cos_m, sin_m) = azimuthal_terms(self.lmax, frame.cos_phi, frame.sin_phi);

        let theta_hat = Vector3::new(
            frame.cos_theta * frame.cos_phi,
            frame.cos_theta * frame.sin_phi,
            -frame.sin_theta,
        );
        let phi_hat = Vector3::new(-frame.sin_phi, frame.cos_phi, 0.0);
        let sin_theta_safe = frame.sin_theta.max(POLE_EPS);

        let mut values = vec![0.0; self.n_components()];
        let mut gradients = vec![Vector3::zeros(); self.n_components()];
        for l in 0..=self.lmax {
            let base = l * l + l;
            for m in 0..=l {
                let p = legendre.get(l, m);
                // (sin theta) dP_lm/d theta = l cos(theta) P_lm - (l+m) P_(l-1)m
                // with P_(l-1)m identically zero once m exceeds l-1.
                let p_prev = if m < l { legendre.get(l - 1, m) } else { 0.0 };
                let dp_dtheta = (l as f64 * frame.cos_theta * p
                    - (l + m) as f64 * p_prev)
                    / sin_theta_safe;

                if m == 0 {
                    let k = self.k(l, 0);
                    values[base] = k * p;
                    gradients[base] = theta_hat * (k * dp_dtheta);
                } else {
                    let k = std::f64::consts::SQRT_2 * self.k(l, m);
                    let m_f = m as f64;

                    values[base + m] = k * p * cos_m[m];
                    values[base - m] = k * p * sin_m[m];

                    let azimuthal_scale = if frame.sin_theta < POLE_EPS {
                        0.0
                    } else {
                        k * p / sin_theta_safe
                    };
                    gradients[base + m] = theta_hat * (k * dp_dtheta * cos_m[m])
                        - phi_hat * (azimuthal_scale * m_f * sin_m[m]);
                    gradients[base - m] = theta_hat * (k * dp_dtheta * sin_m[m])
                        + phi_hat * (azimuthal_scale * m_f * cos_m[m]);
                }
            }
        }
        (values, gradients)
    }
}

struct SphericalFrame {
    cos_theta: f64,
    sin_theta: f64,
    cos_phi: f64,
    sin_phi: f64,
}

impl SphericalFrame {
    fn from_unit(direction: &Vector3<f64>) -> Self {
        let cos_theta = direction.z.clamp(-1.0, 1.0);
        let sin_theta = direction.x.hypot(direction.y);
        let (cos_phi, sin_phi) = if sin_theta < POLE_EPS {
            (1.0, 0.0)
        } else {
            (direction.x / sin_theta, direction.y / sin_theta)
        };
        Self {
            cos_theta,
            sin_theta,
            cos_phi,
            sin_phi,
        }
    }
}

/// Associated Legendre values P_lm (no Condon-Shortley phase) for all
/// 0 <= m <= l <= lmax.
struct LegendreTable {
    lmax: usize,
    values: Vec<f64>,
}

impl LegendreTable {
    fn get(&self, l: usize, m: usize) -> f64 {
        debug_assert!(m <= l && l <= self.lmax);
        self.values[l * (l + 1) / 2 + m]
    }
}

fn associated_legendre(lmax: usize, cos_theta: f64, sin_theta: f64) -> LegendreTable {
    let mut values = vec![0.0; (lmax + 1) * (lmax + 2) / 2];
    let idx = |l: usize, m: usize| l * (l + 1) / 2 + m;

    values[0] = 1.0;
    // Diagonal: P_mm = (2m-1)!! sin(theta)^m, then one step up in l.
    for m in 1..=lmax {
        values[idx(m, m)] = values[idx(m - 1, m - 1)] * (2 * m - 1) as f64 * sin_theta;
    }
    for m in 0..lmax {
        values[idx(m + 1, m)] = (2 * m + 1) as f64 * cos_theta * values[idx(m, m)];
    }
    for m in 0..=lmax {
        for l in (m + 2)..=lmax {
            values[idx(l, m)] = ((2 * l - 1) as f64 * cos_theta * values[idx(l - 1, m)]
                - (l + m - 1) as f64 * values[idx(l - 2, m)])
                / (l - m) as f64;
        }
    }

    LegendreTable { lmax, values }
}

fn azimuthal_terms(lmax: usize, cos_phi: f64, sin_phi: f64) -> (Vec<f64>, Vec<f64>) {
    let mut cos_m = vec![1.0; lmax + 1];
    let mut sin_m = vec![0.0; lmax + 1];
    for m in 1..=lmax {
        cos_m[m] = cos_m[m - 1] * cos_phi - sin_m[m - 1] * sin_phi;
        sin_m[m] = sin_m[m - 1] * cos_phi + cos_m[m - 1] * sin_phi;
    }
    (cos_m, sin_m)
}

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn unit(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z).normalize()
    }

    #[test]
    fn l0_is_constant_over_the_sphere() {
        let sh = RealSphericalHarmonics::new(0);
        for dir in [unit(1.0, 0.0, 0.0), unit(0.3, -0.4, 0.87), unit(0.0, 0.0, -1.0)] {
            let values = sh.evaluate(&dir);
            assert!((values[0] - 0.28209479177387814).abs() < TOLERANCE);
        }
    }

    #[test]
    fn l1_components_are_proportional_to_cartesian_components() {
        let sh = RealSphericalHarmonics::new(1);
        let dir = unit(0.2, -0.7, 0.4);
        let values = sh.evaluate(&dir);
        let c = 0.4886025119029199;
        assert!((values[1] - c * dir.y).abs() < TOLERANCE);
        assert!((values[2] - c * dir.z).abs() < TOLERANCE);
        assert!((values[3] - c * dir.x).abs() < TOLERANCE);
    }

    #[test]
    fn l2_m0_matches_closed_form() {
        let sh = RealSphericalHarmonics::new(2);
        let dir = unit(0.1, 0.5, -0.6);
        let values = sh.evaluate(&dir);
        let expected = 0.31539156525252005 * (3.0 * dir.z * dir.z - 1.0);
        assert!((values[6] - expected).abs() < TOLERANCE);
    }

    #[test]
    fn addition_theorem_holds_per_degree() {
        let sh = RealSphericalHarmonics::new(6);
        let dir = unit(-0.8, 0.33, 0.51);
        let values = sh.evaluate(&dir);
        for l in 0..=6usize {
            let sum: f64 = (0..(2 * l + 1))
                .map(|i| values[l * l + i] * values[l * l + i])
                .sum();
            let expected = (2 * l + 1) as f64 / (4.0 * PI);
            assert!(
                (sum - expected).abs() < 1e-9,
                "addition theorem violated at l={l}: {sum} vs {expected}"
            );
        }
    }

    #[test]
    fn evaluation_at_the_poles_is_finite() {
        let sh = RealSphericalHarmonics::new(4);
        for dir in [Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0)] {
            let (values, gradients) = sh.evaluate_with_gradients(&dir);
            assert!(values.iter().all(|v| v.is_finite()));
            assert!(gradients.iter().all(|g| g.iter().all(|c| c.is_finite())));
        }
    }

    #[test]
    fn gradients_match_finite_differences_off_the_poles() {
        let sh = RealSphericalHarmonics::new(3);
        let dir = unit(0.6, -0.3, 0.45);
        let (_, gradients) = sh.evaluate_with_gradients(&dir);

        let h = 1e-6;
        // Two tangent directions at `dir`.
        let t1 = unit(-dir.y, dir.x, 0.0);
        let t2 = dir.cross(&t1);
        for tangent in [t1, t2] {
            let plus = sh.evaluate(&(dir + tangent * h).normalize());
            let minus = sh.evaluate(&(dir - tangent * h).normalize());
            for (idx, gradient) in gradients.iter().enumerate() {
                let numeric = (plus[idx] - minus[idx]) / (2.0 * h);
                let analytic = gradient.dot(&tangent);
                assert!(
                    (numeric - analytic).abs() < 1e-5,
                    "component {idx}: numeric {numeric} vs analytic {analytic}"
                );
            }
        }
    }
}
