use nalgebra::DMatrix;

/// Analytic overlap of the primitives `(r - rcut)^(n+2)` under the radial
/// measure `r^2 dr`, integrated over `[0, rcut]`:
///
/// S_nm = (-1)^(n+m) 2 rcut^(n+m+7) / ((n+m+5)(n+m+6)(n+m+7))
///
/// The alternating sign carries the parity of `(r - rcut)^(n+2)`, which is
/// negative below the cutoff for odd powers.
pub(super) fn overlap(rcut: f64, nmax: usize) -> DMatrix<f64> {
    DMatrix::from_fn(nmax, nmax, |n, m| {
        let p = (n + m) as f64;
        let sign = if (n + m) % 2 == 0 { 1.0 } else { -1.0 };
        sign * 2.0 * rcut.powf(p + 7.0) / ((p + 5.0) * (p + 6.0) * (p + 7.0))
    })
}

/// Primitive values and radial derivatives at `r`. Everything is identically
/// zero at and beyond the cutoff.
pub(super) fn primitives(rcut: f64, nmax: usize, r: f64) -> (Vec<f64>, Vec<f64>) {
    if r >= rcut {
        return (vec![0.0; nmax], vec![0.0; nmax]);
    }
    let delta = r - rcut;
    let mut values = Vec::with_capacity(nmax);
    let mut derivatives = Vec::with_capacity(nmax);
    for n in 0..nmax {
        let power = n as i32 + 2;
        values.push(delta.powi(power));
        derivatives.push(power as f64 * delta.powi(power - 1));
    }
    (values, derivatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_matches_direct_quadrature() {
        let rcut = 3.0;
        let s = overlap(rcut, 3);

        let steps = 200_000;
        let dr = rcut / steps as f64;
        for (n, m) in [(0usize, 0usize), (0, 1), (1, 2)] {
            let mut integral = 0.0;
            for step in 0..steps {
                let r = (step as f64 + 0.5) * dr;
                let gn = (r - rcut).powi(n as i32 + 2);
                let gm = (r - rcut).powi(m as i32 + 2);
                integral += gn * gm * r * r * dr;
            }
            assert!(
                (s[(n, m)] - integral).abs() / integral.abs() < 1e-6,
                "overlap ({n},{m}) mismatch: {} vs {integral}",
                s[(n, m)]
            );
        }
    }

    #[test]
    fn primitives_are_zero_beyond_the_cutoff() {
        let (values, derivatives) = primitives(3.0, 4, 3.0);
        assert!(values.iter().all(|&v| v == 0.0));
        assert!(derivatives.iter().all(|&d| d == 0.0));
    }
}
