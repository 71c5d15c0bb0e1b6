use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Gaussian widths spread over the cutoff: sigma_n = rcut * sqrt(n+1) / nmax.
pub(super) fn alphas(rcut: f64, nmax: usize) -> Vec<f64> {
    (0..nmax)
        .map(|n| {
            let sigma = rcut * ((n + 1) as f64).sqrt() / nmax as f64;
            1.0 / (2.0 * sigma * sigma)
        })
        .collect()
}

/// Analytic overlap of the primitives `r^l exp(-alpha_n r^2)` under the
/// radial measure `r^2 dr`:
///
/// S_nm = Gamma(l + 3/2) / (2 (alpha_n + alpha_m)^(l + 3/2))
pub(super) fn overlap(l: usize, alphas: &[f64]) -> DMatrix<f64> {
    let nmax = alphas.len();
    let gamma = gamma_half_integer(l);
    let exponent = l as f64 + 1.5;
    DMatrix::from_fn(nmax, nmax, |n, m| {
        gamma / (2.0 * (alphas[n] + alphas[m]).powf(exponent))
    })
}

/// Primitive values and radial derivatives at `r` for angular channel `l`.
pub(super) fn primitives(l: usize, r: f64, alphas: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let r_pow_l = r.powi(l as i32);
    let poly_deriv = if l == 0 {
        0.0
    } else {
        l as f64 * r.powi(l as i32 - 1)
    };

    let mut values = Vec::with_capacity(alphas.len());
    let mut derivatives = Vec::with_capacity(alphas.len());
    for &alpha in alphas {
        let envelope = (-alpha * r * r).exp();
        values.push(r_pow_l * envelope);
        derivatives.push((poly_deriv - 2.0 * alpha * r * r_pow_l) * envelope);
    }
    (values, derivatives)
}

/// Gamma(l + 3/2) = sqrt(pi) (2l+1)!! / 2^(l+1)
fn gamma_half_integer(l: usize) -> f64 {
    let double_factorial: f64 = (0..=l).map(|k| (2 * k + 1) as f64).product();
    PI.sqrt() * double_factorial / 2f64.powi(l as i32 + 1)
}
