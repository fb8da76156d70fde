//! Special functions for bond-order parameters: associated Legendre
//! polynomials, complex spherical harmonics and Wigner 3-j symbols.
//!
//! Only small angular orders are needed (the classifiers use l = 4 and
//! l = 6), so everything is evaluated from plain recurrences and factorials
//! in `f64`. Orders above `MAX_L` are rejected rather than risk losing
//! precision in the factorial ratios.

use crate::error::AnalysisError;
use anyhow::{bail, Result};
use nalgebra::Vector3;
use num_complex::Complex;
use std::f64::consts::PI;

pub const MAX_L: usize = 12;

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Associated Legendre function P_l^m(x) for 0 <= m <= l, including the
/// Condon-Shortley phase. `x` is clamped to [-1, 1].
pub fn associated_legendre(l: usize, m: usize, x: f64) -> f64 {
    if m > l {
        return 0.0;
    }
    let x = x.clamp(-1.0, 1.0);

    // P_m^m = (-1)^m (2m-1)!! (1-x^2)^{m/2}
    let mut pmm = 1.0;
    if m > 0 {
        let somx2 = ((1.0 - x) * (1.0 + x)).sqrt();
        let mut odd = 1.0;
        for _ in 0..m {
            pmm *= -odd * somx2;
            odd += 2.0;
        }
    }
    if l == m {
        return pmm;
    }

    let mut pmmp1 = x * (2 * m + 1) as f64 * pmm;
    if l == m + 1 {
        return pmmp1;
    }

    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = (x * (2 * ll - 1) as f64 * pmmp1 - (ll + m - 1) as f64 * pmm) / (ll - m) as f64;
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}

/// Normalization sqrt((2l+1)/(4 pi) (l-m)!/(l+m)!) for m = 0..=l.
pub fn harmonic_norms(l: usize) -> Vec<f64> {
    (0..=l)
        .map(|m| ((2 * l + 1) as f64 / (4.0 * PI) * factorial(l - m) / factorial(l + m)).sqrt())
        .collect()
}

/// Writes Y_l^m(r) for m = -l..=l into `out` (length 2l+1, index m + l).
///
/// `norms` must come from [`harmonic_norms`] for the same `l`. A zero-length
/// direction is evaluated on the +z axis.
pub fn spherical_harmonics_into(
    l: usize,
    norms: &[f64],
    direction: &Vector3<f64>,
    out: &mut [Complex<f64>],
) {
    debug_assert_eq!(out.len(), 2 * l + 1);
    debug_assert_eq!(norms.len(), l + 1);

    let r = direction.norm();
    let (cos_theta, phi) = if r > 0.0 {
        (direction.z / r, direction.y.atan2(direction.x))
    } else {
        (1.0, 0.0)
    };

    let step = Complex::from_polar(1.0, phi);
    let mut phase = Complex::new(1.0, 0.0);
    for m in 0..=l {
        let value = phase * (norms[m] * associated_legendre(l, m, cos_theta));
        out[l + m] = value;
        if m > 0 {
            // Y_l^{-m} = (-1)^m conj(Y_l^m)
            let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
            out[l - m] = value.conj() * sign;
        }
        phase *= step;
    }
}

pub fn spherical_harmonics(l: usize, direction: &Vector3<f64>) -> Result<Vec<Complex<f64>>> {
    if l > MAX_L {
        bail!(AnalysisError::UnsupportedOrder(l));
    }
    let norms = harmonic_norms(l);
    let mut out = vec![Complex::new(0.0, 0.0); 2 * l + 1];
    spherical_harmonics_into(l, &norms, direction, &mut out);
    Ok(out)
}

/// Wigner 3-j symbol (j1 j2 j3; m1 m2 m3) from the Racah formula.
pub fn wigner_3j(j1: i64, j2: i64, j3: i64, m1: i64, m2: i64, m3: i64) -> f64 {
    if m1 + m2 + m3 != 0 || m1.abs() > j1 || m2.abs() > j2 || m3.abs() > j3 {
        return 0.0;
    }
    if j3 < (j1 - j2).abs() || j3 > j1 + j2 {
        return 0.0;
    }

    let f = |n: i64| factorial(n as usize);
    let triangle = f(j1 + j2 - j3) * f(j1 - j2 + j3) * f(-j1 + j2 + j3) / f(j1 + j2 + j3 + 1);
    let prefactor = (triangle
        * f(j1 + m1)
        * f(j1 - m1)
        * f(j2 + m2)
        * f(j2 - m2)
        * f(j3 + m3)
        * f(j3 - m3))
        .sqrt();

    let k_min = 0.max(j2 - j3 - m1).max(j1 - j3 + m2);
    let k_max = (j1 + j2 - j3).min(j1 - m1).min(j2 + m2);
    let mut sum = 0.0;
    for k in k_min..=k_max {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        sum += sign
            / (f(k)
                * f(j1 + j2 - j3 - k)
                * f(j1 - m1 - k)
                * f(j2 + m2 - k)
                * f(j3 - j2 + m1 + k)
                * f(j3 - j1 - m2 + k));
    }

    let phase = if (j1 - j2 - m3).rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    };
    phase * prefactor * sum
}

/// Nonzero couplings (l l l; m1 m2 m3) with m1 + m2 + m3 = 0, as index
/// triples into a (2l+1)-vector together with the symbol value.
pub fn third_order_couplings(l: usize) -> Vec<(usize, usize, usize, f64)> {
    let li = l as i64;
    let mut couplings = Vec::new();
    for m1 in -li..=li {
        for m2 in -li..=li {
            let m3 = -m1 - m2;
            if m3.abs() > li {
                continue;
            }
            let value = wigner_3j(li, li, li, m1, m2, m3);
            if value != 0.0 {
                couplings.push((
                    (m1 + li) as usize,
                    (m2 + li) as usize,
                    (m3 + li) as usize,
                    value,
                ));
            }
        }
    }
    couplings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legendre_matches_closed_forms() {
        let x: f64 = 0.3;
        assert!((associated_legendre(0, 0, x) - 1.0).abs() < 1e-14);
        assert!((associated_legendre(1, 0, x) - x).abs() < 1e-14);
        assert!((associated_legendre(2, 0, x) - 0.5 * (3.0 * x * x - 1.0)).abs() < 1e-14);
        let p11 = -(1.0 - x * x).sqrt();
        assert!((associated_legendre(1, 1, x) - p11).abs() < 1e-14);
        let p22 = 3.0 * (1.0 - x * x);
        assert!((associated_legendre(2, 2, x) - p22).abs() < 1e-13);
        assert_eq!(associated_legendre(2, 3, x), 0.0);
    }

    #[test]
    fn legendre_clamps_argument() {
        assert_eq!(associated_legendre(6, 0, 1.0 + 1e-12), associated_legendre(6, 0, 1.0));
        assert!(associated_legendre(6, 3, -1.0 - 1e-12).is_finite());
    }

    #[test]
    fn harmonics_on_z_axis() {
        let y = spherical_harmonics(6, &Vector3::new(0.0, 0.0, 2.0)).expect("harmonics");
        let expected = (13.0 / (4.0 * PI)).sqrt();
        assert!((y[6].re - expected).abs() < 1e-12);
        for (idx, value) in y.iter().enumerate() {
            if idx != 6 {
                assert!(value.norm() < 1e-12);
            }
        }
    }

    #[test]
    fn harmonics_obey_conjugation_symmetry() {
        let dir = Vector3::new(0.3, -0.7, 0.4);
        let y = spherical_harmonics(4, &dir).expect("harmonics");
        for m in 1..=4usize {
            let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
            let diff = y[4 - m] - y[4 + m].conj() * sign;
            assert!(diff.norm() < 1e-14);
        }
    }

    #[test]
    fn harmonics_satisfy_addition_theorem() {
        // sum_m |Y_lm|^2 = (2l+1) / (4 pi) for any direction.
        for l in [0usize, 1, 4, 6, 12] {
            let y = spherical_harmonics(l, &Vector3::new(-0.2, 0.9, -0.35)).expect("harmonics");
            let total: f64 = y.iter().map(|c| c.norm_sqr()).sum();
            assert!((total - (2 * l + 1) as f64 / (4.0 * PI)).abs() < 1e-10, "l={l}");
        }
    }

    #[test]
    fn harmonics_reject_large_order() {
        let err = spherical_harmonics(MAX_L + 1, &Vector3::new(0.0, 0.0, 1.0))
            .expect_err("expected error");
        assert!(format!("{err}").contains("outside the supported range"));
    }

    #[test]
    fn wigner_3j_known_values() {
        assert!((wigner_3j(1, 1, 0, 0, 0, 0) + 1.0 / 3f64.sqrt()).abs() < 1e-14);
        assert!((wigner_3j(2, 2, 2, 0, 0, 0) + (2.0f64 / 35.0).sqrt()).abs() < 1e-14);
        assert!((wigner_3j(4, 4, 4, 0, 0, 0) - 0.134097046880302).abs() < 1e-12);
        assert!((wigner_3j(6, 6, 6, 0, 0, 0) + 0.0930595002112907).abs() < 1e-12);
        assert_eq!(wigner_3j(2, 2, 2, 1, 1, 1), 0.0);
        assert_eq!(wigner_3j(1, 1, 3, 0, 0, 0), 0.0);
    }

    #[test]
    fn couplings_conserve_m() {
        let l = 6usize;
        let couplings = third_order_couplings(l);
        assert!(!couplings.is_empty());
        for (a, b, c, _) in couplings {
            assert_eq!(a + b + c, 3 * l);
        }
    }
}
