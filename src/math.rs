use itertools::izip;
use num::complex::Complex64;

#[inline]
pub(crate) fn logaddexp(a: f64, b: f64) -> f64 {
    if a == b {
        return a + 2f64.ln();
    }
    let diff = a - b;
    if diff > 0. {
        a + (-diff).exp().ln_1p()
    } else if diff < 0. {
        b + diff.exp().ln_1p()
    } else {
        // diff is NAN
        diff
    }
}

/// `ln(e^a - e^b)` for `a >= b`.
#[inline]
pub(crate) fn logsubexp(a: f64, b: f64) -> f64 {
    if b == f64::NEG_INFINITY {
        return a;
    }
    a + (-(b - a).exp()).ln_1p()
}

/// Log of the modified Bessel function of the first kind of order zero.
///
/// Polynomial approximations from Abramowitz & Stegun 9.8.1 and 9.8.2,
/// relative error below 2e-7. Written in log space so large arguments
/// do not overflow.
pub(crate) fn log_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax <= 3.75 {
        let t = (ax / 3.75).powi(2);
        let poly = 1.
            + t * (3.5156229
                + t * (3.0899424
                    + t * (1.2067492 + t * (0.2659732 + t * (0.0360768 + t * 0.0045813)))));
        poly.ln()
    } else {
        let t = 3.75 / ax;
        let poly = 0.39894228
            + t * (0.01328592
                + t * (0.00225319
                    + t * (-0.00157565
                        + t * (0.00916281
                            + t * (-0.02057706
                                + t * (0.02635537 + t * (-0.01647633 + t * 0.00392377)))))));
        ax - 0.5 * ax.ln() + poly.ln()
    }
}

/// Noise weighted inner product `4 Δf Σ conj(a) b / psd` over `[kmin, kmax)`.
///
/// Returns the complex overlap; its real part is the usual inner product.
pub(crate) fn weighted_overlap(
    a: &[Complex64],
    b: &[Complex64],
    psd: &[f64],
    kmin: usize,
    kmax: usize,
    delta_f: f64,
) -> Complex64 {
    assert!(a.len() >= kmax);
    assert!(b.len() >= kmax);
    assert!(psd.len() >= kmax);

    let sum = izip!(&a[kmin..kmax], &b[kmin..kmax], &psd[kmin..kmax])
        .filter(|(_, _, &s)| s > 0.)
        .fold(Complex64::new(0., 0.), |acc, (a, b, s)| {
            acc + a.conj() * b / *s
        });
    sum * (4. * delta_f)
}

/// Noise weighted norm `4 Δf Σ |a|² / psd` over `[kmin, kmax)`.
pub(crate) fn weighted_norm(a: &[Complex64], psd: &[f64], kmin: usize, kmax: usize, delta_f: f64) -> f64 {
    assert!(a.len() >= kmax);
    assert!(psd.len() >= kmax);

    let sum: f64 = a[kmin..kmax]
        .iter()
        .zip(&psd[kmin..kmax])
        .filter(|(_, &s)| s > 0.)
        .map(|(a, s)| a.norm_sqr() / s)
        .sum();
    4. * delta_f * sum
}
