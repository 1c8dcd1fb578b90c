//! # Polynomial Module
//!
//! The numerical heart of the calibrator: a dense polynomial with display
//! labels, built either from explicit coefficients or from a least-squares
//! fit over (channel, energy) samples.
//!
//! ## Features
//! - Least-squares fitting (closed-form regression for straight lines,
//!   SVD of the Vandermonde matrix otherwise), with channels mapped onto
//!   `[-1, 1]` before any power is taken
//! - Horner evaluation and chi-squared residuals
//! - Inverse evaluation by root-finding on the shifted polynomial
//! - Human-readable formatting such as `Energy = 0.500000*Chan + 1.250000`

use std::fmt;

use linreg::linear_regression;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::FitError;

/// Roots whose imaginary part is smaller than this are reported as real.
pub const REAL_ROOT_TOLERANCE: f64 = 1e-6;

/// Number of decimal places used when rendering coefficients.
pub const DISPLAY_PRECISION: usize = 6;

/// Singular values below `max_sv * RANK_TOLERANCE` count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Imaginary parts this small relative to the root are snapped to zero.
const IMAGINARY_SNAP_TOLERANCE: f64 = 1e-14;

const NEWTON_STEPS: usize = 8;

/// Iteration cap for the SVD; hitting it is reported as a solver failure.
const MAX_SVD_ITERATIONS: usize = 1000;

/// Slack allowed when comparing the chi-squared of the mapped-back fit
/// with the one found on normalized channels.
const CONSISTENCY_TOLERANCE: f64 = 1e-8;

/// A polynomial `c0*x^d + c1*x^(d-1) + ... + cd` with display names for both variables.
///
/// Coefficients are stored highest degree first. The sequence is never empty,
/// so the degree is always `coefficients.len() - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    xvar: String,
    yvar: String,
}

impl Polynomial {
    /// Creates a polynomial from coefficients (highest degree first) and variable labels.
    ///
    /// # Returns
    /// * `Err(FitError::EmptyCoefficients)` - if `coefficients` is empty
    pub fn new(
        coefficients: Vec<f64>,
        xvar: impl Into<String>,
        yvar: impl Into<String>,
    ) -> Result<Self, FitError> {
        if coefficients.is_empty() {
            return Err(FitError::EmptyCoefficients);
        }
        Ok(Self {
            coefficients,
            xvar: xvar.into(),
            yvar: yvar.into(),
        })
    }

    /// Creates a polynomial labelled with the default `x` and `y`.
    pub fn from_coefficients(coefficients: Vec<f64>) -> Result<Self, FitError> {
        Self::new(coefficients, "x", "y")
    }

    /// Fits a polynomial of the given degree to the samples by least squares.
    ///
    /// The channels are first mapped onto `[-1, 1]` so that no power can
    /// overflow. A degree-1 request then uses ordinary linear regression and
    /// every other degree solves the Vandermonde system through an SVD. The
    /// coefficients are mapped back to raw channels at the end.
    ///
    /// # Arguments
    /// * `xs` - Independent values (channels)
    /// * `ys` - Dependent values (energies), same length as `xs`
    /// * `degree` - Requested polynomial degree
    /// * `xvar`, `yvar` - Display labels for the result
    ///
    /// # Returns
    /// * `Err(FitError::LengthMismatch)` - `xs` and `ys` differ in length
    /// * `Err(FitError::InvalidInput)` - a sample is NaN or infinite
    /// * `Err(FitError::UnderdeterminedFit)` - fewer than `degree + 1` points,
    ///   fewer than `degree + 1` distinct x-values, or a rank-deficient system
    /// * `Err(FitError::SolverFailed)` - the SVD did not converge, or the
    ///   coefficients cannot be represented for raw channels of this magnitude
    pub fn from_fit(
        xs: &[f64],
        ys: &[f64],
        degree: usize,
        xvar: impl Into<String>,
        yvar: impl Into<String>,
    ) -> Result<Self, FitError> {
        validate_samples(xs, ys)?;

        let needed = degree + 1;
        if xs.len() < needed {
            return Err(FitError::UnderdeterminedFit {
                points: xs.len(),
                degree,
            });
        }
        let distinct = count_distinct(xs);
        if distinct < needed {
            return Err(FitError::UnderdeterminedFit {
                points: distinct,
                degree,
            });
        }

        let normalization = Normalization::covering(xs);
        let us: Vec<f64> = xs.iter().map(|&x| normalization.apply(x)).collect();
        let normalized = if degree == 1 {
            fit_line(&us, ys)?
        } else {
            fit_least_squares(&us, ys, degree)?
        };
        let coefficients = normalization.unapply(&normalized);
        check_mapped_fit(xs, ys, &us, &normalized, &coefficients)?;
        debug!(
            "[FIT] degree {} over {} points -> {:?}",
            degree,
            xs.len(),
            coefficients
        );

        Self::new(coefficients, xvar, yvar)
    }

    /// Coefficients, highest degree first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn xvar(&self) -> &str {
        &self.xvar
    }

    pub fn yvar(&self) -> &str {
        &self.yvar
    }

    /// Evaluates the polynomial at `x` using Horner's method.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, &coefficient| acc * x + coefficient)
    }

    fn evaluate_complex(&self, z: Complex64) -> Complex64 {
        self.coefficients
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, &coefficient| acc * z + coefficient)
    }

    /// Sum of squared residuals `(y - p(x))^2` over the samples.
    ///
    /// Unequal lengths are an error rather than a silent truncation.
    pub fn chi2(&self, xs: &[f64], ys: &[f64]) -> Result<f64, FitError> {
        if xs.len() != ys.len() {
            return Err(FitError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        Ok(xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| {
                let residual = y - self.evaluate(x);
                residual * residual
            })
            .sum())
    }

    /// Returns the derivative, keeping the labels. A constant differentiates to `0`.
    pub fn derivative(&self) -> Self {
        let degree = self.degree();
        let mut coefficients: Vec<f64> = self
            .coefficients
            .iter()
            .take(degree)
            .enumerate()
            .map(|(i, &coefficient)| coefficient * (degree - i) as f64)
            .collect();
        if coefficients.is_empty() {
            coefficients.push(0.0);
        }
        Self {
            coefficients,
            xvar: self.xvar.clone(),
            yvar: self.yvar.clone(),
        }
    }

    /// Solves `p(x) = y` for `x`.
    ///
    /// Subtracts `y` from the constant term and returns every complex root of
    /// the shifted polynomial. A constant polynomial has no roots and yields an
    /// empty vector.
    pub fn reverse(&self, y: f64) -> Result<Vec<Complex64>, FitError> {
        let mut shifted = self.clone();
        if let Some(constant) = shifted.coefficients.last_mut() {
            *constant -= y;
        }
        shifted.roots()
    }

    /// The real solutions of `p(x) = y`, sorted ascending.
    ///
    /// Keeps the roots of [`Polynomial::reverse`] whose imaginary part is below
    /// [`REAL_ROOT_TOLERANCE`].
    pub fn real_roots(&self, y: f64) -> Result<Vec<f64>, FitError> {
        let mut real: Vec<f64> = self
            .reverse(y)?
            .into_iter()
            .filter(|root| root.im.abs() < REAL_ROOT_TOLERANCE)
            .map(|root| root.re)
            .collect();
        real.sort_by(f64::total_cmp);
        Ok(real)
    }

    /// All complex roots, counted with multiplicity as far as the solver resolves them.
    ///
    /// Degree 1 and 2 are solved in closed form; higher degrees use the
    /// eigenvalues of the companion matrix, each polished with Newton steps.
    ///
    /// Only leading coefficients that are exactly zero lower the degree; a
    /// tiny but nonzero leading term still contributes its roots, however
    /// far out they lie.
    pub fn roots(&self) -> Result<Vec<Complex64>, FitError> {
        let first = self
            .coefficients
            .iter()
            .position(|&c| c != 0.0)
            .unwrap_or(self.coefficients.len());
        let roots = match &self.coefficients[first..] {
            [] | [_] => Vec::new(),
            &[a, b] => vec![Complex64::new(-b / a, 0.0)],
            &[a, b, c] => quadratic_roots(a, b, c),
            trimmed => companion_roots(trimmed)?,
        };
        trace!("[ROOTS] {:?} -> {:?}", self.coefficients, roots);
        Ok(roots
            .into_iter()
            .map(|root| canonicalize_root(self.polish(root)))
            .collect())
    }

    /// A few Newton steps, keeping each step only if it shrinks |p(z)|.
    fn polish(&self, mut z: Complex64) -> Complex64 {
        let slope = self.derivative();
        let mut residual = self.evaluate_complex(z).norm();
        for _ in 0..NEWTON_STEPS {
            let d = slope.evaluate_complex(z);
            if d.norm() == 0.0 {
                break;
            }
            let candidate = z - self.evaluate_complex(z) / d;
            let candidate_residual = self.evaluate_complex(candidate).norm();
            if !candidate_residual.is_finite() || candidate_residual >= residual {
                break;
            }
            z = candidate;
            residual = candidate_residual;
        }
        z
    }
}

impl fmt::Display for Polynomial {
    /// Renders `yvar = c0*xvar^d + ... + c(d-1)*xvar + cd`.
    ///
    /// Zero coefficients are printed like any other term.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.yvar)?;
        let degree = self.degree();
        for (i, coefficient) in self.coefficients.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            let power = degree - i;
            match power {
                0 => write!(f, "{coefficient:.prec$}", prec = DISPLAY_PRECISION)?,
                1 => write!(
                    f,
                    "{coefficient:.prec$}*{}",
                    self.xvar,
                    prec = DISPLAY_PRECISION
                )?,
                _ => write!(
                    f,
                    "{coefficient:.prec$}*{}^{power}",
                    self.xvar,
                    prec = DISPLAY_PRECISION
                )?,
            }
        }
        Ok(())
    }
}

fn validate_samples(xs: &[f64], ys: &[f64]) -> Result<(), FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    for (index, (&x, &y)) in xs.iter().zip(ys).enumerate() {
        for value in [x, y] {
            if !value.is_finite() {
                return Err(FitError::InvalidInput { index, value });
            }
        }
    }
    Ok(())
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Affine map `u = (x - mid) / half` taking the sample channels onto `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Normalization {
    mid: f64,
    half: f64,
}

impl Normalization {
    fn covering(xs: &[f64]) -> Self {
        let (min, max) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        if min > max {
            return Self { mid: 0.0, half: 1.0 };
        }
        // Halving first keeps the sum and the span finite near f64::MAX.
        let half = max / 2.0 - min / 2.0;
        Self {
            mid: min / 2.0 + max / 2.0,
            half: if half > 0.0 { half } else { 1.0 },
        }
    }

    fn apply(&self, x: f64) -> f64 {
        (x - self.mid) / self.half
    }

    /// Rewrites `q(u)` as `p(x) = q((x - mid) / half)`, both highest degree first.
    fn unapply(&self, coefficients: &[f64]) -> Vec<f64> {
        let scale = 1.0 / self.half;
        let offset = -self.mid / self.half;
        // Horner in polynomial arithmetic: acc = acc * (scale*x + offset) + c.
        coefficients.iter().fold(Vec::new(), |acc: Vec<f64>, &c| {
            let mut next = vec![0.0; acc.len() + 1];
            for (i, &a) in acc.iter().enumerate() {
                next[i] += a * scale;
                next[i + 1] += a * offset;
            }
            next[acc.len()] += c;
            next
        })
    }
}

/// Rejects a mapped-back fit whose coefficients overflowed or whose residuals
/// on the raw channels are worse than those of the normalized fit.
fn check_mapped_fit(
    xs: &[f64],
    ys: &[f64],
    us: &[f64],
    normalized: &[f64],
    coefficients: &[f64],
) -> Result<(), FitError> {
    if let Some(bad) = normalized
        .iter()
        .chain(coefficients)
        .find(|c| !c.is_finite())
    {
        return Err(FitError::SolverFailed(format!(
            "coefficient {bad} is not finite at this channel range"
        )));
    }

    let chi2 = |points: &[f64], terms: &[f64]| -> f64 {
        points
            .iter()
            .zip(ys)
            .map(|(&x, &y)| {
                let fitted = terms.iter().fold(0.0, |acc, &c| acc * x + c);
                (fitted - y).powi(2)
            })
            .sum()
    };
    let raw = chi2(xs, coefficients);
    let reference = chi2(us, normalized);
    let energy_scale: f64 = ys.iter().map(|y| y * y).sum();
    let allowed = reference * (1.0 + CONSISTENCY_TOLERANCE)
        + CONSISTENCY_TOLERANCE * (1.0 + energy_scale);
    if raw.is_nan() || raw > allowed {
        return Err(FitError::SolverFailed(format!(
            "fit loses precision on raw channels (chi2 {raw} against {reference})"
        )));
    }
    Ok(())
}

/// Straight line through the samples; returns `[slope, intercept]`.
fn fit_line(xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, FitError> {
    let (slope, intercept) = linear_regression::<_, _, f64>(xs, ys)
        .map_err(|e| FitError::SolverFailed(format!("linear regression: {e:?}")))?;
    Ok(vec![slope, intercept])
}

fn fit_least_squares(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, FitError> {
    let rows = xs.len();
    let cols = degree + 1;

    let vandermonde =
        DMatrix::from_fn(rows, cols, |row, col| xs[row].powi((degree - col) as i32));

    let svd = vandermonde
        .try_svd(true, true, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or_else(|| FitError::SolverFailed("SVD did not converge".to_string()))?;
    let largest = svd
        .singular_values
        .iter()
        .fold(0.0_f64, |max, &value| max.max(value));
    let tolerance = largest * RANK_TOLERANCE;
    let rank = svd.rank(tolerance);
    if rank < cols {
        return Err(FitError::UnderdeterminedFit {
            points: rank,
            degree,
        });
    }

    let rhs = DVector::from_column_slice(ys);
    let solution = svd
        .solve(&rhs, tolerance)
        .map_err(|e| FitError::SolverFailed(e.to_string()))?;

    Ok(solution.iter().copied().collect())
}

/// Eigenvalues of the companion matrix of `coefficients` (leading term nonzero).
///
/// The variable is rescaled by `s = max |a_k / a_0|^(1/k)` first, so the
/// matrix entries stay near unit size even when the leading coefficient is
/// many orders of magnitude below the others.
fn companion_roots(coefficients: &[f64]) -> Result<Vec<Complex64>, FitError> {
    let degree = coefficients.len() - 1;
    let leading = coefficients[0];

    let scale = coefficients
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, &c)| (c / leading).abs().powf(1.0 / k as f64))
        .fold(0.0_f64, f64::max);
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };

    let mut companion = DMatrix::<Complex64>::zeros(degree, degree);
    for row in 1..degree {
        companion[(row, row - 1)] = Complex64::new(1.0, 0.0);
    }
    for (column, &coefficient) in coefficients.iter().skip(1).enumerate() {
        let scaled = coefficient / leading / scale.powi(column as i32 + 1);
        companion[(0, column)] = Complex64::new(-scaled, 0.0);
    }

    let eigenvalues = companion.eigenvalues().ok_or_else(|| {
        FitError::SolverFailed("companion matrix eigenvalues did not converge".to_string())
    })?;
    Ok(eigenvalues.iter().map(|&t| t * scale).collect())
}

/// Roots of `a*x^2 + b*x + c` with the cancellation-free form of the quadratic formula.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<Complex64> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        let re = -b / (2.0 * a);
        let im = (-discriminant).sqrt() / (2.0 * a).abs();
        return vec![Complex64::new(re, im), Complex64::new(re, -im)];
    }
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    if q == 0.0 {
        return vec![Complex64::new(0.0, 0.0); 2];
    }
    vec![Complex64::new(q / a, 0.0), Complex64::new(c / q, 0.0)]
}

fn canonicalize_root(root: Complex64) -> Complex64 {
    if !root.re.is_finite() || !root.im.is_finite() {
        return root;
    }
    let im = if root.im.abs() <= IMAGINARY_SNAP_TOLERANCE * (1.0 + root.re.abs()) {
        0.0
    } else {
        root.im
    };
    Complex64::new(root.re, im)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_coefficients_are_rejected() {
        assert_eq!(
            Polynomial::from_coefficients(vec![]),
            Err(FitError::EmptyCoefficients)
        );
    }

    #[test]
    fn formats_every_term_with_six_decimals() {
        let poly = Polynomial::new(vec![2.0, -3.0, 1.0], "Chan", "Energy").unwrap();
        assert_eq!(
            poly.to_string(),
            "Energy = 2.000000*Chan^2 + -3.000000*Chan + 1.000000"
        );
    }

    #[test]
    fn formats_zero_terms_and_constants() {
        let cubic = Polynomial::from_coefficients(vec![1.0, 0.0, 0.0, -0.5]).unwrap();
        assert_eq!(
            cubic.to_string(),
            "y = 1.000000*x^3 + 0.000000*x^2 + 0.000000*x + -0.500000"
        );

        let constant = Polynomial::from_coefficients(vec![4.25]).unwrap();
        assert_eq!(constant.to_string(), "y = 4.250000");
    }

    #[test]
    fn line_through_two_points() {
        let xs = [0.0, 1.0];
        let ys = [0.0, 2.0];
        let fit = Polynomial::from_fit(&xs, &ys, 1, "Chan", "Energy").unwrap();

        assert_eq!(fit.degree(), 1);
        assert_close(fit.coefficients()[0], 2.0, 1e-12);
        assert_close(fit.coefficients()[1], 0.0, 1e-12);
        assert_close(fit.evaluate(5.0), 10.0, 1e-12);
        assert_close(fit.chi2(&xs, &ys).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn reverse_of_line_has_single_root() {
        let fit = Polynomial::from_fit(&[0.0, 1.0], &[0.0, 2.0], 1, "Chan", "Energy").unwrap();
        let roots = fit.reverse(10.0).unwrap();

        assert_eq!(roots.len(), 1);
        assert_close(roots[0].re, 5.0, 1e-12);
        assert_close(roots[0].im, 0.0, 1e-12);
        assert_eq!(fit.real_roots(10.0).unwrap().len(), 1);
    }

    #[test]
    fn too_few_points_is_underdetermined() {
        let err = Polynomial::from_fit(&[1.0, 2.0], &[3.0, 4.0], 2, "x", "y").unwrap_err();
        assert_eq!(
            err,
            FitError::UnderdeterminedFit {
                points: 2,
                degree: 2
            }
        );
    }

    #[test]
    fn repeated_channels_do_not_count_twice() {
        let err = Polynomial::from_fit(&[1.0, 1.0, 2.0], &[3.0, 3.5, 4.0], 2, "x", "y")
            .unwrap_err();
        assert!(matches!(err, FitError::UnderdeterminedFit { points: 2, .. }));
    }

    #[test]
    fn mismatched_and_non_finite_samples_are_rejected() {
        assert_eq!(
            Polynomial::from_fit(&[1.0, 2.0, 3.0], &[1.0, 2.0], 1, "x", "y"),
            Err(FitError::LengthMismatch { xs: 3, ys: 2 })
        );
        assert!(matches!(
            Polynomial::from_fit(&[1.0, f64::NAN], &[1.0, 2.0], 1, "x", "y"),
            Err(FitError::InvalidInput { index: 1, .. })
        ));

        let poly = Polynomial::from_coefficients(vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            poly.chi2(&[1.0], &[1.0, 2.0]),
            Err(FitError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn degree_zero_fit_is_the_mean() {
        let fit = Polynomial::from_fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 6.0], 0, "x", "y").unwrap();
        assert_eq!(fit.degree(), 0);
        assert_close(fit.coefficients()[0], 3.0, 1e-12);
        assert!(fit.reverse(3.0).unwrap().is_empty());
    }

    #[test]
    fn quadratic_fit_with_large_channels() {
        // E = 1e-6*ch^2 + 0.35*ch + 2
        let xs: Vec<f64> = (0..8).map(|i| 200.0 + 900.0 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1e-6 * x * x + 0.35 * x + 2.0).collect();
        let fit = Polynomial::from_fit(&xs, &ys, 2, "Chan", "Energy").unwrap();

        assert_close(fit.coefficients()[0], 1e-6, 1e-12);
        assert_close(fit.coefficients()[1], 0.35, 1e-8);
        assert_close(fit.coefficients()[2], 2.0, 1e-5);
        assert!(fit.chi2(&xs, &ys).unwrap() < 1e-12);
    }

    #[test]
    fn quadratic_roots_real_and_complex() {
        // (x - 1)(x - 4)
        let poly = Polynomial::from_coefficients(vec![1.0, -5.0, 4.0]).unwrap();
        let real = poly.real_roots(0.0).unwrap();
        assert_eq!(real.len(), 2);
        assert_close(real[0], 1.0, 1e-12);
        assert_close(real[1], 4.0, 1e-12);

        // x^2 + 1 has only imaginary roots
        let poly = Polynomial::from_coefficients(vec![1.0, 0.0, 1.0]).unwrap();
        let roots = poly.reverse(0.0).unwrap();
        assert_eq!(roots.len(), 2);
        for root in &roots {
            assert_close(root.re, 0.0, 1e-12);
            assert_close(root.im.abs(), 1.0, 1e-12);
        }
        assert!(poly.real_roots(0.0).unwrap().is_empty());
    }

    #[test]
    fn cubic_roots_from_companion_matrix() {
        // (x - 1)(x - 2)(x - 3)
        let poly = Polynomial::from_coefficients(vec![1.0, -6.0, 11.0, -6.0]).unwrap();
        let roots = poly.reverse(0.0).unwrap();
        assert_eq!(roots.len(), 3);

        let real = poly.real_roots(0.0).unwrap();
        assert_eq!(real.len(), 3);
        for (root, expected) in real.iter().zip([1.0, 2.0, 3.0]) {
            assert_close(*root, expected, 1e-9);
        }
    }

    #[test]
    fn huge_channels_fit_without_overflow() {
        let fit =
            Polynomial::from_fit(&[1e200, 2e200, 3e200], &[1.0, 2.0, 3.0], 2, "x", "y").unwrap();
        assert_close(fit.evaluate(2e200), 2.0, 1e-9);
        assert!(fit.chi2(&[1e200, 2e200, 3e200], &[1.0, 2.0, 3.0]).unwrap() < 1e-18);

        let line = Polynomial::from_fit(&[1e200, 2e200], &[1.0, 2.0], 1, "x", "y").unwrap();
        assert_close(line.coefficients()[0] * 1e200, 1.0, 1e-12);
        assert_close(line.coefficients()[1], 0.0, 1e-12);
        assert!(line.chi2(&[1e200, 2e200], &[1.0, 2.0]).unwrap() < 1e-18);
    }

    #[test]
    fn unrepresentable_coefficients_are_a_solver_failure() {
        // A curvature over a 1e-200 wide range needs a coefficient near 1e400.
        let xs = [1e-200, 2e-200, 3e-200];
        let result = Polynomial::from_fit(&xs, &[1.0, 4.0, 9.0], 2, "x", "y");
        assert!(
            matches!(result, Err(FitError::SolverFailed(_))),
            "got {result:?}"
        );
    }

    #[test]
    fn tiny_leading_coefficient_keeps_every_root() {
        // A cubic term of 1e-12 is ordinary for a 16k-channel detector.
        let poly = Polynomial::from_coefficients(vec![1e-12, 1e-7, 0.3, 1.0]).unwrap();
        let roots = poly.reverse(poly.evaluate(3000.0)).unwrap();
        assert_eq!(roots.len(), 3);
        assert!(
            roots
                .iter()
                .any(|r| (r.re - 3000.0).abs() < 1e-6 * 3001.0 && r.im.abs() < 1e-6),
            "{roots:?}"
        );
    }

    #[test]
    fn zero_leading_coefficients_lower_the_degree() {
        let poly = Polynomial::from_coefficients(vec![0.0, 0.0, 2.0, -8.0]).unwrap();
        let roots = poly.roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_close(roots[0].re, 4.0, 1e-12);

        let zero = Polynomial::from_coefficients(vec![0.0, 0.0]).unwrap();
        assert!(zero.roots().unwrap().is_empty());
    }

    #[test]
    fn derivative_drops_the_constant() {
        let poly = Polynomial::new(vec![2.0, -3.0, 1.0], "Chan", "Energy").unwrap();
        let slope = poly.derivative();
        assert_eq!(slope.coefficients(), &[4.0, -3.0]);
        assert_eq!(slope.xvar(), "Chan");

        let constant = Polynomial::from_coefficients(vec![7.0]).unwrap();
        assert_eq!(constant.derivative().coefficients(), &[0.0]);
    }

    proptest! {
        #[test]
        fn horner_matches_direct_sum(
            coefficients in prop::collection::vec(-10.0f64..10.0, 1..7),
            x in -3.0f64..3.0,
        ) {
            let poly = Polynomial::from_coefficients(coefficients.clone()).unwrap();
            let degree = coefficients.len() - 1;
            let terms: Vec<f64> = coefficients
                .iter()
                .enumerate()
                .map(|(i, c)| c * x.powi((degree - i) as i32))
                .collect();
            let direct: f64 = terms.iter().sum();
            let magnitude: f64 = terms.iter().map(|t| t.abs()).sum();
            prop_assert!((poly.evaluate(x) - direct).abs() <= 1e-12 * (1.0 + magnitude));
        }

        #[test]
        fn noise_free_data_is_recovered(
            coefficients in prop::collection::vec(-5.0f64..5.0, 1..5),
        ) {
            let degree = coefficients.len() - 1;
            let truth = Polynomial::from_coefficients(coefficients.clone()).unwrap();
            let xs: Vec<f64> = (0..degree + 4).map(|i| i as f64 - 2.0).collect();
            let ys: Vec<f64> = xs.iter().map(|&x| truth.evaluate(x)).collect();

            let fit = Polynomial::from_fit(&xs, &ys, degree, "x", "y").unwrap();
            for (got, want) in fit.coefficients().iter().zip(&coefficients) {
                prop_assert!((got - want).abs() < 1e-6, "{got} vs {want}");
            }
            prop_assert!(fit.chi2(&xs, &ys).unwrap() < 1e-9);
        }

        #[test]
        fn reverse_recovers_the_channel(
            a3 in 0.01f64..2.0,
            a2 in -1.0f64..1.0,
            extra_slope in 0.5f64..5.0,
            a0 in -50.0f64..50.0,
            x0 in -10.0f64..10.0,
        ) {
            // Keep p'(x) = 3*a3*x^2 + 2*a2*x + a1 >= extra_slope so x0 is a simple root.
            let a1 = a2 * a2 / (3.0 * a3) + extra_slope;
            let poly = Polynomial::from_coefficients(vec![a3, a2, a1, a0]).unwrap();
            let roots = poly.reverse(poly.evaluate(x0)).unwrap();
            prop_assert!(roots
                .iter()
                .any(|r| (r.re - x0).abs() < 1e-6 * (1.0 + x0.abs()) && r.im.abs() < 1e-6));
        }

        #[test]
        fn fitted_calibration_reverses_at_detector_scale(
            degree in 2usize..=3,
            a3 in -5e-12f64..5e-12,
            a2 in -1e-6f64..1e-6,
            a1 in 0.1f64..0.18,
            a0 in -20.0f64..20.0,
            offset in 0.0f64..1000.0,
            x0 in 0.0f64..16384.0,
        ) {
            // 0 - 16k channels, up to about 3 MeV.
            let truth = if degree == 3 {
                vec![a3, a2, a1, a0]
            } else {
                vec![a2, a1, a0]
            };
            let truth = Polynomial::from_coefficients(truth).unwrap();
            let xs: Vec<f64> = (0..8).map(|i| 500.0 + 2000.0 * i as f64 + offset).collect();
            let ys: Vec<f64> = xs.iter().map(|&x| truth.evaluate(x)).collect();

            let fit = Polynomial::from_fit(&xs, &ys, degree, "Chan", "Energy").unwrap();
            let roots = fit.reverse(fit.evaluate(x0)).unwrap();
            prop_assert_eq!(roots.len(), degree);
            prop_assert!(
                roots
                    .iter()
                    .any(|r| (r.re - x0).abs() < 1e-6 * (1.0 + x0) && r.im.abs() < 1e-6),
                "{:?} does not contain {}", roots, x0
            );
        }
    }
}
