//! Classical recovery of the factors from a measured phase estimate.

use crate::utils::{gcd, modpow};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// Result of one factoring attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FactorOutcome {
    /// Two non-trivial factors were found.
    Success(u64, u64),
    /// No factors could be recovered from the sample.
    Failure,
}

impl FactorOutcome {
    /// Whether factors were found.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(..))
    }

    /// The factors, or `(0, 0)` on failure.
    pub fn factors(&self) -> (u64, u64) {
        match self {
            Self::Success(f1, f2) => (*f1, *f2),
            Self::Failure => (0, 0),
        }
    }
}

impl Display for FactorOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(f1, f2) => write!(f, "SUCCESS({}*{})", f1, f2),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Partial quotients of `numerator / denominator`.
///
/// # Example
/// ```
/// use qip_shor::post_processing::continued_fraction;
///
/// assert_eq!(continued_fraction(3, 8), vec![0, 2, 1, 2]);
/// assert_eq!(continued_fraction(64, 256), vec![0, 4]);
/// ```
pub fn continued_fraction(mut numerator: u64, mut denominator: u64) -> Vec<u64> {
    let mut cf = vec![];
    while denominator != 0 {
        cf.push(numerator / denominator);
        let rem = numerator % denominator;
        numerator = denominator;
        denominator = rem;
    }
    cf
}

/// Convergents `(numerator, denominator)` of a continued fraction, in increasing order.
///
/// # Example
/// ```
/// use qip_shor::post_processing::convergents;
///
/// assert_eq!(convergents(&[0, 2, 1, 2]), vec![(0, 1), (1, 2), (1, 3), (3, 8)]);
/// ```
pub fn convergents(cf: &[u64]) -> Vec<(u64, u64)> {
    let (mut p_prev, mut p) = (0u64, 1u64);
    let (mut q_prev, mut q) = (1u64, 0u64);
    cf.iter()
        .map(|a| {
            let next_p = a.saturating_mul(p).saturating_add(p_prev);
            let next_q = a.saturating_mul(q).saturating_add(q_prev);
            p_prev = p;
            q_prev = q;
            p = next_p;
            q = next_q;
            (p, q)
        })
        .collect()
}

/// Turns samples of the exponent register into factors of `composite`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostProcessor {
    /// The number to factor.
    pub composite: u64,
    /// The base whose order was estimated.
    pub coprime: u64,
    /// Width of the work register, the exponent register is twice as wide.
    pub required_bits: usize,
}

impl PostProcessor {
    /// Make a post processor for one run.
    pub fn new(composite: u64, coprime: u64, required_bits: usize) -> Self {
        Self {
            composite,
            coprime,
            required_bits,
        }
    }

    fn exponent_bits(&self) -> usize {
        2 * self.required_bits
    }

    /// Read the phase estimate out of a sample listing qubit `0` first. Exponent qubit `k`
    /// (qubit `required_bits + k`) holds bit `exponent_bits - 1 - k` of the estimate.
    pub fn phase_estimate(&self, sample: &str) -> u64 {
        let bytes = sample.as_bytes();
        (0..self.exponent_bits()).fold(0u64, |res, i| {
            let bit = bytes.get(self.required_bits + i).copied() == Some(b'1');
            (res << 1) | u64::from(bit)
        })
    }

    /// Try to find factors from a sample listing qubit `0` first.
    pub fn process(&self, sample: &str) -> FactorOutcome {
        let res = self.phase_estimate(sample);
        debug!(sample, estimate = res, "measurement");
        self.process_estimate(res)
    }

    /// Try to find factors from a phase estimate `res / 2^exponent_bits`.
    pub fn process_estimate(&self, res: u64) -> FactorOutcome {
        let n = self.composite;
        let a = self.coprime;
        if res == 0 {
            debug!("factorization failed, measured 0");
            return FactorOutcome::Failure;
        }

        let denom = 1u64 << self.exponent_bits();
        let cf = continued_fraction(res, denom);
        debug!(?cf, "continued fraction expansion of {}/{}", res, denom);

        let estimate = res as f64 / denom as f64;
        let tolerance = 1.0 / (2.0 * denom as f64);
        for (numerator, denominator) in convergents(&cf) {
            if denominator > n {
                debug!(numerator, denominator, "denominator larger than {}", n);
                return FactorOutcome::Failure;
            }

            let delta = estimate - numerator as f64 / denominator as f64;
            if delta.abs() >= tolerance {
                debug!(numerator, denominator, delta, "candidate too far off");
                continue;
            }

            let mut fact = 1;
            while denominator * fact < n && modpow(a, denominator * fact, n) != 1 {
                fact += 1;
            }
            let period = denominator * fact;
            if modpow(a, period, n) != 1 {
                debug!(numerator, denominator, "no multiple of the candidate is a period");
                continue;
            }

            debug!(period, "found period");
            if period & 1 == 1 {
                debug!(period, "factorization failed, period is odd");
                return FactorOutcome::Failure;
            }

            let half = modpow(a, period / 2, n);
            let plus = gcd((half + 1) % n, n);
            let minus = gcd(if half == 0 { n - 1 } else { half - 1 }, n);
            if minus == 1 || plus == 1 {
                debug!(minus, plus, "factorization failed, trivial factors");
                return FactorOutcome::Failure;
            }
            debug!(minus, plus, "factorization succeeded");
            return FactorOutcome::Success(minus, plus);
        }
        FactorOutcome::Failure
    }
}
