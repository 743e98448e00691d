use crate::errors::{ShorError, ShorResult};
use crate::utils::bit_length;
use qip_dd::package::DEFAULT_GC_LIMIT;

/// Widest supported work register. All `3 * required_bits` qubits index basis states through a
/// `u64`, so at most 63 of them fit.
pub const MAX_REQUIRED_BITS: usize = 21;

/// When to shrink the state during the inverse Fourier transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApproximationStrategy {
    /// Approximate after a fixed number of processed exponent qubits.
    FidelityDriven,
    /// Approximate whenever the state grows past a node threshold, then double the threshold.
    MemoryDriven,
}

/// How aggressively the state may be approximated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApproximationPolicy {
    /// Fidelity each single approximation must keep.
    pub step_fidelity: f64,
    /// Upper bound on the number of approximations.
    pub step_count: usize,
    /// When to approximate.
    pub strategy: ApproximationStrategy,
    /// Node count which triggers a memory driven approximation.
    pub memory_threshold: usize,
}

impl Default for ApproximationPolicy {
    fn default() -> Self {
        Self::exact()
    }
}

impl ApproximationPolicy {
    /// Never approximate.
    pub fn exact() -> Self {
        Self {
            step_fidelity: 1.0,
            step_count: 0,
            strategy: ApproximationStrategy::FidelityDriven,
            memory_threshold: 1 << 12,
        }
    }

    /// Approximate at a fixed cadence, at most `step_count` times.
    pub fn fidelity_driven(step_fidelity: f64, step_count: usize) -> Self {
        Self {
            step_fidelity,
            step_count,
            ..Self::exact()
        }
    }

    /// Approximate whenever the state has more than `memory_threshold` nodes, at most
    /// `step_count` times.
    pub fn memory_driven(step_fidelity: f64, step_count: usize, memory_threshold: usize) -> Self {
        Self {
            step_fidelity,
            step_count,
            strategy: ApproximationStrategy::MemoryDriven,
            memory_threshold,
        }
    }

    /// Whether any approximation can happen.
    pub fn is_enabled(&self) -> bool {
        self.step_fidelity < 1.0 && self.step_count > 0
    }
}

/// Parameters of a factoring run.
///
/// ```
/// use qip_shor::config::ShorConfig;
///
/// let config = ShorConfig::new(15).with_coprime(7).with_seed(1);
/// assert_eq!(config.coprime, 7);
/// assert_eq!(config.required_bits(), Ok(4));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ShorConfig {
    /// The number to factor.
    pub composite: u64,
    /// Base of the modular exponentiation, `0` picks one at random.
    pub coprime: u64,
    /// Width of the work register, derived from `composite` when unset.
    pub bits: Option<usize>,
    /// Approximation during the inverse Fourier transform.
    pub approximation: ApproximationPolicy,
    /// Seed for coprime selection and sampling, fresh entropy when unset.
    pub seed: Option<u64>,
    /// Report diagram sizes while running. Computing them costs a traversal per stage.
    pub verbose: bool,
    /// Node count above which garbage collection kicks in.
    pub gc_limit: usize,
}

impl Default for ShorConfig {
    fn default() -> Self {
        Self::new(15)
    }
}

impl ShorConfig {
    /// Configuration for factoring `composite` with default settings.
    pub fn new(composite: u64) -> Self {
        Self {
            composite,
            coprime: 0,
            bits: None,
            approximation: ApproximationPolicy::exact(),
            seed: None,
            verbose: false,
            gc_limit: DEFAULT_GC_LIMIT,
        }
    }

    /// Use `coprime` as the base. Unsuitable values are replaced at run time.
    pub fn with_coprime(mut self, coprime: u64) -> Self {
        self.coprime = coprime;
        self
    }

    /// Override the work register width.
    pub fn with_required_bits(mut self, bits: usize) -> Self {
        self.bits = Some(bits);
        self
    }

    /// Set the approximation policy.
    pub fn with_approximation(mut self, approximation: ApproximationPolicy) -> Self {
        self.approximation = approximation;
        self
    }

    /// Seed the random generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Toggle diagram size reporting.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the garbage collection threshold.
    pub fn with_gc_limit(mut self, gc_limit: usize) -> Self {
        self.gc_limit = gc_limit;
        self
    }

    /// Width of the work register, checked against the composite number.
    pub fn required_bits(&self) -> ShorResult<usize> {
        if self.composite < 3 {
            return Err(ShorError::CompositeTooSmall(self.composite));
        }
        let bits = self.bits.unwrap_or_else(|| bit_length(self.composite));
        if bits > MAX_REQUIRED_BITS {
            return Err(ShorError::RegisterTooWide {
                required_bits: bits,
                max: MAX_REQUIRED_BITS,
            });
        }
        if bits < bit_length(self.composite) {
            return Err(ShorError::RegisterTooNarrow {
                composite: self.composite,
                required_bits: bits,
            });
        }
        Ok(bits)
    }

    /// Check every setting, returning the work register width.
    pub fn validate(&self) -> ShorResult<usize> {
        let bits = self.required_bits()?;
        let fidelity = self.approximation.step_fidelity;
        if !(fidelity > 0.0 && fidelity <= 1.0) {
            return Err(ShorError::InvalidFidelity(fidelity));
        }
        Ok(bits)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_required_bits() {
        assert_eq!(ShorConfig::new(15).required_bits(), Ok(4));
        assert_eq!(ShorConfig::new(21).required_bits(), Ok(5));
        assert_eq!(ShorConfig::new(16).required_bits(), Ok(5));
        assert_eq!(ShorConfig::new(15).with_required_bits(6).required_bits(), Ok(6));
        assert_eq!(ShorConfig::default().composite, 15);
    }

    #[test]
    fn test_rejects_bad_setups() {
        assert_eq!(
            ShorConfig::new(2).validate(),
            Err(ShorError::CompositeTooSmall(2))
        );
        assert!(matches!(
            ShorConfig::new(15).with_required_bits(3).validate(),
            Err(ShorError::RegisterTooNarrow { .. })
        ));
        assert!(matches!(
            ShorConfig::new(15).with_required_bits(40).validate(),
            Err(ShorError::RegisterTooWide { .. })
        ));
        assert_eq!(
            ShorConfig::new(15).with_required_bits(22).validate(),
            Err(ShorError::RegisterTooWide {
                required_bits: 22,
                max: 21
            })
        );
        assert_eq!(
            ShorConfig::new(1 << 21).validate(),
            Err(ShorError::RegisterTooWide {
                required_bits: 22,
                max: 21
            })
        );
        assert_eq!(ShorConfig::new(15).with_required_bits(21).validate(), Ok(21));
        let bad = ApproximationPolicy::fidelity_driven(0.0, 3);
        assert_eq!(
            ShorConfig::new(15).with_approximation(bad).validate(),
            Err(ShorError::InvalidFidelity(0.0))
        );
    }

    #[test]
    fn test_approximation_enabled() {
        assert!(!ApproximationPolicy::exact().is_enabled());
        assert!(ApproximationPolicy::fidelity_driven(0.9, 2).is_enabled());
        assert!(!ApproximationPolicy::fidelity_driven(0.9, 0).is_enabled());
        assert!(!ApproximationPolicy::fidelity_driven(1.0, 4).is_enabled());
    }
}
