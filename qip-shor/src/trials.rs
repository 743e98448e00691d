use crate::config::ShorConfig;
use crate::errors::ShorResult;
use crate::post_processing::FactorOutcome;
use crate::simulator::ShorSimulator;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;

/// Outcome of one seeded factoring attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialRecord {
    /// Seed of the attempt.
    pub seed: u64,
    /// Base used in the attempt.
    pub coprime: u64,
    /// Result from the random sample.
    pub sim_result: FactorOutcome,
    /// Result from the most likely branch.
    pub polr_result: FactorOutcome,
    /// Fidelity left after approximation.
    pub final_fidelity: f64,
}

/// Results of a batch of independent attempts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialSummary {
    /// One record per seed, in seed order.
    pub trials: Vec<TrialRecord>,
}

impl TrialSummary {
    /// Number of attempts.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether no attempt was made.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Attempts whose random sample gave factors.
    pub fn successes(&self) -> usize {
        self.trials.iter().filter(|t| t.sim_result.is_success()).count()
    }

    /// Attempts whose most likely branch gave factors.
    pub fn polr_successes(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.polr_result.is_success())
            .count()
    }

    /// Share of attempts whose random sample gave factors, `0` without attempts.
    pub fn success_rate(&self) -> f64 {
        if self.trials.is_empty() {
            0.0
        } else {
            self.successes() as f64 / self.trials.len() as f64
        }
    }

    /// The first factors found by any random sample.
    pub fn first_factors(&self) -> Option<(u64, u64)> {
        self.trials
            .iter()
            .find(|t| t.sim_result.is_success())
            .map(|t| t.sim_result.factors())
    }
}

/// Run one factoring attempt per seed, each on its own package. With the `parallel` feature the
/// attempts run concurrently.
///
/// ```
/// use qip_shor::prelude::*;
///
/// # fn main() -> ShorResult<()> {
/// let summary = run_trials(&ShorConfig::new(15).with_coprime(7), &[1, 2, 3, 4])?;
/// assert_eq!(summary.len(), 4);
/// for trial in &summary.trials {
///     if let FactorOutcome::Success(f1, f2) = trial.sim_result {
///         assert_eq!(f1 * f2, 15);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn run_trials(config: &ShorConfig, seeds: &[u64]) -> ShorResult<TrialSummary> {
    config.validate()?;
    let trials = iter!(seeds)
        .map(|seed| -> ShorResult<TrialRecord> {
            let mut sim = ShorSimulator::new(config.clone().with_seed(*seed))?;
            sim.simulate(1);
            Ok(TrialRecord {
                seed: *seed,
                coprime: sim.coprime(),
                sim_result: sim.sim_result(),
                polr_result: sim.polr_result(),
                final_fidelity: sim.final_fidelity(),
            })
        })
        .collect::<ShorResult<Vec<_>>>()?;
    let summary = TrialSummary { trials };
    info!(
        composite = config.composite,
        trials = summary.len(),
        successes = summary.successes(),
        "trials finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod trials_tests {
    use super::*;
    use crate::errors::ShorError;

    fn record(seed: u64, sim_result: FactorOutcome) -> TrialRecord {
        TrialRecord {
            seed,
            coprime: 7,
            sim_result,
            polr_result: FactorOutcome::Failure,
            final_fidelity: 1.0,
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = TrialSummary {
            trials: vec![
                record(0, FactorOutcome::Failure),
                record(1, FactorOutcome::Success(3, 5)),
                record(2, FactorOutcome::Success(5, 3)),
                record(3, FactorOutcome::Failure),
            ],
        };
        assert_eq!(summary.successes(), 2);
        assert_eq!(summary.polr_successes(), 0);
        assert!((summary.success_rate() - 0.5).abs() < 1e-12);
        assert_eq!(summary.first_factors(), Some((3, 5)));
    }

    #[test]
    fn test_empty_summary() {
        let summary = TrialSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.first_factors(), None);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            run_trials(&ShorConfig::new(2), &[1, 2]),
            Err(ShorError::CompositeTooSmall(2))
        );
    }

    #[test]
    fn test_seeds_keep_order() {
        let summary = run_trials(&ShorConfig::new(15).with_coprime(7), &[9, 4, 7]).unwrap();
        let seeds: Vec<_> = summary.trials.iter().map(|t| t.seed).collect();
        assert_eq!(seeds, vec![9, 4, 7]);
        assert!(summary.trials.iter().all(|t| t.coprime == 7));
    }
}
