use crate::config::ShorConfig;
use crate::errors::ShorResult;
use crate::phase_estimation::{ApproximationStats, PhaseEstimation, RegisterLayout};
use crate::post_processing::{FactorOutcome, PostProcessor};
use crate::utils::{gcd, modpow, reverse_bits};
use qip_dd::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Factors a number by emulating Shor's algorithm on decision diagrams.
///
/// Each call to [`simulate`](ShorSimulator::simulate) is one factoring attempt. Its outcome is
/// kept in two records: one from a random sample of the final state and one from the
/// deterministic walk along the most likely branches.
///
/// ```
/// use qip_shor::prelude::*;
///
/// # fn main() -> ShorResult<()> {
/// let config = ShorConfig::new(15).with_coprime(7).with_seed(3);
/// let mut sim = ShorSimulator::new(config)?;
/// sim.simulate(1);
///
/// // With a = 7 the phase estimate is 0, 64, 128 or 192, only 0 is useless.
/// if let FactorOutcome::Success(f1, f2) = sim.sim_result() {
///     assert_eq!(f1 * f2, 15);
/// }
/// // The most likely branch always reads 0.
/// assert_eq!(sim.polr_result(), FactorOutcome::Failure);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ShorSimulator {
    config: ShorConfig,
    layout: RegisterLayout,
    dd: Package,
    rng: StdRng,
    coprime: u64,
    root: VEdge,
    sim_sample: Option<String>,
    polr_sample: Option<String>,
    polr_amplitude: Complex64,
    sim_result: FactorOutcome,
    polr_result: FactorOutcome,
    approximation: ApproximationStats,
}

impl ShorSimulator {
    /// Check `config` and set up an empty package for it.
    pub fn new(config: ShorConfig) -> ShorResult<Self> {
        let required_bits = config.validate()?;
        let layout = RegisterLayout { required_bits };
        let dd = Package::new_with_gc_limit(layout.n_qubits(), config.gc_limit);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            coprime: config.coprime,
            config,
            layout,
            dd,
            rng,
            root: VEdge::zero(),
            sim_sample: None,
            polr_sample: None,
            polr_amplitude: Complex64::new(0.0, 0.0),
            sim_result: FactorOutcome::Failure,
            polr_result: FactorOutcome::Failure,
            approximation: ApproximationStats::default(),
        })
    }

    /// Run one factoring attempt.
    ///
    /// The shot count is not honored: every call performs a single attempt and returns an empty
    /// histogram. Results are read through [`sim_result`](Self::sim_result) and
    /// [`polr_result`](Self::polr_result), repeated attempts are available through
    /// [`run_trials`](crate::trials::run_trials).
    pub fn simulate(&mut self, shots: usize) -> BTreeMap<String, usize> {
        if shots != 1 {
            debug!(shots, "single factoring attempt, shot count ignored");
        }
        self.release();

        let composite = self.config.composite;
        let required_bits = self.layout.required_bits;
        let mut state = self.dd.make_basis_state(self.layout.n_qubits(), 1);
        self.dd.inc_ref(state);

        self.coprime = self.select_coprime();
        info!(
            composite,
            coprime = self.coprime,
            required_bits,
            qubits = self.layout.n_qubits(),
            "emulating Shor's algorithm"
        );

        let table = self.exponent_table();
        assert_eq!(
            table.len(),
            self.layout.exponent_bits(),
            "one multiplier per exponent qubit"
        );

        let mut stats = ApproximationStats::default();
        {
            let mut pe = PhaseEstimation::new(&mut self.dd, self.layout, self.config.verbose);
            pe.prepare_superposition(&mut state);
            for (round, multiplier) in table.iter().enumerate() {
                debug!(
                    round = round + 1,
                    of = table.len(),
                    multiplier,
                    "controlled modular multiplication"
                );
                pe.exponentiation_round(&mut state, composite, *multiplier, round);
            }
            pe.inverse_fourier_transform(&mut state, &self.config.approximation, &mut stats);
        }
        if self.config.verbose {
            debug!(size = self.dd.size(state), stats = ?self.dd.stats(), "final state");
        }

        // Both walks list the highest qubit first, post processing wants qubit 0 first.
        let sampled = reverse_bits(&self.dd.measure_all(&mut state, false, &mut self.rng));
        let (amplitude, polr) = self.dd.path_of_least_resistance(state);
        let polr = reverse_bits(&polr);

        let post = PostProcessor::new(composite, self.coprime, required_bits);
        self.sim_result = post.process(&sampled);
        self.polr_result = post.process(&polr);
        info!(
            sim = %self.sim_result,
            polr = %self.polr_result,
            fidelity = stats.fidelity,
            approximations = stats.runs,
            "factoring attempt finished"
        );

        self.root = state;
        self.sim_sample = Some(sampled);
        self.polr_sample = Some(polr);
        self.polr_amplitude = amplitude;
        self.approximation = stats;
        BTreeMap::new()
    }

    /// Drop the state of a previous run.
    fn release(&mut self) {
        if !self.root.is_zero() {
            self.dd.dec_ref(self.root);
            self.root = VEdge::zero();
            self.dd.garbage_collect(true);
        }
        self.sim_sample = None;
        self.polr_sample = None;
        self.polr_amplitude = Complex64::new(0.0, 0.0);
        self.sim_result = FactorOutcome::Failure;
        self.polr_result = FactorOutcome::Failure;
        self.approximation = ApproximationStats::default();
    }

    /// The configured base, or a random one if it is missing or unsuitable.
    fn select_coprime(&mut self) -> u64 {
        let n = self.config.composite;
        let requested = self.config.coprime;
        let suitable = |a: u64| a > 1 && a < n && gcd(a, n) == 1;
        if suitable(requested) {
            return requested;
        }
        if requested != 0 {
            warn!(
                coprime = requested,
                composite = n,
                "unsuitable base, picking one at random"
            );
        }
        loop {
            let a = self.rng.gen_range(1..n);
            if suitable(a) {
                debug!(coprime = a, "picked base");
                return a;
            }
        }
    }

    /// `a^(2^i) mod N` for every exponent qubit `i`.
    fn exponent_table(&self) -> Vec<u64> {
        let n = self.config.composite;
        let mut table = Vec::with_capacity(self.layout.exponent_bits());
        let mut a = self.coprime % n;
        for _ in 0..self.layout.exponent_bits() {
            table.push(a);
            a = modpow(a, 2, n);
        }
        table
    }

    /// The configuration of this simulator.
    pub fn config(&self) -> &ShorConfig {
        &self.config
    }

    /// Base used by the last run, the configured one before any run.
    pub fn coprime(&self) -> u64 {
        self.coprime
    }

    /// Width of the work register.
    pub fn required_bits(&self) -> usize {
        self.layout.required_bits
    }

    /// Total number of simulated qubits.
    pub fn n_qubits(&self) -> usize {
        self.layout.n_qubits()
    }

    /// Outcome of post processing the random sample.
    pub fn sim_result(&self) -> FactorOutcome {
        self.sim_result
    }

    /// Outcome of post processing the most likely branch.
    pub fn polr_result(&self) -> FactorOutcome {
        self.polr_result
    }

    /// The random sample of the last run, qubit `0` first.
    pub fn sim_sample(&self) -> Option<&str> {
        self.sim_sample.as_deref()
    }

    /// The most likely branch of the last run, qubit `0` first.
    pub fn polr_sample(&self) -> Option<&str> {
        self.polr_sample.as_deref()
    }

    /// Amplitude of the most likely branch.
    pub fn polr_amplitude(&self) -> Complex64 {
        self.polr_amplitude
    }

    /// Product of the fidelities of all approximations in the last run.
    pub fn final_fidelity(&self) -> f64 {
        self.approximation.fidelity
    }

    /// Number of approximations in the last run.
    pub fn approximation_runs(&self) -> usize {
        self.approximation.runs
    }

    /// Summary of the last run, keyed by name.
    pub fn additional_statistics(&self) -> BTreeMap<&'static str, String> {
        let (sim_f1, sim_f2) = self.sim_result.factors();
        let (polr_f1, polr_f2) = self.polr_result.factors();
        BTreeMap::from([
            ("composite_number", self.config.composite.to_string()),
            ("coprime_a", self.coprime.to_string()),
            ("required_bits", self.layout.required_bits.to_string()),
            ("sim_result", self.sim_result.to_string()),
            ("sim_factor1", sim_f1.to_string()),
            ("sim_factor2", sim_f2.to_string()),
            ("polr_result", self.polr_result.to_string()),
            ("polr_factor1", polr_f1.to_string()),
            ("polr_factor2", polr_f2.to_string()),
            ("approximation_runs", self.approximation.runs.to_string()),
            ("final_fidelity", self.approximation.fidelity.to_string()),
            ("emulation", true.to_string()),
        ])
    }

    /// The package holding the state.
    pub fn package(&self) -> &Package {
        &self.dd
    }

    /// Final state of the last run, still referenced. The zero edge before any run.
    pub fn root_edge(&self) -> VEdge {
        self.root
    }
}
