use qip_shor::prelude::*;

fn seeds(n: u64) -> Vec<u64> {
    (0..n).map(|i| 1000 + 17 * i).collect()
}

#[test]
fn fifteen_samples_multiples_of_64() -> ShorResult<()> {
    for seed in seeds(8) {
        let mut sim = ShorSimulator::new(ShorConfig::new(15).with_coprime(7).with_seed(seed))?;
        sim.simulate(1);
        let post = PostProcessor::new(15, 7, sim.required_bits());
        let res = post.phase_estimate(sim.sim_sample().unwrap());
        assert_eq!(res % 64, 0, "seed {} measured {}", seed, res);
        assert_eq!(sim.sim_result().is_success(), res != 0);
    }
    Ok(())
}

#[test]
fn fifteen_succeeds_most_of_the_time() -> ShorResult<()> {
    // Three of the four possible phase estimates lead to 3 * 5.
    let summary = run_trials(&ShorConfig::new(15).with_coprime(7), &seeds(24))?;
    assert_eq!(summary.len(), 24);
    assert!(summary.successes() >= 10, "{:?}", summary);
    for trial in &summary.trials {
        if let FactorOutcome::Success(f1, f2) = trial.sim_result {
            assert_eq!((f1, f2), (3, 5));
        }
    }
    Ok(())
}

#[test]
fn greedy_walk_is_deterministic() -> ShorResult<()> {
    let summary = run_trials(&ShorConfig::new(15).with_coprime(7), &seeds(4))?;
    let first = summary.trials[0].polr_result;
    assert!(summary.trials.iter().all(|t| t.polr_result == first));
    assert_eq!(first, FactorOutcome::Failure);
    Ok(())
}

#[test]
fn random_base_still_factors() -> ShorResult<()> {
    let summary = run_trials(&ShorConfig::new(15), &seeds(12))?;
    for trial in &summary.trials {
        assert!(trial.coprime > 1 && trial.coprime < 15);
        if let FactorOutcome::Success(f1, f2) = trial.sim_result {
            assert_eq!(f1 * f2, 15, "base {}", trial.coprime);
        }
    }
    Ok(())
}

#[test]
fn twenty_one_factors_multiply_back() -> ShorResult<()> {
    let summary = run_trials(&ShorConfig::new(21).with_coprime(2), &seeds(6))?;
    for trial in &summary.trials {
        if let FactorOutcome::Success(f1, f2) = trial.sim_result {
            assert_eq!(f1 * f2, 21);
        }
    }
    Ok(())
}

#[test]
fn final_state_is_the_only_live_diagram() -> ShorResult<()> {
    let mut sim = ShorSimulator::new(ShorConfig::new(15).with_coprime(7).with_seed(3))?;
    sim.simulate(1);
    let root = sim.root_edge();
    let size = sim.package().size(root);
    let stats = sim.package().stats();
    assert_eq!(stats.referenced_matrix_nodes, 0);
    assert_eq!(stats.referenced_vector_nodes, size - 1);
    Ok(())
}

#[test]
fn approximation_is_recorded() -> ShorResult<()> {
    let exact_config = ShorConfig::new(15).with_coprime(7).with_seed(8);
    let mut exact = ShorSimulator::new(exact_config.clone())?;
    exact.simulate(1);

    // The work register holds four residues, so the widest level has at least four nodes and
    // the lightest of them carries at most a quarter of the mass.
    let config = exact_config.with_approximation(ApproximationPolicy::fidelity_driven(0.7, 3));
    let mut sim = ShorSimulator::new(config)?;
    sim.simulate(1);
    assert!(sim.approximation_runs() > 0);
    assert!(sim.approximation_runs() <= 3);
    assert!(sim.final_fidelity() < 1.0 - 1e-6);
    assert!(sim.final_fidelity() >= 0.7f64.powi(3) - 1e-12);
    assert!((exact.final_fidelity() - 1.0).abs() < 1e-12);

    let stats = sim.additional_statistics();
    assert_eq!(stats["approximation_runs"], sim.approximation_runs().to_string());
    Ok(())
}

#[test]
fn memory_driven_approximation_respects_step_count() -> ShorResult<()> {
    let config = ShorConfig::new(15)
        .with_coprime(7)
        .with_seed(8)
        .with_approximation(ApproximationPolicy::memory_driven(0.95, 1, 1));
    let mut sim = ShorSimulator::new(config)?;
    sim.simulate(1);
    assert_eq!(sim.approximation_runs(), 1);
    Ok(())
}

#[test]
fn verbose_run_matches_quiet_run() -> ShorResult<()> {
    let config = ShorConfig::new(15).with_coprime(7).with_seed(21);
    let mut quiet = ShorSimulator::new(config.clone())?;
    let mut verbose = ShorSimulator::new(config.with_verbose(true))?;
    quiet.simulate(1);
    verbose.simulate(1);
    assert_eq!(quiet.sim_sample(), verbose.sim_sample());
    assert_eq!(quiet.sim_result(), verbose.sim_result());
    Ok(())
}
