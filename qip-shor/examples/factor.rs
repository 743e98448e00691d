use qip_shor::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> ShorResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let composite = args
        .next()
        .map(|s| s.parse::<u64>())
        .transpose()
        .map_err(|e| ShorError::new(format!("invalid composite number: {}", e)))?
        .unwrap_or(15);
    let coprime = args
        .next()
        .map(|s| s.parse::<u64>())
        .transpose()
        .map_err(|e| ShorError::new(format!("invalid base: {}", e)))?
        .unwrap_or(0);

    let config = ShorConfig::new(composite)
        .with_coprime(coprime)
        .with_verbose(true)
        .with_approximation(ApproximationPolicy::fidelity_driven(0.9, 2));
    let mut sim = ShorSimulator::new(config.clone())?;
    sim.simulate(1);
    for (key, value) in sim.additional_statistics() {
        println!("{:>20}: {}", key, value);
    }

    let summary = run_trials(&config.with_verbose(false), &(0..16).collect::<Vec<_>>())?;
    println!(
        "{} of {} attempts found factors, first: {:?}",
        summary.successes(),
        summary.len(),
        summary.first_factors()
    );
    Ok(())
}
