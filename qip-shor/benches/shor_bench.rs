#[macro_use]
extern crate bencher;

use bencher::Bencher;
use qip_shor::arithmetic::ModularArithmetic;
use qip_shor::prelude::*;
use qip_shor::qip_dd::prelude::*;

fn bench_modular_multiplier(b: &mut Bencher) {
    let bits = 5;
    b.iter(|| {
        let mut dd = Package::new(bits);
        ModularArithmetic::new(&mut dd, 21, bits).modular_multiplier(5)
    });
}

fn bench_factor_15(b: &mut Bencher) {
    b.iter(|| {
        let mut sim = ShorSimulator::new(ShorConfig::new(15).with_coprime(7).with_seed(1)).unwrap();
        sim.simulate(1);
        sim.sim_result()
    });
}

fn bench_factor_21_approximated(b: &mut Bencher) {
    let config = ShorConfig::new(21)
        .with_coprime(2)
        .with_seed(1)
        .with_approximation(ApproximationPolicy::fidelity_driven(0.95, 4));
    b.iter(|| {
        let mut sim = ShorSimulator::new(config.clone()).unwrap();
        sim.simulate(1);
        sim.final_fidelity()
    });
}

benchmark_group!(
    benches,
    bench_modular_multiplier,
    bench_factor_15,
    bench_factor_21_approximated
);
benchmark_main!(benches);
