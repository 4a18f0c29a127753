use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gwin::{
    new_likelihood, new_sampler, AnalyticalPsd, Detector, FDomainDetFrameGenerator,
    JointDistribution, LikelihoodArgs, LikelihoodEvaluator, Parameter, ParameterValues, Sampler,
    SamplerConfig, WaveformSettings,
};

fn injection() -> ParameterValues {
    [
        (Parameter::Mass1, 38.6),
        (Parameter::Mass2, 29.3),
        (Parameter::Spin1z, 0.),
        (Parameter::Spin2z, 0.),
        (Parameter::Ra, 1.37),
        (Parameter::Dec, -1.26),
        (Parameter::Distance, 300.),
        (Parameter::Inclination, 0.4),
        (Parameter::Polarization, 2.76),
        (Parameter::CoaPhase, 1.1),
        (Parameter::Tc, 2.),
    ]
    .into_iter()
    .collect()
}

fn make_args() -> LikelihoodArgs {
    let settings = WaveformSettings::default();
    let truth = injection();
    let detectors = vec![Detector::H1, Detector::L1];
    let generator = FDomainDetFrameGenerator::new(
        settings,
        truth.parameters(),
        ParameterValues::new(),
        detectors.clone(),
    )
    .unwrap();
    let data = generator.generate(&truth.to_point()).unwrap();
    let psd = AnalyticalPsd::ZeroDetHighPower
        .generate(settings.len, settings.delta_f, 20.)
        .unwrap();
    let psds: BTreeMap<_, _> = detectors.iter().map(|&d| (d, psd.clone())).collect();
    let prior = JointDistribution::from_reference(&truth).unwrap();
    LikelihoodArgs::new(truth.parameters(), data, generator, 20., psds, prior, false)
}

fn criterion_benchmark(c: &mut Criterion) {
    let point = injection().to_point();

    for name in ["gaussian", "marginalized_phase"] {
        let likelihood = new_likelihood(name, make_args()).unwrap();
        c.bench_function(&format!("{name} loglikelihood"), |b| {
            b.iter(|| likelihood.loglikelihood(black_box(&point)).unwrap())
        });
    }

    let likelihood = new_likelihood("gaussian", make_args()).unwrap();
    for nprocesses in [1, 4] {
        let config = SamplerConfig {
            nwalkers: 64,
            nprocesses,
            ..Default::default()
        };
        c.bench_function(&format!("emcee 64 walkers, {nprocesses} threads"), |b| {
            b.iter_batched(
                || {
                    let mut sampler = new_sampler("emcee", config, likelihood.clone()).unwrap();
                    sampler.set_p0().unwrap();
                    sampler
                },
                |mut sampler| sampler.run(black_box(5)).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
