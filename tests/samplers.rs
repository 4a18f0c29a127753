use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use gwin::{
    data_likelihood_names, likelihood_evaluators, new_likelihood, new_sampler, sampler_names,
    AnalyticalPsd, Detector, FDomainDetFrameGenerator, GwinError, JointDistribution,
    LikelihoodArgs, LikelihoodEvaluator, Parameter, ParameterValues, Primitive, Sampler,
    SamplerConfig,
    WaveformSettings, TEST_PREFIX,
};
use pretty_assertions::assert_eq;

const F_LOWER: f64 = 20.;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A binary black hole two seconds after the start of the data.
fn injection(epoch: f64) -> ParameterValues {
    [
        (Parameter::Tc, epoch + 2.),
        (Parameter::Mass1, 38.6),
        (Parameter::Mass2, 29.3),
        (Parameter::Spin1z, 0.),
        (Parameter::Spin2z, 0.),
        (Parameter::Ra, 1.37),
        (Parameter::Dec, -1.26),
        (Parameter::Polarization, 2.76),
        (Parameter::Distance, 300.),
        (Parameter::CoaPhase, 1.1),
        (Parameter::Inclination, 0.4),
    ]
    .into_iter()
    .collect()
}

/// Zero noise data in two detectors with a design sensitivity PSD.
fn likelihood_args(return_meta: bool) -> Result<LikelihoodArgs> {
    let settings = WaveformSettings {
        epoch: 1_126_259_460.,
        ..Default::default()
    };
    let truth = injection(settings.epoch);
    let variable_params = truth.parameters();
    let detectors = vec![Detector::H1, Detector::L1];

    let generator = FDomainDetFrameGenerator::new(
        settings,
        variable_params.clone(),
        ParameterValues::new(),
        detectors.clone(),
    )?;
    let data = generator.generate(&truth.to_point())?;
    let psd = AnalyticalPsd::ZeroDetHighPower.generate(settings.len, settings.delta_f, F_LOWER)?;
    let psds = detectors.iter().map(|&det| (det, psd.clone())).collect::<BTreeMap<_, _>>();

    let prior = JointDistribution::from_reference(&truth)?;
    Ok(LikelihoodArgs::new(
        variable_params,
        data,
        generator,
        F_LOWER,
        psds,
        prior,
        return_meta,
    ))
}

fn config() -> SamplerConfig {
    SamplerConfig {
        ntemps: 2,
        nwalkers: 30,
        niterations: 4,
        update_interval: 1,
        nprocesses: 2,
        seed: 0,
    }
}

#[test]
fn prior_covers_variable_params() -> Result<()> {
    let args = likelihood_args(false)?;
    for name in data_likelihood_names() {
        let likelihood = new_likelihood(name, args.clone())?;
        let prior_params = likelihood.prior().parameters();
        for param in likelihood.variable_params() {
            assert!(prior_params.contains(param), "{name}: {param} has no prior");
        }
    }
    Ok(())
}

#[test]
fn every_sampler_runs_with_every_likelihood() -> Result<()> {
    init_logging();
    let args = likelihood_args(true)?;
    for likelihood_name in data_likelihood_names() {
        let likelihood: Arc<dyn LikelihoodEvaluator> = new_likelihood(likelihood_name, args.clone())?;
        for sampler_name in sampler_names() {
            let mut sampler = new_sampler(sampler_name, config(), likelihood.clone())?;
            sampler.set_p0()?;
            sampler.run(4)?;
            assert_eq!(
                sampler.niterations(),
                4,
                "{sampler_name} with {likelihood_name}"
            );
            assert_eq!(sampler.name(), sampler_name);
        }
    }
    Ok(())
}

#[test]
fn sampler_enumeration_is_stable() {
    let first = sampler_names();
    let second = sampler_names();
    assert_eq!(first, second);
    assert_eq!(first, vec!["emcee", "emcee_pt", "mcmc", "nested"]);
}

#[test]
fn likelihood_enumeration_skips_test_kinds() {
    let names = data_likelihood_names();
    assert!(!names.is_empty());
    assert!(names.iter().all(|name| !name.starts_with(TEST_PREFIX)));

    let hidden = likelihood_evaluators()
        .names()
        .filter(|name| name.starts_with(TEST_PREFIX))
        .count();
    assert_eq!(names.len() + hidden, likelihood_evaluators().len());
}

#[test]
fn zero_iterations_are_rejected() -> Result<()> {
    let likelihood = new_likelihood("gaussian", likelihood_args(false)?)?;
    let bad = SamplerConfig {
        niterations: 0,
        ..config()
    };
    for name in sampler_names() {
        let err = new_sampler(name, bad, likelihood.clone()).err();
        assert!(matches!(err, Some(GwinError::Config(_))), "{name}");

        let mut sampler = new_sampler(name, config(), likelihood.clone())?;
        sampler.set_p0()?;
        assert!(matches!(sampler.run(0), Err(GwinError::InvalidIterations(0))), "{name}");
    }
    Ok(())
}

#[test]
fn unknown_parameter_names_fail_before_sampling() {
    let err = JointDistribution::from_names(&["mass1", "chirp_mass"], &[30., 25.]).unwrap_err();
    assert_eq!(err.to_string(), "Do not recognize parameter chirp_mass");
}

#[test]
fn prior_wider_than_likelihood_support() -> Result<()> {
    // Negative masses give no waveform, so some initial points have an
    // undefined likelihood.
    let mut args = likelihood_args(false)?;
    let entries = args
        .prior
        .parameters()
        .iter()
        .map(|&param| {
            let dist = match param {
                Parameter::Mass1 => Primitive::uniform(-10., 50.)?,
                _ => args.prior.marginal(param).ok_or(GwinError::MissingParameter(param))?,
            };
            Ok((param, dist))
        })
        .collect::<gwin::Result<Vec<_>>>()?;
    args.prior = JointDistribution::new(entries)?;

    let likelihood = new_likelihood("gaussian", args)?;
    let many_walkers = SamplerConfig {
        nwalkers: 300,
        ..config()
    };
    let mut sampler = new_sampler("mcmc", many_walkers, likelihood)?;
    match sampler.set_p0() {
        Err(GwinError::SupportMismatch { temperature, .. }) => assert_eq!(temperature, 0),
        other => panic!("expected a support mismatch, got {other:?}"),
    }
    Ok(())
}
