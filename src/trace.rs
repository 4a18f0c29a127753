use std::sync::Arc;

use arrow::{
    array::{Array, ArrayBuilder, FixedSizeListBuilder, Float64Builder, PrimitiveBuilder},
    datatypes::Float64Type,
};

use crate::likelihood::Evaluation;

/// Collects the points a sampler visits at one temperature.
pub trait DrawStorage: Send {
    fn append_value(&mut self, point: &[f64], stats: &Evaluation);
    fn finalize(self) -> TraceOutput;
    fn inspect(&self) -> TraceOutput;
}

/// Columnar view of the samples drawn at one temperature.
///
/// `draws` is a fixed size list array with one entry per stored point,
/// `loglikelihood` and `logprior` are aligned with it.
#[derive(Debug, Clone)]
pub struct TraceOutput {
    pub temperature: usize,
    pub draws: Arc<dyn Array>,
    pub loglikelihood: Arc<dyn Array>,
    pub logprior: Arc<dyn Array>,
}

impl TraceOutput {
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

pub struct ArrowDrawStorage {
    temperature: usize,
    draws: FixedSizeListBuilder<PrimitiveBuilder<Float64Type>>,
    loglikelihood: Float64Builder,
    logprior: Float64Builder,
}

impl ArrowDrawStorage {
    pub fn new(temperature: usize, dim: usize) -> Self {
        let items = PrimitiveBuilder::new();
        let draws = FixedSizeListBuilder::new(items, dim as _);
        Self {
            temperature,
            draws,
            loglikelihood: Float64Builder::new(),
            logprior: Float64Builder::new(),
        }
    }
}

impl DrawStorage for ArrowDrawStorage {
    fn append_value(&mut self, point: &[f64], stats: &Evaluation) {
        self.draws.values().append_slice(point);
        self.draws.append(true);
        self.loglikelihood.append_value(stats.loglikelihood);
        self.logprior.append_value(stats.logprior);
    }

    fn finalize(mut self) -> TraceOutput {
        TraceOutput {
            temperature: self.temperature,
            draws: ArrayBuilder::finish(&mut self.draws),
            loglikelihood: ArrayBuilder::finish(&mut self.loglikelihood),
            logprior: ArrayBuilder::finish(&mut self.logprior),
        }
    }

    fn inspect(&self) -> TraceOutput {
        TraceOutput {
            temperature: self.temperature,
            draws: ArrayBuilder::finish_cloned(&self.draws),
            loglikelihood: ArrayBuilder::finish_cloned(&self.loglikelihood),
            logprior: ArrayBuilder::finish_cloned(&self.logprior),
        }
    }
}
