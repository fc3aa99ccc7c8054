// ============================================================
// Layer 5 — Optimizer Selection
// ============================================================
// Maps OptimizerKind to a Burn optimizer:
//
//   sgd   → SgdConfig  + weight decay
//   adam  → AdamConfig + weight decay
//
// Burn's Optimizer trait carries its record type, so it can't be
// boxed directly. ParamUpdate erases it: the trainer only ever
// needs "apply these gradients at this learning rate".

use burn::{
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer, SgdConfig,
    },
    tensor::backend::AutodiffBackend,
};

use crate::domain::run_context::OptimizerKind;

pub trait ParamUpdate<B: AutodiffBackend, M: AutodiffModule<B>> {
    fn apply(&mut self, learning_rate: f64, module: M, grads: GradientsParams) -> M;
}

impl<B, M, O> ParamUpdate<B, M> for O
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn apply(&mut self, learning_rate: f64, module: M, grads: GradientsParams) -> M {
        self.step(learning_rate, module, grads)
    }
}

pub fn build_optimizer<B, M>(kind: OptimizerKind, weight_decay: f64) -> Box<dyn ParamUpdate<B, M>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    let decay = (weight_decay > 0.0).then(|| WeightDecayConfig::new(weight_decay as f32));
    match kind {
        OptimizerKind::Sgd => {
            println!("using stochastic gradient descent optimizer");
            Box::new(SgdConfig::new().with_weight_decay(decay).init::<B, M>())
        }
        OptimizerKind::Adam => {
            println!("using adam optimizer");
            Box::new(AdamConfig::new().with_weight_decay(decay).init::<B, M>())
        }
    }
}
