// ============================================================
// Layer 5 — Masked Next-Token Loss
// ============================================================
// Cross-entropy where <PAD> target positions count for nothing:
//
//   loss = - Σ_k m_k · log p_k(gold_k) / max(Σ_k m_k, 1)
//   m_k  = 1 if gold_k != pad else 0
//
// Two alignments of predictions against gold tokens:
//
//   compute            per row: predicted[:, 0..L-1] vs target[:, 1..L]
//   compute_gathered   replicated path. The gathered logits are
//                      flattened to one batch×position axis first and
//                      row k is paired with gold token k+1 of the
//                      flattened target. Pairs that would cross from
//                      the end of one row into the start of the next
//                      are masked as pad, so both paths agree.
//
// A batch with no non-pad target position has loss 0.

use burn::{prelude::*, tensor::activation::log_softmax};

#[derive(Debug, Clone, Copy)]
pub struct LossComputer {
    pub pad_id: u32,
}

impl LossComputer {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }

    /// predicted [batch, width, vocab], target [batch, width] → scalar loss [1]
    pub fn compute<B: Backend>(&self, predicted: Tensor<B, 3>, target: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch, width, vocab] = predicted.dims();
        if width < 2 {
            return predicted.sum().mul_scalar(0.0);
        }
        let steps = batch * (width - 1);

        let logits = predicted
            .slice([0..batch, 0..width - 1, 0..vocab])
            .reshape([steps, vocab]);
        let gold = target.slice([0..batch, 1..width]).reshape([steps]);

        masked_cross_entropy(logits, gold, self.pad_id)
    }

    /// Same loss, computed over the flattened gathered output of all replicas.
    pub fn compute_gathered<B: Backend>(&self, predicted: Tensor<B, 3>, target: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch, width, vocab] = predicted.dims();
        let total = batch * width;
        if width < 2 {
            return predicted.sum().mul_scalar(0.0);
        }

        let flat_logits = predicted.reshape([total, vocab]);
        let flat_gold   = target.reshape([total]);
        let device      = flat_gold.device();

        let logits = flat_logits.slice([0..total - 1, 0..vocab]);
        let gold   = flat_gold.slice([1..total]);

        // gold index k+1 sits at a row start → the pair spans two rows
        let crossing: Vec<i32> = (0..total - 1)
            .map(|k| i32::from((k + 1) % width == 0))
            .collect();
        let crossing = Tensor::<B, 1, Int>::from_ints(crossing.as_slice(), &device).equal_elem(1);
        let gold     = gold.mask_fill(crossing, self.pad_id as i32);

        masked_cross_entropy(logits, gold, self.pad_id)
    }
}

/// logits [n, vocab], gold [n] → mean NLL over non-pad rows, shape [1]
pub fn masked_cross_entropy<B: Backend>(logits: Tensor<B, 2>, gold: Tensor<B, 1, Int>, pad_id: u32) -> Tensor<B, 1> {
    let [n, _] = logits.dims();

    let log_probs = log_softmax(logits, 1);
    let picked    = log_probs.gather(1, gold.clone().reshape([n, 1])).reshape([n]);
    let mask      = gold.equal_elem(pad_id as i32).bool_not().float();

    let denom = mask.clone().sum().clamp_min(1.0);
    (picked * mask).sum().neg() / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_pad_positions_do_not_count() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[2.0, 0.5, 0.1], [0.0, 0.0, 0.0], [9.0, -9.0, 3.0]],
            &device,
        );
        let only_first  = Tensor::<TestBackend, 1, Int>::from_ints([1, 0, 0], &device);
        let loss_masked = scalar(masked_cross_entropy(logits.clone(), only_first, 0));

        let first_row = logits.slice([0..1, 0..3]);
        let gold      = Tensor::<TestBackend, 1, Int>::from_ints([1], &device);
        let loss_one  = scalar(masked_cross_entropy(first_row, gold, 0));

        assert!((loss_masked - loss_one).abs() < 1e-6);
    }

    #[test]
    fn test_all_pad_batch_has_zero_loss() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::ones([4, 5], &device);
        let gold   = Tensor::<TestBackend, 1, Int>::zeros([4], &device);
        assert_eq!(scalar(masked_cross_entropy(logits, gold, 0)), 0.0);
    }

    #[test]
    fn test_uniform_logits_give_log_vocab() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let gold   = Tensor::<TestBackend, 1, Int>::from_ints([1, 3], &device);
        let loss   = scalar(masked_cross_entropy(logits, gold, 0));
        assert!((loss - 4f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_shift_aligns_prediction_t_with_target_t_plus_1() {
        let device = Default::default();
        // row predicts token 2 strongly at position 0; target[1] = 2
        let mut values = vec![0.0f32; 3 * 4];
        values[2] = 20.0;
        let predicted = Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &device).reshape([1, 3, 4]);
        let target    = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 0], &device).reshape([1, 3]);

        let loss = scalar(LossComputer::new(0).compute(predicted, target));
        assert!(loss < 1e-4);
    }

    #[test]
    fn test_gathered_path_matches_per_row_path() {
        let device    = Default::default();
        let predicted = Tensor::<TestBackend, 3>::random(
            [3, 4, 6],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let target = Tensor::<TestBackend, 1, Int>::from_ints(
            [2, 4, 5, 3, 2, 3, 0, 0, 2, 1, 3, 0],
            &device,
        )
        .reshape([3, 4]);

        let loss   = LossComputer::new(0);
        let plain  = scalar(loss.compute(predicted.clone(), target.clone()));
        let gather = scalar(loss.compute_gathered(predicted, target));
        assert!((plain - gather).abs() < 1e-5);
    }

    #[test]
    fn test_single_position_target_is_zero() {
        let device    = Default::default();
        let predicted = Tensor::<TestBackend, 3>::ones([2, 1, 5], &device);
        let target    = Tensor::<TestBackend, 2, Int>::zeros([2, 1], &device);
        assert_eq!(scalar(LossComputer::new(0).compute(predicted, target)), 0.0);
    }
}
