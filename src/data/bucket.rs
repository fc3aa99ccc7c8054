// ============================================================
// Layer 4 — Bucket Iterator
// ============================================================
// Groups examples of similar source length into the same batch
// so little compute is spent on padding.
//
// Per epoch:
//   1. Shuffle all example indices (seeded by seed + epoch)
//   2. Cut into pools of 100 × batch_size and sort each pool
//      by source length
//   3. Cut each pool into batches, sort every batch by source
//      length, longest first
//   4. Shuffle the order of the batches
//
// The same seed always yields the same batch sequence.

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::TranslationPair,
};
use crate::domain::traits::BatchSource;

const POOL_FACTOR: usize = 100;

pub struct BucketIterator<B: Backend> {
    pairs:      Vec<TranslationPair>,
    batcher:    TranslationBatcher<B>,
    batch_size: usize,
    seed:       u64,
}

impl<B: Backend> BucketIterator<B> {
    pub fn new<D: Dataset<TranslationPair>>(
        dataset:    D,
        batcher:    TranslationBatcher<B>,
        batch_size: usize,
        seed:       u64,
    ) -> Self {
        Self {
            pairs: dataset.iter().collect(),
            batcher,
            batch_size: batch_size.max(1),
            seed,
        }
    }

    /// Index lists of every batch for one epoch.
    pub fn epoch_plan(&self, epoch: usize) -> Vec<Vec<usize>> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));

        let mut order: Vec<usize> = (0..self.pairs.len()).collect();
        order.shuffle(&mut rng);

        let src_len = |i: &usize| self.pairs[*i].source_ids.len();
        let mut batches: Vec<Vec<usize>> = Vec::with_capacity(self.num_batches());

        for pool in order.chunks(self.batch_size * POOL_FACTOR) {
            let mut pool = pool.to_vec();
            pool.sort_by_key(src_len);
            for chunk in pool.chunks(self.batch_size) {
                let mut batch = chunk.to_vec();
                batch.sort_by_key(|i| std::cmp::Reverse(src_len(i)));
                batches.push(batch);
            }
        }

        batches.shuffle(&mut rng);
        batches
    }
}

impl<B: Backend> BatchSource for BucketIterator<B> {
    type Batch = TranslationBatch<B>;

    fn num_batches(&self) -> usize {
        self.pairs.len().div_ceil(self.batch_size)
    }

    fn epoch_batches(&mut self, epoch: usize) -> Box<dyn Iterator<Item = TranslationBatch<B>> + '_> {
        let plan = self.epoch_plan(epoch);
        tracing::debug!("Epoch {} planned as {} batches", epoch, plan.len());
        Box::new(plan.into_iter().map(move |indices| {
            let items = indices.iter().map(|&i| self.pairs[i].clone()).collect();
            self.batcher.batch(items)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::TranslationDataset;
    use burn::backend::NdArray;

    fn iterator(n: usize, batch_size: usize, seed: u64) -> BucketIterator<NdArray> {
        let pairs = (0..n)
            .map(|i| TranslationPair {
                source_ids: vec![2; 2 + i % 7],
                target_ids: vec![2, 3],
            })
            .collect();
        let batcher = TranslationBatcher::new(Default::default(), 0);
        BucketIterator::new(TranslationDataset::new(pairs), batcher, batch_size, seed)
    }

    #[test]
    fn test_plan_covers_every_example_once() {
        let it   = iterator(23, 4, 1);
        let plan = it.epoch_plan(0);
        assert_eq!(plan.len(), it.num_batches());
        assert_eq!(plan.len(), 6);

        let mut seen: Vec<usize> = plan.into_iter().flatten().collect();
        seen.sort();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn test_batches_sorted_longest_first() {
        let it = iterator(40, 8, 3);
        for batch in it.epoch_plan(2) {
            let lens: Vec<usize> = batch.iter().map(|&i| it.pairs[i].source_ids.len()).collect();
            assert!(lens.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn test_plan_is_reproducible_per_seed_and_epoch() {
        let it = iterator(30, 4, 9);
        assert_eq!(it.epoch_plan(1), it.epoch_plan(1));
        assert_eq!(iterator(30, 4, 9).epoch_plan(0), it.epoch_plan(0));
    }

    #[test]
    fn test_yields_tensor_batches() {
        let mut it = iterator(10, 4, 0);
        let sizes: Vec<usize> = it.epoch_batches(0).map(|b| b.batch_size()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert_eq!(sizes.len(), 3);
    }
}
