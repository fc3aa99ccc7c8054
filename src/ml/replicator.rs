// ============================================================
// Layer 5 — Multi-Device Replication
// ============================================================
// Data-parallel wrapper around a Seq2SeqModel.
//
// forward(batch):
//   1. split the batch rows into one contiguous shard per device
//   2. fork the model onto each device (same ParamIds, fresh leaves)
//   3. run every shard on its replica
//   4. move each output back to the primary device and concatenate
//      → [batch, trg_width, trg_vocab] on the primary device
//
// The loss is then computed once over the gathered output, and
// after backward each replica's gradients are pulled out by
// ParamId, moved to the primary device and summed.
//
// Replicas run one after another on the control thread.

use anyhow::{bail, Result};
use burn::{
    optim::{GradientsAccumulator, GradientsParams},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;

use crate::data::batcher::TranslationBatch;
use crate::ml::model::Seq2SeqModel;

#[derive(Debug, Clone)]
pub struct ReplicatedModel<B: AutodiffBackend> {
    inner:   Seq2SeqModel<B>,
    devices: Vec<B::Device>,
}

/// Output of one replicated forward pass.
pub struct ReplicatedForward<B: AutodiffBackend> {
    /// Gathered logits on the primary device
    pub predicted: Tensor<B, 3>,
    /// The per-device forks that produced them, needed to read gradients
    pub replicas:  Vec<Seq2SeqModel<B>>,
}

impl<B: AutodiffBackend> ReplicatedModel<B> {
    /// `devices[0]` becomes the primary device holding the master copy.
    pub fn wrap(model: Seq2SeqModel<B>, devices: Vec<B::Device>) -> Result<Self> {
        let Some(primary) = devices.first() else {
            bail!("Replication needs at least one device");
        };
        let inner = model.fork(primary);
        tracing::info!("Replicating model across {} devices", devices.len());
        Ok(Self { inner, devices })
    }

    pub fn primary_device(&self) -> &B::Device {
        &self.devices[0]
    }

    pub fn inner(&self) -> &Seq2SeqModel<B> {
        &self.inner
    }

    /// Replace the master copy (after an optimizer step).
    pub fn map_inner(self, f: impl FnOnce(Seq2SeqModel<B>) -> Seq2SeqModel<B>) -> Self {
        Self { inner: f(self.inner), devices: self.devices }
    }

    pub fn forward<R: Rng>(&self, batch: &TranslationBatch<B>, rng: &mut R) -> ReplicatedForward<B> {
        let primary = self.primary_device();
        let rows    = batch.batch_size();

        let mut outputs  = Vec::with_capacity(self.devices.len());
        let mut replicas = Vec::with_capacity(self.devices.len());

        for (device, range) in self.devices.iter().zip(shard_ranges(rows, self.devices.len())) {
            if range.is_empty() {
                continue;
            }
            let replica = self.inner.clone().fork(device);
            let shard   = shard_batch(batch, range, device);
            let out     = replica.forward_batch(&shard, rng);

            outputs.push(out.to_device(primary));
            replicas.push(replica);
        }

        ReplicatedForward { predicted: Tensor::cat(outputs, 0), replicas }
    }

    /// Sum every replica's gradients onto the primary device.
    pub fn reduce_gradients(&self, mut grads: B::Gradients, replicas: &[Seq2SeqModel<B>]) -> GradientsParams {
        let mut accumulator = GradientsAccumulator::<Seq2SeqModel<B>>::new();
        for replica in replicas {
            let replica_grads = GradientsParams::from_module(&mut grads, replica)
                .to_device(self.primary_device(), &self.inner);
            accumulator.accumulate(&self.inner, replica_grads);
        }
        accumulator.grads()
    }
}

/// Contiguous, near-equal row ranges; the first `rows % shards` get one extra.
pub fn shard_ranges(rows: usize, shards: usize) -> Vec<std::ops::Range<usize>> {
    let shards = shards.max(1);
    let base   = rows / shards;
    let extra  = rows % shards;

    let mut start  = 0;
    let mut ranges = Vec::with_capacity(shards);
    for i in 0..shards {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn shard_batch<B: Backend>(
    batch:  &TranslationBatch<B>,
    rows:   std::ops::Range<usize>,
    device: &B::Device,
) -> TranslationBatch<B> {
    let src_width = batch.source_tokens.dims()[1];
    let trg_width = batch.target_width();

    TranslationBatch {
        source_tokens:  batch.source_tokens.clone().slice([rows.clone(), 0..src_width]).to_device(device),
        source_lengths: batch.source_lengths.clone().slice([rows.clone()]).to_device(device),
        target_tokens:  batch.target_tokens.clone().slice([rows.clone(), 0..trg_width]).to_device(device),
        target_lengths: batch.target_lengths.clone().slice([rows]).to_device(device),
    }
}
