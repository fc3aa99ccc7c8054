// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TranslationPair>
// into one padded tensor batch.
//
//   source_tokens  [batch, src_width]   padded with <PAD>
//   source_lengths [batch]              true length of each row
//   target_tokens  [batch, trg_width]   padded with <PAD>
//   target_lengths [batch]
//
// Targets are padded to the longest row in the batch. Sources are
// padded to the longest row too, unless a fixed source width is
// configured, in which case every source row is padded or truncated to it
// (a truncated row keeps its final <END> token).
//
// Invariant: lengths[i] <= width for every row.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationPair;

#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    pub source_tokens:  Tensor<B, 2, Int>,
    pub source_lengths: Tensor<B, 1, Int>,
    pub target_tokens:  Tensor<B, 2, Int>,
    pub target_lengths: Tensor<B, 1, Int>,
}

impl<B: Backend> TranslationBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.target_tokens.dims()[0]
    }

    pub fn target_width(&self) -> usize {
        self.target_tokens.dims()[1]
    }
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device:           B::Device,
    pub pad_id:           u32,
    pub src_fix_length:   Option<usize>,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id, src_fix_length: None }
    }

    pub fn with_src_fix_length(mut self, len: Option<usize>) -> Self {
        self.src_fix_length = len.filter(|&l| l > 0);
        self
    }

    /// Flatten rows into a padded [rows, width] tensor plus a lengths tensor.
    fn pad_rows(&self, rows: Vec<&[u32]>, fixed: Option<usize>) -> (Tensor<B, 2, Int>, Tensor<B, 1, Int>) {
        let longest = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let width   = fixed.unwrap_or(longest).max(1);
        let count   = rows.len();

        let mut flat    = Vec::with_capacity(count * width);
        let mut lengths = Vec::with_capacity(count);

        for row in rows {
            let kept: Vec<u32> = if row.len() > width {
                let mut r = row[..width - 1].to_vec();
                r.push(row[row.len() - 1]);
                r
            } else {
                row.to_vec()
            };
            lengths.push(kept.len() as i32);
            flat.extend(kept.iter().map(|&id| id as i32));
            flat.extend(std::iter::repeat(self.pad_id as i32).take(width - kept.len()));
        }

        let tokens = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([count, width]);
        let lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device);
        (tokens, lengths)
    }
}

impl<B: Backend> Batcher<TranslationPair, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationPair>) -> TranslationBatch<B> {
        let (source_tokens, source_lengths) = self.pad_rows(
            items.iter().map(|p| p.source_ids.as_slice()).collect(),
            self.src_fix_length,
        );
        let (target_tokens, target_lengths) = self.pad_rows(
            items.iter().map(|p| p.target_ids.as_slice()).collect(),
            None,
        );

        TranslationBatch { source_tokens, source_lengths, target_tokens, target_lengths }
    }
}
