// ============================================================
// Layer 5 — Recurrent Encoder (shared by both variants)
// ============================================================
// Embedding → stacked LSTM over the padded source batch.
//
// Output:
//   states        [batch, src_width, hidden]  every position
//   last_hidden   [batch, hidden]             top layer at position len-1
//   padding_mask  [batch, src_width]          true where position >= len
//
// Burn's LSTM has no packed-sequence input, so the padded tail is
// still run through the recurrence. The true last state is picked
// out by length instead of taking the final time step.

use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct RecurrentEncoderConfig {
    pub vocab_size: usize,
    pub embed_dim:  usize,
    pub hidden_dim: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
}

impl RecurrentEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentEncoder<B> {
        RecurrentEncoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            layers:    stacked_lstm(self.embed_dim, self.hidden_dim, self.num_layers, device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub layers:    Vec<Lstm<B>>,
    pub dropout:   Dropout,
}

pub struct EncoderOutput<B: Backend> {
    pub states:       Tensor<B, 3>,
    pub last_hidden:  Tensor<B, 2>,
    pub padding_mask: Tensor<B, 2, Bool>,
}

impl<B: Backend> RecurrentEncoder<B> {
    pub fn forward(&self, source: Tensor<B, 2, Int>, lengths: Tensor<B, 1, Int>) -> EncoderOutput<B> {
        let [batch, width] = source.dims();

        let mut x = self.dropout.forward(self.embedding.forward(source));
        let top   = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let (out, _) = layer.forward(x, None);
            // no dropout on the top layer's output
            x = if i < top { self.dropout.forward(out) } else { out };
        }

        let hidden   = x.dims()[2];
        let last_pos = lengths
            .clone()
            .sub_scalar(1)
            .clamp_min(0)
            .reshape([batch, 1, 1])
            .expand([batch, 1, hidden]);
        let last_hidden = x.clone().gather(1, last_pos).reshape([batch, hidden]);

        EncoderOutput {
            states:       x,
            last_hidden,
            padding_mask: padding_mask(lengths, width),
        }
    }
}

/// `num_layers` LSTMs where layer 0 reads `input_dim` features and the
/// rest read the previous layer's hidden state. At least one layer.
pub fn stacked_lstm<B: Backend>(
    input_dim:  usize,
    hidden_dim: usize,
    num_layers: usize,
    device:     &B::Device,
) -> Vec<Lstm<B>> {
    (0..num_layers.max(1))
        .map(|i| {
            let d_input = if i == 0 { input_dim } else { hidden_dim };
            LstmConfig::new(d_input, hidden_dim, true).init(device)
        })
        .collect()
}

/// True at every position `>= length` of its row.
pub fn padding_mask<B: Backend>(lengths: Tensor<B, 1, Int>, width: usize) -> Tensor<B, 2, Bool> {
    let [batch] = lengths.dims();
    let positions = Tensor::<B, 1, Int>::arange(0..width as i64, &lengths.device())
        .unsqueeze::<2>()
        .expand([batch, width]);
    positions.greater_equal(lengths.reshape([batch, 1]).expand([batch, width]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_padding_mask_marks_tail() {
        let device  = Default::default();
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([3, 1], &device);
        let mask: Vec<bool> = padding_mask(lengths, 4).into_data().iter::<bool>().collect();
        assert_eq!(
            mask,
            vec![false, false, false, true, false, true, true, true]
        );
    }

    #[test]
    fn test_encoder_shapes() {
        let device  = Default::default();
        let encoder = RecurrentEncoderConfig::new(10, 4, 6)
            .with_num_layers(2)
            .init::<TestBackend>(&device);
        let source  = Tensor::<TestBackend, 1, Int>::from_ints([2, 5, 6, 3, 2, 3, 0, 0], &device)
            .reshape([2, 4]);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([4, 2], &device);

        let out = encoder.forward(source, lengths);
        assert_eq!(out.states.dims(), [2, 4, 6]);
        assert_eq!(out.last_hidden.dims(), [2, 6]);
        assert_eq!(out.padding_mask.dims(), [2, 4]);
    }

    #[test]
    fn test_last_hidden_follows_length() {
        let device  = Default::default();
        let encoder = RecurrentEncoderConfig::new(10, 4, 3).init::<TestBackend>(&device);
        let source  = Tensor::<TestBackend, 1, Int>::from_ints([2, 5, 3, 0], &device).reshape([1, 4]);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([3], &device);

        let out = encoder.forward(source, lengths);
        let at_len = out.states.slice([0..1, 2..3, 0..3]).reshape([1, 3]);
        out.last_hidden
            .into_data()
            .assert_approx_eq(&at_len.into_data(), 5);
    }
}
