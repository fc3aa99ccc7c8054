// ============================================================
// Layer 5 — SimpleLSTM Variant
// ============================================================
// Plain recurrent encoder/decoder without attention.
//
//   source ──► encoder ──► last hidden ──► bridge (tanh) ──► h0
//                                                            │
//   target ──► embedding ──► decoder LSTM stack (init h0) ───┘
//                                  │
//                                  ▼
//                          projection → [batch, trg_width, trg_vocab]
//
// The decoder always reads the gold target sequence (full teacher
// forcing). Every decoder layer starts from the same bridged hidden
// state and a zero cell state.

use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmState,
    },
    prelude::*,
    tensor::activation::tanh,
};

use crate::ml::encoder::{stacked_lstm, RecurrentEncoder, RecurrentEncoderConfig};
use crate::ml::hyper::SimpleLstmArgs;

#[derive(Config, Debug)]
pub struct SimpleLstmConfig {
    pub src_vocab_size:     usize,
    pub trg_vocab_size:     usize,
    #[config(default = 256)]
    pub encoder_embed_dim:  usize,
    #[config(default = 512)]
    pub encoder_hidden_dim: usize,
    #[config(default = 0.1)]
    pub encoder_dropout:    f64,
    #[config(default = 1)]
    pub encoder_layers:     usize,
    #[config(default = 256)]
    pub decoder_embed_dim:  usize,
    #[config(default = 512)]
    pub decoder_hidden_dim: usize,
    #[config(default = 0.1)]
    pub decoder_dropout:    f64,
    #[config(default = 1)]
    pub decoder_layers:     usize,
}

impl SimpleLstmConfig {
    pub fn from_args(args: &SimpleLstmArgs, src_vocab_size: usize, trg_vocab_size: usize) -> Self {
        let r = &args.recurrent;
        Self::new(src_vocab_size, trg_vocab_size)
            .with_encoder_embed_dim(r.encoder_embed_dim)
            .with_encoder_hidden_dim(r.encoder_hidden_dim)
            .with_encoder_dropout(r.encoder_dropout)
            .with_encoder_layers(r.encoder_layers)
            .with_decoder_embed_dim(r.decoder_embed_dim)
            .with_decoder_hidden_dim(r.decoder_hidden_dim)
            .with_decoder_dropout(r.decoder_dropout)
            .with_decoder_layers(r.decoder_layers)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleLstmModel<B> {
        let encoder = RecurrentEncoderConfig::new(
            self.src_vocab_size,
            self.encoder_embed_dim,
            self.encoder_hidden_dim,
        )
        .with_num_layers(self.encoder_layers)
        .with_dropout(self.encoder_dropout)
        .init(device);

        SimpleLstmModel {
            encoder,
            embedding:  EmbeddingConfig::new(self.trg_vocab_size, self.decoder_embed_dim).init(device),
            layers:     stacked_lstm(self.decoder_embed_dim, self.decoder_hidden_dim, self.decoder_layers, device),
            bridge:     LinearConfig::new(self.encoder_hidden_dim, self.decoder_hidden_dim).init(device),
            projection: LinearConfig::new(self.decoder_hidden_dim, self.trg_vocab_size).init(device),
            dropout:    DropoutConfig::new(self.decoder_dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct SimpleLstmModel<B: Backend> {
    pub encoder:    RecurrentEncoder<B>,
    pub embedding:  Embedding<B>,
    pub layers:     Vec<Lstm<B>>,
    pub bridge:     Linear<B>,
    pub projection: Linear<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> SimpleLstmModel<B> {
    /// source [batch, src_width], target [batch, trg_width]
    /// → logits [batch, trg_width, trg_vocab]
    pub fn forward(
        &self,
        source:         Tensor<B, 2, Int>,
        source_lengths: Tensor<B, 1, Int>,
        target:         Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let encoded = self.encoder.forward(source, source_lengths);
        let h0      = tanh(self.bridge.forward(encoded.last_hidden));
        let c0      = h0.zeros_like();

        let mut x = self.dropout.forward(self.embedding.forward(target));
        for layer in &self.layers {
            let state  = LstmState::new(c0.clone(), h0.clone());
            let (out, _) = layer.forward(x, Some(state));
            x = self.dropout.forward(out);
        }

        self.projection.forward(x)
    }
}
