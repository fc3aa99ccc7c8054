use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::loader::SentencePair;

/// One encoded example: `<START> ... <END>` ids on both sides, unpadded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationPair {
    pub source_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
}

pub struct TranslationDataset {
    pairs: Vec<TranslationPair>,
}

impl TranslationDataset {
    pub fn new(pairs: Vec<TranslationPair>) -> Self { Self { pairs } }

    /// Encode every sentence pair with the given source/target encoders.
    pub fn encode<FS, FT>(sentences: &[SentencePair], encode_src: FS, encode_trg: FT) -> Result<Self>
    where
        FS: Fn(&str) -> Result<Vec<u32>>,
        FT: Fn(&str) -> Result<Vec<u32>>,
    {
        let pairs = sentences
            .iter()
            .map(|p| {
                Ok(TranslationPair {
                    source_ids: encode_src(&p.source)?,
                    target_ids: encode_trg(&p.target)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pairs })
    }

}

impl Dataset<TranslationPair> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationPair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
