// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists a Vocabulary as a HuggingFace tokenizer JSON and
// encodes sentences through the reloaded `tokenizers::Tokenizer`.
//
//   {log_dir}/src_tokenizer.json
//   {log_dir}/trg_tokenizer.json
//
// The JSON is written by hand (WordLevel model, Lowercase
// normalizer, WhitespaceSplit pre-tokenizer) so the ids are exactly
// the Vocabulary's ids: <PAD>=0 <UNK>=1 <START>=2 <END>=3, then
// learned tokens in vocabulary order.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::vocab::{Vocabulary, SPECIAL_TOKENS, UNKNOWN_TOKEN};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}_tokenizer.json"))
    }

    /// Write `vocab` as `{name}_tokenizer.json`.
    pub fn save(&self, name: &str, vocab: &Vocabulary) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut ids = serde_json::Map::new();
        for (id, token) in vocab.tokens().iter().enumerate() {
            ids.insert(token.clone(), serde_json::json!(id));
        }

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .map(|t| serde_json::json!({
                "id": vocab.stoi(t),
                "content": t,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": ids,
                "unk_token": UNKNOWN_TOKEN
            }
        });

        let path = self.path(name);
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON '{}'", path.display()))?;

        tracing::info!("Saved {} vocabulary ({} tokens) to '{}'", name, vocab.len(), path.display());
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Tokenizer> {
        let path = self.path(name);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Sentence encoder backed by the saved tokenizer for `name`.
    pub fn encoder(&self, name: &str, vocab: &Vocabulary) -> Result<SentenceEncoder> {
        Ok(SentenceEncoder {
            tokenizer: self.load(name)?,
            start_id:  vocab.start_id(),
            end_id:    vocab.end_id(),
        })
    }
}

pub struct SentenceEncoder {
    tokenizer: Tokenizer,
    start_id:  u32,
    end_id:    u32,
}

impl SentenceEncoder {
    /// `<START> ids… <END>`
    pub fn encode(&self, sentence: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(sentence, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        let mut ids = Vec::with_capacity(enc.len() + 2);
        ids.push(self.start_id);
        ids.extend_from_slice(enc.get_ids());
        ids.push(self.end_id);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_tokenizer_matches_vocabulary() {
        let tmp   = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::build(["the cat sat", "the dog sat", "The cat ran"], 1, 100);
        let store = VocabStore::new(tmp.path());

        let path = store.save("src", &vocab).unwrap();
        assert_eq!(path, tmp.path().join("src_tokenizer.json"));

        let enc = store.encoder("src", &vocab).unwrap();
        for sentence in ["The Cat sat", "a zebra ran", "dog"] {
            assert_eq!(enc.encode(sentence).unwrap(), vocab.encode(sentence));
        }
    }

    #[test]
    fn test_reserved_ids_survive_round_trip() {
        let tmp   = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_tokens(["bonjour"]);
        let store = VocabStore::new(tmp.path());
        store.save("trg", &vocab).unwrap();

        let tok = store.load("trg").unwrap();
        for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
            assert_eq!(tok.token_to_id(token), Some(id as u32));
        }
        assert_eq!(tok.token_to_id("bonjour"), Some(4));
    }
}
