// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// A bidirectional token <-> id map. The four reserved tokens
// always occupy ids 0..=3 in this order:
//
//   <PAD>   = 0   padding, masked out of the loss
//   <UNK>   = 1   any word not in the vocabulary
//   <START> = 2   prepended to every encoded sentence
//   <END>   = 3   appended to every encoded sentence
//
// Learned tokens follow from id 4, most frequent first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const PAD_TOKEN:     &str = "<PAD>";
pub const UNKNOWN_TOKEN: &str = "<UNK>";
pub const START_TOKEN:   &str = "<START>";
pub const END_TOKEN:     &str = "<END>";
pub const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, UNKNOWN_TOKEN, START_TOKEN, END_TOKEN];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "VocabularyRecord")]
pub struct Vocabulary {
    itos: Vec<String>,
    #[serde(skip)]
    stoi: HashMap<String, u32>,
}

/// On-disk shape: the id-ordered token list only.
#[derive(Deserialize)]
struct VocabularyRecord {
    itos: Vec<String>,
}

impl From<VocabularyRecord> for Vocabulary {
    fn from(record: VocabularyRecord) -> Self {
        Self::from_tokens(record.itos)
    }
}

impl Vocabulary {
    /// A vocabulary holding only the reserved tokens.
    pub fn with_specials() -> Self {
        Self::from_tokens(Vec::<String>::new())
    }

    /// Reserved tokens followed by `tokens` in the given order.
    /// Duplicates and reserved names inside `tokens` are skipped.
    pub fn from_tokens<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        let mut vocab = Self { itos: Vec::new(), stoi: HashMap::new() };
        for special in SPECIAL_TOKENS {
            vocab.push(special.to_string());
        }
        for token in tokens {
            vocab.push(token.into());
        }
        vocab
    }

    /// Count lowercased whitespace tokens, drop those seen fewer than
    /// `min_freq` times, keep at most `max_size` learned tokens.
    /// Ties in frequency are broken alphabetically so the result is stable.
    pub fn build<'a>(
        sentences: impl IntoIterator<Item = &'a str>,
        min_freq:  usize,
        max_size:  usize,
    ) -> Self {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for sentence in sentences {
            for word in tokenize(sentence) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq
            .into_iter()
            .filter(|(w, n)| *n >= min_freq.max(1) && !SPECIAL_TOKENS.contains(&w.as_str()))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(max_size);

        Self::from_tokens(words.into_iter().map(|(w, _)| w))
    }

    fn push(&mut self, token: String) {
        if self.stoi.contains_key(&token) {
            return;
        }
        self.stoi.insert(token.clone(), self.itos.len() as u32);
        self.itos.push(token);
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itos.is_empty()
    }

    pub fn stoi(&self, token: &str) -> u32 {
        self.stoi.get(token).copied().unwrap_or(self.unk_id())
    }

    pub fn itos(&self, id: u32) -> Option<&str> {
        self.itos.get(id as usize).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.itos
    }

    pub fn pad_id(&self) -> u32 {
        self.stoi[PAD_TOKEN]
    }

    pub fn unk_id(&self) -> u32 {
        self.stoi[UNKNOWN_TOKEN]
    }

    pub fn start_id(&self) -> u32 {
        self.stoi[START_TOKEN]
    }

    pub fn end_id(&self) -> u32 {
        self.stoi[END_TOKEN]
    }

    /// `<START> w1 w2 ... <END>`, unknown words mapped to `<UNK>`.
    pub fn encode(&self, sentence: &str) -> Vec<u32> {
        let mut ids = vec![self.start_id()];
        ids.extend(tokenize(sentence).map(|w| self.stoi(&w)));
        ids.push(self.end_id());
        ids
    }
}

/// Lowercased whitespace split, shared by vocabulary building and encoding.
pub fn tokenize(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence.split_whitespace().map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids_are_fixed() {
        let v = Vocabulary::with_specials();
        assert_eq!(v.pad_id(), 0);
        assert_eq!(v.unk_id(), 1);
        assert_eq!(v.start_id(), 2);
        assert_eq!(v.end_id(), 3);
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_build_orders_by_frequency_then_alphabet() {
        let v = Vocabulary::build(["b a a", "c b a"], 1, 10);
        assert_eq!(v.itos(4), Some("a"));
        assert_eq!(v.itos(5), Some("b"));
        assert_eq!(v.itos(6), Some("c"));
    }

    #[test]
    fn test_build_respects_min_freq_and_max_size() {
        let v = Vocabulary::build(["x x y z z z w"], 2, 1);
        // z (3) kept, x (2) cut by max_size, y and w cut by min_freq
        assert_eq!(v.len(), 5);
        assert_eq!(v.itos(4), Some("z"));
    }

    #[test]
    fn test_encode_wraps_and_maps_unknown() {
        let v = Vocabulary::from_tokens(["hello"]);
        assert_eq!(v.encode("Hello stranger"), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_deserialized_vocabulary_is_ready_for_lookup() {
        let v = Vocabulary::from_tokens(["le", "chat"]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pad_id(), 0);
        assert_eq!(back.unk_id(), 1);
        assert_eq!(back.stoi("chat"), 5);
        assert_eq!(back.encode("le chien"), vec![2, 4, 1, 3]);
        assert_eq!(back, v);
    }

    #[test]
    fn test_deserialize_without_reserved_tokens_still_has_them() {
        let back: Vocabulary = serde_json::from_str(r#"{"itos":["chat"]}"#).unwrap();
        assert_eq!(back.pad_id(), 0);
        assert_eq!(back.end_id(), 3);
        assert_eq!(back.stoi("chat"), 4);
    }
}
