// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a line-aligned parallel corpus stored as two files that
// share a prefix:
//
//   data/wmt14_en_fr/small_train.en   ← line i is the source sentence
//   data/wmt14_en_fr/small_train.fr   ← line i is its translation
//
// Both files must have the same number of lines. Pairs where
// either side is empty after cleaning are skipped.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::preprocessor::Preprocessor;

/// One cleaned source/target sentence pair
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePair {
    pub source: String,
    pub target: String,
}

pub struct ParallelCorpusLoader {
    prefix:       PathBuf,
    src_ext:      String,
    trg_ext:      String,
    preprocessor: Preprocessor,
}

impl ParallelCorpusLoader {
    pub fn new(
        prefix:  impl Into<PathBuf>,
        src_ext: impl Into<String>,
        trg_ext: impl Into<String>,
    ) -> Self {
        Self {
            prefix:       prefix.into(),
            src_ext:      src_ext.into(),
            trg_ext:      trg_ext.into(),
            preprocessor: Preprocessor::new(),
        }
    }

    pub fn source_path(&self) -> PathBuf {
        with_ext(&self.prefix, &self.src_ext)
    }

    pub fn target_path(&self) -> PathBuf {
        with_ext(&self.prefix, &self.trg_ext)
    }

    pub fn load(&self) -> Result<Vec<SentencePair>> {
        let src_path = self.source_path();
        let trg_path = self.target_path();

        let src = read_lines(&src_path)?;
        let trg = read_lines(&trg_path)?;

        if src.len() != trg.len() {
            bail!(
                "Parallel corpus is misaligned: '{}' has {} lines, '{}' has {}",
                src_path.display(),
                src.len(),
                trg_path.display(),
                trg.len(),
            );
        }

        let total = src.len();
        let pairs: Vec<SentencePair> = src
            .iter()
            .zip(trg.iter())
            .map(|(s, t)| SentencePair {
                source: self.preprocessor.clean(s),
                target: self.preprocessor.clean(t),
            })
            .filter(|p| !p.source.is_empty() && !p.target.is_empty())
            .collect();

        if pairs.len() < total {
            tracing::warn!("Skipped {} empty sentence pairs", total - pairs.len());
        }
        tracing::info!("Loaded {} sentence pairs from '{}'", pairs.len(), self.prefix.display());
        Ok(pairs)
    }
}

/// `prefix` + "." + `ext`, keeping any dots already in the prefix
fn with_ext(prefix: &Path, ext: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}
