// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Writes model snapshots with Burn's NamedMpkGzFileRecorder
// (MessagePack + gzip, full precision).
//
// Layout:
//   {save_dir}/{model_name}/
//     model_epoch_0_itr_999.mpk.gz   ← periodic
//     model_epoch_0_final.mpk.gz     ← end of epoch 0
//     model_nan_failure.mpk.gz       ← written once if a NaN loss aborts the run
//
// The run directory is created on the first save, not before, so a
// run that fails during setup leaves nothing on disk. Saving to an
// existing name replaces the file. Snapshots are write-only; there
// is no resume.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::ml::model::Seq2SeqModel;

/// Extension the recorder appends to every stem
pub const CHECKPOINT_EXTENSION: &str = "mpk.gz";

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    /// {save_dir}/{model_name}
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(save_dir: impl AsRef<Path>, model_name: &str) -> Self {
        Self { dir: save_dir.as_ref().join(model_name) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final on-disk path for a stem.
    pub fn file_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{CHECKPOINT_EXTENSION}"))
    }

    /// Snapshot every parameter of `model` under `stem`.
    pub fn save<B: Backend>(&self, model: &Seq2SeqModel<B>, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;

        let path = self.file_path(stem);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Cannot replace checkpoint '{}'", path.display()))?;
        }

        // recorder appends the extension itself
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), self.dir.join(stem))
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkpoint::CheckpointId;
    use crate::ml::simple_lstm::SimpleLstmConfig;
    use burn::backend::NdArray;

    fn tiny() -> Seq2SeqModel<NdArray> {
        Seq2SeqModel::SimpleLstm(
            SimpleLstmConfig::new(6, 6)
                .with_encoder_embed_dim(2)
                .with_encoder_hidden_dim(2)
                .with_decoder_embed_dim(2)
                .with_decoder_hidden_dim(2)
                .init(&Default::default()),
        )
    }

    #[test]
    fn test_new_does_not_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(tmp.path(), "run");
        assert!(!mgr.dir().exists());
    }

    #[test]
    fn test_save_creates_dir_and_file() {
        let tmp  = tempfile::tempdir().unwrap();
        let mgr  = CheckpointManager::new(tmp.path().join("nested"), "run");
        let stem = CheckpointId::periodic(0, 1).file_stem();

        let path = mgr.save(&tiny(), &stem).unwrap();
        assert_eq!(path, tmp.path().join("nested/run/model_epoch_0_itr_1.mpk.gz"));
        assert!(path.is_file());
    }

    #[test]
    fn test_save_overwrites_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(tmp.path(), "run");

        mgr.save(&tiny(), "model_nan_failure").unwrap();
        mgr.save(&tiny(), "model_nan_failure").unwrap();

        let files = fs::read_dir(mgr.dir()).unwrap().count();
        assert_eq!(files, 1);
    }
}
