//! Checkpoint directories.
//!
//! A checkpoint holds two files:
//! - `model.mpk`: parameters in burn's NamedMpk format, full precision
//! - `meta.json`: hyperparameters, both vocabularies, a device hint and
//!   the BLAKE3 digest of `model.mpk`
//!
//! Loading rebuilds the model from `meta.json`, checks the digest, then
//! restores parameters.

use std::fs;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use tracing::info;

use crate::config::NmtConfig;
use crate::error::{self, NmtError};
use crate::model::NmtModel;
use crate::vocab::VocabPair;

const MODEL_STEM: &str = "model";
const META_FILE: &str = "meta.json";

/// Everything needed to rebuild a model before its weights are loaded.
#[derive(Config, Debug)]
pub struct CheckpointMeta {
    pub config: NmtConfig,
    pub vocab: VocabPair,
    /// Device the model was saved from; informational only.
    pub device: String,
    /// BLAKE3 hex digest of `model.mpk`.
    pub weights_digest: String,
}

fn model_path(dir: &Path) -> PathBuf {
    // burn appends .mpk
    dir.join(MODEL_STEM).with_extension("mpk")
}

/// True when `dir` holds both checkpoint files.
pub fn available(dir: &Path) -> bool {
    model_path(dir).is_file() && dir.join(META_FILE).is_file()
}

fn digest_file(path: &Path) -> error::Result<String> {
    let bytes = fs::read(path).map_err(|e| NmtError::io(path, e))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Write `model` with its configuration and vocabularies to `dir`.
pub fn save_checkpoint<B: Backend>(
    model: &NmtModel<B>,
    config: &NmtConfig,
    vocab: &VocabPair,
    dir: &Path,
) -> error::Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| NmtError::io(dir, e))?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(dir.join(MODEL_STEM), &recorder)
        .map_err(|e| NmtError::Record(format!("save {}: {}", dir.display(), e)))?;

    let weights = model_path(dir);
    let meta = CheckpointMeta::new(
        config.clone(),
        vocab.clone(),
        format!("{:?}", model.device()),
        digest_file(&weights)?,
    );
    let meta_path = dir.join(META_FILE);
    meta.save(&meta_path).map_err(|e| NmtError::io(&meta_path, e))?;

    info!(path = %dir.display(), digest = %meta.weights_digest, "saved checkpoint");
    Ok(weights)
}

/// Read only the metadata of a checkpoint.
pub fn load_meta(dir: &Path) -> error::Result<CheckpointMeta> {
    let path = dir.join(META_FILE);
    CheckpointMeta::load(&path)
        .map_err(|e| NmtError::Metadata(format!("{}: {}", path.display(), e)))
}

/// Rebuild a model from `dir` onto `device`.
pub fn load_checkpoint<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> error::Result<(NmtModel<B>, CheckpointMeta)> {
    let meta = load_meta(dir)?;

    let weights = model_path(dir);
    let found = digest_file(&weights)?;
    if found != meta.weights_digest {
        return Err(NmtError::DigestMismatch {
            expected: meta.weights_digest,
            found,
        });
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = meta
        .config
        .init::<B>(&meta.vocab, device)?
        .load_file(dir.join(MODEL_STEM), &recorder, device)
        .map_err(|e| NmtError::Record(format!("load {}: {}", weights.display(), e)))?;

    info!(path = %dir.display(), saved_on = %meta.device, "loaded checkpoint");
    Ok((model, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocab;
    use burn::backend::NdArray;

    type B = NdArray;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn fixture() -> (NmtModel<B>, NmtConfig, VocabPair) {
        let vocab = VocabPair::new(Vocab::from(words("a b c")), Vocab::from(words("x y")));
        let config = NmtConfig::new()
            .with_embed_size(4)
            .with_hidden_size(6)
            .with_window_size_d(2)
            .with_dropout_rate(0.0);
        let model = config.init::<B>(&vocab, &Default::default()).unwrap();
        (model, config, vocab)
    }

    #[test]
    fn round_trip_reproduces_scores() {
        let (model, config, vocab) = fixture();
        let dir = tempfile::tempdir().unwrap();
        save_checkpoint(&model, &config, &vocab, dir.path()).unwrap();
        assert!(available(dir.path()));

        let (loaded, meta) = load_checkpoint::<B>(dir.path(), &Default::default()).unwrap();
        assert_eq!(meta.config.hidden_size, 6);
        assert_eq!(meta.vocab.tar.len(), vocab.tar.len());

        let src = vocab.src.pad_batch(&[words("a b c")]).unwrap();
        let tgt = vocab.tar.pad_targets(&[words("y x")]).unwrap();
        let before: f32 = model.forward(&src, &tgt).unwrap().into_scalar();
        let after: f32 = loaded.forward(&src, &tgt).unwrap().into_scalar();
        assert_eq!(before, after);
    }

    #[test]
    fn tampered_weights_rejected() {
        let (model, config, vocab) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let weights = save_checkpoint(&model, &config, &vocab, dir.path()).unwrap();

        let mut bytes = fs::read(&weights).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&weights, bytes).unwrap();

        assert!(matches!(
            load_checkpoint::<B>(dir.path(), &Default::default()),
            Err(NmtError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!available(&dir.path().join("nope")));
        assert!(load_meta(&dir.path().join("nope")).is_err());
    }
}
