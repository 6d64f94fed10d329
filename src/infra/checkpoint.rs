// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk      ← weights after epoch 1
//     model_epoch_2.mpk      ← weights after epoch 2
//     model_best.mpk         ← lowest validation loss so far
//     latest_epoch.json      ← number of the latest epoch file
//     best_epoch.json        ← { epoch, val_loss } of model_best.mpk
//     scheduler.json         ← lr schedule state, for --resume
//     model_config.json      ← StyleQgConfig (architecture)
//     train_config.json      ← TrainConfig (the whole run)
//     tokenizer.json         ← written by TokenizerStore
//
// The architecture config is needed to rebuild the model before
// the weights can be loaded into it; loading fails if the shapes
// do not match.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{StyleQgConfig, StyleQgModel};
use crate::ml::schedule::PlateauScheduler;

const LATEST_EPOCH: &str = "latest_epoch.json";
const BEST_EPOCH:   &str = "best_epoch.json";
const BEST_MODEL:   &str = "model_best";
const SCHEDULER:    &str = "scheduler.json";

/// Which epoch model_best.mpk holds, and the validation loss it reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:    usize,
    pub val_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Nothing is created on disk until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save weights as model_epoch_{epoch} and move the latest pointer.
    pub fn save_model<B: Backend>(&self, model: &StyleQgModel<B>, epoch: usize) -> Result<()> {
        self.record(model, &format!("model_epoch_{epoch}"))?;
        self.write_json(LATEST_EPOCH, &epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    pub fn save_best<B: Backend>(&self, model: &StyleQgModel<B>, best: BestCheckpoint) -> Result<()> {
        self.record(model, BEST_MODEL)?;
        self.write_json(BEST_EPOCH, &best)?;
        tracing::info!("New best model at epoch {} (val_loss={:.4})", best.epoch, best.val_loss);
        Ok(())
    }

    /// The best record so far, or None before any best was saved.
    pub fn best_checkpoint(&self) -> Result<Option<BestCheckpoint>> {
        self.read_optional_json(BEST_EPOCH)
    }

    pub fn save_scheduler(&self, scheduler: &PlateauScheduler) -> Result<()> {
        self.write_json(SCHEDULER, scheduler)
    }

    pub fn load_scheduler(&self) -> Result<Option<PlateauScheduler>> {
        self.read_optional_json(SCHEDULER)
    }

    /// Load weights from the latest saved epoch.
    pub fn load_model<B: Backend>(&self, model: StyleQgModel<B>, device: &B::Device) -> Result<StyleQgModel<B>> {
        let epoch = self.latest_epoch()?;
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        self.load_record(model, &format!("model_epoch_{epoch}"), device)
    }

    pub fn load_best<B: Backend>(&self, model: StyleQgModel<B>, device: &B::Device) -> Result<StyleQgModel<B>> {
        tracing::info!("Loading best checkpoint");
        self.load_record(model, BEST_MODEL, device)
    }

    /// Best weights when they exist, otherwise the latest epoch.
    pub fn load_for_inference<B: Backend>(&self, model: StyleQgModel<B>, device: &B::Device) -> Result<StyleQgModel<B>> {
        if self.dir.join(format!("{BEST_MODEL}.mpk")).exists() {
            self.load_best(model, device)
        } else {
            self.load_model(model, device)
        }
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(LATEST_EPOCH).exists()
    }

    /// Read latest_epoch.json. Fails if training hasn't been run yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    pub fn save_model_config(&self, cfg: &StyleQgConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join("model_config.json");
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<StyleQgConfig> {
        let path = self.dir.join("model_config.json");
        StyleQgConfig::load(&path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot read model config from '{}': {e}. Make sure you have run 'train' first.",
                path.display()
            )
        })
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json("train_config.json", cfg)?;
        tracing::debug!("Saved training config to '{}'", self.dir.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config in '{}'", path.display()))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    fn record<B: Backend>(&self, model: &StyleQgModel<B>, name: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))
    }

    fn load_record<B: Backend>(&self, model: StyleQgModel<B>, name: &str, device: &B::Device) -> Result<StyleQgModel<B>> {
        let path = self.dir.join(name);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    fn read_optional_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }
}
