// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and AdamW.
//
//   - training runs on B (an AutodiffBackend) for gradients
//   - model.valid() gives the same model on B::InnerBackend,
//     dropout off, for the validation pass
//   - the validation batcher therefore uses B::InnerBackend
//   - labels are passed to forward_loss as-is; it builds the
//     shifted decoder input and the ignore mask itself
//
// Per epoch: mean train loss + token accuracy, validation loss +
// token accuracy, plateau lr step, one metrics CSV row, and a
// checkpoint on the save_every cadence, the last epoch, and
// every new best validation loss.
//
// A resumed run restores the scheduler state and the best
// {epoch, val_loss} from the checkpoint dir, so model_best is only
// replaced by an epoch that beats every earlier one.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::{QgBatch, QgBatcher}, dataset::QgDataset};
use crate::infra::{checkpoint::{BestCheckpoint, CheckpointManager}, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::loss::token_accuracy;
use crate::ml::model::{StyleQgConfig, StyleQgModel};
use crate::ml::schedule::PlateauScheduler;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Mean loss and token accuracy over a loader.
#[derive(Debug, Clone, Copy)]
pub struct EvalStats {
    pub loss:     f64,
    pub accuracy: f64,
    pub batches:  usize,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub epochs_run:    usize,
    pub best_epoch:    Option<usize>,
    pub best_val_loss: f64,
    pub last:          Option<EpochMetrics>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &StyleQgConfig,
    train_dataset: QgDataset,
    val_dataset:   QgDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, model_cfg, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &StyleQgConfig,
    train_dataset: QgDataset,
    val_dataset:   QgDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainSummary> {
    model_cfg.validate()?;
    anyhow::ensure!(cfg.batch_size > 0, "batch_size must be at least 1");

    // ── Build or resume model ─────────────────────────────────────────────────
    let mut model: StyleQgModel<B> = model_cfg.init(&device);
    let mut scheduler = PlateauScheduler::new(cfg.lr, cfg.lr_factor, cfg.lr_patience, cfg.min_lr);
    let mut best: Option<BestCheckpoint> = None;
    let mut start_epoch = 1;
    if cfg.resume && ckpt_manager.has_checkpoint() {
        let epoch = ckpt_manager.latest_epoch()?;
        model = ckpt_manager.load_model(model, &device)?;
        if let Some(saved) = ckpt_manager.load_scheduler()? {
            scheduler = saved;
        }
        best = ckpt_manager.best_checkpoint()?;
        start_epoch = epoch + 1;
        tracing::info!(
            "Resuming after epoch {} (lr={:.2e}, best={:?})",
            epoch, scheduler.lr(), best.map(|b| (b.epoch, b.val_loss)),
        );
    }
    if cfg.freeze_encoder_layers > 0 {
        model = model.freeze_encoder_layers(cfg.freeze_encoder_layers);
        tracing::info!("Froze {} encoder layers", cfg.freeze_encoder_layers);
    }
    tracing::info!(
        "Model ready: {}+{} layers, d_model={}, vocab={}",
        model_cfg.num_encoder_layers, model_cfg.num_decoder_layers,
        model_cfg.d_model, model_cfg.vocab_size,
    );

    // ── AdamW with global-norm clipping ───────────────────────────────────────
    let clipping = (cfg.grad_clip > 0.0).then(|| GradientClippingConfig::Norm(cfg.grad_clip as f32));
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_grad_clipping(clipping)
        .init::<B, StyleQgModel<B>>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(QgBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(QgBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics = MetricsLogger::new(ckpt_manager.dir())?;
    let pad_id = model_cfg.pad_token_id;

    let mut summary = TrainSummary {
        epochs_run:    0,
        best_epoch:    best.map(|b| b.epoch),
        best_val_loss: best.map_or(f64::INFINITY, |b| b.val_loss),
        last:          None,
    };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..=cfg.epochs {
        let lr = scheduler.lr();

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut total    = 0usize;

        for batch in train_loader.iter() {
            let (loss, logits) = model.forward_loss(
                batch.input_ids,
                batch.attention_mask,
                batch.style_ids,
                batch.labels.clone(),
                None,
            );
            let (c, t) = token_accuracy(logits, batch.labels, pad_id);
            correct += c;
            total   += t;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;
            tracing::debug!("epoch {} batch {} loss={:.4}", epoch, batches, loss_val);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_acc  = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

        let val = evaluate_loader(&model.valid(), val_loader.as_ref(), pad_id);
        scheduler.step(val.loss);

        let row = EpochMetrics::new(epoch, train_loss, val.loss, train_acc, val.accuracy, lr);
        metrics.log(&row)?;
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | train_acc={:.1}% | val_acc={:.1}% | lr={:.2e}",
            epoch, cfg.epochs, train_loss, val.loss,
            train_acc * 100.0, val.accuracy * 100.0, lr,
        );

        if epoch % cfg.save_every.max(1) == 0 || epoch == cfg.epochs {
            ckpt_manager.save_model(&model, epoch)?;
            ckpt_manager.save_scheduler(&scheduler)?;
        }
        if row.is_improvement(summary.best_val_loss) {
            ckpt_manager.save_best(&model, BestCheckpoint { epoch, val_loss: val.loss })?;
            summary.best_val_loss = val.loss;
            summary.best_epoch = Some(epoch);
        }

        summary.epochs_run += 1;
        summary.last = Some(row);
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics.csv_path().display());
    Ok(summary)
}

/// Mean masked cross-entropy and token accuracy over every batch.
/// An empty loader gives a NaN loss.
pub fn evaluate_loader<B: Backend>(
    model:  &StyleQgModel<B>,
    loader: &dyn DataLoader<QgBatch<B>>,
    pad_id: u32,
) -> EvalStats {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut correct  = 0usize;
    let mut total    = 0usize;

    for batch in loader.iter() {
        let (loss, logits) = model.forward_loss(
            batch.input_ids,
            batch.attention_mask,
            batch.style_ids,
            batch.labels.clone(),
            None,
        );
        let (c, t) = token_accuracy(logits, batch.labels, pad_id);
        correct += c;
        total   += t;
        loss_sum += loss.into_scalar().elem::<f64>();
        batches  += 1;
    }

    EvalStats {
        loss:     if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
        accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
        batches,
    }
}
