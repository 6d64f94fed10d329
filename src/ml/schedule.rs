// ============================================================
// Layer 5 — Reduce-on-plateau learning rate
// ============================================================
// After each epoch the validation loss is reported. When it has
// not improved (by a relative 1e-4) for more than `patience`
// epochs in a row, the learning rate is multiplied by `factor`,
// never going below `min_lr`.
//
// The whole state is serialisable so a resumed run continues with
// the reduced lr and the remembered best instead of starting over.

use serde::{Deserialize, Serialize};

const REL_THRESHOLD: f64 = 1e-4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauScheduler {
    lr:         f64,
    factor:     f64,
    patience:   usize,
    min_lr:     f64,
    best:       Option<f64>,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(lr: f64, factor: f64, patience: usize, min_lr: f64) -> Self {
        Self { lr, factor, patience, min_lr, best: None, bad_epochs: 0 }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Report a metric (lower is better) and return the lr for the next epoch.
    /// Non-finite metrics are ignored.
    pub fn step(&mut self, metric: f64) -> f64 {
        if !metric.is_finite() {
            return self.lr;
        }
        let improved = self.best.map_or(true, |best| metric < best * (1.0 - REL_THRESHOLD));
        if improved {
            self.best = Some(metric);
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.bad_epochs > self.patience {
            let reduced = (self.lr * self.factor).max(self.min_lr);
            if reduced < self.lr {
                tracing::info!("Reducing learning rate {:.2e} → {:.2e}", self.lr, reduced);
            }
            self.lr = reduced;
            self.bad_epochs = 0;
        }
        self.lr
    }
}
