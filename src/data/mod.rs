// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Raw task records all the way to tensor batches:
//
//   raw JSON records
//       │
//       ▼
//   loader::convert_raw  → tagged QgExample values
//       │
//       ▼
//   splitter             → seeded train / val / test split
//       │
//       ▼
//   JsonExampleLoader    → reads a formatted split back
//       │
//       ▼
//   QgDataset            → tokenised, padded QgSample values
//       │
//       ▼
//   QgBatcher            → [batch, len] tensors for the model

/// Raw and formatted JSON records
pub mod loader;

/// Single-line passage normalisation
pub mod preprocessor;

/// Burn Dataset over tokenised samples
pub mod dataset;

/// Burn Batcher producing QgBatch tensors
pub mod batcher;

/// Seeded three-way split
pub mod splitter;
