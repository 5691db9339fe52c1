//! Asynchronous CSV import pipeline.
//!
//! This module turns an uploaded product CSV into durable rows in the
//! `products` table while an `import_jobs` row tracks progress for pollers.
//!
//! # Architecture Overview
//!
//! - **`reader`**: two-pass file access - a counting pass over physical
//!   lines, then a lazy batch producer yielding raw header-to-value rows in
//!   file order.
//!
//! - **`normalize`**: extracts and cleans one product record from a raw row.
//!   Rows without a usable SKU or name are dropped, not errored.
//!
//! - **`upsert`**: deduplicates a batch by normalized SKU (last occurrence
//!   wins) and applies it as a single `INSERT ... ON CONFLICT DO UPDATE`
//!   statement, so each batch commits atomically and re-imports converge.
//!
//! - **`tracker`**: owns the `import_jobs` row - lifecycle transitions and
//!   the monotonic `processed_rows` counter, checkpointed after every batch.
//!
//! - **`runner`**: drives one job from `pending` to `completed` or `failed`;
//!   invoked by the queue worker and safe against duplicate invocation.
//!
//! # Data Flow
//!
//! 1. Upload route stores the file, creates the job row, enqueues the import
//! 2. Runner counts data rows, records the total, switches to `importing`
//! 3. Each batch: normalize -> dedupe -> upsert -> advance checkpoint
//! 4. Exhausted input completes the job and raises `product.import.completed`
//!
//! Progress counts *input consumption*: dropped and deduplicated rows still
//! advance `processed_rows`, so a finished job always reports the file's
//! full data-row count.

pub mod normalize;
pub mod reader;
pub mod runner;
pub mod tracker;
pub mod upsert;

/// Rows per upsert batch. Each batch is one atomic statement and one
/// progress checkpoint.
pub const DEFAULT_BATCH_SIZE: usize = 2_000;
