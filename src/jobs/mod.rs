//! Background job queue and worker loop.
//!
//! All deferred work - CSV imports, webhook deliveries, webhook test
//! triggers - flows through a single Postgres-backed `jobs` table. Producers
//! insert a typed row with a JSON payload; the worker loop claims rows with
//! `FOR UPDATE SKIP LOCKED` and spawns each claimed job onto the Tokio
//! runtime, so imports run concurrently with each other and every webhook
//! delivery is an independent task.
//!
//! The queue is at-least-once: a consumer crash between claiming and
//! completing a job means a later claim may see the same work again. Both
//! job handlers tolerate this - the import path is idempotent by SKU and
//! no-ops on terminal jobs, and a duplicate delivery only repeats a
//! best-effort notification.

pub mod queue;
pub mod worker;

pub use queue::{JobQueue, JobType};
pub use worker::JobWorker;
