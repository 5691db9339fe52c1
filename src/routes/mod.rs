//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (products,
//! uploads, webhooks) and exposes typed Rocket handlers annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically.

pub mod health;
pub mod products;
pub mod uploads;
pub mod webhooks;
