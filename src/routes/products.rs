//! Product CRUD endpoints.
//!
//! Every mutation raises the corresponding `product.*` event through the
//! webhook dispatcher. Dispatch failures are logged and discarded so they
//! can never break the mutation that triggered them.

use crate::error::ApiError;
use crate::models::{Product, ProductList};
use crate::webhooks::dispatch_event;
use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;

const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, price, active, created_at, updated_at";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProductCreate {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DeleteResponse {
    pub ok: bool,
}

/// Serialize a product into the JSON-safe payload carried by webhook jobs.
fn product_payload(product: &Product) -> Value {
    serde_json::json!({
        "id": product.id,
        "sku": product.sku,
        "name": product.name,
        "description": product.description,
        "price": product.price.and_then(|p| p.to_f64()),
        "active": product.active,
    })
}

async fn raise_event(pool: &PgPool, event_type: &str, payload: Value) {
    if let Err(e) = dispatch_event(pool, event_type, payload).await {
        log::warn!("failed to queue '{}' webhooks: {}", event_type, e);
    }
}

/// List products with optional filters and pagination.
#[openapi(tag = "Products")]
#[get("/products?<sku>&<name>&<description>&<active>&<page>&<page_size>")]
pub async fn list_products(
    sku: Option<String>,
    name: Option<String>,
    description: Option<String>,
    active: Option<bool>,
    page: Option<i64>,
    page_size: Option<i64>,
    pool: &State<PgPool>,
) -> Result<Json<ProductList>, ApiError> {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    // SKUs are stored upper-cased; the sku filter matches case-insensitively
    // by uppercasing the needle.
    const FILTER: &str = r#"($1::text IS NULL OR sku LIKE '%' || UPPER($1) || '%')
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR description ILIKE '%' || $3 || '%')
          AND ($4::bool IS NULL OR active = $4)"#;

    let (total,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM products WHERE {FILTER}"
    ))
    .bind(&sku)
    .bind(&name)
    .bind(&description)
    .bind(active)
    .fetch_one(pool.inner())
    .await?;

    let items: Vec<Product> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE {FILTER} ORDER BY id LIMIT $5 OFFSET $6"
    ))
    .bind(&sku)
    .bind(&name)
    .bind(&description)
    .bind(active)
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(ProductList {
        items,
        page,
        page_size,
        total,
    }))
}

/// Create a product; the SKU is normalized to upper case before insert.
#[openapi(tag = "Products")]
#[post("/products", data = "<payload>")]
pub async fn create_product(
    payload: Json<ProductCreate>,
    pool: &State<PgPool>,
) -> Result<Json<Product>, ApiError> {
    let payload = payload.into_inner();
    let sku = payload.sku.trim().to_uppercase();

    if sku.is_empty() {
        return Err(ApiError::BadRequest("sku is required".to_string()));
    }

    let existing: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE sku = $1")
        .bind(&sku)
        .fetch_optional(pool.inner())
        .await?;

    if existing.is_some() {
        return Err(ApiError::BadRequest(
            "Product with this SKU already exists".to_string(),
        ));
    }

    let product: Product = sqlx::query_as(&format!(
        r#"INSERT INTO products (sku, name, description, price, active)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING {PRODUCT_COLUMNS}"#
    ))
    .bind(&sku)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.active)
    .fetch_one(pool.inner())
    .await?;

    raise_event(pool.inner(), "product.created", product_payload(&product)).await;

    Ok(Json(product))
}

/// Partially update a product; omitted fields keep their stored values.
#[openapi(tag = "Products")]
#[put("/products/<product_id>", data = "<payload>")]
pub async fn update_product(
    product_id: i32,
    payload: Json<ProductUpdate>,
    pool: &State<PgPool>,
) -> Result<Json<Product>, ApiError> {
    let payload = payload.into_inner();

    let product: Option<Product> = sqlx::query_as(&format!(
        r#"UPDATE products
           SET name = COALESCE($2, name),
               description = COALESCE($3, description),
               price = COALESCE($4, price),
               active = COALESCE($5, active),
               updated_at = NOW()
           WHERE id = $1
           RETURNING {PRODUCT_COLUMNS}"#
    ))
    .bind(product_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.active)
    .fetch_optional(pool.inner())
    .await?;

    let product = product.ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    raise_event(pool.inner(), "product.updated", product_payload(&product)).await;

    Ok(Json(product))
}

/// Delete a product by id.
#[openapi(tag = "Products")]
#[delete("/products/<product_id>")]
pub async fn delete_product(
    product_id: i32,
    pool: &State<PgPool>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted: Option<(String,)> =
        sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING sku")
            .bind(product_id)
            .fetch_optional(pool.inner())
            .await?;

    let (sku,) = deleted.ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    raise_event(
        pool.inner(),
        "product.deleted",
        serde_json::json!({ "id": product_id, "sku": sku }),
    )
    .await;

    Ok(Json(DeleteResponse { ok: true }))
}

/// Delete every product.
#[openapi(tag = "Products")]
#[delete("/products")]
pub async fn delete_all_products(
    pool: &State<PgPool>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM products")
        .execute(pool.inner())
        .await?;

    let deleted = result.rows_affected();

    raise_event(
        pool.inner(),
        "product.bulk_deleted",
        serde_json::json!({ "deleted": deleted }),
    )
    .await;

    Ok(Json(BulkDeleteResponse { deleted }))
}
