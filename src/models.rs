use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ===== Products =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Product {
    pub id: i32,
    /// Stored upper-cased; the unique index on this column is the sole
    /// conflict-resolution mechanism for concurrent writers.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

// ===== Import jobs =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "import_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Parsing,
    Importing,
    Completed,
    Failed,
}

impl ImportStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct ImportJob {
    pub id: i32,
    pub filename: String,
    pub status: ImportStatus,
    pub total_rows: Option<i32>,
    pub processed_rows: i32,
    pub error_message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// Progress in percent, rounded to two decimals.
    ///
    /// Undefined (None) until the counting pass has stored a positive total.
    pub fn percentage(&self) -> Option<f64> {
        match self.total_rows {
            Some(total) if total > 0 => {
                let raw = self.processed_rows as f64 * 100.0 / total as f64;
                Some((raw * 100.0).round() / 100.0)
            }
            _ => None,
        }
    }
}

/// Status shape returned by the upload polling endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportJobStatus {
    pub id: i32,
    pub filename: String,
    pub status: ImportStatus,
    pub total_rows: Option<i32>,
    pub processed_rows: i32,
    pub percentage: Option<f64>,
    pub error_message: Option<String>,
}

impl From<ImportJob> for ImportJobStatus {
    fn from(job: ImportJob) -> Self {
        let percentage = job.percentage();
        ImportJobStatus {
            id: job.id,
            filename: job.filename,
            status: job.status,
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            percentage,
            error_message: job.error_message,
        }
    }
}

// ===== Webhooks =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Webhook {
    pub id: i32,
    pub url: String,
    /// Event filter, matched case-insensitively against dispatched events.
    pub event_type: String,
    pub enabled: bool,
    pub last_status_code: Option<i32>,
    pub last_response_ms: Option<i32>,
    pub last_error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(total_rows: Option<i32>, processed_rows: i32) -> ImportJob {
        ImportJob {
            id: 1,
            filename: "products.csv".to_string(),
            status: ImportStatus::Importing,
            total_rows,
            processed_rows,
            error_message: None,
            created_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn percentage_is_none_without_positive_total() {
        assert_eq!(job(None, 10).percentage(), None);
        assert_eq!(job(Some(0), 0).percentage(), None);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(job(Some(3), 1).percentage(), Some(33.33));
        assert_eq!(job(Some(3), 2).percentage(), Some(66.67));
        assert_eq!(job(Some(3), 3).percentage(), Some(100.0));
    }

    #[test]
    fn terminal_states() {
        assert!(ImportStatus::Completed.is_terminal());
        assert!(ImportStatus::Failed.is_terminal());
        assert!(!ImportStatus::Pending.is_terminal());
        assert!(!ImportStatus::Parsing.is_terminal());
        assert!(!ImportStatus::Importing.is_terminal());
    }
}
