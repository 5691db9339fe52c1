use crate::import::normalize::NormalizedRow;
use rocket_db_pools::sqlx::{self, PgPool};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Applies normalized row batches to the `products` table.
pub struct ProductUpserter {
    pool: PgPool,
}

/// Collapse repeated SKUs within one batch so the conflict target is hit at
/// most once per statement; the last occurrence in file order wins.
pub(crate) fn dedupe_last_wins(rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
    let mut index_by_sku: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<NormalizedRow> = Vec::with_capacity(rows.len());

    for row in rows {
        match index_by_sku.get(&row.sku) {
            Some(&i) => deduped[i] = row,
            None => {
                index_by_sku.insert(row.sku.clone(), deduped.len());
                deduped.push(row);
            }
        }
    }

    deduped
}

impl ProductUpserter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert-or-update one batch as a single atomic statement using UNNEST.
    ///
    /// Existing rows keep their SKU and `active` flag; name, description,
    /// price and `updated_at` take the incoming values. Returns the number
    /// of distinct records written.
    pub async fn upsert_batch(&self, rows: Vec<NormalizedRow>) -> Result<usize, sqlx::Error> {
        let rows = dedupe_last_wins(rows);
        if rows.is_empty() {
            return Ok(0);
        }

        let count = rows.len();

        let mut skus = Vec::with_capacity(count);
        let mut names = Vec::with_capacity(count);
        let mut descriptions: Vec<Option<String>> = Vec::with_capacity(count);
        let mut prices: Vec<Option<Decimal>> = Vec::with_capacity(count);

        for row in rows {
            skus.push(row.sku);
            names.push(row.name);
            descriptions.push(row.description);
            prices.push(row.price);
        }

        sqlx::query(
            r#"INSERT INTO products (sku, name, description, price)
               SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::numeric[])
                   AS t(sku, name, description, price)
               ON CONFLICT (sku) DO UPDATE
               SET name = EXCLUDED.name,
                   description = EXCLUDED.description,
                   price = EXCLUDED.price,
                   updated_at = NOW()"#,
        )
        .bind(&skus)
        .bind(&names)
        .bind(&descriptions)
        .bind(&prices)
        .execute(&self.pool)
        .await?;

        log::trace!("upserted {} products", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(sku: &str, name: &str, price: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            sku: sku.to_string(),
            name: name.to_string(),
            description: None,
            price: price.map(|p| Decimal::from_str(p).unwrap()),
        }
    }

    #[test]
    fn last_occurrence_wins_within_a_batch() {
        let deduped = dedupe_last_wins(vec![
            row("A1", "Widget", Some("9.99")),
            row("B2", "Gadget", None),
            row("A1", "Widget Pro", Some("12.50")),
        ]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].sku, "A1");
        assert_eq!(deduped[0].name, "Widget Pro");
        assert_eq!(deduped[0].price, Some(Decimal::from_str("12.50").unwrap()));
        assert_eq!(deduped[1].sku, "B2");
    }

    #[test]
    fn distinct_skus_keep_first_seen_order() {
        let deduped = dedupe_last_wins(vec![
            row("C3", "c", None),
            row("A1", "a", None),
            row("B2", "b", None),
        ]);

        let skus: Vec<&str> = deduped.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["C3", "A1", "B2"]);
    }
}
