//! Persist: normalize parsed fields into a [`ReceiptRecord`] and insert it.
//!
//! Expected table shape:
//!
//! ```sql
//! CREATE TABLE receipts (
//!     receipt_id   uuid PRIMARY KEY,
//!     user_id      uuid NOT NULL,
//!     category     text NOT NULL,
//!     receipt_date date NOT NULL,
//!     vendor_name  text NOT NULL,
//!     total_amount numeric(12, 2) NOT NULL,
//!     s3_url       text NOT NULL
//! );
//! ```
//!
//! The insert runs inside one transaction on a connection opened for this
//! invocation alone; the connection is closed unconditionally on exit from
//! this stage. On any database error the transaction is rolled back, the
//! error is logged together with the attempted values, and re-raised.
//! There is no update or delete path.

use crate::error::ReceiptError;
use crate::record::{ReceiptFields, ReceiptRecord};
use chrono::Local;
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{error, info};
use uuid::Uuid;

/// The currency-symbol literal stripped from model-reported amounts.
const CURRENCY_SYMBOL: char = '₹';

/// Vendor fallback when the model could not read a business name.
const DEFAULT_VENDOR: &str = "Unknown";

/// Category fallback when the object carries no `category` metadata tag.
const DEFAULT_CATEGORY: &str = "work";

const INSERT_RECEIPT: &str = "\
INSERT INTO receipts (receipt_id, user_id, category, receipt_date, vendor_name, total_amount, s3_url)
VALUES ($1, $2, $3, $4::date, $5, $6, $7)";

/// Build the row to insert from the parsed fields and fetch metadata.
///
/// Normalization rules:
/// - `total_amount`: absent → `"0"`; strip the currency symbol, thousands
///   separators, and surrounding whitespace; must parse as a nonnegative
///   decimal or the invocation fails.
/// - `vendor_name`: absent → `"Unknown"`.
/// - `receipt_date`: absent → current local date, `YYYY-MM-DD`. A present
///   but malformed date is passed through; the `date` column rejects it at
///   insert time.
/// - `category`: metadata key `category`, absent → `"work"`.
/// - `s3_url`: `endpoint + "/" + key`, no URL-encoding of the key.
/// - `receipt_id`: fresh v4 UUID, independent of key and content —
///   re-processing the same object yields a new identifier and a new row.
pub fn prepare_record(
    fields: &ReceiptFields,
    metadata: &HashMap<String, String>,
    object_key: &str,
    user_id: Uuid,
    storage_endpoint: &str,
) -> Result<ReceiptRecord, ReceiptError> {
    let total_amount = normalize_amount(fields.total_amount().unwrap_or("0"))?;
    let vendor_name = fields.vendor_name().unwrap_or(DEFAULT_VENDOR).to_string();
    let receipt_date = fields
        .receipt_date()
        .map(str::to_string)
        .unwrap_or_else(processing_date);
    let category = metadata
        .get("category")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let s3_url = format!("{storage_endpoint}/{object_key}");

    Ok(ReceiptRecord {
        receipt_id: Uuid::new_v4(),
        user_id,
        category,
        receipt_date,
        vendor_name,
        total_amount,
        s3_url,
    })
}

/// Insert the record inside one committed transaction.
///
/// Opens its own connection from `database_url`; the connection is closed
/// on both the success and the failure path.
///
/// # Errors
///
/// [`ReceiptError::Persist`] on connect, insert, or commit failure. The
/// attempted values are logged at error level before the error propagates.
pub async fn insert_receipt(
    database_url: &str,
    record: &ReceiptRecord,
) -> Result<(), ReceiptError> {
    let mut conn = PgConnection::connect(database_url)
        .await
        .map_err(|source| ReceiptError::Persist { source })?;

    let result = write_record(&mut conn, record).await;
    if let Err(ref e) = result {
        error!("DB insert error: {e} | values: {record:?}");
    }
    let _ = conn.close().await;
    result
}

async fn write_record(conn: &mut PgConnection, record: &ReceiptRecord) -> Result<(), ReceiptError> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|source| ReceiptError::Persist { source })?;

    let inserted = sqlx::query(INSERT_RECEIPT)
        .bind(record.receipt_id)
        .bind(record.user_id)
        .bind(&record.category)
        .bind(&record.receipt_date)
        .bind(&record.vendor_name)
        .bind(record.total_amount)
        .bind(&record.s3_url)
        .execute(&mut *tx)
        .await;

    match inserted {
        Ok(_) => {
            tx.commit()
                .await
                .map_err(|source| ReceiptError::Persist { source })?;
            info!("Successfully created receipt record {}", record.receipt_id);
            Ok(())
        }
        Err(source) => {
            let _ = tx.rollback().await;
            Err(ReceiptError::Persist { source })
        }
    }
}

/// Reduce a model-reported amount to a nonnegative decimal.
fn normalize_amount(raw: &str) -> Result<Decimal, ReceiptError> {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|&c| c != CURRENCY_SYMBOL && c != ',')
        .collect();

    let amount =
        Decimal::from_str(stripped.trim()).map_err(|e| ReceiptError::AmountInvalid {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;

    if amount < Decimal::ZERO {
        return Err(ReceiptError::AmountInvalid {
            raw: raw.to_string(),
            reason: "amount is negative".to_string(),
        });
    }
    Ok(amount)
}

/// Current local date in `YYYY-MM-DD`.
fn processing_date() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(amount: Option<&str>, vendor: Option<&str>, date: Option<&str>) -> ReceiptFields {
        ReceiptFields {
            total_amount: amount.map(str::to_string),
            vendor_name: vendor.map(str::to_string),
            receipt_date: date.map(str::to_string),
        }
    }

    fn prepare(fields: &ReceiptFields, metadata: &HashMap<String, String>) -> ReceiptRecord {
        prepare_record(
            fields,
            metadata,
            "r1.jpg",
            Uuid::nil(),
            "https://bucket.example.com",
        )
        .expect("record must prepare")
    }

    #[test]
    fn currency_symbol_and_separators_are_stripped() {
        let record = prepare(
            &fields(Some("₹1,234.56"), Some("Acme"), Some("2024-03-01")),
            &HashMap::new(),
        );
        assert_eq!(record.total_amount, Decimal::new(123456, 2));
    }

    #[test]
    fn surrounding_whitespace_is_stripped() {
        let record = prepare(
            &fields(Some("  ₹45.00 "), Some("Acme"), Some("2024-03-01")),
            &HashMap::new(),
        );
        assert_eq!(record.total_amount, Decimal::new(4500, 2));
    }

    #[test]
    fn absent_amount_defaults_to_zero() {
        let record = prepare(&fields(None, Some("Acme"), Some("2024-03-01")), &HashMap::new());
        assert_eq!(record.total_amount, Decimal::ZERO);
    }

    #[test]
    fn sentinel_amount_defaults_to_zero() {
        let record = prepare(
            &fields(Some("None"), Some("Acme"), Some("2024-03-01")),
            &HashMap::new(),
        );
        assert_eq!(record.total_amount, Decimal::ZERO);
    }

    #[test]
    fn non_numeric_amount_is_fatal() {
        let err = prepare_record(
            &fields(Some("forty-five"), None, None),
            &HashMap::new(),
            "r1.jpg",
            Uuid::nil(),
            "https://bucket.example.com",
        )
        .unwrap_err();
        assert!(matches!(err, ReceiptError::AmountInvalid { .. }));
    }

    #[test]
    fn negative_amount_is_fatal() {
        let err = prepare_record(
            &fields(Some("-12.00"), None, None),
            &HashMap::new(),
            "r1.jpg",
            Uuid::nil(),
            "https://bucket.example.com",
        )
        .unwrap_err();
        assert!(matches!(err, ReceiptError::AmountInvalid { .. }));
    }

    #[test]
    fn absent_vendor_defaults_to_unknown() {
        let record = prepare(&fields(Some("1.00"), None, Some("2024-03-01")), &HashMap::new());
        assert_eq!(record.vendor_name, "Unknown");
    }

    #[test]
    fn absent_date_defaults_to_processing_date() {
        let record = prepare(&fields(Some("1.00"), Some("Acme"), None), &HashMap::new());
        assert_eq!(record.receipt_date, processing_date());
    }

    #[test]
    fn malformed_date_is_passed_through_for_db_validation() {
        let record = prepare(
            &fields(Some("1.00"), Some("Acme"), Some("03/01/2024")),
            &HashMap::new(),
        );
        assert_eq!(record.receipt_date, "03/01/2024");
    }

    #[test]
    fn category_comes_from_metadata_with_work_default() {
        let mut metadata = HashMap::new();
        metadata.insert("category".to_string(), "travel".to_string());
        let record = prepare(&fields(None, None, None), &metadata);
        assert_eq!(record.category, "travel");

        let record = prepare(&fields(None, None, None), &HashMap::new());
        assert_eq!(record.category, "work");
    }

    #[test]
    fn s3_url_concatenates_without_encoding() {
        let record = prepare_record(
            &fields(None, None, None),
            &HashMap::new(),
            "Screenshot 2025-02-07 193723.jpg",
            Uuid::nil(),
            "https://bucket.example.com",
        )
        .expect("record must prepare");
        assert_eq!(
            record.s3_url,
            "https://bucket.example.com/Screenshot 2025-02-07 193723.jpg"
        );
    }

    #[test]
    fn each_preparation_generates_a_fresh_identifier() {
        let f = fields(Some("1.00"), Some("Acme"), Some("2024-03-01"));
        let a = prepare(&f, &HashMap::new());
        let b = prepare(&f, &HashMap::new());
        assert_ne!(a.receipt_id, b.receipt_id);
        assert_eq!(a.s3_url, b.s3_url);
    }
}
