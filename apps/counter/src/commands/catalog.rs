//! # Catalog Commands
//!
//! Batch lookup for a medicine picked from search results.

use chrono::NaiveDate;
use tracing::{debug, info};

use rxpos_client::BillingApi;
use rxpos_core::{sellable_lots, Lot};

use crate::error::AppError;

/// Fetches the batches the counter may bill from, first-expiry-first.
///
/// Empty and expired batches are left out.
pub async fn sellable_batches(
    api: &dyn BillingApi,
    medicine_id: &str,
    today: NaiveDate,
) -> Result<Vec<Lot>, AppError> {
    debug!(medicine_id = %medicine_id, "sellable_batches command");

    let lots = api.fetch_batches(medicine_id).await?;
    let sellable = sellable_lots(&lots, today);

    if sellable.len() < lots.len() {
        info!(
            medicine_id = %medicine_id,
            hidden = lots.len() - sellable.len(),
            "Skipped empty or expired batches"
        );
    }

    Ok(sellable)
}
