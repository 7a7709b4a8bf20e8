//! Incremental transaction sync.
//!
//! The aggregator hands out transactions a page at a time and reports whether more pages are
//! waiting. [sync_transactions] keeps asking until it is told there are none left, but never for
//! more than [SyncOptions::max_pages] pages or longer than [SyncOptions::timeout]. When either
//! limit is hit the transactions gathered so far are returned along with the cursor to resume
//! from.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use actix_rt::time::{timeout, Instant};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::plaid::{Aggregator, AggregatorError, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub max_pages: u32,
    pub timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            max_pages: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    PageLimit,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Complete,
    Incomplete(IncompleteReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncedTransactions {
    pub transactions: Vec<Transaction>,
    /// Where the next sync should resume. `None` if the aggregator never handed one out.
    pub next_cursor: Option<String>,
    pub status: SyncStatus,
}

impl SyncedTransactions {
    pub fn is_complete(&self) -> bool {
        self.status == SyncStatus::Complete
    }
}

#[instrument(skip(aggregator, access_token, options))]
pub async fn sync_transactions(
    aggregator: &dyn Aggregator,
    access_token: &str,
    cursor: Option<String>,
    options: &SyncOptions,
) -> Result<SyncedTransactions, AggregatorError> {
    let deadline = Instant::now() + options.timeout;
    let mut transactions = Vec::new();
    let mut cursor = cursor;

    for page_number in 0..options.max_pages {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let page = match timeout(
            remaining,
            aggregator.sync_transactions(access_token, cursor.as_deref()),
        )
        .await
        {
            Ok(page) => page?,
            Err(_) => {
                warn!(
                    page_number,
                    received = transactions.len(),
                    "Transaction sync timed out"
                );
                return Ok(SyncedTransactions {
                    transactions,
                    next_cursor: cursor,
                    status: SyncStatus::Incomplete(IncompleteReason::Timeout),
                });
            }
        };

        debug!(
            page_number,
            added = page.added.len(),
            has_more = page.has_more,
            "Received transaction page"
        );
        transactions.extend(page.added);
        if let Some(next_cursor) = page.next_cursor.filter(|c| !c.is_empty()) {
            cursor = Some(next_cursor);
        }

        if !page.has_more {
            return Ok(SyncedTransactions {
                transactions,
                next_cursor: cursor,
                status: SyncStatus::Complete,
            });
        }
    }

    warn!(
        max_pages = options.max_pages,
        received = transactions.len(),
        "Transaction sync stopped at page limit"
    );
    Ok(SyncedTransactions {
        transactions,
        next_cursor: cursor,
        status: SyncStatus::Incomplete(IncompleteReason::PageLimit),
    })
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SpendingTotal {
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SpendingSummary {
    pub by_merchant: Vec<SpendingTotal>,
    pub by_category: Vec<SpendingTotal>,
}

/// Totals transaction amounts per merchant and per category, largest first.
///
/// A transaction with several category labels counts fully towards each of them.
pub fn summarize(transactions: &[Transaction]) -> SpendingSummary {
    let mut by_merchant: HashMap<&str, Decimal> = HashMap::new();
    let mut by_category: HashMap<&str, Decimal> = HashMap::new();

    for transaction in transactions {
        let merchant = transaction
            .merchant_name
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(if transaction.name.is_empty() {
                "Unknown"
            } else {
                transaction.name.as_str()
            });
        *by_merchant.entry(merchant).or_default() += transaction.amount;

        let categories: Vec<&str> = match (&transaction.category, &transaction.personal_finance_category)
        {
            (Some(labels), _) if !labels.is_empty() => labels.iter().map(String::as_str).collect(),
            (_, Some(pfc)) => vec![pfc.primary.as_str()],
            _ => vec!["Uncategorized"],
        };
        for category in categories {
            *by_category.entry(category).or_default() += transaction.amount;
        }
    }

    SpendingSummary {
        by_merchant: sorted_totals(by_merchant),
        by_category: sorted_totals(by_category),
    }
}

fn sorted_totals(totals: HashMap<&str, Decimal>) -> Vec<SpendingTotal> {
    let mut totals: Vec<SpendingTotal> = totals
        .into_iter()
        .map(|(label, total)| SpendingTotal {
            label: label.to_string(),
            total,
        })
        .collect();
    totals.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.label.cmp(&b.label),
        ordering => ordering,
    });
    totals
}
