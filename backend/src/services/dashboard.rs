//! Dashboard service: aggregate KPIs over documents and stock
//!
//! A document is pending while its status is non-terminal, so drafts count
//! alongside waiting and ready documents.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// How many upcoming documents the overview lists per document type.
const OVERVIEW_LIMIT: usize = 10;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

/// Pending/late breakdown for one document type
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentCounts {
    pub to_process: i64,
    pub waiting: i64,
    pub late: i64,
}

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardKpis {
    pub total_products: i64,
    pub total_warehouses: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub receipts: DocumentCounts,
    pub deliveries: DocumentCounts,
    pub transfers: DocumentCounts,
    pub movements_today: i64,
}

/// A pending document as the overview lists it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingDocument {
    pub id: Uuid,
    pub reference: String,
    /// Supplier for receipts, customer for deliveries
    pub partner: String,
    pub status: String,
    pub scheduled_date: Option<NaiveDate>,
    pub warehouse_id: Uuid,
    pub warehouse_name: Option<String>,
}

/// Counts derived from one document type's pending set
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct PendingBreakdown {
    pub total: i64,
    pub late: i64,
    pub upcoming: i64,
    pub waiting: i64,
}

/// Pending documents of one type plus their breakdown
#[derive(Debug, Serialize)]
pub struct PendingSection {
    pub summary: PendingBreakdown,
    pub next_scheduled: Vec<PendingDocument>,
}

#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub receipts: PendingSection,
    pub deliveries: PendingSection,
}

#[derive(Debug, FromRow)]
struct CountsRow {
    to_process: i64,
    waiting: i64,
    late: i64,
}

/// Breakdown of a pending set against today: late is scheduled before
/// today, upcoming after; documents without a schedule are neither.
fn summarize(documents: &[PendingDocument], today: NaiveDate) -> PendingBreakdown {
    let mut breakdown = PendingBreakdown {
        total: documents.len() as i64,
        ..Default::default()
    };
    for document in documents {
        if let Some(date) = document.scheduled_date {
            if date < today {
                breakdown.late += 1;
            } else if date > today {
                breakdown.upcoming += 1;
            }
        }
        if document.status == "waiting" {
            breakdown.waiting += 1;
        }
    }
    breakdown
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn kpis(&self) -> AppResult<DashboardKpis> {
        let total_products =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE active = true")
                .fetch_one(&self.db)
                .await?;

        let total_warehouses =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM warehouses")
                .fetch_one(&self.db)
                .await?;

        // Stock levels are summed across warehouses before classifying, so
        // a product split over two locations is not flagged twice.
        let (low_stock_products, out_of_stock_products) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE total > 0 AND total <= reorder_level),
                COUNT(*) FILTER (WHERE total <= 0)
            FROM (
                SELECT p.reorder_level,
                       COALESCE(SUM(ps.quantity), 0) as total
                FROM products p
                LEFT JOIN product_stocks ps ON ps.product_id = p.id
                WHERE p.active = true
                GROUP BY p.id, p.reorder_level
            ) totals
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let receipts = self.document_counts("receipts").await?;
        let deliveries = self.document_counts("deliveries").await?;
        let transfers = self.document_counts("transfers").await?;

        let movements_today = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM move_history WHERE timestamp >= CURRENT_DATE",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardKpis {
            total_products,
            total_warehouses,
            low_stock_products,
            out_of_stock_products,
            receipts,
            deliveries,
            transfers,
            movements_today,
        })
    }

    /// Pending receipt and delivery lists with their breakdowns. Documents
    /// are ordered soonest-scheduled first, unscheduled last.
    pub async fn overview(&self) -> AppResult<DashboardOverview> {
        let today = Utc::now().date_naive();

        let receipts = self.pending_documents("receipts", "supplier").await?;
        let deliveries = self.pending_documents("deliveries", "customer").await?;

        Ok(DashboardOverview {
            receipts: PendingSection {
                summary: summarize(&receipts, today),
                next_scheduled: receipts.into_iter().take(OVERVIEW_LIMIT).collect(),
            },
            deliveries: PendingSection {
                summary: summarize(&deliveries, today),
                next_scheduled: deliveries.into_iter().take(OVERVIEW_LIMIT).collect(),
            },
        })
    }

    /// Pending document counts for one table. Pending means the status is
    /// neither done nor canceled; late adds a schedule in the past.
    async fn document_counts(&self, table: &str) -> AppResult<DocumentCounts> {
        // `table` is a compile-time constant from kpis().
        let query = format!(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status NOT IN ('done', 'canceled')) as to_process,
                COUNT(*) FILTER (WHERE status = 'waiting') as waiting,
                COUNT(*) FILTER (WHERE status NOT IN ('done', 'canceled')
                                 AND scheduled_date IS NOT NULL
                                 AND scheduled_date < CURRENT_DATE) as late
            FROM {}
            "#,
            table
        );

        let row = sqlx::query_as::<_, CountsRow>(&query)
            .fetch_one(&self.db)
            .await?;

        Ok(DocumentCounts {
            to_process: row.to_process,
            waiting: row.waiting,
            late: row.late,
        })
    }

    /// All pending documents of one type, soonest schedule first.
    async fn pending_documents(
        &self,
        table: &str,
        partner_column: &str,
    ) -> AppResult<Vec<PendingDocument>> {
        // `table` and `partner_column` are compile-time constants from
        // overview().
        let query = format!(
            r#"
            SELECT d.id, d.reference, d.{partner} as partner, d.status,
                   d.scheduled_date, d.warehouse_id, w.name as warehouse_name
            FROM {table} d
            LEFT JOIN warehouses w ON w.id = d.warehouse_id
            WHERE d.status NOT IN ('done', 'canceled')
            ORDER BY d.scheduled_date ASC NULLS LAST, d.created_at DESC
            "#,
            partner = partner_column,
            table = table,
        );

        let documents = sqlx::query_as::<_, PendingDocument>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::DocumentStatus;

    fn pending(status: &str, scheduled_date: Option<NaiveDate>) -> PendingDocument {
        PendingDocument {
            id: Uuid::new_v4(),
            reference: "WH/IN/0001".to_string(),
            partner: "Acme".to_string(),
            status: status.to_string(),
            scheduled_date,
            warehouse_id: Uuid::new_v4(),
            warehouse_name: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pending_statuses_are_the_non_terminal_ones() {
        // The SQL predicate `status NOT IN ('done', 'canceled')` must agree
        // with the status machine's terminal set.
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Waiting,
            DocumentStatus::Ready,
            DocumentStatus::Done,
            DocumentStatus::Canceled,
        ] {
            let counted = !matches!(status.as_str(), "done" | "canceled");
            assert_eq!(counted, !status.is_terminal());
        }
    }

    #[test]
    fn draft_documents_count_as_pending() {
        let today = date(2026, 8, 30);
        let breakdown = summarize(&[pending("draft", None)], today);

        assert_eq!(breakdown.total, 1);
        assert_eq!(breakdown.late, 0);
        assert_eq!(breakdown.waiting, 0);
    }

    #[test]
    fn breakdown_splits_late_upcoming_and_waiting() {
        let today = date(2026, 8, 30);
        let documents = [
            pending("draft", Some(date(2026, 8, 20))),
            pending("waiting", Some(date(2026, 9, 5))),
            pending("ready", Some(date(2026, 8, 30))),
            pending("waiting", None),
        ];

        let breakdown = summarize(&documents, today);
        assert_eq!(breakdown.total, 4);
        assert_eq!(breakdown.late, 1);
        assert_eq!(breakdown.upcoming, 1);
        assert_eq!(breakdown.waiting, 2);
    }

    #[test]
    fn unscheduled_documents_are_never_late() {
        let today = date(2026, 8, 30);
        let breakdown = summarize(&[pending("ready", None)], today);

        assert_eq!(breakdown.late, 0);
        assert_eq!(breakdown.upcoming, 0);
    }
}
