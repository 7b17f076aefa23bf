//! Order lifecycle for the self-order gateway.
//!
//! Orders accumulate lines across ordering sessions while unpaid; the
//! "continue ordering" flow opens a new session and appends a batch to the
//! same order. Settling is terminal: a paid order accepts nothing further.
//!
//! Also hosts the landing-page visibility rules, pure functions the
//! frontend queries to decide which buttons to show.

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::models::{Order, OrderingMode, PayAfter, SelfOrderConfig};
use crate::sessions::{self, OrderSummary};
use crate::store::{SelfOrderStore, SqliteStore, StoreError};

/// One item in an incoming batch.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLine {
    #[serde(alias = "product_name", alias = "name")]
    pub product_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default, alias = "unit_price", alias = "price")]
    pub unit_price: f64,
}

fn default_quantity() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Create a new unpaid order for a config. The first ordering session is
/// opened implicitly (`session_count` = 1).
pub fn create_order(conn: &Connection, config_id: i64) -> Result<Order, String> {
    let order_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    // Sequence number within the config, for the human-facing reference.
    let seq: i64 = conn
        .query_row(
            "SELECT COUNT(*) + 1 FROM orders WHERE config_id = ?1",
            params![config_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("order sequence: {e}"))?;
    let order_number = format!("Self-Order {config_id:05}-001-{seq:04}");

    conn.execute(
        "INSERT INTO orders (id, config_id, order_number, session_count,
                             payment_status, submitted, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, 'unpaid', 0, ?4, ?4)",
        params![order_id, config_id, order_number, now],
    )
    .map_err(|e| format!("insert order: {e}"))?;

    info!(order_id = %order_id, config_id, %order_number, "order created");

    SqliteStore::new(conn)
        .order_header(&order_id)
        .map_err(|e| format!("reload order: {e}"))
}

// ---------------------------------------------------------------------------
// Append lines / continue ordering
// ---------------------------------------------------------------------------

/// Append a batch of lines to an unpaid order.
///
/// With `new_session` the order's session counter is incremented first and
/// the batch is tagged with the new value; otherwise the current value is
/// used. Returns the session the batch was tagged with.
pub fn append_lines(
    conn: &Connection,
    order_id: &str,
    items: &[NewLine],
    new_session: bool,
) -> Result<u32, String> {
    if items.is_empty() {
        return Err("Cannot append an empty batch".into());
    }
    for item in items {
        if item.product_name.trim().is_empty() {
            return Err("Line is missing a product name".into());
        }
        if item.quantity <= 0.0 {
            return Err(format!(
                "Invalid quantity {} for {}",
                item.quantity, item.product_name
            ));
        }
    }

    let now = Utc::now().to_rfc3339();

    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| format!("begin transaction: {e}"))?;

    let result = (|| -> Result<u32, String> {
        let status: String = conn
            .query_row(
                "SELECT payment_status FROM orders WHERE id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .map_err(|_| format!("Order not found: {order_id}"))?;
        if status == "paid" {
            return Err(format!("Order already settled: {order_id}"));
        }

        if new_session {
            conn.execute(
                "UPDATE orders SET session_count = session_count + 1, updated_at = ?1
                 WHERE id = ?2",
                params![now, order_id],
            )
            .map_err(|e| format!("advance session: {e}"))?;
        } else {
            conn.execute(
                "UPDATE orders SET updated_at = ?1 WHERE id = ?2",
                params![now, order_id],
            )
            .map_err(|e| format!("touch order: {e}"))?;
        }

        let session: i64 = conn
            .query_row(
                "SELECT session_count FROM orders WHERE id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .map_err(|e| format!("read session: {e}"))?;

        let mut position: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM order_lines WHERE order_id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .map_err(|e| format!("next position: {e}"))?;

        for item in items {
            conn.execute(
                "INSERT INTO order_lines (id, order_id, session, product_name,
                                          quantity, unit_price, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    Uuid::new_v4().to_string(),
                    order_id,
                    session,
                    item.product_name.trim(),
                    item.quantity,
                    item.unit_price,
                    position,
                    now,
                ],
            )
            .map_err(|e| format!("insert line: {e}"))?;
            position += 1;
        }

        Ok(session.max(1) as u32)
    })();

    match result {
        Ok(session) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| format!("commit: {e}"))?;
            info!(order_id, session, count = items.len(), "lines appended");
            Ok(session)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

/// The "continue ordering" flow: open a new session on an existing unpaid
/// order and append the batch to it.
pub fn continue_ordering(
    conn: &Connection,
    order_id: &str,
    items: &[NewLine],
) -> Result<u32, String> {
    append_lines(conn, order_id, items, true)
}

// ---------------------------------------------------------------------------
// Submit / settle
// ---------------------------------------------------------------------------

/// Mark an order as sent to the kitchen.
pub fn mark_submitted(conn: &Connection, order_id: &str) -> Result<(), String> {
    let updated = conn
        .execute(
            "UPDATE orders SET submitted = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), order_id],
        )
        .map_err(|e| format!("mark submitted: {e}"))?;
    if updated == 0 {
        return Err(format!("Order not found: {order_id}"));
    }
    Ok(())
}

/// Settle an order: `unpaid -> paid`, exactly once. The transition is
/// triggered by the external payment flow; afterwards the order and its
/// lines are frozen.
pub fn settle_order(conn: &Connection, order_id: &str) -> Result<(), String> {
    let status: String = conn
        .query_row(
            "SELECT payment_status FROM orders WHERE id = ?1",
            params![order_id],
            |row| row.get(0),
        )
        .map_err(|_| format!("Order not found: {order_id}"))?;
    if status == "paid" {
        return Err(format!("Order already settled: {order_id}"));
    }

    conn.execute(
        "UPDATE orders SET payment_status = 'paid', updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), order_id],
    )
    .map_err(|e| format!("settle order: {e}"))?;

    info!(order_id, "order settled");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Load an order and its lines and build the per-visit summary.
pub fn order_summary(conn: &Connection, order_id: &str) -> Result<OrderSummary, StoreError> {
    let store = SqliteStore::new(conn);
    let order = store.order_header(order_id)?;
    let lines = store.order_lines(order_id)?;
    Ok(sessions::summarize(&order, &lines))
}

/// Unpaid orders for a config, oldest first.
pub fn list_draft_orders(conn: &Connection, config_id: i64) -> Result<Vec<Order>, StoreError> {
    let store = SqliteStore::new(conn);
    let mut stmt = conn.prepare(
        "SELECT id FROM orders
         WHERE config_id = ?1 AND payment_status = 'unpaid'
         ORDER BY created_at ASC, id ASC",
    )?;
    let ids: Vec<String> = stmt
        .query_map(params![config_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    ids.iter().map(|id| store.order_header(id)).collect()
}

// ---------------------------------------------------------------------------
// Landing visibility rules
// ---------------------------------------------------------------------------

/// Whether the landing page offers "continue ordering": mobile mode,
/// pay-per-order settlement, and an already-submitted unpaid order.
pub fn offers_continue_ordering(config: &SelfOrderConfig, drafts: &[Order]) -> bool {
    config.ordering_mode == OrderingMode::Mobile
        && config.pay_after == PayAfter::Each
        && drafts.iter().any(|o| o.is_unpaid() && o.submitted)
}

/// Whether the direct products link is hidden on the landing page.
///
/// Pay-per-order: hidden as soon as any unpaid order exists (the customer
/// goes through "continue ordering" instead). Pay-at-end: hidden once an
/// unpaid order has been submitted, until it is settled.
pub fn hides_products_link(config: &SelfOrderConfig, drafts: &[Order]) -> bool {
    match config.pay_after {
        PayAfter::Each => drafts.iter().any(Order::is_unpaid),
        PayAfter::Meal => drafts.iter().any(|o| o.is_unpaid() && o.submitted),
    }
}
