//! Read-only access to the order store.
//!
//! The resolver and grouper consume a narrow interface rather than the
//! database directly, so they can be exercised against fixtures and the
//! persistence layer can be swapped without touching them.

use rusqlite::Connection;
use thiserror::Error;

use crate::models::{Order, OrderLine, OrderingMode, PayAfter, PaymentStatus, SelfOrderConfig};

/// Failure reading from the backing store. Handlers map `Db` to a 500 and
/// `OrderNotFound` to a 404; nothing here is retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

/// Narrow read interface over configs and orders.
pub trait SelfOrderStore {
    /// Configs whose mode is in `modes` (all configs when empty),
    /// ordered by id ascending.
    fn list_configs(&self, modes: &[OrderingMode]) -> Result<Vec<SelfOrderConfig>, StoreError>;

    /// Order header including its current session counter.
    fn order_header(&self, order_id: &str) -> Result<Order, StoreError>;

    /// An order's lines in insertion order.
    fn order_lines(&self, order_id: &str) -> Result<Vec<OrderLine>, StoreError>;
}

/// SQLite-backed store over an already-locked connection.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SelfOrderStore for SqliteStore<'_> {
    fn list_configs(&self, modes: &[OrderingMode]) -> Result<Vec<SelfOrderConfig>, StoreError> {
        let mut sql = String::from(
            "SELECT id, name, ordering_mode, pay_after, access_token
             FROM self_order_configs",
        );
        if !modes.is_empty() {
            let placeholders = (1..=modes.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE ordering_mode IN ({placeholders})"));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(modes.iter().map(|m| m.as_str()));
        let rows = stmt.query_map(params, |row| {
            Ok(SelfOrderConfig {
                id: row.get(0)?,
                name: row.get(1)?,
                ordering_mode: OrderingMode::parse(&row.get::<_, String>(2)?),
                pay_after: PayAfter::parse(&row.get::<_, String>(3)?),
                access_token: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn order_header(&self, order_id: &str) -> Result<Order, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, config_id, order_number, session_count, payment_status,
                    submitted, created_at, updated_at
             FROM orders WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![order_id], |row| {
            Ok(Order {
                id: row.get(0)?,
                config_id: row.get(1)?,
                order_number: row.get(2)?,
                session_count: row.get::<_, i64>(3)?.max(1) as u32,
                payment_status: PaymentStatus::parse(&row.get::<_, String>(4)?),
                submitted: row.get::<_, i64>(5)? != 0,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?;
        rows.next()
            .transpose()?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }

    fn order_lines(&self, order_id: &str) -> Result<Vec<OrderLine>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, order_id, session, product_name, quantity, unit_price, position
             FROM order_lines WHERE order_id = ?1
             ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![order_id], |row| {
            Ok(OrderLine {
                id: row.get(0)?,
                order_id: row.get(1)?,
                session: row.get::<_, i64>(2)?.max(1) as u32,
                product_name: row.get(3)?,
                quantity: row.get(4)?,
                unit_price: row.get(5)?,
                position: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::{params, Connection};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        conn
    }

    fn insert_config(conn: &Connection, id: i64, mode: &str, token: &str) {
        conn.execute(
            "INSERT INTO self_order_configs (id, name, ordering_mode, pay_after, access_token)
             VALUES (?1, ?2, ?3, 'each', ?4)",
            params![id, format!("Config {id}"), mode, token],
        )
        .expect("insert config");
    }

    #[test]
    fn list_configs_filters_by_mode_and_orders_by_id() {
        let conn = test_conn();
        insert_config(&conn, 9, "kiosk", "k9");
        insert_config(&conn, 3, "mobile", "m3");
        insert_config(&conn, 5, "nothing", "n5");

        let store = SqliteStore::new(&conn);
        let configs = store
            .list_configs(&[OrderingMode::Mobile, OrderingMode::Kiosk])
            .expect("list configs");

        let ids: Vec<i64> = configs.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(configs[0].ordering_mode, OrderingMode::Mobile);
        assert_eq!(configs[0].access_token, "m3");
    }

    #[test]
    fn list_configs_with_no_filter_returns_everything() {
        let conn = test_conn();
        insert_config(&conn, 1, "nothing", "");
        insert_config(&conn, 2, "consultation", "");

        let store = SqliteStore::new(&conn);
        let configs = store.list_configs(&[]).expect("list configs");
        assert_eq!(configs.len(), 2);
    }

    #[test]
    fn order_header_missing_is_a_not_found_error() {
        let conn = test_conn();
        let store = SqliteStore::new(&conn);
        let err = store
            .order_header("missing-order")
            .expect_err("missing order should error");
        assert!(matches!(err, StoreError::OrderNotFound(_)));
    }

    #[test]
    fn order_lines_come_back_in_insertion_order() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO orders (id, config_id, order_number, session_count)
             VALUES ('o1', 1, 'Self-Order 00001-001-0001', 2)",
            [],
        )
        .expect("insert order");
        for (id, session, pos) in [("l-b", 2, 1), ("l-a", 1, 0), ("l-c", 2, 2)] {
            conn.execute(
                "INSERT INTO order_lines (id, order_id, session, product_name, quantity, unit_price, position)
                 VALUES (?1, 'o1', ?2, 'Tea', 1, 2.5, ?3)",
                params![id, session, pos],
            )
            .expect("insert line");
        }

        let store = SqliteStore::new(&conn);
        let lines = store.order_lines("o1").expect("order lines");
        let ids: Vec<&str> = lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["l-a", "l-b", "l-c"]);

        let header = store.order_header("o1").expect("order header");
        assert_eq!(header.session_count, 2);
        assert!(header.is_unpaid());
    }
}
