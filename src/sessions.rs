//! Per-visit grouping of order lines.
//!
//! An order accumulates lines across several ordering sessions ("visits")
//! when the customer keeps adding items before settling. The summary
//! screen shows each visit as its own block with a subtotal, plus the
//! amount added in the current visit next to the order's grand total.
//!
//! Everything here is a pure view computation: groups are rebuilt from the
//! tagged lines on every request and never stored.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Order, OrderLine};

/// One visit's worth of lines. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGroup {
    /// 1-based visit label; equals the lines' session tag.
    pub visit_number: u32,
    pub lines: Vec<OrderLine>,
    pub subtotal: f64,
}

/// Display-ready order summary consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub groups: Vec<SessionGroup>,
    /// Subtotal of the group matching the order's current session counter,
    /// or zero when that visit has no lines yet.
    pub current_visit_subtotal: f64,
    pub grand_total: f64,
    pub order_reference: String,
}

impl OrderSummary {
    /// More than one visit on the order.
    pub fn has_multiple_visits(&self) -> bool {
        self.groups.len() > 1
    }
}

/// Partition lines into per-session groups: ascending by session tag,
/// insertion order preserved within each group. Session tags are trusted
/// as-is; a gap in the sequence is forwarded, not repaired.
pub fn group_by_session(lines: &[OrderLine]) -> Vec<SessionGroup> {
    let mut buckets: BTreeMap<u32, Vec<OrderLine>> = BTreeMap::new();
    for line in lines {
        buckets.entry(line.session).or_default().push(line.clone());
    }

    buckets
        .into_iter()
        .map(|(session, lines)| {
            let subtotal = lines.iter().map(OrderLine::line_total).sum();
            SessionGroup {
                visit_number: session,
                lines,
                subtotal,
            }
        })
        .collect()
}

/// Build the full summary for an order's loaded lines.
pub fn summarize(order: &Order, lines: &[OrderLine]) -> OrderSummary {
    let groups = group_by_session(lines);
    let grand_total = groups.iter().map(|g| g.subtotal).sum();
    let current_visit_subtotal = groups
        .iter()
        .find(|g| g.visit_number == order.session_count)
        .map(|g| g.subtotal)
        .unwrap_or(0.0);

    OrderSummary {
        groups,
        current_visit_subtotal,
        grand_total,
        order_reference: order.order_number.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;

    fn order(session_count: u32) -> Order {
        Order {
            id: "o1".into(),
            config_id: 1,
            order_number: "Self-Order 00001-001-0001".into(),
            session_count,
            payment_status: PaymentStatus::Unpaid,
            submitted: true,
            created_at: "2025-01-01T10:00:00Z".into(),
            updated_at: "2025-01-01T10:00:00Z".into(),
        }
    }

    fn line(id: &str, session: u32, quantity: f64, unit_price: f64, position: i64) -> OrderLine {
        OrderLine {
            id: id.into(),
            order_id: "o1".into(),
            session,
            product_name: format!("Item {id}"),
            quantity,
            unit_price,
            position,
        }
    }

    #[test]
    fn groups_split_by_session_with_running_totals() {
        // Two items in the first visit, one added in the second.
        let lines = vec![
            line("a", 1, 2.0, 10.0, 0),
            line("b", 1, 1.0, 5.0, 1),
            line("c", 2, 1.0, 20.0, 2),
        ];
        let summary = summarize(&order(2), &lines);

        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.groups[0].visit_number, 1);
        assert_eq!(summary.groups[0].subtotal, 25.0);
        assert_eq!(summary.groups[1].visit_number, 2);
        assert_eq!(summary.groups[1].subtotal, 20.0);
        assert_eq!(summary.current_visit_subtotal, 20.0);
        assert_eq!(summary.grand_total, 45.0);
        assert!(summary.has_multiple_visits());
    }

    #[test]
    fn empty_order_yields_empty_groups_and_zero_totals() {
        let summary = summarize(&order(1), &[]);
        assert!(summary.groups.is_empty());
        assert_eq!(summary.current_visit_subtotal, 0.0);
        assert_eq!(summary.grand_total, 0.0);
        assert!(!summary.has_multiple_visits());
    }

    #[test]
    fn single_session_order_is_its_own_current_visit() {
        let lines = vec![line("a", 1, 3.0, 4.0, 0)];
        let summary = summarize(&order(1), &lines);
        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.current_visit_subtotal, 12.0);
        assert_eq!(summary.grand_total, 12.0);
    }

    #[test]
    fn group_count_and_sizes_match_distinct_session_tags() {
        let lines = vec![
            line("a", 1, 1.0, 1.0, 0),
            line("b", 2, 1.0, 1.0, 1),
            line("c", 2, 1.0, 1.0, 2),
            line("d", 3, 1.0, 1.0, 3),
            line("e", 3, 1.0, 1.0, 4),
            line("f", 3, 1.0, 1.0, 5),
        ];
        let groups = group_by_session(&lines);

        assert_eq!(groups.len(), 3);
        let sizes: Vec<usize> = groups.iter().map(|g| g.lines.len()).collect();
        assert_eq!(sizes, vec![1, 2, 3]);
        assert_eq!(sizes.iter().sum::<usize>(), lines.len());

        let visits: Vec<u32> = groups.iter().map(|g| g.visit_number).collect();
        let mut sorted = visits.clone();
        sorted.sort_unstable();
        assert_eq!(visits, sorted, "groups must ascend by session number");
    }

    #[test]
    fn grand_total_equals_sum_of_group_subtotals() {
        let lines = vec![
            line("a", 1, 2.0, 3.5, 0),
            line("b", 2, 1.0, 9.9, 1),
            line("c", 2, 4.0, 0.25, 2),
        ];
        let summary = summarize(&order(2), &lines);
        let from_groups: f64 = summary.groups.iter().map(|g| g.subtotal).sum();
        assert_eq!(summary.grand_total, from_groups);

        let from_lines: f64 = lines.iter().map(OrderLine::line_total).sum();
        assert_eq!(summary.grand_total, from_lines);
    }

    #[test]
    fn insertion_order_is_preserved_within_a_group() {
        let lines = vec![
            line("first", 1, 1.0, 1.0, 0),
            line("second", 1, 1.0, 1.0, 1),
            line("third", 1, 1.0, 1.0, 2),
        ];
        let groups = group_by_session(&lines);
        let ids: Vec<&str> = groups[0].lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn session_gaps_are_forwarded_untouched() {
        let lines = vec![line("a", 1, 1.0, 2.0, 0), line("b", 3, 1.0, 7.0, 1)];
        let summary = summarize(&order(3), &lines);

        let visits: Vec<u32> = summary.groups.iter().map(|g| g.visit_number).collect();
        assert_eq!(visits, vec![1, 3]);
        assert_eq!(summary.current_visit_subtotal, 7.0);
    }

    #[test]
    fn current_visit_without_lines_reports_zero_subtotal() {
        // Counter already advanced but nothing added in the new visit yet.
        let lines = vec![line("a", 1, 1.0, 8.0, 0)];
        let summary = summarize(&order(2), &lines);
        assert_eq!(summary.current_visit_subtotal, 0.0);
        assert_eq!(summary.grand_total, 8.0);
    }

    #[test]
    fn summarize_is_idempotent_over_unchanged_input() {
        let lines = vec![
            line("a", 1, 2.0, 10.0, 0),
            line("b", 2, 1.0, 20.0, 1),
        ];
        let o = order(2);
        assert_eq!(summarize(&o, &lines), summarize(&o, &lines));
    }
}
