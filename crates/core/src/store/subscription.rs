//! Live snapshot subscriptions and ordering

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::document::Document;
use super::error::StoreError;

/// Reserved order field resolved against the store-assigned creation stamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Reserved order field resolved against the store-assigned update stamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Declared sort key of a subscription's snapshots.
///
/// `createdAt`/`updatedAt` address the store-assigned stamps; any other
/// name addresses a top-level data field. Missing and null values sort
/// first ascending, and ties fall back to the document id so the order
/// is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Sort a snapshot in place according to this order.
    pub fn sort(&self, docs: &mut [Document]) {
        docs.sort_by(|a, b| {
            let by_field = match self.field.as_str() {
                FIELD_CREATED_AT => a.created_at.cmp(&b.created_at),
                FIELD_UPDATED_AT => a.updated_at.cmp(&b.updated_at),
                field => compare_fields(a.field(field), b.field(field)),
            };
            let by_field = match self.direction {
                Direction::Ascending => by_field,
                Direction::Descending => by_field.reverse(),
            };
            by_field.then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Compare two optional field values with a total order: missing/null
/// first, then booleans, numbers, strings; composite values rank last
/// and tie among themselves.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank_a = type_rank(a);
    let rank_b = type_rank(b);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// A standing subscription to one collection.
///
/// The first [`recv`](Subscription::recv) resolves immediately with the
/// collection's current contents; later calls wait for the next change.
/// Intermediate snapshots may be coalesced into the latest one. Dropping
/// the subscription releases the listener.
pub struct Subscription {
    rx: watch::Receiver<Arc<Vec<Document>>>,
    order: OrderBy,
    primed: bool,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<Arc<Vec<Document>>>, order: OrderBy) -> Self {
        Self {
            rx,
            order,
            primed: false,
        }
    }

    /// Wait for the next full snapshot, ordered by the declared sort key.
    ///
    /// Returns [`StoreError::SubscriptionClosed`] once the stream has
    /// terminated; the error is persistent and the stream never resumes.
    pub async fn recv(&mut self) -> Result<Vec<Document>, StoreError> {
        if self.primed {
            self.rx
                .changed()
                .await
                .map_err(|_| StoreError::SubscriptionClosed)?;
        }
        self.primed = true;

        let mut docs = self.rx.borrow_and_update().as_ref().clone();
        self.order.sort(&mut docs);
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn doc(id: &str, created_secs: i64, data: Value) -> Document {
        let stamp = Utc.timestamp_opt(created_secs, 0).unwrap();
        Document {
            id: id.into(),
            created_at: stamp,
            updated_at: stamp,
            data,
        }
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_data_field_ascending() {
        let mut docs = vec![
            doc("b", 0, json!({ "startTime": "2025-06-02T18:00:00+00:00" })),
            doc("a", 0, json!({ "startTime": "2025-06-01T18:00:00+00:00" })),
        ];

        OrderBy::ascending("startTime").sort(&mut docs);
        assert_eq!(ids(&docs), vec!["a", "b"]);
    }

    #[test]
    fn test_sort_by_created_at_descending() {
        let mut docs = vec![
            doc("old", 100, json!({})),
            doc("new", 300, json!({})),
            doc("mid", 200, json!({})),
        ];

        OrderBy::descending(FIELD_CREATED_AT).sort(&mut docs);
        assert_eq!(ids(&docs), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_missing_field_sorts_first_ascending() {
        let mut docs = vec![
            doc("named", 0, json!({ "displayName": "Alex" })),
            doc("anon", 0, json!({})),
        ];

        OrderBy::ascending("displayName").sort(&mut docs);
        assert_eq!(ids(&docs), vec!["anon", "named"]);
    }

    #[test]
    fn test_ties_break_by_document_id() {
        let mut docs = vec![
            doc("z", 0, json!({ "startTime": "2025-06-01T18:00:00+00:00" })),
            doc("a", 0, json!({ "startTime": "2025-06-01T18:00:00+00:00" })),
        ];

        OrderBy::ascending("startTime").sort(&mut docs);
        assert_eq!(ids(&docs), vec!["a", "z"]);
    }

    #[test]
    fn test_numbers_sort_numerically() {
        let mut docs = vec![
            doc("ten", 0, json!({ "maxPlayers": 10 })),
            doc("two", 0, json!({ "maxPlayers": 2 })),
        ];

        OrderBy::ascending("maxPlayers").sort(&mut docs);
        assert_eq!(ids(&docs), vec!["two", "ten"]);
    }

    #[tokio::test]
    async fn test_first_recv_returns_current_contents() {
        let (tx, rx) = watch::channel(Arc::new(vec![doc("a", 0, json!({}))]));
        let mut sub = Subscription::new(rx, OrderBy::ascending(FIELD_CREATED_AT));

        let snapshot = sub.recv().await.unwrap();
        assert_eq!(ids(&snapshot), vec!["a"]);
        drop(tx);
    }

    #[tokio::test]
    async fn test_recv_after_close_is_persistent() {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let mut sub = Subscription::new(rx, OrderBy::ascending(FIELD_CREATED_AT));

        sub.recv().await.unwrap();
        drop(tx);

        assert!(matches!(
            sub.recv().await,
            Err(StoreError::SubscriptionClosed)
        ));
        assert!(matches!(
            sub.recv().await,
            Err(StoreError::SubscriptionClosed)
        ));
    }

    #[tokio::test]
    async fn test_intermediate_snapshots_coalesce() {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let mut sub = Subscription::new(rx, OrderBy::ascending(FIELD_CREATED_AT));

        sub.recv().await.unwrap();
        tx.send_replace(Arc::new(vec![doc("a", 0, json!({}))]));
        tx.send_replace(Arc::new(vec![doc("a", 0, json!({})), doc("b", 1, json!({}))]));

        let snapshot = sub.recv().await.unwrap();
        assert_eq!(ids(&snapshot), vec!["a", "b"]);
    }
}
