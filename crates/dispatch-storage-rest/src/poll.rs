use crate::{send_rows, RestStore};
use dispatch_storage::{ChangeKind, ChangeNotice, StoreError, Subscription, Table};
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct RowStamp {
    id: String,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Cheap projection of a table: every row's id and last write time, in listing order.
pub(crate) type Fingerprint = Vec<RowStamp>;

pub(crate) fn subscribe(store: RestStore, table: Table, interval: Duration) -> Subscription {
    let (sender, receiver) = broadcast::channel(16);
    let task = tokio::spawn(run(store, table, interval, sender));
    Subscription::new(table, receiver).with_task(task)
}

async fn run(
    store: RestStore,
    table: Table,
    interval: Duration,
    sender: broadcast::Sender<ChangeNotice>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Fingerprint> = None;

    loop {
        ticker.tick().await;
        match fingerprint(&store, table).await {
            Ok(current) => {
                if has_changed(last.as_ref(), &current) {
                    tracing::debug!(%table, rows = current.len(), "poll detected change");
                    if sender
                        .send(ChangeNotice {
                            table,
                            kind: ChangeKind::Unknown,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                last = Some(current);
            }
            Err(err) => {
                tracing::warn!(%table, error = %err, "change poll failed; retrying");
            }
        }
    }
}

async fn fingerprint(store: &RestStore, table: Table) -> Result<Fingerprint, StoreError> {
    let request = store.request(
        Method::GET,
        table,
        &[
            ("select", "id,updated_at".to_string()),
            ("order", crate::ORDER_NEWEST_FIRST.to_string()),
        ],
    );
    send_rows(request).await
}

/// The first observation is the baseline and never counts as a change.
pub(crate) fn has_changed(previous: Option<&Fingerprint>, current: &Fingerprint) -> bool {
    previous.is_some_and(|previous| previous != current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(id: &str, updated_at: &str) -> RowStamp {
        RowStamp {
            id: id.to_string(),
            updated_at: Some(updated_at.to_string()),
        }
    }

    #[test]
    fn baseline_is_not_a_change() {
        let current = vec![stamp("a", "2024-01-01T00:00:00Z")];
        assert!(!has_changed(None, &current));
    }

    #[test]
    fn insert_update_and_delete_are_detected() {
        let base = vec![stamp("a", "2024-01-01T00:00:00Z")];

        let inserted = vec![stamp("b", "2024-01-01T00:01:00Z"), base[0].clone()];
        assert!(has_changed(Some(&base), &inserted));

        let updated = vec![stamp("a", "2024-01-01T00:02:00Z")];
        assert!(has_changed(Some(&base), &updated));

        assert!(has_changed(Some(&base), &Vec::new()));
        assert!(!has_changed(Some(&base), &base.clone()));
    }

    #[test]
    fn row_stamp_tolerates_missing_updated_at() {
        let rows: Fingerprint = serde_json::from_str(r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(rows[0].updated_at, None);
    }
}
