// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pruner.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::SyncError;
    use crate::record::RecordType;
    use crate::service::ServiceDescriptor;
    use crate::state::StateStore;
    use crate::test_support::{marker, record, FakeProvider};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    const ZONE: &str = "svc.internal.";
    const OWNER: &str = "team-x";

    fn pruner(provider: Arc<FakeProvider>, state: StateStore) -> Pruner {
        Pruner::new(
            provider,
            state,
            vec!["svc.internal".to_string()],
            OWNER.to_string(),
        )
    }

    fn synced_state() -> StateStore {
        let state = StateStore::new();
        state.mark_synced();
        state
    }

    fn live(name: &str, namespace: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, namespace, "job", vec!["t".to_string()])
    }

    fn seed_redis(provider: &FakeProvider) {
        provider.seed(
            ZONE,
            vec![
                record(RecordType::A, "redis", "10.0.0.1,10.0.0.2"),
                record(RecordType::TXT, "redis", &marker("redis", "default", OWNER)),
            ],
        );
    }

    #[test]
    fn test_group_folds_address_rows_and_normalizes_names() {
        let records = vec![
            record(RecordType::A, "redis.svc.internal.", "10.0.0.1"),
            record(RecordType::A, "redis.svc.internal.", "10.0.0.2"),
            record(
                RecordType::TXT,
                "redis.svc.internal.",
                &format!("\"{}\"", marker("redis", "default", OWNER)),
            ),
        ];

        let groups = group_owned_records(ZONE, records, OWNER);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "redis");
        assert_eq!(groups[0].zone, ZONE);
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[0].records[0].value, "10.0.0.1,10.0.0.2");
    }

    #[test]
    fn test_group_ignores_records_of_other_owners_and_foreign_txt() {
        let records = vec![
            record(RecordType::A, "mine", "10.0.0.1"),
            record(RecordType::TXT, "mine", &marker("mine", "default", OWNER)),
            record(RecordType::TXT, "mine", "v=spf1 -all"),
            record(RecordType::A, "theirs", "10.0.0.2"),
            record(RecordType::TXT, "theirs", &marker("theirs", "default", "team-y")),
            record(RecordType::A, "manual", "10.0.0.3"),
            record(RecordType::Other("CNAME".to_string()), "mine", "x.example."),
        ];

        let groups = group_owned_records(ZONE, records, OWNER);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "mine");
        assert!(groups[0].records.iter().all(|r| r.value != "v=spf1 -all"));
        assert!(groups[0]
            .records
            .iter()
            .all(|r| r.record_type != RecordType::Other("CNAME".to_string())));
    }

    #[tokio::test]
    async fn test_identify_orphans_uses_live_state() {
        let state = StateStore::new();
        state.commit(live("api", "default")).await;

        let groups = group_owned_records(
            ZONE,
            vec![
                record(RecordType::TXT, "api", &marker("api", "default", OWNER)),
                record(RecordType::TXT, "redis", &marker("redis", "default", OWNER)),
            ],
            OWNER,
        );

        let guard = state.prune_guard().await;
        let orphans = identify_orphans(&groups, OWNER, &guard);

        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].name, "redis");
    }

    #[tokio::test]
    async fn test_undecodable_marker_is_left_alone() {
        let state = StateStore::new();
        let groups = group_owned_records(
            ZONE,
            vec![
                record(RecordType::A, "odd", "10.0.0.1"),
                record(RecordType::TXT, "odd", "owner=team-x created-by=nomad-external-dns"),
            ],
            OWNER,
        );

        let guard = state.prune_guard().await;
        assert_eq!(groups.len(), 1);
        assert!(identify_orphans(&groups, OWNER, &guard).is_empty());
    }

    #[tokio::test]
    async fn test_prune_deletes_departed_service() {
        let provider = Arc::new(FakeProvider::default());
        seed_redis(&provider);

        let summary = pruner(provider.clone(), synced_state()).prune().await.unwrap();

        assert_eq!(
            summary,
            PruneSummary {
                owned: 1,
                orphaned: 1,
                deleted: 1,
                failed: 0,
                skipped: false,
            }
        );
        assert!(provider.records(ZONE).is_empty());
        assert_eq!(provider.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_live_service() {
        let provider = Arc::new(FakeProvider::default());
        seed_redis(&provider);
        let state = synced_state();
        state.commit(live("redis", "default")).await;

        let summary = pruner(provider.clone(), state).prune().await.unwrap();

        assert_eq!(summary.orphaned, 0);
        assert_eq!(provider.records(ZONE).len(), 2);
        assert_eq!(provider.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prune_never_touches_unowned_records() {
        let provider = Arc::new(FakeProvider::default());
        provider.seed(
            ZONE,
            vec![
                record(RecordType::A, "legacy", "10.9.9.9"),
                record(RecordType::TXT, "legacy", "managed-by=terraform"),
                record(RecordType::A, "other", "10.8.8.8"),
                record(RecordType::TXT, "other", &marker("other", "default", "team-y")),
            ],
        );

        let summary = pruner(provider.clone(), synced_state()).prune().await.unwrap();

        assert_eq!(summary.owned, 0);
        assert_eq!(provider.records(ZONE).len(), 4);
        assert_eq!(provider.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prune_read_failure_aborts_cycle() {
        let provider = Arc::new(FakeProvider::default());
        seed_redis(&provider);
        provider.set_read_failure(true);

        let err = pruner(provider.clone(), synced_state())
            .prune()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ProviderRead { .. }));
        assert_eq!(err.reason(), "ProviderReadError");
        assert_eq!(provider.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prune_delete_failure_is_skipped() {
        let provider = Arc::new(FakeProvider::default());
        seed_redis(&provider);
        provider.seed(
            ZONE,
            vec![
                record(RecordType::A, "api", "10.0.0.5"),
                record(RecordType::TXT, "api", &marker("api", "default", OWNER)),
            ],
        );
        provider.fail_name("redis");

        let summary = pruner(provider.clone(), synced_state()).prune().await.unwrap();

        assert_eq!(summary.orphaned, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 1);
        let remaining = provider.records(ZONE);
        assert!(remaining.iter().all(|r| r.name == "redis"));
    }

    #[tokio::test]
    async fn test_prune_waits_for_first_sync() {
        let provider = Arc::new(FakeProvider::default());
        seed_redis(&provider);
        let state = StateStore::new();

        let summary = pruner(provider.clone(), state.clone()).prune().await.unwrap();

        assert!(summary.skipped);
        assert_eq!(summary.owned, 0);
        assert_eq!(provider.records(ZONE).len(), 2);
        assert_eq!(provider.delete_calls.load(Ordering::SeqCst), 0);

        state.mark_synced();
        let summary = pruner(provider.clone(), state).prune().await.unwrap();
        assert!(!summary.skipped);
        assert_eq!(summary.deleted, 1);
    }
}
