//! End-to-end pipeline over the durable store: record a task's lifecycle,
//! then reconstruct it at every point and list its history.

use trail_core::query::{list_history, HistoryQuery};
use trail_core::record::RelationDelta;
use trail_core::replay::snapshot_at;
use trail_core::resolve::IdentityResolver;
use trail_core::store::CurrentState;
use trail_core::{
    ChangeType, FieldName, HistoryStore, Priority, RelationKind, SqliteHistory, TaskFields,
    DEFAULT_REPLAY_CAP,
};

use serde_json::json;

/// The recorded lifecycle: creation, one priority change, assignee handoff.
struct Lifecycle {
    store: SqliteHistory,
    created_id: String,
    priority_id: String,
    assigned_id: String,
    handoff_id: String,
}

fn record_lifecycle() -> Lifecycle {
    let mut store = SqliteHistory::in_memory().expect("open in-memory store");

    let created = store
        .create_task(
            "task-42",
            TaskFields {
                name: "Ship snapshot reconstruction".into(),
                description: Some("replay the ledger".into()),
                priority: Some(Priority::Medium),
                ..TaskFields::default()
            },
            Some("user-amara"),
            1_000_000,
        )
        .expect("create task");

    let mut post = store
        .task("task-42")
        .expect("query live row")
        .expect("task exists")
        .fields;
    post.priority = Some(Priority::High);
    let priority = store
        .update_task("task-42", post, Some("user-amara"), 2_000_000)
        .expect("update priority");

    let assigned = store
        .apply_relations(
            "task-42",
            RelationKind::Assignee,
            &RelationDelta {
                added: vec!["user-amara".into()],
                removed: vec![],
            },
            Some("user-amara"),
            3_000_000,
        )
        .expect("assign amara");

    let handoff = store
        .apply_relations(
            "task-42",
            RelationKind::Assignee,
            &RelationDelta {
                added: vec!["user-bennett".into()],
                removed: vec!["user-amara".into()],
            },
            Some("user-bennett"),
            4_000_000,
        )
        .expect("hand off to bennett");

    Lifecycle {
        store,
        created_id: created.id,
        priority_id: priority[0].id.clone(),
        assigned_id: assigned[0].id.clone(),
        handoff_id: handoff.last().expect("handoff entry").id.clone(),
    }
}

#[test]
fn snapshot_at_creation_shows_initial_state() {
    let lc = record_lifecycle();
    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &lc.created_id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");

    assert_eq!(snap.fields["priority"], json!("medium"));
    assert_eq!(snap.fields["name"], json!("Ship snapshot reconstruction"));
    assert!(snap.assignees.is_empty());
    assert_eq!(snap.entry_meta.change_type, ChangeType::EntityCreated);
    assert!(!snap.degraded);
}

#[test]
fn snapshot_mid_history_sees_changes_up_to_target_only() {
    let lc = record_lifecycle();
    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &lc.priority_id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");

    // Priority change applied, assignee changes not yet.
    assert_eq!(snap.fields["priority"], json!("high"));
    assert!(snap.assignees.is_empty());
}

#[test]
fn snapshot_at_first_assignment_pairs_field_and_membership() {
    let lc = record_lifecycle();
    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &lc.assigned_id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");

    // The earlier priority change and the assignment show up together.
    assert_eq!(snap.fields["priority"], json!("high"));
    assert_eq!(snap.assignees, vec!["user-amara".to_string()]);
    assert!(!snap.degraded);
}

#[test]
fn latest_snapshot_round_trips_with_live_state() {
    let lc = record_lifecycle();
    let live = lc
        .store
        .task("task-42")
        .expect("query live row")
        .expect("task exists");
    let live_relations = lc.store.relations("task-42").expect("live relations");

    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &lc.handoff_id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");

    assert!(!snap.degraded);
    assert_eq!(snap.fields, live.fields.to_object());
    assert_eq!(snap.assignees, vec!["user-bennett".to_string()]);
    assert_eq!(
        live_relations.assignees.into_iter().collect::<Vec<_>>(),
        snap.assignees
    );
}

#[test]
fn handoff_resolves_to_last_writer_per_member() {
    let lc = record_lifecycle();
    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &lc.handoff_id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");

    // Amara was added then removed; Bennett added last.
    assert!(!snap.assignees.contains(&"user-amara".to_string()));
    assert!(snap.assignees.contains(&"user-bennett".to_string()));
}

#[test]
fn re_adding_a_removed_member_restores_membership() {
    let mut lc = record_lifecycle();
    let readd = lc
        .store
        .apply_relations(
            "task-42",
            RelationKind::Assignee,
            &RelationDelta {
                added: vec!["user-amara".into()],
                removed: vec![],
            },
            None,
            5_000_000,
        )
        .expect("re-add amara");

    let snap = snapshot_at(
        &lc.store,
        &IdentityResolver,
        &IdentityResolver,
        "task-42",
        &readd[0].id,
        DEFAULT_REPLAY_CAP,
    )
    .expect("snapshot");
    assert_eq!(
        snap.assignees,
        vec!["user-amara".to_string(), "user-bennett".to_string()]
    );
    assert!(!snap.degraded);
}

#[test]
fn snapshots_are_reproducible() {
    let lc = record_lifecycle();
    let take = || {
        snapshot_at(
            &lc.store,
            &IdentityResolver,
            &IdentityResolver,
            "task-42",
            &lc.priority_id,
            DEFAULT_REPLAY_CAP,
        )
        .expect("snapshot")
    };
    assert_eq!(take(), take());
}

#[test]
fn history_listing_is_descending_and_complete() {
    let lc = record_lifecycle();
    let page = list_history(&lc.store, &HistoryQuery::new("task-42")).expect("list");

    // created, priority, add amara, remove amara, add bennett
    assert_eq!(page.total_count, 5);
    assert_eq!(page.entries.len(), 5);
    let positions: Vec<_> = page
        .entries
        .iter()
        .map(|e| (e.changed_at_us, e.sequence))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(positions, sorted);
    assert_eq!(page.entity_summary.name, "Ship snapshot reconstruction");
}

#[test]
fn relation_added_filter_lists_only_additions() {
    let lc = record_lifecycle();
    let page = list_history(
        &lc.store,
        &HistoryQuery {
            change_type: Some(ChangeType::RelationAdded),
            ..HistoryQuery::new("task-42")
        },
    )
    .expect("list");

    assert_eq!(page.total_count, 2);
    assert_eq!(page.entries[0].related_id.as_deref(), Some("user-bennett"));
    assert_eq!(page.entries[1].related_id.as_deref(), Some("user-amara"));
}

#[test]
fn field_filter_pinpoints_one_field_history() {
    let lc = record_lifecycle();
    let page = list_history(
        &lc.store,
        &HistoryQuery {
            field_name: Some(FieldName::Priority),
            ..HistoryQuery::new("task-42")
        },
    )
    .expect("list");

    assert_eq!(page.total_count, 1);
    assert_eq!(page.entries[0].id, lc.priority_id);
    assert_eq!(page.entries[0].old_value, Some(json!("medium")));
    assert_eq!(page.entries[0].new_value, Some(json!("high")));
}

#[test]
fn entry_ids_are_stable_across_reopens_of_the_same_ledger() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("trail.sqlite3");

    let created_id = {
        let mut store = SqliteHistory::open(&path).expect("open");
        store
            .create_task(
                "task-1",
                TaskFields {
                    name: "Durable".into(),
                    ..TaskFields::default()
                },
                None,
                7_000,
            )
            .expect("create")
            .id
    };

    let store = SqliteHistory::open(&path).expect("reopen");
    let latest = store.latest("task-1").expect("query").expect("entry");
    assert_eq!(latest.id, created_id);
    assert_eq!(latest.changed_at_us, 7_000);
}
