use super::*;
use crate::agent::{AgentRecord, AgentState};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn agent(id: &str, x: f64) -> AgentRecord {
    AgentRecord::new(id, x, 10.0, AgentState::Idle)
}

#[test]
fn test_upsert_inserts_and_replaces() {
    let registry = AgentRegistry::new();

    registry.upsert(agent("a1", 1.0));
    registry.upsert(agent("a1", 2.0));

    assert_eq!(registry.count(), 1);
    assert_eq!(registry.get("a1").unwrap().x, 2.0);
    assert!(registry.is_dirty());
}

#[test]
fn test_upsert_identical_twice_is_idempotent() {
    let registry = AgentRegistry::new();

    registry.upsert(agent("a1", 5.0));
    registry.upsert(agent("a1", 5.0));

    assert_eq!(registry.get_all(), vec![agent("a1", 5.0)]);
    assert!(registry.take_dirty());
    assert!(!registry.take_dirty());
}

#[test]
fn test_remove_existing_marks_dirty() {
    let registry = AgentRegistry::new();
    registry.upsert(agent("a1", 1.0));
    registry.clear_dirty();

    assert!(registry.remove("a1"));
    assert!(registry.is_dirty());
    assert!(registry.get("a1").is_none());
    assert_eq!(registry.take_removed(), vec!["a1".to_string()]);
}

#[test]
fn test_remove_nonexistent_not_dirty() {
    let registry = AgentRegistry::new();

    assert!(!registry.remove("ghost"));
    assert!(!registry.is_dirty());
    assert!(registry.take_removed().is_empty());
}

#[test]
fn test_upsert_cancels_pending_removal() {
    let registry = AgentRegistry::new();
    registry.upsert(agent("a1", 1.0));
    registry.remove("a1");
    registry.upsert(agent("a1", 3.0));

    assert!(registry.take_removed().is_empty());
    assert_eq!(registry.count(), 1);
}

#[test]
fn test_update_mutates_in_place() {
    let registry = AgentRegistry::new();
    registry.upsert(agent("a1", 1.0));
    registry.clear_dirty();

    assert!(registry.update("a1", |a| a.x = 7.0));
    assert_eq!(registry.get("a1").unwrap().x, 7.0);
    assert!(registry.is_dirty());
}

#[test]
fn test_update_never_resurrects_removed_agent() {
    let registry = AgentRegistry::new();
    registry.upsert(agent("a1", 1.0));
    registry.remove("a1");
    registry.clear_dirty();

    assert!(!registry.update("a1", |a| a.x = 7.0));
    assert!(!registry.update("ghost", |a| a.x = 7.0));

    assert!(registry.get("a1").is_none());
    assert!(!registry.is_dirty());
    assert_eq!(registry.take_removed(), vec!["a1".to_string()]);
}

#[test]
fn test_get_all_sorted_by_id() {
    let registry = AgentRegistry::new();
    registry.upsert(agent("b", 1.0));
    registry.upsert(agent("c", 1.0));
    registry.upsert(agent("a", 1.0));

    let ids: Vec<String> = registry.get_all().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_concurrent_upserts() {
    let registry = Arc::new(AgentRegistry::new());
    let mut handles = vec![];

    for i in 0..10 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            registry.upsert(agent(&format!("agent-{}", i), i as f64));
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.count(), 10);
}

// ── Broadcaster ──────────────────────────────────────────────────────────────

#[test]
fn test_tick_skips_when_clean() {
    let broadcaster = Broadcaster::new(Arc::new(AgentRegistry::new()));
    let mut rx = broadcaster.subscribe();

    assert!(broadcaster.tick().is_none());
    assert!(broadcaster.tick().is_none());

    assert!(rx.try_recv().is_err());
    // Tick still advances
    assert_eq!(broadcaster.current_tick(), 2);
}

#[test]
fn test_mutations_between_ticks_coalesce_into_one_broadcast() {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let mut rx = broadcaster.subscribe();

    registry.upsert(agent("a1", 1.0));
    registry.upsert(agent("a2", 1.0));
    registry.remove("a2");
    registry.upsert(agent("a3", 1.0));

    let sent = broadcaster.tick().unwrap();
    assert_eq!(sent.agents, registry.get_all());
    assert_eq!(sent.removed, vec!["a2".to_string()]);

    // Exactly one message on the wire
    assert_eq!(rx.try_recv().unwrap(), sent);
    assert!(rx.try_recv().is_err());

    // Nothing changed since: next tick is silent
    assert!(broadcaster.tick().is_none());
    assert!(!registry.is_dirty());
}

#[test]
fn test_two_upserts_same_id_broadcast_final_value() {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));

    registry.upsert(agent("a1", 100.0));
    registry.upsert(agent("a1", 200.0));

    let sent = broadcaster.tick().unwrap();
    assert_eq!(sent.agents, vec![agent("a1", 200.0)]);
}

#[test]
fn test_remove_of_unknown_id_does_not_broadcast() {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));

    registry.remove("nope");

    assert!(broadcaster.tick().is_none());
}

#[test]
fn test_snapshot_carries_current_tick() {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    registry.upsert(agent("a1", 1.0));
    broadcaster.tick();
    broadcaster.tick();

    let snapshot = broadcaster.snapshot();
    assert_eq!(snapshot.tick, 2);
    assert_eq!(snapshot.agents, vec![agent("a1", 1.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_loop_broadcasts_on_change() {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
    let mut rx = broadcaster.subscribe();
    let _task = Arc::clone(&broadcaster).spawn(Duration::from_millis(100));

    registry.upsert(agent("a1", 1.0));
    registry.upsert(agent("a1", 2.0));

    let update = rx.recv().await.unwrap();
    assert_eq!(update.agents, vec![agent("a1", 2.0)]);

    // Idle registry: no further broadcasts
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
}
