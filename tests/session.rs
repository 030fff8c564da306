use tempfile::TempDir;

use logsieve::session::{SessionRegistry, SessionState};
use logsieve::SieveError;

fn registry_in(dir: &TempDir) -> SessionRegistry {
    SessionRegistry::open(dir.path())
}

#[test]
fn create_makes_the_new_session_active() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    let created = registry
        .create("prod", dir.path().join("prod.parquet"))
        .unwrap();
    assert_eq!(created.name, "prod");
    assert_eq!(created.state, SessionState::Active);

    let active = registry.active().unwrap();
    assert_eq!(active.name, "prod");
    assert_eq!(active.store_path, dir.path().join("prod.parquet"));
}

#[test]
fn create_deactivates_the_previous_session() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    registry.create("one", dir.path().join("one.parquet")).unwrap();
    registry.create("two", dir.path().join("two.parquet")).unwrap();

    assert_eq!(registry.active().unwrap().name, "two");
    let sessions = registry.list().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].state, SessionState::Inactive);
    assert_eq!(sessions[1].state, SessionState::Active);
}

#[test]
fn create_rejects_duplicate_names() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    registry.create("dup", dir.path().join("a.parquet")).unwrap();
    let err = registry
        .create("dup", dir.path().join("b.parquet"))
        .unwrap_err();
    assert!(matches!(err, SieveError::Session { .. }));
}

#[test]
fn create_sanitizes_the_name() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    let created = registry
        .create("My Prod!", dir.path().join("p.parquet"))
        .unwrap();
    assert_eq!(created.name, "my_prod_");
}

#[test]
fn attach_switches_the_active_session() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    registry.create("one", dir.path().join("one.parquet")).unwrap();
    registry.create("two", dir.path().join("two.parquet")).unwrap();

    let attached = registry.attach("one").unwrap();
    assert_eq!(attached.state, SessionState::Active);
    assert_eq!(registry.active().unwrap().name, "one");

    let err = registry.attach("three").unwrap_err();
    assert!(matches!(err, SieveError::Session { .. }));
}

#[test]
fn kill_forgets_only_the_active_session() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);

    registry.create("keep", dir.path().join("keep.parquet")).unwrap();
    registry.create("gone", dir.path().join("gone.parquet")).unwrap();

    let killed = registry.kill().unwrap();
    assert_eq!(killed.name, "gone");

    let sessions = registry.list().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "keep");

    // The survivor is not auto-activated.
    assert!(matches!(
        registry.active(),
        Err(SieveError::Session { .. })
    ));
    assert!(matches!(registry.kill(), Err(SieveError::Session { .. })));
}

#[test]
fn registry_state_survives_reopen() {
    let dir = TempDir::new().unwrap();

    registry_in(&dir)
        .create("persisted", dir.path().join("p.parquet"))
        .unwrap();

    let reopened = registry_in(&dir);
    assert_eq!(reopened.active().unwrap().name, "persisted");
}

#[test]
fn empty_registry_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir);
    assert!(registry.list().unwrap().is_empty());
    assert!(matches!(registry.active(), Err(SieveError::Session { .. })));
}
