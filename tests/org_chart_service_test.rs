//! Tests for OrgChartService: lifecycle, mutations and persistence

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rstest::rstest;
use tempfile::TempDir;

use orgview::application::services::{OrgChartService, Outcome};
use orgview::application::ApplicationError;
use orgview::config::{PoolConfig, Settings};
use orgview::domain::{
    DomainError, DropTarget, IdGenerator, NodeId, OrgChart, OrgRecord, SequentialIds,
};
use orgview::infrastructure::di::ServiceContainer;
use orgview::infrastructure::traits::{
    EmptyChildLoader, MemorySnapshotStore, RealFileSystem, SnapshotStore,
};
use orgview::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

/// In-memory store that counts saves and can be told to fail them.
#[derive(Default)]
struct RecordingStore {
    record: Mutex<Option<String>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl RecordingStore {
    fn with_record(record: &str) -> Self {
        Self {
            record: Mutex::new(Some(record.to_string())),
            ..Self::default()
        }
    }

    fn stored(&self) -> Option<OrgRecord> {
        let raw = self.record.lock().unwrap().clone()?;
        Some(serde_json::from_str(&raw).expect("stored record is valid JSON"))
    }
}

impl SnapshotStore for RecordingStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.record.lock().unwrap().clone())
    }

    fn save(&self, record: &str) -> io::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(io::Error::other("quota exceeded"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

/// Hands out the given ids in order, then falls back to a counter.
struct ScriptedIds {
    scripted: Mutex<Vec<&'static str>>,
    fallback: SequentialIds,
}

impl IdGenerator for ScriptedIds {
    fn next_id(&self) -> NodeId {
        let mut scripted = self.scripted.lock().unwrap();
        if scripted.is_empty() {
            self.fallback.next_id()
        } else {
            NodeId::from(scripted.remove(0))
        }
    }
}

fn service_with(store: Arc<dyn SnapshotStore>, settings: Settings) -> OrgChartService {
    OrgChartService::new(
        store,
        Arc::new(EmptyChildLoader),
        Arc::new(SequentialIds::new("n")),
        Arc::new(settings),
    )
}

fn ready_service(store: Arc<RecordingStore>) -> OrgChartService {
    let service = service_with(store, Settings::default());
    service.initialize();
    service
}

#[test]
fn given_uninitialized_service_when_using_then_rejected() {
    let service = service_with(Arc::new(MemorySnapshotStore::new()), Settings::default());

    assert!(!service.is_ready());
    assert!(matches!(
        service.snapshot(),
        Err(ApplicationError::Uninitialized)
    ));
    assert!(matches!(
        service.add_node("root", "X", None),
        Err(ApplicationError::Uninitialized)
    ));
}

#[test]
fn given_empty_store_when_initializing_then_default_chart_without_write() {
    // Arrange
    let store = Arc::new(RecordingStore::default());
    let service = service_with(store.clone(), Settings::default());

    // Act
    let chart = service.initialize();

    // Assert
    assert!(service.is_ready());
    assert_eq!(*chart, OrgChart::default());
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert!(store.stored().is_none());
}

#[rstest]
#[case::not_json("{not json")]
#[case::wrong_shape(r#"{"unassigned":[]}"#)]
#[case::duplicate_ids(
    r#"{"tree":{"id":"a","name":"A","children":[{"id":"a","name":"Again"}]}}"#
)]
fn given_unusable_record_when_initializing_then_falls_back_to_default(#[case] raw: &str) {
    let service = service_with(
        Arc::new(MemorySnapshotStore::with_record(raw)),
        Settings::default(),
    );

    let chart = service.initialize();

    assert_eq!(*chart, OrgChart::default());
}

#[test]
fn given_mutation_when_committed_then_persisted_and_reloadable() {
    // Arrange
    let store = Arc::new(RecordingStore::default());
    let service = ready_service(store.clone());

    // Act
    let id = service
        .add_node("root", "Grace Hopper", Some("Advisor"))
        .expect("add");

    // Assert
    assert_eq!(id.as_str(), "n-1");
    let stored = store.stored().expect("record saved");
    assert!(stored.tree.contains("n-1"));

    let reloaded = service_with(store.clone(), Settings::default());
    let chart = reloaded.initialize();
    assert_eq!(chart, service.snapshot().expect("snapshot"));
    let node = chart.tree().node("n-1").expect("persisted node");
    assert_eq!(node.data.role.as_deref(), Some("Advisor"));
    assert_eq!(node.depth, 1);
}

#[test]
fn given_same_name_when_renaming_then_no_write() {
    let store = Arc::new(RecordingStore::default());
    let service = ready_service(store.clone());

    let outcome = service.rename_node("1", "Marcus Rodriguez").expect("rename");

    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[test]
fn given_rejected_mutation_when_committing_then_nothing_written() {
    let store = Arc::new(RecordingStore::default());
    let service = ready_service(store.clone());
    let before = service.snapshot().expect("snapshot");

    let err = service.delete_node("root").unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::RootProtected(_))
    ));
    assert!(!err.is_retryable());
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert_eq!(service.snapshot().expect("snapshot"), before);
}

#[test]
fn given_failing_store_when_saving_then_state_unchanged_and_retry_succeeds() {
    // Arrange
    let store = Arc::new(RecordingStore::default());
    let service = ready_service(store.clone());
    let before = service.snapshot().expect("snapshot");
    store.fail_saves.store(true, Ordering::SeqCst);

    // Act
    let err = service.rename_node("2", "Elena Gilbert-Ruiz").unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Persistence { .. }));
    assert!(err.is_retryable());
    assert!(err.report().contains("quota exceeded"));
    assert_eq!(service.snapshot().expect("snapshot"), before);

    // Act: retry once storage recovers
    store.fail_saves.store(false, Ordering::SeqCst);
    let outcome = service.rename_node("2", "Elena Gilbert-Ruiz").expect("retry");

    // Assert
    assert_eq!(outcome, Outcome::Changed);
    let renamed = store.stored().expect("saved");
    assert_eq!(renamed.tree.children[1].name, "Elena Gilbert-Ruiz");
}

#[rstest]
#[case(true, 4)]
#[case(false, 3)]
fn given_pool_policy_when_deleting_then_deleted_person_returns_or_not(
    #[case] return_deleted: bool,
    #[case] pool_size: usize,
) {
    let settings = Settings {
        pool: PoolConfig { return_deleted },
        ..Settings::default()
    };
    let service = service_with(Arc::new(RecordingStore::default()), settings);
    service.initialize();
    service.add_node("1", "Report", None).expect("add");

    let removed = service.delete_node("1").expect("delete");

    assert_eq!(removed.count(), 2);
    let chart = service.snapshot().expect("snapshot");
    assert_eq!(chart.unassigned().len(), pool_size);
    assert!(!chart.tree().contains_id("1"));
}

#[test]
fn given_pool_person_when_moved_into_tree_then_persisted_without_pool_entry() {
    let store = Arc::new(RecordingStore::default());
    let service = ready_service(store.clone());

    let outcome = service
        .move_node("u2", &DropTarget::Before("2".into()))
        .expect("move");

    assert_eq!(outcome, Outcome::Changed);
    let stored = store.stored().expect("saved");
    let ids: Vec<&str> = stored.tree.children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "u2", "2"]);
    let pool = stored.unassigned.expect("pool persisted");
    assert!(pool.iter().all(|p| p.id.as_str() != "u2"));
}

#[test]
fn given_added_unassigned_when_listing_then_appended_to_pool() {
    let service = ready_service(Arc::new(RecordingStore::default()));

    let id = service.add_unassigned("Linus").expect("add");

    let chart = service.snapshot().expect("snapshot");
    let last = chart.unassigned().last().expect("non-empty pool");
    assert_eq!(last.id, id);
    assert_eq!(last.name, "Linus");
}

#[test]
fn given_generated_id_collision_when_adding_then_draws_again() {
    let service = OrgChartService::new(
        Arc::new(RecordingStore::default()),
        Arc::new(EmptyChildLoader),
        Arc::new(ScriptedIds {
            scripted: Mutex::new(vec!["1", "u1", "fresh"]),
            fallback: SequentialIds::new("n"),
        }),
        Arc::new(Settings::default()),
    );
    service.initialize();

    let id = service.add_node("root", "New", None).expect("add");

    assert_eq!(id.as_str(), "fresh");
}

#[test]
fn given_edited_chart_when_resetting_then_record_cleared_and_default_restored() {
    let store = Arc::new(RecordingStore::with_record(
        r#"{"tree":{"id":"x","name":"Stored Root"},"unassigned":[]}"#,
    ));
    let service = ready_service(store.clone());
    assert_eq!(service.snapshot().expect("snapshot").root_id().as_str(), "x");

    let chart = service.reset().expect("reset");

    assert_eq!(*chart, OrgChart::default());
    assert!(store.stored().is_none());
}

#[test]
fn given_file_store_when_editing_then_record_survives_restart() {
    // Arrange
    let temp = TempDir::new().expect("temp dir");
    let settings = Settings {
        data_dir: temp.path().join("data"),
        id_prefix: Some("emp".into()),
        ..Settings::default()
    };
    let record_path = settings.record_path();

    // Act
    let container = ServiceContainer::new(settings.clone());
    container.org_chart.initialize();
    let id = container
        .org_chart
        .add_node("2", "Barbara Liskov", None)
        .expect("add");
    container
        .org_chart
        .move_node(id.as_str(), &DropTarget::Child("1".into()))
        .expect("move");

    // Assert
    assert!(record_path.exists());
    assert!(!temp.path().join("data/orgview_data_v1.json.tmp").exists());

    let restarted = ServiceContainer::with_deps(
        settings,
        Arc::new(RealFileSystem),
        container.store.clone(),
    );
    let chart = restarted.org_chart.initialize();
    let parent = chart.tree().parent_of(id.as_str()).expect("moved node has a parent");
    assert_eq!(parent.data.id.as_str(), "1");
    assert_eq!(chart.tree().node(id.as_str()).map(|n| n.depth), Some(2));
}
