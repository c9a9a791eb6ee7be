//! Org chart service: the tree store
//!
//! Owns the current snapshot, applies mutations, persists every successful
//! state transition and drives lazy loading of children.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    DomainError, DomainResult, DropTarget, IdGenerator, Installation, NodeId, OrgChart, OrgNode,
    OrgRecord, Transition,
};
use crate::infrastructure::traits::{ChildLoader, SnapshotStore};

/// Attempts at drawing an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Whether a mutation changed (and persisted) the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

/// Lazy-load state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    NotLoaded,
    Loading,
    Loaded,
    /// Last attempt failed; a new attempt is allowed.
    Failed(String),
}

/// Result of a `load_children` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fetched children were installed.
    Installed(usize),
    /// The node gained children during the fetch, or the chart was reset;
    /// fetched data was dropped.
    Discarded,
    /// Children were already materialized; nothing fetched.
    AlreadyLoaded,
    /// Another load of the same node is running; nothing fetched.
    InFlight,
}

/// Bookkeeping for a node with a running or failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadMarker {
    /// Fetch identified by its ticket is running.
    Loading(u64),
    Failed(String),
}

/// The tree store.
///
/// Starts uninitialized; [`OrgChartService::initialize`] moves it to ready.
/// Mutations are serialized by the state lock and each one either persists a
/// new snapshot or leaves the current one in place.
pub struct OrgChartService {
    store: Arc<dyn SnapshotStore>,
    loader: Arc<dyn ChildLoader>,
    ids: Arc<dyn IdGenerator>,
    settings: Arc<Settings>,
    state: Mutex<Option<Arc<OrgChart>>>,
    loads: Mutex<HashMap<NodeId, LoadMarker>>,
    /// Bumped on reset, under the state lock, so in-flight loads can tell
    /// they are stale.
    epoch: AtomicU64,
    tickets: AtomicU64,
}

impl OrgChartService {
    /// Create a new, uninitialized org chart service.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        loader: Arc<dyn ChildLoader>,
        ids: Arc<dyn IdGenerator>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            loader,
            ids,
            settings,
            state: Mutex::new(None),
            loads: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            tickets: AtomicU64::new(0),
        }
    }

    /// Load the persisted chart, falling back to the built-in default when
    /// nothing is stored or the stored record is unusable.
    #[instrument(level = "debug", skip(self))]
    pub fn initialize(&self) -> Arc<OrgChart> {
        let chart = match self.store.load() {
            Ok(Some(raw)) => match parse_record(&raw) {
                Ok(chart) => {
                    info!("loaded chart: {} nodes", chart.tree().len());
                    chart
                }
                Err(e) => {
                    warn!("stored chart is unusable, using default: {}", e.report());
                    OrgChart::default()
                }
            },
            Ok(None) => {
                debug!("no stored chart, using default");
                OrgChart::default()
            }
            Err(e) => {
                warn!("cannot read stored chart, using default: {}", e);
                OrgChart::default()
            }
        };

        let chart = Arc::new(chart);
        *self.lock_state() = Some(Arc::clone(&chart));
        chart
    }

    pub fn is_ready(&self) -> bool {
        self.lock_state().is_some()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> ApplicationResult<Arc<OrgChart>> {
        self.lock_state()
            .clone()
            .ok_or(ApplicationError::Uninitialized)
    }

    /// Add a direct report under `parent_id`; returns the new node's id.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(
        &self,
        parent_id: &str,
        name: &str,
        role: Option<&str>,
    ) -> ApplicationResult<NodeId> {
        let (_, id) = self.commit(|chart| {
            let id = self.fresh_id(chart);
            let next = chart.add_node(parent_id, id.clone(), name, role)?;
            Ok((Transition::Changed(next), id))
        })?;
        info!("added {} under {}", id, parent_id);
        Ok(id)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn rename_node(&self, id: &str, name: &str) -> ApplicationResult<Outcome> {
        let (outcome, _) = self.commit(|chart| Ok((chart.rename_node(id, name)?, ())))?;
        Ok(outcome)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn set_role(&self, id: &str, role: Option<&str>) -> ApplicationResult<Outcome> {
        let (outcome, _) = self.commit(|chart| Ok((chart.set_role(id, role)?, ())))?;
        Ok(outcome)
    }

    /// Delete a node and its subtree; returns the removed subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&self, id: &str) -> ApplicationResult<OrgNode> {
        let return_to_pool = self.settings.pool.return_deleted;
        let (_, removed) = self.commit(|chart| {
            let (next, removed) = chart.delete_node(id, return_to_pool)?;
            Ok((Transition::Changed(next), removed))
        })?;
        info!("deleted {} ({} nodes)", id, removed.count());
        Ok(removed)
    }

    /// Move a tree node or an unassigned person to `target`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&self, active_id: &str, target: &DropTarget) -> ApplicationResult<Outcome> {
        let (outcome, _) = self.commit(|chart| Ok((chart.move_node(active_id, target)?, ())))?;
        Ok(outcome)
    }

    /// Add a person to the unassigned list; returns their id.
    #[instrument(level = "debug", skip(self))]
    pub fn add_unassigned(&self, name: &str) -> ApplicationResult<NodeId> {
        let (_, id) = self.commit(|chart| {
            let id = self.fresh_id(chart);
            let next = chart.add_unassigned(id.clone(), name)?;
            Ok((Transition::Changed(next), id))
        })?;
        Ok(id)
    }

    /// Lazy-load state of a node.
    pub fn load_status(&self, id: &str) -> ApplicationResult<LoadStatus> {
        let chart = self.snapshot()?;
        let node = chart
            .tree()
            .node(id)
            .ok_or_else(|| DomainError::NotFound(id.into()))?;
        let loaded = node.children_loaded();
        Ok(match self.lock_loads().get(id) {
            Some(LoadMarker::Loading(_)) => LoadStatus::Loading,
            Some(LoadMarker::Failed(reason)) if !loaded => LoadStatus::Failed(reason.clone()),
            _ if loaded => LoadStatus::Loaded,
            _ => LoadStatus::NotLoaded,
        })
    }

    /// Fetch and install the children of `id` from the child loader.
    ///
    /// Concurrent calls for the same node are deduplicated: only the first
    /// one reaches the loader. The lock is never held while fetching, so
    /// other operations stay available. A failed fetch marks the node
    /// [`LoadStatus::Failed`] and can be retried.
    #[instrument(level = "debug", skip(self))]
    pub async fn load_children(&self, id: &str) -> ApplicationResult<LoadOutcome> {
        let (node_id, epoch, ticket) = {
            let state = self.lock_state();
            let chart = state.as_ref().ok_or(ApplicationError::Uninitialized)?;
            let node = chart
                .tree()
                .node(id)
                .ok_or_else(|| DomainError::NotFound(id.into()))?;
            if node.children_loaded() {
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            let mut loads = self.lock_loads();
            if matches!(loads.get(id), Some(LoadMarker::Loading(_))) {
                debug!("load of {} already in flight", id);
                return Ok(LoadOutcome::InFlight);
            }
            let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);
            loads.insert(node.data.id.clone(), LoadMarker::Loading(ticket));
            (
                node.data.id.clone(),
                self.epoch.load(Ordering::SeqCst),
                ticket,
            )
        };

        info!("loading children of {}", node_id);
        let fetched = self.loader.fetch_children(&node_id).await;

        let result = match fetched {
            Ok(children) => self
                .commit(|chart| {
                    if self.epoch.load(Ordering::SeqCst) != epoch {
                        return Ok((Transition::Unchanged, None));
                    }
                    let (transition, installation) =
                        chart.install_children(node_id.as_str(), &children)?;
                    Ok((transition, Some(installation)))
                })
                .map(|(_, installation)| match installation {
                    Some(Installation::Installed(n)) => LoadOutcome::Installed(n),
                    Some(Installation::Discarded) => LoadOutcome::Discarded,
                    None => {
                        debug!("chart was reset while loading {}, dropping result", node_id);
                        LoadOutcome::Discarded
                    }
                }),
            Err(_) if self.epoch.load(Ordering::SeqCst) != epoch => {
                debug!("chart was reset while loading {}, dropping error", node_id);
                Ok(LoadOutcome::Discarded)
            }
            Err(source) => Err(ApplicationError::LazyLoad {
                node: node_id.clone(),
                source,
            }),
        };

        let mut loads = self.lock_loads();
        if loads.get(&node_id) != Some(&LoadMarker::Loading(ticket)) {
            // marker was cleared by a reset or a removal of the node
            return result;
        }
        match &result {
            Ok(outcome) => {
                debug!("load of {} finished: {:?}", node_id, outcome);
                loads.remove(&node_id);
            }
            Err(ApplicationError::Domain(DomainError::NotFound(_))) => {
                debug!("{} was removed while loading", node_id);
                loads.remove(&node_id);
            }
            Err(e) => {
                warn!("load of {} failed: {}", node_id, e.report());
                loads.insert(node_id.clone(), LoadMarker::Failed(e.report()));
            }
        }
        result
    }

    /// Discard everything, including the stored record, and start over
    /// from the built-in default chart.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&self) -> ApplicationResult<Arc<OrgChart>> {
        let mut state = self.lock_state();
        self.store.clear().with_store_context("clear chart")?;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.lock_loads().clear();

        let chart = Arc::new(OrgChart::default());
        *state = Some(Arc::clone(&chart));
        info!("chart reset to default");
        Ok(chart)
    }

    /// Apply `op` to the current snapshot; persist and publish the result if
    /// it changed. A failed save keeps the previous snapshot current.
    fn commit<T>(
        &self,
        op: impl FnOnce(&OrgChart) -> DomainResult<(Transition, T)>,
    ) -> ApplicationResult<(Outcome, T)> {
        let mut state = self.lock_state();
        let current = state.as_ref().ok_or(ApplicationError::Uninitialized)?;

        match op(current)? {
            (Transition::Unchanged, value) => Ok((Outcome::Unchanged, value)),
            (Transition::Changed(next), value) => {
                self.persist(&next)?;
                self.prune_loads(&next);
                *state = Some(Arc::new(next));
                Ok((Outcome::Changed, value))
            }
        }
    }

    fn persist(&self, chart: &OrgChart) -> ApplicationResult<()> {
        let json = serde_json::to_string(&chart.to_record()).map_err(|e| {
            ApplicationError::Serialization {
                context: "encode chart".to_string(),
                source: e,
            }
        })?;
        self.store.save(&json).with_store_context("save chart")
    }

    /// Forget markers of nodes that left the tree and failures of nodes
    /// whose children are now materialized.
    fn prune_loads(&self, chart: &OrgChart) {
        self.lock_loads()
            .retain(|id, marker| match chart.tree().node(id.as_str()) {
                None => false,
                Some(node) => {
                    matches!(marker, LoadMarker::Loading(_)) || !node.children_loaded()
                }
            });
    }

    fn fresh_id(&self, chart: &OrgChart) -> NodeId {
        let mut id = self.ids.next_id();
        for _ in 1..MAX_ID_ATTEMPTS {
            if !chart.contains_id(id.as_str()) {
                break;
            }
            debug!("generated id {} already taken, drawing again", id);
            id = self.ids.next_id();
        }
        id
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<Arc<OrgChart>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_loads(&self) -> std::sync::MutexGuard<'_, HashMap<NodeId, LoadMarker>> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decode a stored record into a chart.
fn parse_record(raw: &str) -> ApplicationResult<OrgChart> {
    let record: OrgRecord =
        serde_json::from_str(raw).map_err(|e| ApplicationError::Serialization {
            context: "decode stored chart".to_string(),
            source: e,
        })?;
    Ok(OrgChart::from_record(&record)?)
}
