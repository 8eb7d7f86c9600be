//! Shared mock collaborators for the scheduler tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::{Dispatcher, ExecutionHistory, Fetcher, OwnerStore, TaskStore};
use pagewatch_core::types::{
    ChannelConfig, ChannelKind, ExecutionResult, Owner, WatchTask,
};

/// Fetcher that replays a scripted sequence of outcomes, repeating the
/// last one when the script runs out.
pub struct ScriptedFetcher {
    script: Mutex<Vec<Result<ExecutionResult>>>,
    fetches: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<ExecutionResult>>) -> Self {
        assert!(!script.is_empty(), "script must have at least one entry");
        Self {
            script: Mutex::new(script),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn ok(result: ExecutionResult) -> Self {
        Self::new(vec![Ok(result)])
    }

    pub fn err(error: PagewatchError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> Result<ExecutionResult> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.remove(0)
        } else {
            clone_outcome(&script[0])
        };
        next
    }
}

fn clone_outcome(outcome: &Result<ExecutionResult>) -> Result<ExecutionResult> {
    match outcome {
        Ok(result) => Ok(result.clone()),
        Err(PagewatchError::Fetch(msg)) => Err(PagewatchError::Fetch(msg.clone())),
        Err(other) => Err(PagewatchError::Fetch(other.to_string())),
    }
}

/// In-memory task store recording every save.
#[derive(Default)]
pub struct MemStore {
    pub tasks: Mutex<std::collections::HashMap<i64, WatchTask>>,
    pub saves: Mutex<Vec<WatchTask>>,
    pub fail_load: bool,
}

impl TaskStore for MemStore {
    fn load_eligible(&self) -> Result<Vec<WatchTask>> {
        if self.fail_load {
            return Err(PagewatchError::Store("store offline".into()));
        }
        let mut tasks: Vec<WatchTask> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| !t.options.is_dependency)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }
    fn list(&self) -> Result<Vec<WatchTask>> {
        Ok(self.tasks.lock().unwrap().values().cloned().collect())
    }
    fn get(&self, id: i64) -> Result<Option<WatchTask>> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }
    fn insert(&self, task: &WatchTask) -> Result<i64> {
        let mut tasks = self.tasks.lock().unwrap();
        let id = tasks.keys().max().copied().unwrap_or(0) + 1;
        let mut task = task.clone();
        task.id = id;
        tasks.insert(id, task);
        Ok(id)
    }
    fn save(&self, task: &WatchTask) -> Result<()> {
        self.saves.lock().unwrap().push(task.clone());
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(&task.id) {
            tasks.insert(task.id, task.clone());
        }
        Ok(())
    }
    fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.tasks.lock().unwrap().remove(&id).is_some())
    }
}

impl MemStore {
    pub fn seed(&self, task: WatchTask) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<WatchTask> {
        self.saves.lock().unwrap().last().cloned()
    }
}

/// Owner store with zero or one owner.
#[derive(Default)]
pub struct MemOwners {
    pub owner: Option<Owner>,
}

impl OwnerStore for MemOwners {
    fn owner(&self, id: i64) -> Result<Option<Owner>> {
        Ok(self.owner.clone().filter(|o| o.id == id))
    }
}

/// Execution history returning a fixed uniqueness count.
pub struct MemHistory {
    count: u64,
    fail: bool,
    records: AtomicUsize,
}

impl MemHistory {
    pub fn empty() -> Self {
        Self::with_count(0)
    }

    pub fn with_count(count: u64) -> Self {
        Self {
            count,
            fail: false,
            records: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            count: 0,
            fail: true,
            records: AtomicUsize::new(0),
        }
    }

    pub fn records(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }
}

impl ExecutionHistory for MemHistory {
    fn record(&self, _url: &str, _result: &ExecutionResult) -> Result<i64> {
        let n = self.records.fetch_add(1, Ordering::SeqCst);
        Ok(n as i64 + 1)
    }

    fn count_by_hash(&self, _url: &str, _hash: &str, _exclude_id: Option<i64>) -> Result<u64> {
        if self.fail {
            Err(PagewatchError::Store("history offline".into()))
        } else {
            Ok(self.count)
        }
    }
}

/// Dispatcher that counts deliveries and optionally fails each one.
#[derive(Clone)]
pub struct CountingDispatcher {
    kind: ChannelKind,
    fail: bool,
    deliveries: Arc<AtomicUsize>,
}

impl CountingDispatcher {
    pub fn ok(kind: ChannelKind) -> Self {
        Self {
            kind,
            fail: false,
            deliveries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(kind: ChannelKind) -> Self {
        Self {
            kind,
            fail: true,
            deliveries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Dispatcher for CountingDispatcher {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(
        &self,
        _config: &ChannelConfig,
        _message: &str,
        _task: &WatchTask,
    ) -> Result<()> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(PagewatchError::Channel("mock delivery failure".into()))
        } else {
            Ok(())
        }
    }
}
