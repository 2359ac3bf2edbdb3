//! Scenario files: entities, their passengers and the steps to replay.

use ferry_engine::{EntityRef, ExistenceOracle, SessionError, TransferableEntity};
use ferry_protocol::PropertyMap;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while loading or replaying a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The scenario file is not valid JSON for a scenario.
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    /// A step or passenger list names an entity that was never declared.
    #[error("unknown entity {0}")]
    UnknownEntity(String),

    /// The session rejected a step.
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn default_conversation() -> u32 {
    1
}

fn default_type() -> String {
    "Entity".into()
}

/// A replayable scenario.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Conversation number of the session.
    #[serde(default = "default_conversation")]
    pub conversation: u32,
    /// Session timeout, defaults to the engine default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Development-mode flag for every batch.
    #[serde(default)]
    pub development_mode: bool,
    /// Ids the client is not allowed to see.
    #[serde(default)]
    pub hidden: Vec<String>,
    /// Property keys stripped from every snapshot.
    #[serde(default)]
    pub redact: Vec<String>,
    /// Declared entities.
    pub entities: Vec<EntitySpec>,
    /// Steps to replay in order.
    pub steps: Vec<Step>,
}

/// Declaration of one entity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    /// Entity id.
    pub id: String,
    /// Entity type name.
    #[serde(rename = "type", default = "default_type")]
    pub type_name: String,
    /// Initial version.
    #[serde(default)]
    pub modification_time: i64,
    /// Snapshot properties.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Ids of passenger entities.
    #[serde(default)]
    pub passengers: Vec<String>,
}

/// One replay step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Send an entity.
    Send(String),
    /// Send an entity if the client tracks it.
    SendIfTracking(String),
    /// Bump an entity's version.
    Update(String),
    /// Delete an entity on the client.
    Delete(String),
    /// Mark an entity deleted in the store so the next send deletes it.
    MarkDeleted(String),
    /// Forget everything the client holds.
    Forget,
    /// Forget every tracked entity of a type.
    ForgetType(String),
    /// Pop and print the pending batch.
    Pop,
    /// Move the session clock forward.
    AdvanceSecs(u64),
    /// Record client activity.
    Touch,
    /// Print the liveness state.
    CheckTimeout,
}

/// An entity declared by a scenario.
pub struct ScenarioEntity {
    id: String,
    type_name: String,
    modification_time: AtomicI64,
    properties: PropertyMap,
    passengers: Mutex<Vec<EntityRef>>,
}

impl ScenarioEntity {
    fn bump(&self) -> i64 {
        self.modification_time.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl TransferableEntity for ScenarioEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn modification_time(&self) -> i64 {
        self.modification_time.load(Ordering::SeqCst)
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create_properties_map(&self) -> PropertyMap {
        self.properties.clone()
    }

    fn passengers(&self) -> Vec<EntityRef> {
        self.passengers.lock().clone()
    }
}

/// Entities of a scenario, wired to their passengers.
pub struct Catalog {
    entities: HashMap<String, Arc<ScenarioEntity>>,
}

impl Catalog {
    /// Builds the catalog, resolving passenger ids.
    pub fn build(specs: &[EntitySpec]) -> Result<Self, ScenarioError> {
        let entities: HashMap<String, Arc<ScenarioEntity>> = specs
            .iter()
            .map(|spec| {
                let entity = Arc::new(ScenarioEntity {
                    id: spec.id.clone(),
                    type_name: spec.type_name.clone(),
                    modification_time: AtomicI64::new(spec.modification_time),
                    properties: spec.properties.clone(),
                    passengers: Mutex::new(Vec::new()),
                });
                (spec.id.clone(), entity)
            })
            .collect();

        for spec in specs {
            let owner = &entities[&spec.id];
            let mut passengers = owner.passengers.lock();
            for passenger_id in &spec.passengers {
                let passenger = entities
                    .get(passenger_id)
                    .ok_or_else(|| ScenarioError::UnknownEntity(passenger_id.clone()))?;
                passengers.push(Arc::clone(passenger) as EntityRef);
            }
        }

        Ok(Self { entities })
    }

    /// Looks up an entity.
    pub fn get(&self, id: &str) -> Result<&Arc<ScenarioEntity>, ScenarioError> {
        self.entities
            .get(id)
            .ok_or_else(|| ScenarioError::UnknownEntity(id.to_owned()))
    }

    /// Bumps an entity's version and returns the new one.
    pub fn update(&self, id: &str) -> Result<i64, ScenarioError> {
        Ok(self.get(id)?.bump())
    }
}

/// Existence oracle driven by `mark_deleted` steps.
#[derive(Debug, Default)]
pub struct ScenarioStore {
    deleted: HashSet<String>,
}

impl ScenarioStore {
    /// Marks an entity deleted.
    pub fn mark_deleted(&mut self, id: &str) {
        self.deleted.insert(id.to_owned());
    }
}

impl ExistenceOracle for ScenarioStore {
    fn is_deleted(&self, entity_id: &str) -> bool {
        self.deleted.contains(entity_id)
    }
}
