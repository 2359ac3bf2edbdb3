//! Replay command implementation.

use crate::scenario::{Catalog, Scenario, ScenarioError, ScenarioStore, Step};
use ferry_engine::{
    ErrorWrapper, ManualClock, PropertyMap, SessionConfig, SyncSession, TransferableEntity,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs the replay command.
pub fn run(path: &Path, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Replaying scenario {:?}", path);
    let scenario = load(path)?;

    for output in replay(&scenario)? {
        if pretty {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    Ok(())
}

/// Reads and parses a scenario file.
pub fn load(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Replays a scenario and returns one JSON document per `pop` and
/// `check_timeout` step.
pub fn replay(scenario: &Scenario) -> Result<Vec<Value>, ScenarioError> {
    let catalog = Catalog::build(&scenario.entities)?;
    let mut store = ScenarioStore::default();
    let clock = Arc::new(ManualClock::new());

    let mut config = SessionConfig::new()
        .with_development_mode(scenario.development_mode)
        .with_clock(clock.clone());
    if let Some(secs) = scenario.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let hidden: HashSet<String> = scenario.hidden.iter().cloned().collect();
    let redact = scenario.redact.clone();
    let session = SyncSession::new(scenario.conversation, config)
        .with_visibility(move |entity: &dyn TransferableEntity| !hidden.contains(entity.id()))
        .with_property_filter(move |_: &dyn TransferableEntity, props: &mut PropertyMap| {
            for key in &redact {
                props.remove(key);
            }
        });

    let mut outputs = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(step = index, ?step, "replaying step");
        match step {
            Step::Send(id) => {
                let entity = catalog.get(id)?;
                let result = session.send(&store, &**entity);
                record(&session, result)?;
            }
            Step::SendIfTracking(id) => {
                let entity = catalog.get(id)?;
                let result = session.send_if_tracking(&store, &**entity);
                record(&session, result)?;
            }
            Step::Update(id) => {
                let version = catalog.update(id)?;
                debug!(entity = %id, version, "updated entity");
            }
            Step::Delete(id) => session.delete_from_client(id),
            Step::MarkDeleted(id) => store.mark_deleted(id),
            Step::Forget => {
                session.forget_tracked_entities();
            }
            Step::ForgetType(type_name) => {
                session.forget_tracked_entities_of_type(type_name);
            }
            Step::Pop => {
                let batch = session.pop_batch();
                outputs.push(json!({ "step": index, "batch": batch }));
            }
            Step::AdvanceSecs(secs) => clock.advance(Duration::from_secs(*secs)),
            Step::Touch => session.touch(),
            Step::CheckTimeout => {
                outputs.push(json!({
                    "step": index,
                    "timedOut": session.is_timed_out(),
                    "state": format!("{:?}", session.state()),
                }));
            }
        }
    }

    Ok(outputs)
}

/// Turns a visibility rejection into a batch error; other errors abort.
fn record(
    session: &SyncSession,
    result: ferry_engine::SessionResult<ferry_engine::SendReport>,
) -> Result<(), ScenarioError> {
    match result {
        Ok(report) => {
            debug!(?report, "sent");
            Ok(())
        }
        Err(e) if e.is_permission_denied() => {
            warn!(error = %e, "send rejected");
            session.add_error(ErrorWrapper::from_error("PermissionDenied", &e));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"{
        "conversation": 3,
        "timeoutSecs": 120,
        "hidden": ["secret"],
        "redact": ["password"],
        "entities": [
            {"id": "u1", "type": "User", "modificationTime": 5,
             "properties": {"name": "Ada", "password": "pw"}, "passengers": ["p1"]},
            {"id": "p1", "type": "Project", "modificationTime": 1, "passengers": ["u1"]},
            {"id": "secret", "modificationTime": 1}
        ],
        "steps": [
            {"send": "u1"},
            "pop",
            {"send": "u1"},
            "pop",
            {"update": "u1"},
            {"send_if_tracking": "u1"},
            {"send": "secret"},
            "pop",
            {"mark_deleted": "p1"},
            {"send": "p1"},
            "pop",
            {"advance_secs": 121},
            "check_timeout"
        ]
    }"#;

    fn scenario_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        file
    }

    #[test]
    fn replays_versions_deletions_and_timeout() {
        let file = scenario_file();
        let scenario = load(file.path()).unwrap();
        let outputs = replay(&scenario).unwrap();
        assert_eq!(outputs.len(), 5);

        let first = &outputs[0]["batch"];
        assert_eq!(first["conversationNumber"], 3);
        assert_eq!(first["initial"], true);
        assert_eq!(first["entities"]["u1"]["name"], "Ada");
        assert!(first["entities"]["u1"].get("password").is_none());
        assert_eq!(first["entities"]["p1"]["modificationTime"], "1");

        let second = &outputs[1]["batch"];
        assert_eq!(second["entities"].as_object().unwrap().len(), 0);

        let third = &outputs[2]["batch"];
        assert_eq!(third["entities"]["u1"]["modificationTime"], "6");
        assert!(third["entities"].get("p1").is_none());
        assert_eq!(third["errors"][0]["name"], "PermissionDenied");

        let fourth = &outputs[3]["batch"];
        assert_eq!(fourth["deletedEntities"][0], "p1");

        assert_eq!(outputs[4]["timedOut"], true);
        assert_eq!(outputs[4]["state"], "TimedOut");
    }

    #[test]
    fn unknown_step_entity_fails() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"entities": [], "steps": [{"send": "ghost"}]}"#).unwrap();
        assert!(matches!(
            replay(&scenario),
            Err(ScenarioError::UnknownEntity(id)) if id == "ghost"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load(Path::new("/nonexistent/ferry/scenario.json")),
            Err(ScenarioError::Io(_))
        ));
    }
}
