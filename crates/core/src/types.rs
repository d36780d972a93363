/// Agent and job identifiers are UUID strings issued by the orchestrator.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Issue a fresh random identifier.
pub fn new_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}
