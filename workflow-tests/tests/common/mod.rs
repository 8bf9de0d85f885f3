//! Common fixtures for session workflow tests.

use serde_json::{json, Value};
use workforce_frontend::models::Session;
use workforce_frontend::services::error::ProviderError;

pub const ANN_ID: &str = "u-ann";

/// Session for Ann, with signup metadata that differs from her profile row.
pub fn ann_session() -> Session {
    Session::new(ANN_ID, "ann@x.io", "access-ann")
        .with_metadata(Some("Annie".to_string()), Some("Signup".to_string()))
}

pub fn session_for(subject_id: &str, email: &str) -> Session {
    Session::new(subject_id, email, format!("access-{}", subject_id))
}

pub fn profile_row(id: &str, first: &str, last: &str, role: Option<&str>) -> Value {
    json!({
        "id": id,
        "first_name": first,
        "last_name": last,
        "role": role,
        "department_id": "d1",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-02-01T00:00:00Z"
    })
}

pub fn transport_error() -> ProviderError {
    ProviderError::Transport("connection reset".to_string())
}
