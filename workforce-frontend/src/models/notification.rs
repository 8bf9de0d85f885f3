use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Task,
    Project,
    Announcement,
    Document,
    System,
}

/// Row of the `notifications` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub related_entity_id: Option<String>,
    #[serde(default)]
    pub related_entity_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_from_row() {
        let n: Notification = serde_json::from_value(json!({
            "id": "n1",
            "user_id": "u1",
            "title": "Task assigned",
            "message": "You have a new task",
            "type": "task",
            "is_read": false,
            "related_entity_id": "t9",
            "related_entity_type": "task",
            "created_at": "2024-03-01T09:30:00Z"
        }))
        .unwrap();

        assert_eq!(n.kind, NotificationKind::Task);
        assert!(!n.is_read);
        assert_eq!(n.related_entity_id.as_deref(), Some("t9"));
    }
}
