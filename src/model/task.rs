use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Legal transitions: pending → in_progress → completed, with cancel
    /// allowed from any non-terminal state.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::InProgress) => true,
            (TaskStatus::InProgress, TaskStatus::Completed) => true,
            (TaskStatus::Pending | TaskStatus::InProgress, TaskStatus::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Task {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "Collect Barangay A route 3")]
    pub title: String,

    #[schema(example = "Morning collection along the riverside route", nullable = true)]
    pub description: Option<String>,

    /// collection | composting | facility
    #[schema(example = "collection")]
    pub task_type: String,

    #[schema(example = "high", value_type = String)]
    pub priority: String,

    #[schema(example = "pending", value_type = String)]
    pub status: String,

    #[schema(example = 42)]
    pub assigned_to: u64,

    #[schema(example = 1)]
    pub assigned_by: u64,

    #[schema(example = "Barangay A")]
    pub barangay: String,

    #[schema(example = "2025-06-01T06:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2025-06-01T11:32:00Z", format = "date-time", value_type = String, nullable = true)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_lifecycle() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Cancelled));

        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Cancelled));
    }
}
