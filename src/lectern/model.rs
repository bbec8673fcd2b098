use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named collection of entries, e.g. a course or a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Metadata for a single note. The body lives in its own file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at` to now, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Partial payload for `update_entry_metadata`: only the title is replaceable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub title: String,
}

impl EntryUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_entry_has_matching_timestamps() {
        let entry = Entry::new("Week 1");
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.title, "Week 1");
    }

    #[test]
    fn touch_never_goes_backwards() {
        let mut entry = Entry::new("Future");
        let future = Utc::now() + Duration::hours(1);
        entry.updated_at = future;
        entry.touch();
        assert_eq!(entry.updated_at, future);
    }

    #[test]
    fn entry_serializes_with_snake_case_timestamps() {
        let entry = Entry::new("Notes");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("created_at").is_some());
        assert!(json.get("updated_at").is_some());
        assert_eq!(json["id"], entry.id.to_string());
    }
}
