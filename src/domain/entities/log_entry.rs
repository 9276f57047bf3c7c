//! Combat log entries

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::CombatEvent;
use crate::domain::value_objects::{CombatantId, LogEntryId};

/// Window inside which an identical consecutive entry is treated as a double
/// trigger and dropped.
pub const DUPLICATE_WINDOW_MS: i64 = 1000;

/// Display category of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryType {
    Damage,
    Healing,
    Status,
    Turn,
    Round,
}

/// One narrated line of the combat log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatLogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    #[serde(rename = "type")]
    pub entry_type: LogEntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<CombatantId>,
    /// Structured form of `text`. Absent on entries written as plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<CombatEvent>,
}

impl CombatLogEntry {
    pub fn from_event(
        event: CombatEvent,
        source_id: Option<CombatantId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp,
            text: event.narrate(),
            entry_type: event.entry_type(),
            source_id,
            event: Some(event),
        }
    }

    /// A text-only entry, as found in snapshots written before events were
    /// recorded alongside the narration.
    pub fn narrative(
        text: impl Into<String>,
        entry_type: LogEntryType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp,
            text: text.into(),
            entry_type,
            source_id: None,
            event: None,
        }
    }

    /// Whether this entry repeats `previous` closely enough to be discarded.
    pub fn is_duplicate_of(&self, previous: &CombatLogEntry) -> bool {
        self.text == previous.text
            && self.entry_type == previous.entry_type
            && self.timestamp - previous.timestamp < Duration::milliseconds(DUPLICATE_WINDOW_MS)
    }

    /// The recorded event, or one recovered from the text.
    pub fn resolved_event(&self) -> Option<CombatEvent> {
        match &self.event {
            Some(event) => Some(event.clone()),
            None => CombatEvent::parse(&self.text),
        }
    }
}
