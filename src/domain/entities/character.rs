//! Roster entities - saved player characters and NPC templates
//!
//! These live outside any encounter. Adding one to the encounter creates a
//! fresh [`NewCombatant`] at full HP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::NewCombatant;
use crate::domain::error::DomainError;
use crate::domain::value_objects::{CharacterId, NpcId};

/// A saved roster character. Names are unique within a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    pub ac: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative: Option<i32>,
}

impl Character {
    pub fn new(name: impl Into<String>, max_hp: u32, ac: i32) -> Self {
        Self {
            name: name.into(),
            max_hp,
            ac,
            initiative: None,
        }
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = Some(initiative);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Character name cannot be empty"));
        }
        if self.max_hp == 0 {
            return Err(DomainError::validation("Max HP must be greater than 0"));
        }
        Ok(())
    }

    /// Combatant fields for this character at full health
    pub fn to_combatant(&self, is_player: bool) -> NewCombatant {
        NewCombatant {
            name: self.name.clone(),
            max_hp: self.max_hp,
            current_hp: Some(self.max_hp),
            temp_hp: Some(0),
            ac: self.ac,
            initiative: self.initiative,
            is_player,
            conditions: Vec::new(),
        }
    }
}

/// A character persisted in the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCharacter {
    pub id: CharacterId,
    #[serde(flatten)]
    pub character: Character,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update shared by stored characters and NPCs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "maxHP", default)]
    pub max_hp: Option<u32>,
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub initiative: Option<i32>,
}

impl RosterPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which side of the table an NPC usually fights on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcKind {
    Enemy,
    Ally,
}

impl NpcKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpcKind::Enemy => "enemy",
            NpcKind::Ally => "ally",
        }
    }
}

impl std::fmt::Display for NpcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NpcKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enemy" => Ok(NpcKind::Enemy),
            "ally" => Ok(NpcKind::Ally),
            other => Err(DomainError::parse(format!("unknown NPC kind '{}'", other))),
        }
    }
}

/// NPC fields before the record store assigns an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNpc {
    pub name: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    pub ac: i32,
    #[serde(default)]
    pub initiative: Option<i32>,
    #[serde(rename = "type")]
    pub kind: NpcKind,
}

/// Partial update for a stored NPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcPatch {
    #[serde(flatten)]
    pub fields: RosterPatch,
    #[serde(rename = "type", default)]
    pub kind: Option<NpcKind>,
}

/// A stored NPC template (enemy or ally)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    pub ac: i32,
    #[serde(default)]
    pub initiative: Option<i32>,
    #[serde(rename = "type")]
    pub kind: NpcKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Npc {
    /// Allies fight alongside the players but are never counted as players
    pub fn to_combatant(&self) -> NewCombatant {
        NewCombatant {
            name: self.name.clone(),
            max_hp: self.max_hp,
            current_hp: Some(self.max_hp),
            temp_hp: Some(0),
            ac: self.ac,
            initiative: self.initiative,
            is_player: false,
            conditions: Vec::new(),
        }
    }
}
