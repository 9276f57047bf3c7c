//! Request and response bodies for combat actions

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Character, CombatLogEntry};
use crate::domain::services::AttackAction;
use crate::domain::value_objects::CombatantId;

/// An attack whose roll may be left to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequestDto {
    #[serde(default)]
    pub source_id: Option<CombatantId>,
    pub target_ids: Vec<CombatantId>,
    /// Rolled as a d20 when omitted
    #[serde(default)]
    pub roll: Option<i32>,
    #[serde(default)]
    pub damage: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AttackRequestDto {
    pub fn into_action(self, roll: i32) -> AttackAction {
        AttackAction {
            source_id: self.source_id,
            target_ids: self.target_ids,
            roll,
            damage: self.damage,
            status: self.status,
        }
    }
}

/// Manual HP or temp HP edit. Out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueRequestDto {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRequestDto {
    #[serde(default)]
    pub source_id: Option<CombatantId>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequestDto {
    pub title: String,
}

/// Roster update addressed by the character's current name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdateDto {
    pub old_name: String,
    pub character: Character,
}

/// What an action did: the roll used and the log lines it produced, oldest
/// first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReportDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<i32>,
    pub entries: Vec<CombatLogEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIdResponseDto<T> {
    pub id: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_request_roll_is_optional() {
        let target = CombatantId::new();
        let body = format!(r#"{{"targetIds": ["{}"], "damage": 4}}"#, target);
        let dto: AttackRequestDto = serde_json::from_str(&body).unwrap();
        assert_eq!(dto.roll, None);
        let action = dto.into_action(17);
        assert_eq!(action.roll, 17);
        assert_eq!(action.target_ids, vec![target]);
        assert_eq!(action.damage, Some(4));
    }

    #[test]
    fn test_roster_update_shape() {
        let dto: RosterUpdateDto = serde_json::from_str(
            r#"{"oldName": "Aria", "character": {"name": "Aria the Bold", "maxHP": 30, "ac": 15}}"#,
        )
        .unwrap();
        assert_eq!(dto.old_name, "Aria");
        assert_eq!(dto.character.initiative, None);
    }
}
