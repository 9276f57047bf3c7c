//! Combatant entity - a participant in the current encounter

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::value_objects::CombatantId;

/// A creature taking part in the encounter.
///
/// `0 <= current_hp <= max_hp` is maintained by the operations on this type
/// and by callers of [`CombatantPatch`], which performs no clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    #[serde(rename = "currentHP")]
    pub current_hp: u32,
    #[serde(rename = "tempHP", default)]
    pub temp_hp: u32,
    pub ac: i32,
    #[serde(default)]
    pub initiative: i32,
    #[serde(default)]
    pub is_player: bool,
    /// Free-text condition labels in the order they were applied
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// Current and temporary hit points, as computed before being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitPoints {
    pub current: u32,
    pub temp: u32,
}

impl Combatant {
    /// Hit points left after taking `damage`. Temporary HP absorbs first and
    /// the remainder comes off current HP, floored at zero.
    pub fn hp_after_damage(&self, damage: u32) -> HitPoints {
        let absorbed = damage.min(self.temp_hp);
        HitPoints {
            current: self.current_hp.saturating_sub(damage - absorbed),
            temp: self.temp_hp - absorbed,
        }
    }

    /// Current HP after healing, never above max HP.
    pub fn hp_after_healing(&self, amount: u32) -> u32 {
        self.current_hp.saturating_add(amount).min(self.max_hp)
    }

    /// Temporary HP does not stack: a grant only wins if it is strictly larger.
    pub fn temp_hp_after_grant(&self, amount: u32) -> u32 {
        if amount > self.temp_hp {
            amount
        } else {
            self.temp_hp
        }
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c == condition)
    }

    /// Merge the set fields of `patch` into this combatant.
    pub fn apply(&mut self, patch: CombatantPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(max_hp) = patch.max_hp {
            self.max_hp = max_hp;
        }
        if let Some(current_hp) = patch.current_hp {
            self.current_hp = current_hp;
        }
        if let Some(temp_hp) = patch.temp_hp {
            self.temp_hp = temp_hp;
        }
        if let Some(ac) = patch.ac {
            self.ac = ac;
        }
        if let Some(initiative) = patch.initiative {
            self.initiative = initiative;
        }
        if let Some(is_player) = patch.is_player {
            self.is_player = is_player;
        }
        if let Some(conditions) = patch.conditions {
            self.conditions = conditions;
        }
    }
}

/// Fields for a combatant that has not been added to the encounter yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCombatant {
    pub name: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    /// Defaults to `max_hp`
    #[serde(rename = "currentHP", default)]
    pub current_hp: Option<u32>,
    #[serde(rename = "tempHP", default)]
    pub temp_hp: Option<u32>,
    pub ac: i32,
    #[serde(default)]
    pub initiative: Option<i32>,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl NewCombatant {
    pub fn new(name: impl Into<String>, max_hp: u32, ac: i32) -> Self {
        Self {
            name: name.into(),
            max_hp,
            current_hp: None,
            temp_hp: None,
            ac,
            initiative: None,
            is_player: false,
            conditions: Vec::new(),
        }
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = Some(initiative);
        self
    }

    pub fn with_current_hp(mut self, current_hp: u32) -> Self {
        self.current_hp = Some(current_hp);
        self
    }

    pub fn with_temp_hp(mut self, temp_hp: u32) -> Self {
        self.temp_hp = Some(temp_hp);
        self
    }

    pub fn as_player(mut self) -> Self {
        self.is_player = true;
        self
    }

    /// Reject input the engine's invariants cannot absorb.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Combatant name cannot be empty"));
        }
        if self.max_hp == 0 {
            return Err(DomainError::validation("Max HP must be greater than 0"));
        }
        if let Some(current_hp) = self.current_hp {
            if current_hp > self.max_hp {
                return Err(DomainError::validation(format!(
                    "Current HP {} exceeds max HP {}",
                    current_hp, self.max_hp
                )));
            }
        }
        Ok(())
    }

    pub fn into_combatant(self, id: CombatantId) -> Combatant {
        Combatant {
            id,
            name: self.name.trim().to_string(),
            max_hp: self.max_hp,
            current_hp: self.current_hp.unwrap_or(self.max_hp),
            temp_hp: self.temp_hp.unwrap_or(0),
            ac: self.ac,
            initiative: self.initiative.unwrap_or(0),
            is_player: self.is_player,
            conditions: self.conditions,
        }
    }
}

/// Partial update for a combatant. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "maxHP", default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<u32>,
    #[serde(rename = "currentHP", default, skip_serializing_if = "Option::is_none")]
    pub current_hp: Option<u32>,
    #[serde(rename = "tempHP", default, skip_serializing_if = "Option::is_none")]
    pub temp_hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_player: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

impl CombatantPatch {
    pub fn hit_points(hp: HitPoints) -> Self {
        Self {
            current_hp: Some(hp.current),
            temp_hp: Some(hp.temp),
            ..Self::default()
        }
    }

    pub fn current_hp(current_hp: u32) -> Self {
        Self {
            current_hp: Some(current_hp),
            ..Self::default()
        }
    }

    pub fn temp_hp(temp_hp: u32) -> Self {
        Self {
            temp_hp: Some(temp_hp),
            ..Self::default()
        }
    }

    pub fn conditions(conditions: Vec<String>) -> Self {
        Self {
            conditions: Some(conditions),
            ..Self::default()
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goblin(current_hp: u32, temp_hp: u32) -> Combatant {
        NewCombatant::new("Goblin", 20, 13)
            .with_current_hp(current_hp)
            .with_temp_hp(temp_hp)
            .into_combatant(CombatantId::new())
    }

    #[test]
    fn test_temp_hp_absorbs_damage_first() {
        let hp = goblin(15, 5).hp_after_damage(8);
        assert_eq!(hp, HitPoints { current: 12, temp: 0 });

        let hp = goblin(15, 10).hp_after_damage(8);
        assert_eq!(hp, HitPoints { current: 15, temp: 2 });
    }

    #[test]
    fn test_damage_floors_at_zero() {
        for (current, temp, damage) in [(3, 0, 10), (0, 0, 4), (20, 4, 100), (1, 1, 2)] {
            let c = goblin(current, temp);
            let hp = c.hp_after_damage(damage);
            let expected_temp = temp.saturating_sub(damage);
            let expected_current = current.saturating_sub(damage.saturating_sub(temp));
            assert_eq!(hp.temp, expected_temp);
            assert_eq!(hp.current, expected_current);
            assert!(hp.current <= c.max_hp);
        }
    }

    #[test]
    fn test_healing_caps_at_max() {
        assert_eq!(goblin(15, 0).hp_after_healing(10), 20);
        assert_eq!(goblin(0, 0).hp_after_healing(4), 4);
    }

    #[test]
    fn test_temp_hp_grant_does_not_stack() {
        assert_eq!(goblin(20, 5).temp_hp_after_grant(8), 8);
        assert_eq!(goblin(20, 5).temp_hp_after_grant(5), 5);
        assert_eq!(goblin(20, 5).temp_hp_after_grant(3), 5);
    }

    #[test]
    fn test_new_combatant_defaults() {
        let c = NewCombatant::new("  Aria ", 30, 15).into_combatant(CombatantId::new());
        assert_eq!(c.name, "Aria");
        assert_eq!(c.current_hp, 30);
        assert_eq!(c.temp_hp, 0);
        assert_eq!(c.initiative, 0);
        assert!(c.conditions.is_empty());
    }

    #[test]
    fn test_new_combatant_validation() {
        assert!(NewCombatant::new("", 10, 10).validate().is_err());
        assert!(NewCombatant::new("Orc", 0, 10).validate().is_err());
        assert!(NewCombatant::new("Orc", 10, 10).with_current_hp(11).validate().is_err());
        assert!(NewCombatant::new("Orc", 10, 10).validate().is_ok());
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let mut c = goblin(20, 0);
        c.apply(CombatantPatch::current_hp(7).with_conditions(vec!["Prone".into()]));
        assert_eq!(c.current_hp, 7);
        assert_eq!(c.max_hp, 20);
        assert!(c.has_condition("Prone"));
    }

    #[test]
    fn test_wire_names() {
        let c = goblin(12, 3);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["maxHP"], 20);
        assert_eq!(json["currentHP"], 12);
        assert_eq!(json["tempHP"], 3);
        assert_eq!(json["isPlayer"], false);
    }
}
