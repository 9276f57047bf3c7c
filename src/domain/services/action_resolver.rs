//! Action Resolver - computes the effect of combat actions
//!
//! Every function here reads the encounter and returns a [`Resolution`]:
//! the combatant patches to merge and the events to log, in chronological
//! order. Nothing is mutated until the aggregate applies the resolution, so
//! a batch action is visible either completely or not at all.
//!
//! Target ids that no longer exist are skipped.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::CombatState;
use crate::domain::entities::{Combatant, CombatantPatch};
use crate::domain::events::CombatEvent;
use crate::domain::value_objects::{CombatantId, SaveAbility};

/// Name narrated when an action has no identifiable source
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Result of resolving an action against the current encounter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub patches: Vec<(CombatantId, CombatantPatch)>,
    /// Events in the order they happened, each with the acting combatant
    pub events: Vec<(CombatEvent, Option<CombatantId>)>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.events.is_empty()
    }

    fn patch(&mut self, id: CombatantId, patch: CombatantPatch) {
        if !patch.is_empty() {
            self.patches.push((id, patch));
        }
    }

    fn event(&mut self, event: CombatEvent, source_id: Option<CombatantId>) {
        self.events.push((event, source_id));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackAction {
    #[serde(default)]
    pub source_id: Option<CombatantId>,
    pub target_ids: Vec<CombatantId>,
    pub roll: i32,
    #[serde(default)]
    pub damage: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAction {
    #[serde(default)]
    pub source_id: Option<CombatantId>,
    pub target_ids: Vec<CombatantId>,
    #[serde(default)]
    pub ability: SaveAbility,
    /// Shown to the table only; success is decided by `successes`
    #[serde(default)]
    pub dc: Option<i32>,
    /// Targets that made their save
    #[serde(default)]
    pub successes: Vec<CombatantId>,
    #[serde(default)]
    pub damage: Option<u32>,
    #[serde(default)]
    pub half_damage_on_save: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Healing or a temporary HP grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportAction {
    #[serde(default)]
    pub source_id: Option<CombatantId>,
    pub target_ids: Vec<CombatantId>,
    pub amount: u32,
}

// ============================================================================
// Attack rolls and saving throws
// ============================================================================

/// `hit <=> roll >= ac`. Hits take damage (temp HP first) and gain the
/// status; misses are untouched.
pub fn resolve_attack(state: &CombatState, action: &AttackAction) -> Resolution {
    let mut resolution = Resolution::default();
    let targets = collect_targets(state, &action.target_ids);
    if targets.is_empty() {
        return resolution;
    }

    let (source_id, source_name) = attacker(state, action.source_id);
    let damage = non_zero(action.damage);
    let status = clean_label(action.status.as_deref());

    let mut hits = Vec::new();
    let mut misses = Vec::new();
    let mut knocked_out = Vec::new();

    for target in targets {
        if action.roll < target.ac {
            misses.push(target.name.clone());
            continue;
        }
        hits.push(target.name.clone());

        let mut patch = CombatantPatch::default();
        if let Some(damage) = damage {
            let hp = target.hp_after_damage(damage);
            if falls_unconscious(target, hp.current) {
                knocked_out.push(target.name.clone());
            }
            patch = CombatantPatch::hit_points(hp);
        }
        if let Some(status) = &status {
            patch = patch.with_conditions(with_condition(target, status));
        }
        resolution.patch(target.id, patch);
    }

    if !hits.is_empty() {
        resolution.event(
            CombatEvent::Hit {
                source: source_name.clone(),
                targets: hits,
                damage,
                status,
                roll: Some(action.roll),
            },
            source_id,
        );
        knockouts(&mut resolution, Some(&source_name), source_id, knocked_out);
    }
    if !misses.is_empty() {
        resolution.event(
            CombatEvent::Miss {
                source: source_name,
                targets: misses,
                roll: Some(action.roll),
            },
            source_id,
        );
    }
    resolution
}

/// Failed saves take full damage and gain the status. Successful saves take
/// half damage (rounded down) when `half_damage_on_save` is set, full damage
/// otherwise.
///
/// The forcing source is only recorded when given explicitly; saves are often
/// forced by traps or effects that have no turn of their own.
pub fn resolve_save(state: &CombatState, action: &SaveAction) -> Resolution {
    let mut resolution = Resolution::default();
    let targets = collect_targets(state, &action.target_ids);
    if targets.is_empty() {
        return resolution;
    }

    let source = action
        .source_id
        .and_then(|id| state.find_combatant(id))
        .map(|c| (c.id, c.name.clone()));
    let source_id = source.as_ref().map(|(id, _)| *id);
    let source_name = source.map(|(_, name)| name);
    let damage = non_zero(action.damage);
    let success_damage = damage
        .map(|d| if action.half_damage_on_save { d / 2 } else { d })
        .filter(|d| *d > 0);
    let status = clean_label(action.status.as_deref());

    let mut made = Vec::new();
    let mut failed = Vec::new();
    let mut made_knockouts = Vec::new();
    let mut failed_knockouts = Vec::new();

    for target in targets {
        let success = action.successes.contains(&target.id);
        let taken = if success { success_damage } else { damage };

        let mut patch = CombatantPatch::default();
        if let Some(taken) = taken {
            let hp = target.hp_after_damage(taken);
            if falls_unconscious(target, hp.current) {
                if success {
                    made_knockouts.push(target.name.clone());
                } else {
                    failed_knockouts.push(target.name.clone());
                }
            }
            patch = CombatantPatch::hit_points(hp);
        }
        if success {
            made.push(target.name.clone());
        } else {
            if let Some(status) = &status {
                patch = patch.with_conditions(with_condition(target, status));
            }
            failed.push(target.name.clone());
        }
        resolution.patch(target.id, patch);
    }

    if !made.is_empty() {
        resolution.event(
            CombatEvent::SaveSuccess {
                source: source_name.clone(),
                targets: made,
                ability: action.ability,
                damage: success_damage,
            },
            source_id,
        );
        knockouts(&mut resolution, source_name.as_deref(), source_id, made_knockouts);
    }
    if !failed.is_empty() {
        resolution.event(
            CombatEvent::SaveFail {
                source: source_name.clone(),
                targets: failed,
                ability: action.ability,
                damage,
                status,
            },
            source_id,
        );
        knockouts(&mut resolution, source_name.as_deref(), source_id, failed_knockouts);
    }
    resolution
}

// ============================================================================
// Healing and temporary HP
// ============================================================================

/// Heal up to max HP. Targets brought up from 0 are announced as revived.
pub fn resolve_heal(state: &CombatState, action: &SupportAction) -> Resolution {
    let mut resolution = Resolution::default();
    let targets = collect_targets(state, &action.target_ids);
    if targets.is_empty() {
        return resolution;
    }
    let (source_id, source_name) = attacker(state, action.source_id);

    let mut names = Vec::new();
    let mut revived = Vec::new();
    for target in targets {
        let current = target.hp_after_healing(action.amount);
        if target.current_hp == 0 && current > 0 {
            revived.push(target.name.clone());
        }
        names.push(target.name.clone());
        if action.amount > 0 {
            resolution.patch(target.id, CombatantPatch::current_hp(current));
        }
    }

    resolution.event(
        CombatEvent::Heal {
            source: source_name,
            targets: names,
            amount: action.amount,
        },
        source_id,
    );
    for target in revived {
        resolution.event(CombatEvent::Revive { target }, source_id);
    }
    resolution
}

/// Temporary HP does not stack; each target keeps the larger buffer.
pub fn resolve_temp_hp(state: &CombatState, action: &SupportAction) -> Resolution {
    let mut resolution = Resolution::default();
    let targets = collect_targets(state, &action.target_ids);
    if targets.is_empty() {
        return resolution;
    }
    let (source_id, source_name) = attacker(state, action.source_id);

    let mut names = Vec::new();
    for target in targets {
        let temp = target.temp_hp_after_grant(action.amount);
        if temp != target.temp_hp {
            resolution.patch(target.id, CombatantPatch::temp_hp(temp));
        }
        names.push(target.name.clone());
    }

    resolution.event(
        CombatEvent::TempHpGrant {
            source: source_name,
            targets: names,
            amount: action.amount,
        },
        source_id,
    );
    resolution
}

// ============================================================================
// Manual edits
// ============================================================================

/// Set current HP directly, clamped to `0..=max_hp`.
pub fn resolve_set_hp(state: &CombatState, target_id: CombatantId, hp: i64) -> Resolution {
    let mut resolution = Resolution::default();
    let Some(target) = state.find_combatant(target_id) else {
        return resolution;
    };
    let hp = hp.clamp(0, i64::from(target.max_hp)) as u32;
    resolution.patch(target.id, CombatantPatch::current_hp(hp));
    resolution.event(
        CombatEvent::HpSet {
            target: target.name.clone(),
            hp,
        },
        None,
    );
    resolution
}

/// Set temporary HP directly, floored at 0. Unlike a grant this may lower it.
pub fn resolve_set_temp_hp(state: &CombatState, target_id: CombatantId, amount: i64) -> Resolution {
    let mut resolution = Resolution::default();
    let Some(target) = state.find_combatant(target_id) else {
        return resolution;
    };
    let amount = amount.clamp(0, i64::from(u32::MAX)) as u32;
    resolution.patch(target.id, CombatantPatch::temp_hp(amount));
    resolution.event(
        CombatEvent::TempHpSet {
            target: target.name.clone(),
            amount,
        },
        None,
    );
    resolution
}

pub fn resolve_afflict(
    state: &CombatState,
    source_id: Option<CombatantId>,
    target_id: CombatantId,
    status: &str,
) -> Resolution {
    let mut resolution = Resolution::default();
    let (Some(target), Some(status)) = (state.find_combatant(target_id), clean_label(Some(status)))
    else {
        return resolution;
    };
    let (source_id, source_name) = attacker(state, source_id);
    resolution.patch(
        target.id,
        CombatantPatch::conditions(with_condition(target, &status)),
    );
    resolution.event(
        CombatEvent::Afflict {
            source: source_name,
            target: target.name.clone(),
            status,
        },
        source_id,
    );
    resolution
}

/// Remove every occurrence of `status` from the target.
pub fn resolve_remove_condition(
    state: &CombatState,
    source_id: Option<CombatantId>,
    target_id: CombatantId,
    status: &str,
) -> Resolution {
    let mut resolution = Resolution::default();
    let Some(target) = state.find_combatant(target_id) else {
        return resolution;
    };
    if !target.has_condition(status) {
        return resolution;
    }
    let (source_id, source_name) = attacker(state, source_id);
    let remaining = target
        .conditions
        .iter()
        .filter(|c| c.as_str() != status)
        .cloned()
        .collect();
    resolution.patch(target.id, CombatantPatch::conditions(remaining));
    resolution.event(
        CombatEvent::ConditionRemoved {
            source: source_name,
            target: target.name.clone(),
            status: status.to_string(),
        },
        source_id,
    );
    resolution
}

// ============================================================================
// Helpers
// ============================================================================

/// Existing targets in request order, each at most once.
fn collect_targets<'a>(state: &'a CombatState, ids: &[CombatantId]) -> Vec<&'a Combatant> {
    let mut seen = Vec::with_capacity(ids.len());
    ids.iter()
        .filter(|id| {
            if seen.contains(*id) {
                false
            } else {
                seen.push(**id);
                true
            }
        })
        .filter_map(|id| state.find_combatant(*id))
        .collect()
}

/// Explicit source, else whoever's turn it is.
fn attacker(state: &CombatState, source_id: Option<CombatantId>) -> (Option<CombatantId>, String) {
    source_id
        .and_then(|id| state.find_combatant(id))
        .or_else(|| state.current_combatant())
        .map(|c| (Some(c.id), c.name.clone()))
        .unwrap_or_else(|| (None, UNKNOWN_SOURCE.to_string()))
}

fn knockouts(
    resolution: &mut Resolution,
    source: Option<&str>,
    source_id: Option<CombatantId>,
    targets: Vec<String>,
) {
    for target in targets {
        resolution.event(
            CombatEvent::Knockout {
                source: source.map(str::to_string),
                target,
            },
            source_id,
        );
    }
}

fn falls_unconscious(target: &Combatant, current_hp: u32) -> bool {
    target.current_hp > 0 && current_hp == 0
}

fn with_condition(target: &Combatant, status: &str) -> Vec<String> {
    let mut conditions = target.conditions.clone();
    conditions.push(status.to_string());
    conditions
}

fn non_zero(amount: Option<u32>) -> Option<u32> {
    amount.filter(|a| *a > 0)
}

fn clean_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewCombatant;
    use chrono::Utc;

    struct Table {
        state: CombatState,
        fighter: CombatantId,
        goblin: CombatantId,
        orc: CombatantId,
    }

    fn table() -> Table {
        let mut state = CombatState::default();
        let now = Utc::now();
        let fighter = state
            .add_combatant(NewCombatant::new("Fighter", 30, 17).with_initiative(15).as_player(), now)
            .unwrap();
        let goblin = state
            .add_combatant(NewCombatant::new("Goblin", 7, 13).with_initiative(12), now)
            .unwrap();
        let orc = state
            .add_combatant(
                NewCombatant::new("Orc", 15, 16).with_initiative(10).with_temp_hp(4),
                now,
            )
            .unwrap();
        state.start_combat().unwrap();
        Table {
            state,
            fighter,
            goblin,
            orc,
        }
    }

    fn texts(resolution: &Resolution) -> Vec<String> {
        resolution.events.iter().map(|(e, _)| e.narrate()).collect()
    }

    fn patch_for(resolution: &Resolution, id: CombatantId) -> Option<&CombatantPatch> {
        resolution
            .patches
            .iter()
            .find(|(target, _)| *target == id)
            .map(|(_, p)| p)
    }

    #[test]
    fn test_attack_splits_hits_and_misses() {
        let t = table();
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin, t.orc],
                roll: 14,
                damage: Some(5),
                status: Some("Prone".into()),
            },
        );
        assert_eq!(
            texts(&resolution),
            vec![
                "Fighter hit Goblin for 5 damage and applied Prone (Attack: 14)",
                "Fighter missed Orc (Attack: 14)",
            ]
        );
        let goblin = patch_for(&resolution, t.goblin).unwrap();
        assert_eq!(goblin.current_hp, Some(2));
        assert_eq!(goblin.conditions, Some(vec!["Prone".to_string()]));
        assert!(patch_for(&resolution, t.orc).is_none());
    }

    #[test]
    fn test_attack_knockout_follows_hit() {
        let t = table();
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin],
                roll: 20,
                damage: Some(9),
                status: None,
            },
        );
        assert_eq!(
            texts(&resolution),
            vec![
                "Fighter hit Goblin for 9 damage (Attack: 20)",
                "Goblin falls unconscious!",
            ]
        );
        assert_eq!(
            resolution.events[1].0,
            CombatEvent::Knockout {
                source: Some("Fighter".into()),
                target: "Goblin".into()
            }
        );
    }

    #[test]
    fn test_hitting_a_downed_target_is_not_another_knockout() {
        let mut t = table();
        t.state.update_combatant(t.goblin, CombatantPatch::current_hp(0));
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin],
                roll: 20,
                damage: Some(5),
                status: None,
            },
        );
        assert_eq!(
            texts(&resolution),
            vec!["Fighter hit Goblin for 5 damage (Attack: 20)"]
        );
    }

    #[test]
    fn test_attack_falls_back_to_current_turn() {
        let t = table();
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: None,
                target_ids: vec![t.orc],
                roll: 18,
                damage: Some(6),
                status: None,
            },
        );
        assert_eq!(resolution.events[0].1, Some(t.fighter));
        // Temp HP soaks the first 4 points
        let orc = patch_for(&resolution, t.orc).unwrap();
        assert_eq!((orc.current_hp, orc.temp_hp), (Some(13), Some(0)));
    }

    #[test]
    fn test_zero_damage_still_logs_and_applies_status() {
        let t = table();
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin],
                roll: 13,
                damage: Some(0),
                status: Some("Grappled".into()),
            },
        );
        assert_eq!(
            texts(&resolution),
            vec!["Fighter hit Goblin and applied Grappled (Attack: 13)"]
        );
        let goblin = patch_for(&resolution, t.goblin).unwrap();
        assert_eq!(goblin.current_hp, None);
    }

    #[test]
    fn test_missing_targets_are_skipped() {
        let t = table();
        let resolution = resolve_attack(
            &t.state,
            &AttackAction {
                source_id: Some(t.fighter),
                target_ids: vec![CombatantId::new(), t.goblin, t.goblin],
                roll: 13,
                damage: Some(1),
                status: None,
            },
        );
        assert_eq!(resolution.patches.len(), 1);
        assert_eq!(texts(&resolution), vec!["Fighter hit Goblin for 1 damage (Attack: 13)"]);
    }

    #[test]
    fn test_save_half_damage_on_success() {
        let t = table();
        let resolution = resolve_save(
            &t.state,
            &SaveAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin, t.orc],
                ability: SaveAbility::Dex,
                dc: Some(14),
                successes: vec![t.orc],
                damage: Some(7),
                half_damage_on_save: true,
                status: Some("Burning".into()),
            },
        );
        assert_eq!(
            texts(&resolution),
            vec![
                "Orc succeeded on their DEX save (taking 3 damage)",
                "Goblin failed their DEX save taking 7 damage and gained Burning",
                "Goblin falls unconscious!",
            ]
        );
        let orc = patch_for(&resolution, t.orc).unwrap();
        assert_eq!((orc.current_hp, orc.temp_hp), (Some(15), Some(1)));
        assert_eq!(orc.conditions, None);
        let goblin = patch_for(&resolution, t.goblin).unwrap();
        assert_eq!(goblin.conditions, Some(vec!["Burning".to_string()]));
    }

    #[test]
    fn test_save_without_half_flag_takes_full_damage() {
        let t = table();
        let resolution = resolve_save(
            &t.state,
            &SaveAction {
                source_id: None,
                target_ids: vec![t.orc],
                ability: SaveAbility::Wis,
                dc: None,
                successes: vec![t.orc],
                damage: Some(7),
                half_damage_on_save: false,
                status: None,
            },
        );
        assert_eq!(
            texts(&resolution),
            vec!["Orc succeeded on their WIS save (taking 7 damage)"]
        );
        assert_eq!(patch_for(&resolution, t.orc).unwrap().current_hp, Some(12));
    }

    #[test]
    fn test_save_source_is_not_inferred_from_turn() {
        let t = table();
        let resolution = resolve_save(
            &t.state,
            &SaveAction {
                source_id: None,
                target_ids: vec![t.goblin],
                ability: SaveAbility::Con,
                dc: None,
                successes: vec![],
                damage: Some(20),
                half_damage_on_save: false,
                status: None,
            },
        );
        assert!(resolution.events.iter().all(|(_, source)| source.is_none()));
        assert!(matches!(
            &resolution.events[0].0,
            CombatEvent::SaveFail { source: None, .. }
        ));
        assert!(matches!(
            &resolution.events[1].0,
            CombatEvent::Knockout { source: None, .. }
        ));
    }

    #[test]
    fn test_heal_caps_and_revives() {
        let mut t = table();
        t.state.update_combatant(t.goblin, CombatantPatch::current_hp(0));
        let resolution = resolve_heal(
            &t.state,
            &SupportAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin, t.orc],
                amount: 10,
            },
        );
        assert_eq!(
            texts(&resolution),
            vec![
                "Fighter healed Goblin, Orc for 10 HP",
                "Goblin is back on their feet!",
            ]
        );
        assert_eq!(patch_for(&resolution, t.goblin).unwrap().current_hp, Some(7));
        assert_eq!(patch_for(&resolution, t.orc).unwrap().current_hp, Some(15));
    }

    #[test]
    fn test_zero_amount_support_still_logs() {
        let t = table();
        let action = SupportAction {
            source_id: Some(t.fighter),
            target_ids: vec![t.goblin],
            amount: 0,
        };

        let heal = resolve_heal(&t.state, &action);
        assert_eq!(texts(&heal), vec!["Fighter healed Goblin for 0 HP"]);
        assert!(heal.patches.is_empty());

        let grant = resolve_temp_hp(&t.state, &action);
        assert_eq!(
            texts(&grant),
            vec!["Fighter granted 0 temporary HP to Goblin"]
        );
        assert!(grant.patches.is_empty());
    }

    #[test]
    fn test_temp_hp_grant_keeps_larger_buffer() {
        let t = table();
        let resolution = resolve_temp_hp(
            &t.state,
            &SupportAction {
                source_id: Some(t.fighter),
                target_ids: vec![t.goblin, t.orc],
                amount: 3,
            },
        );
        assert_eq!(texts(&resolution), vec!["Fighter granted 3 temporary HP to Goblin, Orc"]);
        assert_eq!(patch_for(&resolution, t.goblin).unwrap().temp_hp, Some(3));
        assert!(patch_for(&resolution, t.orc).is_none());
    }

    #[test]
    fn test_manual_hp_edits_clamp() {
        let t = table();
        let resolution = resolve_set_hp(&t.state, t.goblin, 99);
        assert_eq!(texts(&resolution), vec!["Goblin's current HP set to 7"]);
        let resolution = resolve_set_temp_hp(&t.state, t.orc, -3);
        assert_eq!(texts(&resolution), vec!["Orc's temporary HP was removed"]);
        assert_eq!(patch_for(&resolution, t.orc).unwrap().temp_hp, Some(0));
    }

    #[test]
    fn test_afflict_and_remove_condition() {
        let mut t = table();
        let resolution = resolve_afflict(&t.state, None, t.goblin, " Poisoned ");
        assert_eq!(texts(&resolution), vec!["Fighter afflicted Goblin with Poisoned"]);
        t.state.apply(resolution, Utc::now());
        t.state.apply(resolve_afflict(&t.state, None, t.goblin, "Poisoned"), Utc::now());

        let resolution = resolve_remove_condition(&t.state, Some(t.orc), t.goblin, "Poisoned");
        assert_eq!(texts(&resolution), vec!["Orc removed Poisoned from Goblin"]);
        assert_eq!(
            patch_for(&resolution, t.goblin).unwrap().conditions,
            Some(Vec::new())
        );
        assert!(resolve_afflict(&t.state, None, t.goblin, "  ").is_empty());
    }
}
