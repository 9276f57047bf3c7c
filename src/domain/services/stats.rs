//! Stats Aggregator - per-combatant totals derived from a combat log
//!
//! Entries that carry a structured event are counted from the event and its
//! recorded source. Text-only entries are parsed first, and their sources are
//! inferred from neighbouring lines:
//!
//! - a saving throw is credited to the nearest older turn declaration in the
//!   same round
//! - a knockout is credited to the adjacent hit or save line that names the
//!   fallen combatant, ignoring other knockout and revive lines in between
//!
//! Text that matches no known template contributes nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::CombatLogEntry;
use crate::domain::events::CombatEvent;

/// Totals keyed by combatant name
pub type Tally = BTreeMap<String, u32>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatStats {
    pub damage_dealt: Tally,
    pub damage_taken: Tally,
    pub healing_done: Tally,
    pub healing_received: Tally,
    pub hits: Tally,
    pub misses: Tally,
    pub saving_throws_forced: Tally,
    pub saving_throws_made: Tally,
    pub saving_throws_failed: Tally,
    pub kills: Tally,
    pub knockouts: Tally,
}

impl CombatStats {
    /// Reduce a newest-first log into totals.
    pub fn from_log(entries: &[CombatLogEntry]) -> Self {
        let log = ResolvedLog::new(entries);
        let mut stats = Self::default();

        for (index, event) in log.events.iter().enumerate() {
            let Some(event) = event else {
                continue;
            };
            match event {
                CombatEvent::Hit {
                    source,
                    targets,
                    damage,
                    ..
                } => {
                    for target in targets {
                        add(&mut stats.hits, source, 1);
                        if let Some(damage) = damage {
                            add(&mut stats.damage_dealt, source, *damage);
                            add(&mut stats.damage_taken, target, *damage);
                        }
                    }
                }
                CombatEvent::Miss { source, targets, .. } => {
                    add(&mut stats.misses, source, targets.len() as u32);
                }
                CombatEvent::Heal {
                    source,
                    targets,
                    amount,
                } => {
                    for target in targets {
                        add(&mut stats.healing_done, source, *amount);
                        add(&mut stats.healing_received, target, *amount);
                    }
                }
                CombatEvent::SaveSuccess {
                    targets, damage, ..
                }
                | CombatEvent::SaveFail {
                    targets, damage, ..
                } => {
                    let made = matches!(event, CombatEvent::SaveSuccess { .. });
                    let source = log.save_source(index);
                    for target in targets {
                        if made {
                            add(&mut stats.saving_throws_made, target, 1);
                        } else {
                            add(&mut stats.saving_throws_failed, target, 1);
                        }
                        if let Some(damage) = damage {
                            add(&mut stats.damage_taken, target, *damage);
                        }
                        if let Some(source) = &source {
                            add(&mut stats.saving_throws_forced, source, 1);
                            if let Some(damage) = damage {
                                add(&mut stats.damage_dealt, source, *damage);
                            }
                        }
                    }
                }
                CombatEvent::Knockout { target, .. } => {
                    add(&mut stats.knockouts, target, 1);
                    if let Some(source) = log.knockout_source(index, target) {
                        add(&mut stats.kills, &source, 1);
                    }
                }
                _ => {}
            }
        }
        stats
    }
}

fn add(tally: &mut Tally, name: &str, amount: u32) {
    let total = tally.entry(name.to_string()).or_insert(0);
    *total = total.saturating_add(amount);
}

/// A log with every entry's event resolved once up front.
struct ResolvedLog<'a> {
    entries: &'a [CombatLogEntry],
    events: Vec<Option<CombatEvent>>,
}

impl<'a> ResolvedLog<'a> {
    fn new(entries: &'a [CombatLogEntry]) -> Self {
        Self {
            entries,
            events: entries.iter().map(CombatLogEntry::resolved_event).collect(),
        }
    }

    fn is_text_only(&self, index: usize) -> bool {
        self.entries[index].event.is_none()
    }

    /// Who forced the save at `index`.
    fn save_source(&self, index: usize) -> Option<String> {
        if !self.is_text_only(index) {
            return self.events[index].as_ref()?.source().map(str::to_string);
        }
        for event in self.events.iter().skip(index + 1) {
            match event {
                Some(CombatEvent::TurnAdvance { combatant }) => return Some(combatant.clone()),
                Some(CombatEvent::RoundStart { .. }) => return None,
                _ => {}
            }
        }
        None
    }

    /// Who dropped `target` in the knockout at `index`.
    fn knockout_source(&self, index: usize, target: &str) -> Option<String> {
        if !self.is_text_only(index) {
            return self.events[index].as_ref()?.source().map(str::to_string);
        }

        let older = (index + 1..self.events.len()).find(|i| !self.is_aftermath(*i));
        let newer = (0..index).rev().find(|i| !self.is_aftermath(*i));
        let candidates: Vec<usize> = [older, newer].into_iter().flatten().collect();

        let blow = candidates
            .iter()
            .copied()
            .find(|i| self.blow_targets(*i).is_some_and(|t| t.iter().any(|n| n == target)))
            .or_else(|| candidates.iter().copied().find(|i| self.blow_targets(*i).is_some()))?;

        match self.events[blow].as_ref()? {
            CombatEvent::Hit { source, .. } => Some(source.clone()),
            _ => self.save_source(blow),
        }
    }

    /// Knockout and revive lines sit next to the blow that caused them.
    fn is_aftermath(&self, index: usize) -> bool {
        matches!(
            self.events[index],
            Some(CombatEvent::Knockout { .. }) | Some(CombatEvent::Revive { .. })
        )
    }

    /// Targets of a line that can drop a combatant to 0 HP.
    fn blow_targets(&self, index: usize) -> Option<&[String]> {
        match self.events[index].as_ref()? {
            CombatEvent::Hit { targets, .. }
            | CombatEvent::SaveSuccess { targets, .. }
            | CombatEvent::SaveFail { targets, .. } => Some(targets.as_slice()),
            _ => None,
        }
    }
}
