//! Combat events - structured record of what happened in an encounter
//!
//! Every log line is rendered from one of these events, and the stats
//! aggregator reads the events directly. The narrative text stays a
//! presentation concern; [`CombatEvent::parse`] only exists to recover events
//! from log entries that were stored as plain text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::entities::LogEntryType;
use crate::domain::value_objects::SaveAbility;

/// Separator between target names inside a single log line
pub const TARGET_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEvent {
    /// An attack roll met or beat the AC of every listed target
    Hit {
        source: String,
        targets: Vec<String>,
        damage: Option<u32>,
        status: Option<String>,
        roll: Option<i32>,
    },
    /// An attack roll fell short of every listed target's AC
    Miss {
        source: String,
        targets: Vec<String>,
        roll: Option<i32>,
    },
    SaveSuccess {
        source: Option<String>,
        targets: Vec<String>,
        ability: SaveAbility,
        damage: Option<u32>,
    },
    SaveFail {
        source: Option<String>,
        targets: Vec<String>,
        ability: SaveAbility,
        damage: Option<u32>,
        status: Option<String>,
    },
    /// Target dropped to 0 HP. `source` is whoever dealt the final blow.
    Knockout {
        source: Option<String>,
        target: String,
    },
    Revive {
        target: String,
    },
    Heal {
        source: String,
        targets: Vec<String>,
        amount: u32,
    },
    TempHpGrant {
        source: String,
        targets: Vec<String>,
        amount: u32,
    },
    /// Manual temp HP edit; 0 means the buffer was removed
    TempHpSet {
        target: String,
        amount: u32,
    },
    /// Manual current HP edit
    HpSet {
        target: String,
        hp: u32,
    },
    Afflict {
        source: String,
        target: String,
        status: String,
    },
    ConditionRemoved {
        source: String,
        target: String,
        status: String,
    },
    TurnAdvance {
        combatant: String,
    },
    RoundStart {
        round: u32,
    },
    Joined {
        name: String,
    },
}

impl CombatEvent {
    /// Log category this event is filed under
    pub fn entry_type(&self) -> LogEntryType {
        match self {
            CombatEvent::Hit { .. }
            | CombatEvent::Miss { .. }
            | CombatEvent::SaveSuccess { .. }
            | CombatEvent::SaveFail { .. }
            | CombatEvent::Knockout { .. } => LogEntryType::Damage,
            CombatEvent::Revive { .. }
            | CombatEvent::Heal { .. }
            | CombatEvent::TempHpGrant { .. }
            | CombatEvent::TempHpSet { .. } => LogEntryType::Healing,
            CombatEvent::HpSet { .. }
            | CombatEvent::Afflict { .. }
            | CombatEvent::ConditionRemoved { .. } => LogEntryType::Status,
            CombatEvent::TurnAdvance { .. } => LogEntryType::Turn,
            CombatEvent::RoundStart { .. } | CombatEvent::Joined { .. } => LogEntryType::Round,
        }
    }

    /// Render the narrative log line for this event
    pub fn narrate(&self) -> String {
        match self {
            CombatEvent::Hit {
                source,
                targets,
                damage,
                status,
                roll,
            } => {
                let mut text = format!("{} hit {}", source, targets.join(TARGET_SEPARATOR));
                if let Some(damage) = damage {
                    text.push_str(&format!(" for {} damage", damage));
                }
                if let Some(status) = status {
                    text.push_str(&format!(" and applied {}", status));
                }
                if let Some(roll) = roll {
                    text.push_str(&format!(" (Attack: {})", roll));
                }
                text
            }
            CombatEvent::Miss {
                source,
                targets,
                roll,
            } => {
                let mut text = format!("{} missed {}", source, targets.join(TARGET_SEPARATOR));
                if let Some(roll) = roll {
                    text.push_str(&format!(" (Attack: {})", roll));
                }
                text
            }
            CombatEvent::SaveSuccess {
                targets,
                ability,
                damage,
                ..
            } => {
                let mut text = format!(
                    "{} succeeded on their {} save",
                    targets.join(TARGET_SEPARATOR),
                    ability.label()
                );
                if let Some(damage) = damage {
                    text.push_str(&format!(" (taking {} damage)", damage));
                }
                text
            }
            CombatEvent::SaveFail {
                targets,
                ability,
                damage,
                status,
                ..
            } => {
                let mut text = format!(
                    "{} failed their {} save",
                    targets.join(TARGET_SEPARATOR),
                    ability.label()
                );
                if let Some(damage) = damage {
                    text.push_str(&format!(" taking {} damage", damage));
                }
                if let Some(status) = status {
                    text.push_str(&format!(" and gained {}", status));
                }
                text
            }
            CombatEvent::Knockout { target, .. } => format!("{} falls unconscious!", target),
            CombatEvent::Revive { target } => format!("{} is back on their feet!", target),
            CombatEvent::Heal {
                source,
                targets,
                amount,
            } => format!(
                "{} healed {} for {} HP",
                source,
                targets.join(TARGET_SEPARATOR),
                amount
            ),
            CombatEvent::TempHpGrant {
                source,
                targets,
                amount,
            } => format!(
                "{} granted {} temporary HP to {}",
                source,
                amount,
                targets.join(TARGET_SEPARATOR)
            ),
            CombatEvent::TempHpSet { target, amount } => {
                if *amount > 0 {
                    format!("{} gained {} temporary HP", target, amount)
                } else {
                    format!("{}'s temporary HP was removed", target)
                }
            }
            CombatEvent::HpSet { target, hp } => {
                format!("{}'s current HP set to {}", target, hp)
            }
            CombatEvent::Afflict {
                source,
                target,
                status,
            } => format!("{} afflicted {} with {}", source, target, status),
            CombatEvent::ConditionRemoved {
                source,
                target,
                status,
            } => format!("{} removed {} from {}", source, status, target),
            CombatEvent::TurnAdvance { combatant } => format!("{}'s turn", combatant),
            CombatEvent::RoundStart { round } => format!("Round {} begins", round),
            CombatEvent::Joined { name } => format!("{} joined the combat!", name),
        }
    }

    /// Name of the combatant who acted, if the event records one
    pub fn source(&self) -> Option<&str> {
        match self {
            CombatEvent::Hit { source, .. }
            | CombatEvent::Miss { source, .. }
            | CombatEvent::Heal { source, .. }
            | CombatEvent::TempHpGrant { source, .. }
            | CombatEvent::Afflict { source, .. }
            | CombatEvent::ConditionRemoved { source, .. } => Some(source),
            CombatEvent::SaveSuccess { source, .. }
            | CombatEvent::SaveFail { source, .. }
            | CombatEvent::Knockout { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Recover an event from a narrative line. Unknown text yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        // Patterns anchored on a distinctive suffix go first so that names
        // containing words like "hit" cannot shadow them.
        if let Some(caps) = KNOCKOUT_RE.captures(text) {
            return Some(CombatEvent::Knockout {
                source: None,
                target: caps["target"].to_string(),
            });
        }
        if let Some(caps) = REVIVE_RE.captures(text) {
            return Some(CombatEvent::Revive {
                target: caps["target"].to_string(),
            });
        }
        if let Some(caps) = ROUND_RE.captures(text) {
            return Some(CombatEvent::RoundStart {
                round: caps["round"].parse().ok()?,
            });
        }
        if let Some(caps) = JOINED_RE.captures(text) {
            return Some(CombatEvent::Joined {
                name: caps["name"].to_string(),
            });
        }
        if let Some(caps) = SAVE_SUCCESS_RE.captures(text) {
            return Some(CombatEvent::SaveSuccess {
                source: None,
                targets: split_targets(&caps["targets"]),
                ability: caps["ability"].parse().ok()?,
                damage: number(&caps, "damage"),
            });
        }
        if let Some(caps) = SAVE_FAIL_RE.captures(text) {
            return Some(CombatEvent::SaveFail {
                source: None,
                targets: split_targets(&caps["targets"]),
                ability: caps["ability"].parse().ok()?,
                damage: number(&caps, "damage"),
                status: caps.name("status").map(|m| m.as_str().to_string()),
            });
        }
        if let Some(caps) = HEAL_RE.captures(text) {
            return Some(CombatEvent::Heal {
                source: caps["source"].to_string(),
                targets: split_targets(&caps["targets"]),
                amount: caps["amount"].parse().ok()?,
            });
        }
        if let Some(caps) = TEMP_GRANT_RE.captures(text) {
            return Some(CombatEvent::TempHpGrant {
                source: caps["source"].to_string(),
                targets: split_targets(&caps["targets"]),
                amount: caps["amount"].parse().ok()?,
            });
        }
        if let Some(caps) = TEMP_SET_RE.captures(text) {
            return Some(CombatEvent::TempHpSet {
                target: caps["target"].to_string(),
                amount: caps["amount"].parse().ok()?,
            });
        }
        if let Some(caps) = TEMP_REMOVED_RE.captures(text) {
            return Some(CombatEvent::TempHpSet {
                target: caps["target"].to_string(),
                amount: 0,
            });
        }
        if let Some(caps) = HP_SET_RE.captures(text) {
            return Some(CombatEvent::HpSet {
                target: caps["target"].to_string(),
                hp: caps["hp"].parse().ok()?,
            });
        }
        if let Some(caps) = TURN_RE.captures(text) {
            return Some(CombatEvent::TurnAdvance {
                combatant: caps["name"].to_string(),
            });
        }
        if let Some(caps) = MISS_RE.captures(text) {
            return Some(CombatEvent::Miss {
                source: caps["source"].to_string(),
                targets: split_targets(&caps["targets"]),
                roll: signed(&caps, "roll"),
            });
        }
        if let Some(caps) = HIT_RE.captures(text) {
            return Some(CombatEvent::Hit {
                source: caps["source"].to_string(),
                targets: split_targets(&caps["targets"]),
                damage: number(&caps, "damage"),
                status: caps.name("status").map(|m| m.as_str().to_string()),
                roll: signed(&caps, "roll"),
            });
        }
        if let Some(caps) = AFFLICT_RE.captures(text) {
            return Some(CombatEvent::Afflict {
                source: caps["source"].to_string(),
                target: caps["target"].to_string(),
                status: caps["status"].to_string(),
            });
        }
        if let Some(caps) = REMOVED_RE.captures(text) {
            return Some(CombatEvent::ConditionRemoved {
                source: caps["source"].to_string(),
                target: caps["target"].to_string(),
                status: caps["status"].to_string(),
            });
        }
        None
    }
}

fn split_targets(list: &str) -> Vec<String> {
    list.split(TARGET_SEPARATOR).map(str::to_string).collect()
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn signed(caps: &Captures<'_>, name: &str) -> Option<i32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

// ============================================================================
// Narrative templates (compiled once)
// ============================================================================

static HIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<source>.+?) hit (?P<targets>.+?)(?: for (?P<damage>\d+) damage)?(?: and applied (?P<status>.+?))?(?: \(Attack: (?P<roll>-?\d+)\))?$",
    )
    .expect("valid hit pattern")
});

static MISS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?) missed (?P<targets>.+?)(?: \(Attack: (?P<roll>-?\d+)\))?$")
        .expect("valid miss pattern")
});

static SAVE_SUCCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<targets>.+) succeeded on their (?P<ability>[A-Z]{3}) save(?: \(taking (?P<damage>\d+) damage\))?$",
    )
    .expect("valid save success pattern")
});

static SAVE_FAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<targets>.+) failed their (?P<ability>[A-Z]{3}) save(?: taking (?P<damage>\d+) damage)?(?: and gained (?P<status>.+))?$",
    )
    .expect("valid save fail pattern")
});

static KNOCKOUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<target>.+) falls unconscious!$").expect("valid knockout pattern"));

static REVIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<target>.+) is back on their feet!$").expect("valid revive pattern")
});

static HEAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?) healed (?P<targets>.+) for (?P<amount>\d+) HP$")
        .expect("valid heal pattern")
});

static TEMP_GRANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?) granted (?P<amount>\d+) temporary HP to (?P<targets>.+)$")
        .expect("valid temp grant pattern")
});

static TEMP_SET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<target>.+) gained (?P<amount>\d+) temporary HP$").expect("valid temp set pattern")
});

static TEMP_REMOVED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<target>.+)'s temporary HP was removed$").expect("valid temp removed pattern")
});

static HP_SET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<target>.+)'s current HP set to (?P<hp>\d+)$").expect("valid hp set pattern")
});

static ROUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Round (?P<round>\d+) begins$").expect("valid round pattern"));

static TURN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>.+)'s turn$").expect("valid turn pattern"));

static JOINED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>.+) joined the combat!$").expect("valid joined pattern"));

static AFFLICT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?) afflicted (?P<target>.+?) with (?P<status>.+)$")
        .expect("valid afflict pattern")
});

static REMOVED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<source>.+?) removed (?P<status>.+?) from (?P<target>.+)$")
        .expect("valid condition removed pattern")
});
