//! Saving throw ability scores

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// The six ability scores a saving throw can be made against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAbility {
    Str,
    #[default]
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl SaveAbility {
    /// Short uppercase label used in the combat log ("DEX")
    pub fn label(&self) -> &'static str {
        match self {
            SaveAbility::Str => "STR",
            SaveAbility::Dex => "DEX",
            SaveAbility::Con => "CON",
            SaveAbility::Int => "INT",
            SaveAbility::Wis => "WIS",
            SaveAbility::Cha => "CHA",
        }
    }
}

impl std::fmt::Display for SaveAbility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SaveAbility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "str" => Ok(SaveAbility::Str),
            "dex" => Ok(SaveAbility::Dex),
            "con" => Ok(SaveAbility::Con),
            "int" => Ok(SaveAbility::Int),
            "wis" => Ok(SaveAbility::Wis),
            "cha" => Ok(SaveAbility::Cha),
            other => Err(DomainError::parse(format!("unknown save ability '{}'", other))),
        }
    }
}
