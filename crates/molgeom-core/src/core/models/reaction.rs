use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionType {
    Trivial,
    // --- Unimolecular ---
    HydrogenMigration,
    BetaScission,
    RingFormingScission,
    Elimination,
    // --- Bimolecular ---
    HydrogenAbstraction,
    Addition,
    Insertion,
    Substitution,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid reaction type string: '{0}'")]
pub struct ParseReactionTypeError(pub String);

impl ReactionType {
    pub const ALL: [ReactionType; 9] = [
        ReactionType::Trivial,
        ReactionType::HydrogenMigration,
        ReactionType::BetaScission,
        ReactionType::RingFormingScission,
        ReactionType::Elimination,
        ReactionType::HydrogenAbstraction,
        ReactionType::Addition,
        ReactionType::Insertion,
        ReactionType::Substitution,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReactionType::Trivial => "trivial",
            ReactionType::HydrogenMigration => "hydrogen migration",
            ReactionType::BetaScission => "beta scission",
            ReactionType::RingFormingScission => "ring forming scission",
            ReactionType::Elimination => "elimination",
            ReactionType::HydrogenAbstraction => "hydrogen abstraction",
            ReactionType::Addition => "addition",
            ReactionType::Insertion => "insertion",
            ReactionType::Substitution => "substitution",
        }
    }

    pub fn is_unimolecular(&self) -> bool {
        matches!(
            self,
            ReactionType::HydrogenMigration
                | ReactionType::BetaScission
                | ReactionType::RingFormingScission
                | ReactionType::Elimination
        )
    }

    /// The type of the same reaction run backwards.
    ///
    /// Substitutions and trivial reactions have no defined reverse type.
    pub fn reverse(&self) -> Option<ReactionType> {
        match self {
            ReactionType::HydrogenMigration => Some(ReactionType::HydrogenMigration),
            ReactionType::HydrogenAbstraction => Some(ReactionType::HydrogenAbstraction),
            ReactionType::Addition => Some(ReactionType::BetaScission),
            ReactionType::BetaScission => Some(ReactionType::Addition),
            ReactionType::Elimination => Some(ReactionType::Insertion),
            ReactionType::Insertion => Some(ReactionType::Elimination),
            ReactionType::Trivial
            | ReactionType::RingFormingScission
            | ReactionType::Substitution => None,
        }
    }

    /// Whether a class of this type must name the spin surface it runs on.
    pub fn needs_spin_designation(&self) -> bool {
        matches!(
            self,
            ReactionType::Addition | ReactionType::HydrogenAbstraction
        )
    }
}

impl FromStr for ReactionType {
    type Err = ParseReactionTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        ReactionType::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| ParseReactionTypeError(s.to_string()))
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The role a reaction plays in a kinetic mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MechanismType {
    Propagation,
    Termination,
    Branching,
    Lumped,
}

impl fmt::Display for MechanismType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MechanismType::Propagation => "propagation",
                MechanismType::Termination => "termination",
                MechanismType::Branching => "branching",
                MechanismType::Lumped => "lumped",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpinState {
    LowSpin,
    HighSpin,
    #[default]
    Unspecified,
}

impl fmt::Display for SpinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SpinState::LowSpin => "low-spin",
                SpinState::HighSpin => "high-spin",
                SpinState::Unspecified => "",
            }
        )
    }
}

/// A full reaction-class designation: type, spin surface and whether the
/// reactants or products are two or more radicals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionClass {
    pub reaction_type: ReactionType,
    #[serde(default)]
    pub spin: SpinState,
    #[serde(default)]
    pub radical_radical: bool,
}

impl ReactionClass {
    pub fn new(reaction_type: ReactionType, spin: SpinState, radical_radical: bool) -> Self {
        Self {
            reaction_type,
            spin,
            radical_radical,
        }
    }

    pub fn is_high_spin(&self) -> bool {
        self.spin == SpinState::HighSpin
    }

    pub fn is_low_spin(&self) -> bool {
        self.spin == SpinState::LowSpin
    }

    pub fn is_radical_radical(&self) -> bool {
        self.radical_radical
    }

    /// Radical-radical reactions off the high-spin surface are taken to be
    /// barrierless.
    pub fn has_no_barrier(&self) -> bool {
        self.radical_radical && !self.is_high_spin()
    }

    pub fn needs_spin_designation(&self) -> bool {
        self.reaction_type.needs_spin_designation()
    }

    /// Whether entrance- or exit-channel van der Waals wells describe the
    /// reaction.
    pub fn needs_wells(&self) -> bool {
        matches!(
            self.reaction_type,
            ReactionType::HydrogenAbstraction | ReactionType::Substitution
        )
    }
}

impl fmt::Display for ReactionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reaction_type)?;
        if self.spin != SpinState::Unspecified {
            write!(f, " ({})", self.spin)?;
        }
        if self.radical_radical {
            write!(f, " [radical-radical]")?;
        }
        Ok(())
    }
}
