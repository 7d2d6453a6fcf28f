use airlock_core::GameError;
use airlock_types::StageId;
use serde::{Deserialize, Serialize};

/// Scoring and attempt rules for one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRules {
    pub base_score: u32,
    pub max_attempts: u32,
}

/// Deployment-wide scoring constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub decode: StageRules,
    pub translate: StageRules,
    pub challenge: StageRules,
    pub bonus: StageRules,
    /// Points lost per attempt beyond the first.
    pub attempt_penalty: u32,
}

impl ScoringConfig {
    pub fn rules(&self, stage: StageId) -> StageRules {
        match stage {
            StageId::Decode => self.decode,
            StageId::Translate => self.translate,
            StageId::Challenge => self.challenge,
            StageId::Bonus => self.bonus,
        }
    }

    /// Rules for `stage` after applying a session's attempt-cap overrides.
    pub fn effective(&self, stage: StageId, overrides: &PuzzleOverrides) -> StageRules {
        let mut rules = self.rules(stage);
        if let Some(max) = overrides.max_attempts(stage) {
            rules.max_attempts = max;
        }
        rules
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decode: StageRules {
                base_score: 250,
                max_attempts: 5,
            },
            translate: StageRules {
                base_score: 250,
                max_attempts: 3,
            },
            challenge: StageRules {
                base_score: 300,
                max_attempts: 2,
            },
            bonus: StageRules {
                base_score: 200,
                max_attempts: 3,
            },
            attempt_penalty: 50,
        }
    }
}

pub const MAX_ATTEMPTS_LIMIT: u32 = 20;
pub const DEADLINE_MINUTES_LIMIT: u32 = 240;
const MAX_ENTRY_LEN: usize = 64;

/// Per-session customization. `None` means "use the default".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleOverrides {
    pub decode_words: Option<Vec<String>>,
    pub translate_phrases: Option<Vec<String>>,
    pub decode_max_attempts: Option<u32>,
    pub translate_max_attempts: Option<u32>,
    pub challenge_max_attempts: Option<u32>,
    pub bonus_max_attempts: Option<u32>,
    pub deadline_minutes: Option<u32>,
}

impl PuzzleOverrides {
    pub fn max_attempts(&self, stage: StageId) -> Option<u32> {
        match stage {
            StageId::Decode => self.decode_max_attempts,
            StageId::Translate => self.translate_max_attempts,
            StageId::Challenge => self.challenge_max_attempts,
            StageId::Bonus => self.bonus_max_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        for stage in StageId::ALL {
            if let Some(max) = self.max_attempts(stage) {
                if !(1..=MAX_ATTEMPTS_LIMIT).contains(&max) {
                    return Err(GameError::Validation(format!(
                        "{} max attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}",
                        stage.name()
                    )));
                }
            }
        }
        if let Some(minutes) = self.deadline_minutes {
            if !(1..=DEADLINE_MINUTES_LIMIT).contains(&minutes) {
                return Err(GameError::Validation(format!(
                    "deadline must be between 1 and {DEADLINE_MINUTES_LIMIT} minutes"
                )));
            }
        }
        validate_list("decode_words", self.decode_words.as_deref())?;
        validate_list("translate_phrases", self.translate_phrases.as_deref())?;
        Ok(())
    }
}

fn validate_list(field: &str, list: Option<&[String]>) -> Result<(), GameError> {
    let Some(list) = list else {
        return Ok(());
    };
    if list.is_empty() {
        return Err(GameError::Validation(format!("{field} must not be empty")));
    }
    for entry in list {
        let trimmed = entry.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_ENTRY_LEN {
            return Err(GameError::Validation(format!(
                "{field} entries must be 1 to {MAX_ENTRY_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
        {
            return Err(GameError::Validation(format!(
                "{field} entries may only contain letters, digits and spaces"
            )));
        }
    }
    Ok(())
}
