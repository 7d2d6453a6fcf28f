use crate::cipher::{morse_encode, CipherScheme};
use crate::config::PuzzleOverrides;
use crate::stage::StagePuzzle;
use airlock_core::PlayerSlot;
use airlock_types::StageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shift applied to translate-stage phrases.
pub const TRANSLATE_SHIFT: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: BTreeSet<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Riddle {
    pub prompt: String,
    pub accepted: Vec<String>,
}

/// Content lists puzzles are drawn from, one list per stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleContent {
    pub decode_words: Vec<String>,
    pub translate_phrases: Vec<String>,
    pub challenge_questions: Vec<TriviaQuestion>,
    pub bonus_riddles: Vec<Riddle>,
}

impl PuzzleContent {
    /// Content with a session's list overrides applied.
    pub fn with_overrides(&self, overrides: &PuzzleOverrides) -> PuzzleContent {
        let mut content = self.clone();
        if let Some(words) = overrides.decode_words.as_ref().filter(|w| !w.is_empty()) {
            content.decode_words = words.clone();
        }
        if let Some(phrases) = overrides
            .translate_phrases
            .as_ref()
            .filter(|p| !p.is_empty())
        {
            content.translate_phrases = phrases.clone();
        }
        content
    }

    pub fn len(&self, stage: StageId) -> usize {
        match stage {
            StageId::Decode => self.decode_words.len(),
            StageId::Translate => self.translate_phrases.len(),
            StageId::Challenge => self.challenge_questions.len(),
            StageId::Bonus => self.bonus_riddles.len(),
        }
    }

    /// Index into `stage`'s list for the player in `slot`: `slot mod len`.
    pub fn index_for(&self, stage: StageId, slot: PlayerSlot) -> usize {
        match self.len(stage) {
            0 => 0,
            len => slot as usize % len,
        }
    }

    /// Build the puzzle the player in `slot` solves for `stage`.
    ///
    /// Falls back to the built-in library if the list is empty.
    pub fn puzzle_for(&self, stage: StageId, slot: PlayerSlot) -> StagePuzzle {
        if self.len(stage) == 0 {
            return PuzzleContent::default().puzzle_for(stage, slot);
        }
        let idx = self.index_for(stage, slot);
        match stage {
            StageId::Decode => {
                let word = self.decode_words[idx].trim().to_uppercase();
                StagePuzzle::Text {
                    prompt: morse_encode(&word),
                    answer: word,
                }
            }
            StageId::Translate => {
                let phrase = self.translate_phrases[idx].trim().to_uppercase();
                StagePuzzle::Text {
                    prompt: CipherScheme::Caesar {
                        shift: TRANSLATE_SHIFT,
                    }
                    .encode(&phrase),
                    answer: phrase,
                }
            }
            StageId::Challenge => {
                let question = &self.challenge_questions[idx];
                StagePuzzle::MultipleChoice {
                    prompt: question.prompt.clone(),
                    options: question.options.clone(),
                    correct: question.correct.clone(),
                }
            }
            StageId::Bonus => {
                let riddle = &self.bonus_riddles[idx];
                StagePuzzle::OpenResponse {
                    prompt: riddle.prompt.clone(),
                    accepted: riddle.accepted.clone(),
                }
            }
        }
    }

    pub fn assign(&self, slot: PlayerSlot) -> PuzzleAssignment {
        PuzzleAssignment {
            decode: self.puzzle_for(StageId::Decode, slot),
            translate: self.puzzle_for(StageId::Translate, slot),
            challenge: self.puzzle_for(StageId::Challenge, slot),
            bonus: self.puzzle_for(StageId::Bonus, slot),
        }
    }
}

impl Default for PuzzleContent {
    fn default() -> Self {
        Self {
            decode_words: ["OXYGEN", "AIRLOCK", "REACTOR", "HELIUM", "ORBIT"]
                .map(String::from)
                .to_vec(),
            translate_phrases: [
                "SEAL THE HATCH",
                "VENT THE CORE",
                "FIND THE KEY",
                "CHECK THE VALVE",
            ]
            .map(String::from)
            .to_vec(),
            challenge_questions: vec![
                question(
                    "Which planet is closest to the Sun?",
                    &["Venus", "Mercury", "Mars", "Earth"],
                    &[1],
                ),
                question(
                    "What is the chemical symbol for oxygen?",
                    &["O", "Ox", "Og", "Om"],
                    &[0],
                ),
                question(
                    "How many minutes are in three hours?",
                    &["120", "160", "180", "300"],
                    &[2],
                ),
                question(
                    "Which of these are noble gases?",
                    &["Nitrogen", "Neon", "Argon", "Hydrogen"],
                    &[1, 2],
                ),
            ],
            bonus_riddles: vec![
                riddle(
                    "The more you take, the more you leave behind. What am I?",
                    &["footsteps", "steps"],
                ),
                riddle(
                    "What has keys but can't open locks?",
                    &["a piano", "piano", "keyboard", "a keyboard"],
                ),
                riddle(
                    "What gets wetter the more it dries?",
                    &["a towel", "towel"],
                ),
            ],
        }
    }
}

fn question(prompt: &str, options: &[&str], correct: &[usize]) -> TriviaQuestion {
    TriviaQuestion {
        prompt: prompt.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct: correct.iter().copied().collect(),
    }
}

fn riddle(prompt: &str, accepted: &[&str]) -> Riddle {
    Riddle {
        prompt: prompt.to_string(),
        accepted: accepted.iter().map(|a| a.to_string()).collect(),
    }
}

/// The puzzles a player was given at join time. Fixed for the player's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleAssignment {
    pub decode: StagePuzzle,
    pub translate: StagePuzzle,
    pub challenge: StagePuzzle,
    pub bonus: StagePuzzle,
}

impl PuzzleAssignment {
    pub fn get(&self, stage: StageId) -> &StagePuzzle {
        match stage {
            StageId::Decode => &self.decode,
            StageId::Translate => &self.translate,
            StageId::Challenge => &self.challenge,
            StageId::Bonus => &self.bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::check_answer;

    #[test]
    fn assignment_follows_slot_modulo_list_length() {
        let content = PuzzleContent::default();
        for len in 1..=4usize {
            let words: Vec<String> = (0..len).map(|i| format!("WORD{i}")).collect();
            let content = content.with_overrides(&PuzzleOverrides {
                decode_words: Some(words.clone()),
                ..Default::default()
            });
            for slot in 0..8u8 {
                let puzzle = content.puzzle_for(StageId::Decode, slot);
                let expected = &words[slot as usize % len];
                assert!(check_answer(&puzzle, expected), "slot {slot}, len {len}");
            }
        }
    }

    #[test]
    fn decode_prompt_is_morse_of_answer() {
        let content = PuzzleContent::default();
        let StagePuzzle::Text { prompt, answer } = content.puzzle_for(StageId::Decode, 0) else {
            panic!("decode stage must be a text puzzle");
        };
        assert_eq!(answer, "OXYGEN");
        assert_eq!(prompt, morse_encode("OXYGEN"));
    }

    #[test]
    fn translate_prompt_is_shifted() {
        let content = PuzzleContent::default();
        let puzzle = content.puzzle_for(StageId::Translate, 1);
        assert_eq!(puzzle.prompt(), "YHQW WKH FRUH");
        assert!(check_answer(&puzzle, "vent the core"));
    }

    #[test]
    fn empty_lists_fall_back_to_builtin_library() {
        let content = PuzzleContent {
            challenge_questions: vec![],
            ..PuzzleContent::default()
        };
        let puzzle = content.puzzle_for(StageId::Challenge, 0);
        assert_eq!(puzzle.kind_name(), "multiple_choice");
    }

    #[test]
    fn assignment_exposes_every_stage() {
        let assignment = PuzzleContent::default().assign(2);
        assert_eq!(assignment.get(StageId::Challenge).kind_name(), "multiple_choice");
        assert_eq!(assignment.get(StageId::Bonus).kind_name(), "open_response");
        assert!(check_answer(assignment.get(StageId::Decode), "reactor"));
    }
}
