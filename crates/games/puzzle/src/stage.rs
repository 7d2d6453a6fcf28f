use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A concrete puzzle for one stage. Closed set of kinds, each with exactly one
/// evaluation rule in [`check_answer`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagePuzzle {
    /// Exact answer, compared after normalization.
    Text { prompt: String, answer: String },
    /// Pick one option; any index in `correct` is accepted.
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        correct: BTreeSet<usize>,
    },
    /// Free text accepted if it matches one of several phrasings.
    OpenResponse { prompt: String, accepted: Vec<String> },
}

impl StagePuzzle {
    pub fn prompt(&self) -> &str {
        match self {
            StagePuzzle::Text { prompt, .. }
            | StagePuzzle::MultipleChoice { prompt, .. }
            | StagePuzzle::OpenResponse { prompt, .. } => prompt,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            StagePuzzle::MultipleChoice { options, .. } => options,
            StagePuzzle::Text { .. } | StagePuzzle::OpenResponse { .. } => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            StagePuzzle::Text { .. } => "text",
            StagePuzzle::MultipleChoice { .. } => "multiple_choice",
            StagePuzzle::OpenResponse { .. } => "open_response",
        }
    }
}

/// Upper-case and collapse whitespace so `" air  lock"` equals `"AIR LOCK"`.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

pub fn check_answer(puzzle: &StagePuzzle, submitted: &str) -> bool {
    match puzzle {
        StagePuzzle::Text { answer, .. } => {
            let submitted = normalize(submitted);
            !submitted.is_empty() && submitted == normalize(answer)
        }
        StagePuzzle::MultipleChoice {
            options, correct, ..
        } => resolve_choice(options, submitted).is_some_and(|idx| correct.contains(&idx)),
        StagePuzzle::OpenResponse { accepted, .. } => {
            let submitted = normalize(submitted);
            !submitted.is_empty() && accepted.iter().any(|a| normalize(a) == submitted)
        }
    }
}

/// Accepts a 0-based index (`"2"`), a letter (`"c"`), or the option text.
fn resolve_choice(options: &[String], submitted: &str) -> Option<usize> {
    let trimmed = submitted.trim();
    if let Ok(idx) = trimmed.parse::<usize>() {
        return (idx < options.len()).then_some(idx);
    }
    let mut chars = trimmed.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            let idx = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
            if idx < options.len() {
                return Some(idx);
            }
        }
    }
    let normalized = normalize(trimmed);
    options.iter().position(|o| normalize(o) == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> StagePuzzle {
        StagePuzzle::MultipleChoice {
            prompt: "Which gas do we breathe?".to_string(),
            options: vec![
                "Helium".to_string(),
                "Oxygen".to_string(),
                "Argon".to_string(),
            ],
            correct: BTreeSet::from([1]),
        }
    }

    #[test]
    fn text_answers_ignore_case_and_spacing() {
        let puzzle = StagePuzzle::Text {
            prompt: "--- ...-".to_string(),
            answer: "Air Lock".to_string(),
        };
        assert!(check_answer(&puzzle, "  air   LOCK "));
        assert!(!check_answer(&puzzle, "airlock"));
        assert!(!check_answer(&puzzle, ""));
    }

    #[test]
    fn multiple_choice_accepts_index_letter_or_text() {
        let puzzle = choice();
        assert!(check_answer(&puzzle, "1"));
        assert!(check_answer(&puzzle, "b"));
        assert!(check_answer(&puzzle, "oxygen"));
        assert!(!check_answer(&puzzle, "0"));
        assert!(!check_answer(&puzzle, "7"));
        assert!(!check_answer(&puzzle, "z"));
    }

    #[test]
    fn open_response_matches_any_accepted_phrasing() {
        let puzzle = StagePuzzle::OpenResponse {
            prompt: "What has keys but no locks?".to_string(),
            accepted: vec!["a keyboard".to_string(), "keyboard".to_string()],
        };
        assert!(check_answer(&puzzle, "Keyboard"));
        assert!(check_answer(&puzzle, "A  keyboard"));
        assert!(!check_answer(&puzzle, "piano"));
    }

    #[test]
    fn puzzles_round_trip_as_tagged_json() {
        let json = serde_json::to_string(&choice()).unwrap();
        assert!(json.contains(r#""kind":"multiple_choice""#));
        let back: StagePuzzle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, choice());
    }
}
