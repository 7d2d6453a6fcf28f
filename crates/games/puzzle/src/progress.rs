use crate::config::StageRules;
use crate::scoring::compute_stage_score;
use crate::stage::{check_answer, StagePuzzle};
use airlock_core::{Conflict, GameError};
use airlock_types::StageId;
use serde::{Deserialize, Serialize};

/// Attempts and completion for one stage. `completed` only goes false -> true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageProgress {
    pub attempts: u32,
    pub completed: bool,
    /// Score locked in at completion; zero while incomplete.
    pub score: u32,
}

/// Outcome of one answer submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub stage: StageId,
    pub correct: bool,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub score_delta: u32,
    /// No attempts remain and the stage was never completed.
    pub exhausted: bool,
}

/// Partial update for one stage. Unset fields are left alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePatch {
    pub attempts: Option<u32>,
    pub completed: Option<bool>,
}

/// A player's progress through all stages, in solving order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProgress {
    stages: [StageProgress; 4],
}

impl PlayerProgress {
    pub fn stage(&self, stage: StageId) -> &StageProgress {
        &self.stages[stage.index()]
    }

    pub(crate) fn stage_mut(&mut self, stage: StageId) -> &mut StageProgress {
        &mut self.stages[stage.index()]
    }

    /// A stage is open once every earlier stage is completed.
    pub fn is_unlocked(&self, stage: StageId) -> bool {
        match stage.previous() {
            None => true,
            Some(prev) => self.stage(prev).completed,
        }
    }

    pub fn all_completed(&self) -> bool {
        self.stages.iter().all(|s| s.completed)
    }

    pub fn any_attempted(&self) -> bool {
        self.stages.iter().any(|s| s.attempts > 0)
    }

    /// Sum of scores over completed stages. Incomplete stages contribute zero.
    pub fn total_score(&self) -> u32 {
        self.stages
            .iter()
            .filter(|s| s.completed)
            .map(|s| s.score)
            .sum()
    }

    /// Check an answer and record the attempt.
    ///
    /// Out-of-order and already-completed submissions are refused without
    /// touching state. Once attempts are exhausted the call reports
    /// `correct = false` and consumes nothing, however often it is repeated.
    pub fn submit(
        &mut self,
        stage: StageId,
        puzzle: &StagePuzzle,
        answer: &str,
        rules: StageRules,
        penalty: u32,
    ) -> Result<AnswerOutcome, Conflict> {
        if !self.is_unlocked(stage) {
            return Err(Conflict::StageLocked);
        }
        let progress = self.stage_mut(stage);
        if progress.completed {
            return Err(Conflict::StageAlreadyCompleted);
        }

        if progress.attempts >= rules.max_attempts {
            return Ok(AnswerOutcome {
                stage,
                correct: false,
                attempts_used: progress.attempts,
                max_attempts: rules.max_attempts,
                score_delta: 0,
                exhausted: true,
            });
        }

        progress.attempts += 1;
        let correct = check_answer(puzzle, answer);
        let mut score_delta = 0;
        if correct {
            score_delta = compute_stage_score(rules.base_score, progress.attempts, penalty);
            progress.completed = true;
            progress.score = score_delta;
        }

        Ok(AnswerOutcome {
            stage,
            correct,
            attempts_used: progress.attempts,
            max_attempts: rules.max_attempts,
            score_delta,
            exhausted: !correct && progress.attempts >= rules.max_attempts,
        })
    }

    /// Apply an administrative partial update to one stage.
    ///
    /// Validates everything first; on error nothing changes.
    pub fn apply_patch(
        &mut self,
        stage: StageId,
        patch: StagePatch,
        rules: StageRules,
        penalty: u32,
    ) -> Result<(), GameError> {
        if patch == StagePatch::default() {
            return Ok(());
        }
        if !self.is_unlocked(stage) {
            return Err(Conflict::StageLocked.into());
        }

        let current = *self.stage(stage);
        let mut next = current;

        if let Some(attempts) = patch.attempts {
            if attempts < current.attempts {
                return Err(Conflict::ProgressRegression.into());
            }
            if attempts > rules.max_attempts {
                return Err(GameError::Validation(format!(
                    "{} allows at most {} attempts",
                    stage.name(),
                    rules.max_attempts
                )));
            }
            next.attempts = attempts;
        }

        if let Some(completed) = patch.completed {
            if current.completed && !completed {
                return Err(Conflict::ProgressRegression.into());
            }
            next.completed = completed;
        }

        if current.completed && next.attempts != current.attempts {
            return Err(Conflict::StageAlreadyCompleted.into());
        }
        if next.completed && next.attempts == 0 {
            return Err(GameError::Validation(
                "a completed stage needs at least one attempt".to_string(),
            ));
        }
        if next.completed && !current.completed {
            next.score = compute_stage_score(rules.base_score, next.attempts, penalty);
        }

        *self.stage_mut(stage) = next;
        Ok(())
    }
}
