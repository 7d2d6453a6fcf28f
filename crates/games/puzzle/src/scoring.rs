use crate::progress::PlayerProgress;
use airlock_types::StageId;

/// Score for a stage completed on attempt `attempts_used`.
///
/// The first attempt earns `base`; each further attempt costs `penalty`,
/// floored at zero. A stage with no attempts earns nothing.
pub fn compute_stage_score(base: u32, attempts_used: u32, penalty: u32) -> u32 {
    if attempts_used == 0 {
        return 0;
    }
    base.saturating_sub(penalty.saturating_mul(attempts_used - 1))
}

/// Length of the final unlock code.
pub const UNLOCK_CODE_LEN: usize = 4;

/// Derive the final unlock code from aggregate score statistics.
///
/// Digits, in order: sum of totals, spread (max minus min), integer mean,
/// and the sum of decode-stage scores, each modulo 10. Pure, so anyone holding
/// the session state can verify it.
pub fn derive_unlock_code<'a, I>(players: I) -> String
where
    I: IntoIterator<Item = &'a PlayerProgress>,
{
    let mut count: u64 = 0;
    let mut sum: u64 = 0;
    let mut max: u64 = 0;
    let mut min: u64 = u64::MAX;
    let mut decode_sum: u64 = 0;

    for progress in players {
        let total = progress.total_score() as u64;
        count += 1;
        sum += total;
        max = max.max(total);
        min = min.min(total);
        let decode = progress.stage(StageId::Decode);
        if decode.completed {
            decode_sum += decode.score as u64;
        }
    }

    if count == 0 {
        return "0".repeat(UNLOCK_CODE_LEN);
    }

    let digits = [sum, max - min, sum / count, decode_sum];
    digits.iter().map(|d| char::from(b'0' + (d % 10) as u8)).collect()
}
