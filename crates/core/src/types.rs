use crate::error::GameError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of players in one session.
pub const MAX_PLAYERS: usize = 4;

/// 0-based join order of a player within its session.
pub type PlayerSlot = u8;

/// Identifies a game session. Opaque and immutable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's sole credential. Unguessable, never reissued.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(pub String);

impl PlayerToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the administrator that created a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const JOIN_CODE_LEN: usize = 6;

/// Unambiguous characters only (no `0/O`, `1/I`).
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Short human-enterable code, always stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    /// Draw a random code. Uniqueness is the registry's concern.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..JOIN_CODE_LEN)
            .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalize user input (trim, upper-case) and validate it.
    pub fn parse(input: &str) -> Result<Self, GameError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != JOIN_CODE_LEN {
            return Err(GameError::Validation(format!(
                "join code must be {JOIN_CODE_LEN} characters"
            )));
        }
        if !code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)) {
            return Err(GameError::Validation(
                "join code contains invalid characters".to_string(),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn random_codes_use_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = JoinCode::random(&mut rng);
            assert_eq!(code.as_str().len(), JOIN_CODE_LEN);
            assert!(code.as_str().bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let code = JoinCode::parse("  abc234 ").unwrap();
        assert_eq!(code.as_str(), "ABC234");
    }

    #[test]
    fn parse_rejects_bad_length_and_characters() {
        assert!(matches!(
            JoinCode::parse("ABC"),
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            JoinCode::parse("ABCDE0"),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn tokens_are_distinct() {
        let tokens: HashSet<_> = (0..500).map(|_| PlayerToken::generate()).collect();
        assert_eq!(tokens.len(), 500);
    }
}
