use serde::{Deserialize, Serialize};

/// Named encoding applied to a clue's plaintext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum CipherScheme {
    Morse,
    Caesar { shift: u8 },
    Atbash,
    Reverse,
}

impl CipherScheme {
    pub fn encode(self, plaintext: &str) -> String {
        match self {
            CipherScheme::Morse => morse_encode(plaintext),
            CipherScheme::Caesar { shift } => caesar(plaintext, shift),
            CipherScheme::Atbash => atbash(plaintext),
            CipherScheme::Reverse => plaintext.chars().rev().collect(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherScheme::Morse => "morse",
            CipherScheme::Caesar { .. } => "caesar",
            CipherScheme::Atbash => "atbash",
            CipherScheme::Reverse => "reverse",
        }
    }
}

const MORSE: [(char, &str); 36] = [
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
];

/// Letters are separated by a space, words by ` / `. Unknown characters are dropped.
pub fn morse_encode(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter_map(|c| {
                    let upper = c.to_ascii_uppercase();
                    MORSE.iter().find(|(l, _)| *l == upper).map(|(_, code)| *code)
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn caesar(text: &str, shift: u8) -> String {
    let shift = shift % 26;
    text.chars()
        .map(|c| match c {
            'A'..='Z' => (b'A' + (c as u8 - b'A' + shift) % 26) as char,
            'a'..='z' => (b'a' + (c as u8 - b'a' + shift) % 26) as char,
            _ => c,
        })
        .collect()
}

pub fn atbash(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'A'..='Z' => (b'Z' - (c as u8 - b'A')) as char,
            'a'..='z' => (b'z' - (c as u8 - b'a')) as char,
            _ => c,
        })
        .collect()
}
