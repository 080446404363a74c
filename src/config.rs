use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Tone digit for the neutral tone, which never carries a diacritic.
pub const NEUTRAL_TONE: i32 = 5;

/// Tones with a contour diacritic.
pub const MARKED_TONES: std::ops::RangeInclusive<i32> = 1..=4;

/// Every tone digit the engine accepts, including the neutral tone.
pub const VALID_TONES: std::ops::RangeInclusive<i32> = 1..=NEUTRAL_TONE;

/// Initials after which ü is written as plain u.
pub const UMLAUT_DROPPING_INITIALS: &[char] = &['j', 'q', 'x', 'y'];

/// Placeholder typed in place of ü.
pub const UMLAUT_PLACEHOLDER: char = 'v';
pub const UMLAUT_PLACEHOLDER_UPPER: char = 'V';

/* Precomposed toned vowels, indexed as [vowel][case][tone - 1].
Vowel order follows VowelLetter (a, e, i, o, u, ü), case 0 is lowercase and case 1 uppercase. */
pub static TONE_MARKS: [[[char; 4]; 2]; 6] = [
    [['ā', 'á', 'ǎ', 'à'], ['Ā', 'Á', 'Ǎ', 'À']],
    [['ē', 'é', 'ě', 'è'], ['Ē', 'É', 'Ě', 'È']],
    [['ī', 'í', 'ǐ', 'ì'], ['Ī', 'Í', 'Ǐ', 'Ì']],
    [['ō', 'ó', 'ǒ', 'ò'], ['Ō', 'Ó', 'Ǒ', 'Ò']],
    [['ū', 'ú', 'ǔ', 'ù'], ['Ū', 'Ú', 'Ǔ', 'Ù']],
    [['ǖ', 'ǘ', 'ǚ', 'ǜ'], ['Ǖ', 'Ǘ', 'Ǚ', 'Ǜ']],
];

/// Options for batch conversion, optionally read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Write one JSON object per numbered token instead of converted text
    pub json: bool,
    /// Keep the tone digit of tokens that could not be marked
    pub keep_unconverted_digit: bool,
    /// Log a warning for every numbered token that was passed through
    pub warn_on_unchanged: bool,
}

impl Settings {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)
            .context(format!("Could not read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&s)
            .context(format!("Invalid settings file {}", path.display()))?;
        Ok(settings)
    }
}
