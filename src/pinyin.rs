use serde::Serialize;

use crate::config::{
    MARKED_TONES, NEUTRAL_TONE, TONE_MARKS, UMLAUT_DROPPING_INITIALS, UMLAUT_PLACEHOLDER,
    UMLAUT_PLACEHOLDER_UPPER, VALID_TONES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VowelLetter {
    A,
    E,
    I,
    O,
    U,
    UUmlaut,
}

impl VowelLetter {
    /// Vowel identity of `c`, ignoring case.
    pub fn from_char(c: char) -> Option<Self> {
        Some(match fold_case(c) {
            'a' => VowelLetter::A,
            'e' => VowelLetter::E,
            'i' => VowelLetter::I,
            'o' => VowelLetter::O,
            'u' => VowelLetter::U,
            'ü' => VowelLetter::UUmlaut,
            _ => return None,
        })
    }

    /// Toned variant for a contour tone (1 to 4), `None` for any other tone.
    pub fn with_tone(self, tone: i32, uppercase: bool) -> Option<char> {
        if !MARKED_TONES.contains(&tone) {
            return None;
        }
        let tone_idx = usize::try_from(tone - 1).ok()?;
        let case_idx = usize::from(uppercase);
        Some(TONE_MARKS[self as usize][case_idx][tone_idx])
    }
}

/// The character that receives the tone mark. `index` counts chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    pub index: usize,
    pub vowel: VowelLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    EmptyInput,
    InvalidTone,
    NeutralTone,
    NoVowelFound,
}

/// Result of a conversion that tells a genuine mark apart from a passthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Marked { text: String, target: Target },
    Unchanged { text: String, reason: UnchangedReason },
}

impl Conversion {
    pub fn text(&self) -> &str {
        match self {
            Conversion::Marked { text, .. } | Conversion::Unchanged { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Conversion::Marked { text, .. } | Conversion::Unchanged { text, .. } => text,
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Conversion::Marked { .. })
    }
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Rewrites the placeholder `v`/`V` to `ü`/`Ü`, or to `u`/`U` after j, q, x and y.
pub fn normalize_umlaut(syllable: &str) -> String {
    let drops_umlaut = syllable
        .chars()
        .next()
        .is_some_and(|first| UMLAUT_DROPPING_INITIALS.contains(&fold_case(first)));
    let (lower, upper) = if drops_umlaut {
        ('u', 'U')
    } else {
        ('ü', 'Ü')
    };
    syllable
        .chars()
        .map(|c| match c {
            UMLAUT_PLACEHOLDER => lower,
            UMLAUT_PLACEHOLDER_UPPER => upper,
            _ => c,
        })
        .collect()
}

/// Picks the vowel that carries the tone mark.
///
/// The rules apply in order and the first match wins:
/// 1. the first `a`
/// 2. the first `e`
/// 3. the `o` of the first `ou`
/// 4. the rightmost vowel
///
/// Matching ignores case. The `ou` rule is not anchored to the final.
pub fn select_target(normalized: &str) -> Option<Target> {
    let folded: Vec<char> = normalized.chars().map(fold_case).collect();

    let first_of = |wanted: char| folded.iter().position(|&c| c == wanted);

    if let Some(index) = first_of('a') {
        return Some(Target {
            index,
            vowel: VowelLetter::A,
        });
    }
    if let Some(index) = first_of('e') {
        return Some(Target {
            index,
            vowel: VowelLetter::E,
        });
    }
    if let Some(index) = folded.windows(2).position(|w| w == ['o', 'u']) {
        return Some(Target {
            index,
            vowel: VowelLetter::O,
        });
    }
    folded.iter().enumerate().rev().find_map(|(index, &c)| {
        VowelLetter::from_char(c).map(|vowel| Target { index, vowel })
    })
}

/// Replaces the target char with its toned variant, keeping its case.
///
/// Tone 5, tones outside 1 to 5 and a missing target leave the text as is.
pub fn apply_tone(normalized: &str, target: Option<Target>, tone: i32) -> String {
    let Some(target) = target else {
        return normalized.to_owned();
    };
    if !MARKED_TONES.contains(&tone) {
        return normalized.to_owned();
    }
    normalized
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i == target.index {
                target.vowel.with_tone(tone, c.is_uppercase()).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

fn unchanged_reason(
    normalized: &str,
    target: Option<Target>,
    tone: i32,
) -> Option<UnchangedReason> {
    if normalized.is_empty() {
        Some(UnchangedReason::EmptyInput)
    } else if !VALID_TONES.contains(&tone) {
        Some(UnchangedReason::InvalidTone)
    } else if tone == NEUTRAL_TONE {
        Some(UnchangedReason::NeutralTone)
    } else if target.is_none() {
        Some(UnchangedReason::NoVowelFound)
    } else {
        None
    }
}

/// Converts a syllable and a tone digit, reporting whether a mark was applied.
pub fn convert_tagged(syllable: &str, tone: i32) -> Conversion {
    let normalized = normalize_umlaut(syllable);
    let target = select_target(&normalized);
    match (unchanged_reason(&normalized, target, tone), target) {
        (None, Some(target)) => Conversion::Marked {
            text: apply_tone(&normalized, Some(target), tone),
            target,
        },
        (reason, _) => Conversion::Unchanged {
            text: normalized,
            reason: reason.unwrap_or(UnchangedReason::NoVowelFound),
        },
    }
}

/// Converts a syllable such as `lve` with tone 4 into `lüè`.
///
/// Never fails: empty input, a syllable without vowel or an invalid tone
/// give back the umlaut-normalized syllable.
pub fn convert(syllable: &str, tone: i32) -> String {
    convert_tagged(syllable, tone).into_text()
}
