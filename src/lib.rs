//! Tone marks for Hanyu Pinyin.
//!
//! Converts a syllable typed with the placeholder `v` for `ü` plus a tone digit
//! into a marked syllable, e.g. `lve` with tone 4 into `lüè`.

pub mod config;
pub mod pinyin;
pub mod txt_convert;
pub mod txt_parser;

pub use pinyin::{Conversion, UnchangedReason, convert, convert_tagged};
