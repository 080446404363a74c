use std::io::{BufRead, BufReader, Read, Write};

use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;

use crate::config::Settings;
use crate::pinyin::{Conversion, UnchangedReason, convert_tagged};
use crate::txt_parser::{Token, split_line};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub lines: u32,
    pub numbered: u32,
    pub marked: u32,
    pub unchanged: u32,
    pub raw: u32,
}

/// One numbered token in JSON output.
#[derive(Debug, Serialize)]
struct TokenRecord<'a> {
    line: u32,
    input: &'a str,
    tone: i32,
    output: &'a str,
    marked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<UnchangedReason>,
}

/// Result of converting a single line.
#[derive(Debug, PartialEq, Eq)]
pub struct LineResult<'a> {
    pub text: String,
    pub tokens: Vec<(Token<'a>, Option<Conversion>)>,
}

fn token_output(token: &Token, conversion: Option<&Conversion>, settings: &Settings) -> String {
    match (token, conversion) {
        (Token::Numbered { raw, .. }, Some(Conversion::Unchanged { text, .. }))
            if settings.keep_unconverted_digit =>
        {
            let digit = raw.chars().next_back().map(String::from).unwrap_or_default();
            format!("{text}{digit}")
        }
        (_, Some(conversion)) => conversion.text().to_owned(),
        (token, None) => token.raw().to_owned(),
    }
}

/// Splits off "\n" or "\r\n", the last line of a file may have neither.
fn split_line_end(line: &str) -> (&str, &str) {
    let content = line
        .strip_suffix('\n')
        .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));
    line.split_at(content.len())
}

/// Converts every numbered syllable of a line, everything else is kept as is.
pub fn convert_line<'a>(line: &'a str, settings: &Settings) -> LineResult<'a> {
    let tokens: Vec<(Token, Option<Conversion>)> = split_line(line)
        .into_iter()
        .map(|token| {
            let conversion = match token {
                Token::Numbered { syllable, tone, .. } => Some(convert_tagged(syllable, tone)),
                Token::Space(_) | Token::Raw(_) => None,
            };
            (token, conversion)
        })
        .collect();
    let text = tokens
        .iter()
        .map(|(token, conversion)| token_output(token, conversion.as_ref(), settings))
        .join("");
    LineResult { text, tokens }
}

pub struct TxtConverter<'a> {
    writer: &'a mut dyn Write,
    settings: &'a Settings,
    stats: ConvertStats,
}

impl std::fmt::Debug for TxtConverter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxtConverter")
            .field("settings", &self.settings)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'a> TxtConverter<'a> {
    pub fn new(writer: &'a mut dyn Write, settings: &'a Settings) -> Self {
        TxtConverter {
            writer,
            settings,
            stats: ConvertStats::default(),
        }
    }

    pub fn stats(&self) -> &ConvertStats {
        &self.stats
    }

    /// Converts `reader` line by line. Every line is written and flushed before
    /// the next one is read, so a read error keeps the lines converted so far.
    pub fn convert_reader(&mut self, reader: &mut dyn BufRead) -> anyhow::Result<()> {
        let mut buf = String::new();
        loop {
            buf.clear();
            let num_read = reader
                .read_line(&mut buf)
                .context(format!("Could not read input line {}", self.stats.lines + 1))?;
            if num_read == 0 {
                break;
            }
            let (line, line_end) = split_line_end(&buf);
            self.convert_one_line(line, line_end)?;
            self.writer.flush()?;
        }
        Ok(())
    }

    fn convert_one_line(&mut self, line: &str, line_end: &str) -> anyhow::Result<()> {
        self.stats.lines += 1;
        let line_num = self.stats.lines;
        let result = convert_line(line, self.settings);

        for (token, conversion) in &result.tokens {
            match conversion {
                Some(Conversion::Marked { text, target }) => {
                    self.stats.numbered += 1;
                    self.stats.marked += 1;
                    tracing::debug!(
                        line = line_num,
                        input = token.raw(),
                        output = %text,
                        index = target.index,
                        "marked"
                    );
                }
                Some(Conversion::Unchanged { reason, .. }) => {
                    self.stats.numbered += 1;
                    self.stats.unchanged += 1;
                    if self.settings.warn_on_unchanged {
                        tracing::warn!(line = line_num, input = token.raw(), ?reason, "no tone mark applied");
                    } else {
                        tracing::debug!(line = line_num, input = token.raw(), ?reason, "unchanged");
                    }
                }
                None => {
                    if matches!(token, Token::Raw(_)) {
                        self.stats.raw += 1;
                    }
                }
            }
        }

        if self.settings.json {
            for (token, conversion) in &result.tokens {
                let (Token::Numbered { raw, tone, .. }, Some(conversion)) = (token, conversion)
                else {
                    continue;
                };
                let output = token_output(token, Some(conversion), self.settings);
                let record = TokenRecord {
                    line: line_num,
                    input: raw,
                    tone: *tone,
                    output: &output,
                    marked: conversion.is_marked(),
                    reason: match conversion {
                        Conversion::Unchanged { reason, .. } => Some(*reason),
                        Conversion::Marked { .. } => None,
                    },
                };
                serde_json::to_writer(&mut *self.writer, &record)?;
                writeln!(self.writer)?;
            }
        } else {
            write!(self.writer, "{}{line_end}", result.text)?;
        }
        Ok(())
    }
}

/// Converts all lines of `reader` and writes them to `writer`.
pub fn txt_convert(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    settings: &Settings,
) -> anyhow::Result<ConvertStats> {
    let mut reader = BufReader::new(reader);
    let mut converter = TxtConverter::new(writer, settings);
    converter.convert_reader(&mut reader)?;
    let stats = converter.stats().clone();
    tracing::info!(
        lines = stats.lines,
        marked = stats.marked,
        unchanged = stats.unchanged,
        "conversion finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_line() {
        let settings = Settings::default();
        assert_eq!(convert_line("ni3 hao3", &settings).text, "nǐ hǎo");
        assert_eq!(convert_line("Zhong1 guo2", &settings).text, "Zhōng guó");
        assert_eq!(convert_line("  lve4\tnv3 ", &settings).text, "  lüè\tnǚ ");
        assert_eq!(convert_line("xue2 sheng5", &settings).text, "xué sheng");
        assert_eq!(convert_line("ni3hao3 ok", &settings).text, "ni3hao3 ok");
        assert_eq!(convert_line("", &settings).text, "");
    }

    #[test]
    fn test_convert_line_drops_digit_of_passthrough() {
        let settings = Settings::default();
        assert_eq!(convert_line("sh2 ma0", &settings).text, "sh ma");
    }

    #[test]
    fn test_convert_line_keeps_digit() {
        let settings = Settings {
            keep_unconverted_digit: true,
            ..Settings::default()
        };
        assert_eq!(
            convert_line("sh2 ma0 ma5 ma1", &settings).text,
            "sh2 ma0 ma5 mā"
        );
        assert_eq!(convert_line("jv7", &settings).text, "ju7");
    }

    #[test]
    fn test_txt_convert_text() {
        let mut input = "ni3 hao3\nxie4xie5 pin1yin1\nyvan3\n".as_bytes();
        let mut out: Vec<u8> = vec![];
        let stats = txt_convert(&mut input, &mut out, &Settings::default()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "nǐ hǎo\nxie4xie5 pin1yin1\nyuǎn\n"
        );
        assert_eq!(
            stats,
            ConvertStats {
                lines: 3,
                numbered: 3,
                marked: 3,
                unchanged: 0,
                raw: 2,
            }
        );
    }

    #[test]
    fn test_txt_convert_json() {
        let mut input = "ma1 sh2 word\n".as_bytes();
        let mut out: Vec<u8> = vec![];
        let settings = Settings {
            json: true,
            ..Settings::default()
        };
        let stats = txt_convert(&mut input, &mut out, &settings).unwrap();
        let out = String::from_utf8(out).unwrap();
        let records: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["output"], "mā");
        assert_eq!(records[0]["marked"], true);
        assert!(records[0].get("reason").is_none());
        assert_eq!(records[1]["input"], "sh2");
        assert_eq!(records[1]["output"], "sh");
        assert_eq!(records[1]["reason"], "no_vowel_found");
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.raw, 1);
    }

    #[test]
    fn test_convert_line_non_pinyin_digits_kept() {
        let settings = Settings::default();
        assert_eq!(
            convert_line("第3 Ωα2 nü3", &settings).text,
            "第3 Ωα2 nǚ"
        );
    }

    #[test]
    fn test_txt_convert_keeps_line_endings() {
        let mut input = "ma1\r\nni3\n\nhao3".as_bytes();
        let mut out: Vec<u8> = vec![];
        let stats = txt_convert(&mut input, &mut out, &Settings::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "mā\r\nnǐ\n\nhǎo");
        assert_eq!(stats.lines, 4);
    }

    struct FailingReader {
        data: Option<&'static [u8]>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => Err(std::io::Error::other("device gone")),
            }
        }
    }

    #[test]
    fn test_txt_convert_read_error_keeps_converted_lines() {
        let mut reader = FailingReader {
            data: Some(b"ma1\nni3\n"),
        };
        let mut out: Vec<u8> = vec![];
        let result = txt_convert(&mut reader, &mut out, &Settings::default());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert_eq!(String::from_utf8(out).unwrap(), "mā\nnǐ\n");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_for(input: &str, settings: &Settings) -> String {
        let logs = LogBuffer::default();
        let make_writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || make_writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let mut input = input.as_bytes();
            let mut out: Vec<u8> = vec![];
            txt_convert(&mut input, &mut out, settings).unwrap();
        });
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_warn_on_unchanged() {
        let settings = Settings {
            warn_on_unchanged: true,
            ..Settings::default()
        };
        let logs = warnings_for("ma1 sh2 ma5\n", &settings);
        assert_eq!(logs.matches("no tone mark applied").count(), 2);
        assert!(logs.contains("sh2"));
        assert!(logs.contains("ma5"));
        assert!(!logs.contains("ma1"));

        let logs = warnings_for("ma1 sh2 ma5\n", &Settings::default());
        assert!(logs.is_empty());
    }
}
