/*
Token Format

A line of input is a sequence of whitespace runs and tokens. Whitespace is kept verbatim.
A token is classified as follows:

numbered_syllable = letter {letter} digit
letter = ASCII letter (including the placeholder v) | "ü" | "Ü"
digit = "0" | ... | "9"

Any other token (punctuation, several tone digits, no tone digit) is raw and is copied
to the output unchanged. Tokens are never split into several syllables, "ni3hao3" is raw.
*/

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till1, take_while1},
    character::complete::satisfy,
    combinator::{all_consuming, map_opt},
    multi::many0,
    sequence::pair,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token<'a> {
    Space(&'a str),
    Numbered {
        raw: &'a str,
        syllable: &'a str,
        tone: i32,
    },
    Raw(&'a str),
}

impl<'a> Token<'a> {
    /// Source text of the token.
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Space(s) | Token::Raw(s) | Token::Numbered { raw: s, .. } => *s,
        }
    }
}

fn parse_tone_digit(input: &str) -> IResult<&str, i32> {
    map_opt(satisfy(|c: char| c.is_ascii_digit()), |c| {
        c.to_digit(10).and_then(|d| i32::try_from(d).ok())
    })
    .parse(input)
}

fn is_syllable_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == 'ü' || c == 'Ü'
}

fn parse_numbered_syllable(token: &str) -> IResult<&str, (&str, i32)> {
    all_consuming(pair(
        take_while1(is_syllable_letter),
        parse_tone_digit,
    ))
    .parse(token)
}

/// Classifies a single token without whitespace.
pub fn parse_token(token: &str) -> Token<'_> {
    match parse_numbered_syllable(token) {
        Ok((_remainder, (syllable, tone))) => Token::Numbered {
            raw: token,
            syllable,
            tone,
        },
        Err(_) => Token::Raw(token),
    }
}

fn parse_pieces(line: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(many0(alt((
        take_while1(char::is_whitespace),
        take_till1(char::is_whitespace),
    ))))
    .parse(line)
}

/// Splits a line into whitespace runs and classified tokens. Concatenating
/// the raw text of all returned tokens gives back the line.
pub fn split_line(line: &str) -> Vec<Token<'_>> {
    let pieces = match parse_pieces(line) {
        Ok((_remainder, pieces)) => pieces,
        Err(_) => return vec![Token::Raw(line)],
    };
    pieces
        .into_iter()
        .map(|piece| {
            if piece.starts_with(char::is_whitespace) {
                Token::Space(piece)
            } else {
                parse_token(piece)
            }
        })
        .collect()
}
