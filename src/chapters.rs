//! Derivation of a chapter list from a [`MediaSource`].
//!
//! Chapters either come from the records the provider lists, or are parsed from the
//! free-text description, one chapter per line holding a timestamp:
//!
//! ```text
//! 0:00 Intro
//! (1:23) Verse One
//! Bonus - 1:02:03
//! ```

use std::{fmt::Display, sync::OnceLock};

use regex::Regex;

use crate::types::{ChapterRecord, ChapterTime, Chapters, MediaSource};

/// An optional opening parenthesis
macro_rules! opt_open {
    () => {
        r#"\(?"#
    };
}
/// Colon separated digit groups. The group count is validated by [`parse_timestamp`]
macro_rules! clock {
    () => {
        r#"(?P<time>[0-9]+(?::[0-9]+)+)"#
    };
}
/// An optional closing parenthesis
macro_rules! opt_close {
    () => {
        r#"\)?"#
    };
}
/// Example: "(1:23)", "01:02:03", "4:05"
const TOKEN_PATTERN: &str = concat!(opt_open!(), clock!(), opt_close!());

/// Characters surrounding a title that only separate it from its timestamp
const TITLE_SEPARATORS: &[char] = &[':', '-', '–', '—', '|'];

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("timestamp pattern is valid"))
}

/// Where the chapters of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterSource {
    /// Records listed by the stream provider
    Structured,
    /// Timestamps parsed from the description
    Description,
    /// Neither source gave a chapter
    None,
}

impl Display for ChapterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChapterSource::Structured => "structured",
            ChapterSource::Description => "description",
            ChapterSource::None => "none",
        };
        f.write_str(s)
    }
}

/// Prefer the provider chapter records, fall back to parsing the description
pub fn derive_chapters(source: &MediaSource) -> (ChapterSource, Chapters) {
    if !source.chapters().is_empty() {
        return (ChapterSource::Structured, from_records(source.chapters()));
    }

    let chapters = from_description(source.description());
    if chapters.is_empty() {
        (ChapterSource::None, chapters)
    } else {
        (ChapterSource::Description, chapters)
    }
}

pub fn from_records(records: &[ChapterRecord]) -> Chapters {
    Chapters::numbered(
        records
            .iter()
            .map(|record| (record.start.clone(), record.title.clone())),
    )
}

/// Parse one chapter per description line containing a timestamp.
///
/// Lines without a valid timestamp are skipped and do not consume an ordinal.
pub fn from_description(description: &str) -> Chapters {
    Chapters::numbered(
        description
            .lines()
            .filter_map(parse_line)
            .map(|(time, title)| (time.to_string(), title)),
    )
}

/// Extract the first timestamp token of the line and the title around it
fn parse_line(line: &str) -> Option<(ChapterTime, String)> {
    let cap = token_regex().captures(line)?;
    let time = parse_timestamp(cap.name("time")?.as_str())?;

    let token = cap.get(0)?;
    let before = trim_trailing_separators(&line[..token.start()]).trim_start();
    let after = trim_leading_separators(&line[token.end()..])
        .trim_end_matches(|c: char| c.is_whitespace() || c == ':');

    let title = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{before} {after}"),
        (true, _) => after.to_owned(),
        (false, true) => before.to_owned(),
    };

    Some((time, title))
}

/// Drop the separators following a timestamp, e.g. `" - Intro"` -> `"Intro"`.
///
/// A separator is only dropped when it stands alone, so `"-5 Degrees"` is kept whole.
fn trim_leading_separators(s: &str) -> &str {
    let mut s = s.trim_start();
    while let Some(rest) = s.strip_prefix(TITLE_SEPARATORS) {
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            break;
        }
        s = rest.trim_start();
    }
    s
}

/// Drop the separators preceding a timestamp, e.g. `"Bonus - "` -> `"Bonus"`.
///
/// Colons are always dropped, other separators only when they stand alone.
fn trim_trailing_separators(s: &str) -> &str {
    let mut s = s.trim_end();
    while let Some(c) = s.chars().next_back() {
        let rest = &s[..s.len() - c.len_utf8()];
        let standalone = c == ':' || rest.is_empty() || rest.ends_with(char::is_whitespace);
        if !TITLE_SEPARATORS.contains(&c) || !standalone {
            break;
        }
        s = rest.trim_end();
    }
    s
}

/// Parse `H:MM:SS` or `MM:SS`, each field being one or two digits.
///
/// Three groups are read as hours, minutes and seconds (hours up to 23), two groups as
/// minutes and seconds. Any other group count, or a field out of range, is rejected.
pub fn parse_timestamp(token: &str) -> Option<ChapterTime> {
    let field = |s: &str| -> Option<u32> {
        if (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };

    match token.split(':').collect::<Vec<_>>().as_slice() {
        [h, m, s] => {
            let hours = field(h).filter(|&h| h <= 23)?;
            ChapterTime::new(hours, field(m)?, field(s)?)
        }
        [m, s] => ChapterTime::new(0, field(m)?, field(s)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{derive_chapters, from_description, from_records, parse_timestamp, ChapterSource};
    use crate::types::{ChapterRecord, MediaSource};

    fn triples(description: &str) -> Vec<(String, String, String)> {
        from_description(description)
            .iter()
            .map(|c| (c.label(), c.position.clone(), c.title.clone()))
            .collect()
    }

    fn t(ord: &str, pos: &str, title: &str) -> (String, String, String) {
        (ord.to_owned(), pos.to_owned(), title.to_owned())
    }

    #[test]
    fn parses_mixed_description() {
        let chapters = triples("Intro\n0:00 Intro\n1:23 Verse One\nGarbage Line\n12:34:56 Bonus");

        assert_eq!(
            chapters,
            vec![
                t("01", "00:00:00", "Intro"),
                t("02", "00:01:23", "Verse One"),
                t("03", "12:34:56", "Bonus"),
            ]
        );
    }

    #[test]
    fn accepts_parentheses_and_trailing_timestamps() {
        let description = indoc! {"
            Tracklist:
            (0:00) Opening
            Second Song - (03:15)
            Third Song: 1:02:03
            [not a chapter]
        "};

        assert_eq!(
            triples(description),
            vec![
                t("01", "00:00:00", "Opening"),
                t("02", "00:03:15", "Second Song"),
                t("03", "01:02:03", "Third Song"),
            ]
        );
    }

    #[test]
    fn rejected_tokens_consume_no_ordinal() {
        let description = indoc! {"
            1:2:3:4 too many groups
            0:75 bad seconds
            75:00 bad minutes
            24:00:00 bad hours
            123:45 too many digits
            2:30 Kept
        "};

        assert_eq!(triples(description), vec![t("01", "00:02:30", "Kept")]);
    }

    #[test]
    fn handles_crlf_and_duplicate_positions() {
        let chapters = triples("0:10 First\r\n0:10 Same time\r\n");

        assert_eq!(
            chapters,
            vec![t("01", "00:00:10", "First"), t("02", "00:00:10", "Same time")]
        );
    }

    #[test]
    fn only_the_matched_token_is_removed() {
        assert_eq!(
            triples("0:00 Remix of 3:16 Song"),
            vec![t("01", "00:00:00", "Remix of 3:16 Song")]
        );
    }

    #[test]
    fn only_standalone_separators_are_trimmed() {
        let description = indoc! {"
            0:00 -5 Degrees
            0:30 - Intro | 
            1:00 | Live
            Outro-Take 2 - 2:00
            Part 1: 3:00
        "};

        assert_eq!(
            triples(description),
            vec![
                t("01", "00:00:00", "-5 Degrees"),
                t("02", "00:00:30", "Intro |"),
                t("03", "00:01:00", "Live"),
                t("04", "00:02:00", "Outro-Take 2"),
                t("05", "00:03:00", "Part 1"),
            ]
        );
    }

    #[test]
    fn parsing_is_idempotent() {
        let description = "a\n0:01 b\nc 0:02\n";
        assert_eq!(from_description(description), from_description(description));
    }

    #[test]
    fn empty_description_has_no_chapters() {
        assert!(from_description("").is_empty());
        assert!(from_description("no timestamps here\nnor here").is_empty());
    }

    #[test]
    fn timestamp_precedence() {
        assert_eq!(parse_timestamp("1:02:03").unwrap().to_string(), "01:02:03");
        assert_eq!(parse_timestamp("02:03").unwrap().to_string(), "00:02:03");
        assert_eq!(parse_timestamp("2:3").unwrap().to_string(), "00:02:03");
        assert!(parse_timestamp("1:2:3:4").is_none());
        assert!(parse_timestamp("12").is_none());
        assert!(parse_timestamp(":30").is_none());
    }

    #[test]
    fn records_pass_through() {
        let records = vec![
            ChapterRecord {
                start: "00:00:00".into(),
                title: "Start".into(),
            },
            ChapterRecord {
                start: "00:04:10".into(),
                title: "".into(),
            },
        ];

        let chapters = from_records(&records);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].label(), "02");
        assert_eq!(chapters[1].position, "00:04:10");
        assert_eq!(chapters[1].title, "");
    }

    #[test]
    fn structured_records_win_over_description() {
        let source = MediaSource::new(
            "https://example.com/v",
            "title",
            "0:00 From text",
            vec![],
            vec![ChapterRecord {
                start: "00:00:00".into(),
                title: "From records".into(),
            }],
        );

        let (origin, chapters) = derive_chapters(&source);
        assert_eq!(origin, ChapterSource::Structured);
        assert_eq!(chapters[0].title, "From records");
    }

    #[test]
    fn falls_back_to_description_then_none() {
        let source = MediaSource::new("u", "t", "0:00 From text", vec![], vec![]);
        let (origin, chapters) = derive_chapters(&source);
        assert_eq!(origin, ChapterSource::Description);
        assert_eq!(chapters[0].title, "From text");

        let source = MediaSource::new("u", "t", "", vec![], vec![]);
        let (origin, chapters) = derive_chapters(&source);
        assert_eq!(origin, ChapterSource::None);
        assert!(chapters.is_empty());
    }
}
