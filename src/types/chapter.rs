use std::{fmt::Display, ops::Deref};

/// A position in a video, rendered as `HH:MM:SS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChapterTime {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
}

impl ChapterTime {
    /// Build a time from its fields, rejecting out of range minutes and seconds
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Option<Self> {
        if minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self {
            hours,
            minutes: minutes as u8,
            seconds: seconds as u8,
        })
    }

    /// Fractional seconds are truncated
    pub fn from_seconds(secs: f64) -> Self {
        let total = if secs.is_finite() && secs > 0.0 {
            secs as u64
        } else {
            0
        };
        Self {
            hours: (total / 3600) as u32,
            minutes: (total / 60 % 60) as u8,
            seconds: (total % 60) as u8,
        }
    }
}

impl Display for ChapterTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    /// 1-based, in discovery order
    pub ordinal: usize,
    pub position: String,
    pub title: String,
}

impl ChapterEntry {
    /// The ordinal zero-padded to two digits, e.g. "01"
    pub fn label(&self) -> String {
        format!("{:02}", self.ordinal)
    }
}

impl Display for ChapterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:>8} - {}", self.label(), self.position, self.title)
    }
}

/// An ordered chapter list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapters(Vec<ChapterEntry>);

impl Chapters {
    /// Number the (position, title) pairs in the order they are given
    pub fn numbered<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (position, title))| ChapterEntry {
                ordinal: idx + 1,
                position,
                title,
            })
            .collect();
        Self(entries)
    }

    /// Render the OGM chapters file understood by `MP4Box -chap`
    pub fn to_ogm(&self) -> String {
        let mut out = String::new();
        for chapter in &self.0 {
            let label = chapter.label();
            out.push_str(&format!("CHAPTER{label}={}\n", chapter.position));
            out.push_str(&format!("CHAPTER{label}NAME={}\n", chapter.title));
        }
        out
    }
}

impl Deref for Chapters {
    type Target = Vec<ChapterEntry>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Chapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[")?;
        for v in self.0.iter() {
            writeln!(f, "\t{v}")?;
        }
        writeln!(f, "]")?;
        Ok(())
    }
}
