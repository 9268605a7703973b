//! Typed menu choices offered by the conversation.
//!
//! The chat keyboard shows [`TrimChoice::label`] and [`AspectRatio::label`],
//! but validity is decided here: a choice is accepted when the text is the
//! label, the bare option number, the number followed by `)`, or one of the
//! option keywords.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Whether to keep the whole video or cut a time range out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrimChoice {
    /// Download the entire video
    Whole,
    /// Trim to a start/end range
    Trim,
}

impl TrimChoice {
    pub const ALL: &'static [TrimChoice] = &[TrimChoice::Whole, TrimChoice::Trim];

    /// Menu position (1-based).
    pub fn number(&self) -> u8 {
        match self {
            TrimChoice::Whole => 1,
            TrimChoice::Trim => 2,
        }
    }

    /// Keyboard label.
    pub fn label(&self) -> &'static str {
        match self {
            TrimChoice::Whole => "1) Download entire video",
            TrimChoice::Trim => "2) Trim video",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrimChoice::Whole => "whole",
            TrimChoice::Trim => "trim",
        }
    }

    fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "whole" | "entire" | "full" | "download" | "download entire video" => {
                Some(TrimChoice::Whole)
            }
            "trim" | "cut" | "trim video" => Some(TrimChoice::Trim),
            _ => None,
        }
    }
}

impl fmt::Display for TrimChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrimChoice {
    type Err = ChoiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, Self::ALL, TrimChoice::number, TrimChoice::from_keyword)
    }
}

/// Target aspect ratio for the delivered clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    /// 4:3
    Traditional,
    /// 21:9
    Ultrawide,
    /// Keep the source frame untouched
    Original,
}

impl AspectRatio {
    /// All choices, in menu order.
    pub const ALL: &'static [AspectRatio] = &[
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Traditional,
        AspectRatio::Ultrawide,
        AspectRatio::Original,
    ];

    /// Menu position (1-based).
    pub fn number(&self) -> u8 {
        match self {
            AspectRatio::Square => 1,
            AspectRatio::Landscape => 2,
            AspectRatio::Portrait => 3,
            AspectRatio::Traditional => 4,
            AspectRatio::Ultrawide => 5,
            AspectRatio::Original => 6,
        }
    }

    /// Keyboard label.
    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1) 1:1 (Square)",
            AspectRatio::Landscape => "2) 16:9 (Landscape)",
            AspectRatio::Portrait => "3) 9:16 (Portrait)",
            AspectRatio::Traditional => "4) 4:3 (Traditional)",
            AspectRatio::Ultrawide => "5) 21:9 (Ultrawide)",
            AspectRatio::Original => "6) Original ratio",
        }
    }

    /// Width:height as an integer pair, `None` for [`AspectRatio::Original`].
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            AspectRatio::Square => Some((1, 1)),
            AspectRatio::Landscape => Some((16, 9)),
            AspectRatio::Portrait => Some((9, 16)),
            AspectRatio::Traditional => Some((4, 3)),
            AspectRatio::Ultrawide => Some((21, 9)),
            AspectRatio::Original => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Traditional => "4:3",
            AspectRatio::Ultrawide => "21:9",
            AspectRatio::Original => "original",
        }
    }

    fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "1:1" | "square" => Some(AspectRatio::Square),
            "16:9" | "landscape" => Some(AspectRatio::Landscape),
            "9:16" | "portrait" | "vertical" => Some(AspectRatio::Portrait),
            "4:3" | "traditional" | "tv" => Some(AspectRatio::Traditional),
            "21:9" | "ultrawide" | "cinema" => Some(AspectRatio::Ultrawide),
            "original" | "original ratio" | "keep" => Some(AspectRatio::Original),
            _ => None,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ChoiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, Self::ALL, AspectRatio::number, AspectRatio::from_keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown choice: {0}")]
pub struct ChoiceParseError(String);

/// Shared parser: `"3"`, `"3)"`, `"3) anything"`, or a keyword.
fn parse_choice<T: Copy>(
    input: &str,
    all: &[T],
    number: impl Fn(&T) -> u8,
    keyword: impl Fn(&str) -> Option<T>,
) -> Result<T, ChoiceParseError> {
    let normalized = input.trim().to_lowercase();

    // An explicit option number decides on its own, even when out of range.
    if let Some(n) = leading_option_number(&normalized) {
        return all
            .iter()
            .find(|c| number(c) == n)
            .copied()
            .ok_or_else(|| ChoiceParseError(input.trim().to_string()));
    }

    // Labels minus their "N) " prefix and trailing "(Name)" are also keywords.
    let bare = normalized
        .split_once(") ")
        .map(|(_, rest)| rest)
        .unwrap_or(&normalized);
    let bare = bare.split(" (").next().unwrap_or(bare).trim();

    keyword(&normalized)
        .or_else(|| keyword(bare))
        .ok_or_else(|| ChoiceParseError(input.trim().to_string()))
}

/// `"2"` and `"2)..."` yield `Some(2)`; `"20"` or `"2x"` do not.
fn leading_option_number(s: &str) -> Option<u8> {
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }
    let rest = &s[digits_end..];
    if !rest.is_empty() && !rest.starts_with(')') {
        return None;
    }
    s[..digits_end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_choice_from_labels() {
        for choice in TrimChoice::ALL {
            assert_eq!(choice.label().parse::<TrimChoice>().unwrap(), *choice);
        }
    }

    #[test]
    fn test_trim_choice_shorthand() {
        assert_eq!("1".parse::<TrimChoice>().unwrap(), TrimChoice::Whole);
        assert_eq!("2)".parse::<TrimChoice>().unwrap(), TrimChoice::Trim);
        assert_eq!("  TRIM ".parse::<TrimChoice>().unwrap(), TrimChoice::Trim);
        assert!("3".parse::<TrimChoice>().is_err());
        assert!("12".parse::<TrimChoice>().is_err());
        assert!("maybe".parse::<TrimChoice>().is_err());
    }

    #[test]
    fn test_aspect_ratio_from_labels() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.label().parse::<AspectRatio>().unwrap(), *ratio);
        }
    }

    #[test]
    fn test_aspect_ratio_keywords() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert_eq!("Square".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert_eq!("6".parse::<AspectRatio>().unwrap(), AspectRatio::Original);
        assert!("7) 32:9".parse::<AspectRatio>().is_err());
        assert!("".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_out_of_range_number_is_not_rescued_by_keyword() {
        assert!("7) 9:16".parse::<AspectRatio>().is_err());
        assert!("0) square".parse::<AspectRatio>().is_err());
        assert!("3) Trim video".parse::<TrimChoice>().is_err());
    }

    #[test]
    fn test_aspect_ratio_values() {
        assert_eq!(AspectRatio::Square.dimensions(), Some((1, 1)));
        assert_eq!(AspectRatio::Original.dimensions(), None);
        assert_eq!(AspectRatio::Ultrawide.dimensions(), Some((21, 9)));
    }
}
