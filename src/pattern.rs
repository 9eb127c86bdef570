//! Pattern-based file name construction.
//!
//! A pattern is an ordered list of tokens and literal text, written as a
//! template such as `{date}_{prefix}_{name}_{num}`. Recognized placeholders
//! are `{prefix}`, `{name}`, `{suffix}`, `{num}` and `{date}`; anything
//! outside braces is literal text.
//!
//! # Examples
//!
//! ```
//! use bulk_rename::pattern::{Pattern, TokenValues, render_pattern};
//!
//! let pattern: Pattern = "{prefix}{name}{num}".parse().unwrap();
//! let values = TokenValues {
//!     prefix: String::new(),
//!     name: "photo".to_string(),
//!     num: "001".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(render_pattern(pattern.elements(), "_", &values), "photo_001");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::RenameError;
use crate::validator::ILLEGAL_CHARS;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("placeholder regex is valid"));

/// Template used when no pattern is configured.
pub const DEFAULT_PATTERN: &str = "{prefix}{name}{suffix}{num}{date}";

/// One element of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternElement {
    Prefix,
    Name,
    Suffix,
    Number,
    Date,
    Literal(String),
}

impl PatternElement {
    /// Parses a single placeholder such as `{num}`, or takes text literally.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown placeholder.
    pub fn parse(text: &str) -> Result<Self, RenameError> {
        if text.starts_with('{') && text.ends_with('}') {
            return match text {
                "{prefix}" => Ok(Self::Prefix),
                "{name}" => Ok(Self::Name),
                "{suffix}" => Ok(Self::Suffix),
                "{num}" => Ok(Self::Number),
                "{date}" => Ok(Self::Date),
                other => Err(RenameError::InvalidConfig(format!(
                    "unknown placeholder {}",
                    other
                ))),
            };
        }
        Ok(Self::Literal(text.to_string()))
    }

    pub fn is_token(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }
}

impl std::fmt::Display for PatternElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefix => write!(f, "{{prefix}}"),
            Self::Name => write!(f, "{{name}}"),
            Self::Suffix => write!(f, "{{suffix}}"),
            Self::Number => write!(f, "{{num}}"),
            Self::Date => write!(f, "{{date}}"),
            Self::Literal(text) => write!(f, "{}", text),
        }
    }
}

/// An ordered, editable sequence of pattern elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    elements: Vec<PatternElement>,
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            elements: vec![
                PatternElement::Prefix,
                PatternElement::Name,
                PatternElement::Suffix,
                PatternElement::Number,
                PatternElement::Date,
            ],
        }
    }
}

impl Pattern {
    pub fn new(elements: Vec<PatternElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, element: PatternElement) {
        self.elements.push(element);
    }

    /// Inserts at `index`, clamped to the end of the pattern.
    pub fn insert(&mut self, index: usize, element: PatternElement) {
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
    }

    pub fn remove(&mut self, index: usize) -> Option<PatternElement> {
        (index < self.elements.len()).then(|| self.elements.remove(index))
    }

    /// Moves the element at `from` so it ends up at `to`.
    pub fn move_element(&mut self, from: usize, to: usize) -> bool {
        if from >= self.elements.len() || to >= self.elements.len() {
            return false;
        }
        let element = self.elements.remove(from);
        self.elements.insert(to, element);
        true
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        index > 0 && self.move_element(index, index - 1)
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        self.move_element(index, index + 1)
    }

    /// Checks the pattern can produce a file name.
    ///
    /// # Errors
    ///
    /// Rejects empty patterns, patterns of blank literals only, and literal
    /// text containing characters that are illegal in file names.
    pub fn validate(&self) -> Result<(), RenameError> {
        if self.elements.is_empty() {
            return Err(RenameError::InvalidConfig(
                "pattern cannot be empty".to_string(),
            ));
        }

        let meaningful = self.elements.iter().any(|element| match element {
            PatternElement::Literal(text) => !text.trim().is_empty(),
            _ => true,
        });
        if !meaningful {
            return Err(RenameError::InvalidConfig(
                "pattern must contain at least one placeholder or text".to_string(),
            ));
        }

        for element in &self.elements {
            if let PatternElement::Literal(text) = element
                && let Some(c) = text
                    .chars()
                    .find(|c| ILLEGAL_CHARS.contains(c) || c.is_control())
            {
                return Err(RenameError::InvalidConfig(format!(
                    "pattern text '{}' contains invalid character {:?}",
                    text, c
                )));
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for Pattern {
    type Err = RenameError;

    /// Splits a template into placeholders and the literal text between them.
    fn from_str(template: &str) -> Result<Self, Self::Err> {
        let mut elements = Vec::new();
        let mut last_end = 0;

        for placeholder in PLACEHOLDER_RE.find_iter(template) {
            if placeholder.start() > last_end {
                elements.push(PatternElement::Literal(
                    template[last_end..placeholder.start()].to_string(),
                ));
            }
            elements.push(PatternElement::parse(placeholder.as_str())?);
            last_end = placeholder.end();
        }

        if last_end < template.len() {
            elements.push(PatternElement::Literal(template[last_end..].to_string()));
        }

        Ok(Self { elements })
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Pattern {
    type Error = RenameError;

    fn try_from(template: String) -> Result<Self, Self::Error> {
        template.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

/// Resolved values for each placeholder of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenValues {
    pub prefix: String,
    pub name: String,
    pub suffix: String,
    pub num: String,
    pub date: String,
}

impl TokenValues {
    fn resolve<'a>(&'a self, element: &'a PatternElement) -> &'a str {
        match element {
            PatternElement::Prefix => &self.prefix,
            PatternElement::Name => &self.name,
            PatternElement::Suffix => &self.suffix,
            PatternElement::Number => &self.num,
            PatternElement::Date => &self.date,
            PatternElement::Literal(text) => text,
        }
    }
}

/// Literal text made only of separator-like characters.
fn is_delimiter(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| matches!(c, '-' | '_' | ' ' | '.'))
}

struct Segment<'a> {
    text: &'a str,
    token: bool,
}

/// Renders `elements` into a base name.
///
/// Adjacent tokens are joined with `separator`; literal text is inserted
/// verbatim and never wrapped in the separator. Tokens that resolve to an
/// empty string are dropped, together with any delimiter-only literal left
/// dangling by the drop, so an empty token never produces a doubled
/// delimiter or a leading/trailing one.
pub fn render_pattern(elements: &[PatternElement], separator: &str, values: &TokenValues) -> String {
    let mut kept: Vec<Segment<'_>> = Vec::with_capacity(elements.len());
    let mut dropped_since_kept = false;

    for element in elements {
        let text = values.resolve(element);
        let token = element.is_token();

        if token && text.is_empty() {
            dropped_since_kept = true;
            continue;
        }

        if !token && is_delimiter(text) && dropped_since_kept {
            let dangling = kept.last().is_none_or(|prev| !prev.token && is_delimiter(prev.text));
            if dangling {
                continue;
            }
        }

        kept.push(Segment { text, token });
        dropped_since_kept = false;
    }

    if dropped_since_kept {
        while kept
            .last()
            .is_some_and(|last| !last.token && is_delimiter(last.text))
        {
            kept.pop();
        }
    }

    let mut out = String::new();
    let mut previous_was_token = false;
    for segment in &kept {
        if segment.token && previous_was_token {
            out.push_str(separator);
        }
        out.push_str(segment.text);
        previous_was_token = segment.token;
    }
    out
}
