//! Pattern matching and placeholder substitution.
//!
//! # Responsibilities
//! - Compile handler URL patterns (regex, unanchored search)
//! - Extract capture groups from a request URL
//! - Substitute `\N` placeholders in script/static templates
//!
//! # Design Decisions
//! - Patterns search anywhere in the URL; anchoring is the pattern's job
//! - Placeholders are resolved once at compile time into segments
//! - Non-participating groups substitute as the empty string

use regex::Regex;

use crate::routing::RouteError;

/// A compiled handler URL pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a pattern string.
    pub fn compile(source: &str) -> Result<Self, RouteError> {
        let regex = Regex::new(source).map_err(|e| RouteError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of capture slots, including group 0.
    pub fn group_count(&self) -> usize {
        self.regex.captures_len()
    }

    /// Search `url` for the pattern.
    ///
    /// Returns every capture slot in order; index 0 is the whole match.
    pub fn captures(&self, url: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(url)?;
        Some(
            caps.iter()
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(usize),
}

/// A target template with its placeholders resolved against a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source` for a pattern exposing `group_count` capture slots.
    ///
    /// A placeholder is a backslash followed by digits. The digits are read as
    /// far as they still name an existing group, so with two groups `\10` is
    /// group 1 followed by a literal `0`.
    pub fn parse(source: &str, group_count: usize) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find('\\') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();

            if digits == 0 {
                literal.push('\\');
                rest = after;
                continue;
            }

            let longest_valid = (1..=digits)
                .rev()
                .find(|&len| after[..len].parse::<usize>().is_ok_and(|g| g < group_count));

            let Some(len) = longest_valid else {
                return Err(RouteError::UnknownCapture {
                    template: source.to_string(),
                    group: after[..digits].to_string(),
                    available: group_count.saturating_sub(1),
                });
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            // Digits were validated above.
            let group = after[..len].parse().unwrap_or_default();
            segments.push(Segment::Group(group));
            rest = &after[len..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute captures into the template in a single pass.
    pub fn render(&self, captures: &[String]) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(index) => {
                    if let Some(value) = captures.get(*index) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}
