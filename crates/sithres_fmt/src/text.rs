//! Repeated pattern matching over structured text documents.
//!
//! The engine's level files are line-oriented text. A [`TextPattern`] pairs
//! a regular expression with an ordered list of capture-group bindings;
//! [`TextPattern::matches`] applies it repeatedly over a document, left to
//! right without overlap, and yields one [`TextMatch`] per hit. A group may
//! be bound to a nested pattern, in which case its captured text is matched
//! through that pattern recursively and the nested results stored in its
//! place.

use crate::DecodeError;
use regex::Regex;

/// A compiled pattern plus its group bindings. Stateless; one instance can
/// scan any number of documents.
pub struct TextPattern {
    regex: Regex,
    groups: Vec<GroupSpec>,
}

struct GroupSpec {
    name: Option<String>,
    sub: Option<TextPattern>,
}

/// One capture group's content: plain text, or the matches produced by the
/// group's bound sub-pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValue {
    Text(String),
    Nested(Vec<TextMatch>),
}

impl GroupValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GroupValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&[TextMatch]> {
        match self {
            GroupValue::Nested(v) => Some(v),
            _ => None,
        }
    }
}

/// A single match: the full matched text plus every capture group, reachable
/// by position and, for named groups, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    full: String,
    groups: Vec<(Option<String>, GroupValue)>,
}

impl TextMatch {
    /// The full matched text (capture group 0).
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Capture group by position, zero-based over the declared bindings.
    pub fn at(&self, index: usize) -> Option<&GroupValue> {
        self.groups.get(index).map(|(_, v)| v)
    }

    /// Capture group by bound name.
    pub fn get(&self, name: &str) -> Option<&GroupValue> {
        self.groups
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }

    /// Named group as plain text.
    pub fn text(&self, name: &str) -> Result<&str, DecodeError> {
        self.get(name)
            .ok_or_else(|| DecodeError::MissingField(name.into()))?
            .as_text()
            .ok_or(DecodeError::TypeMismatch {
                field: name.into(),
                expected: "captured text",
            })
    }

    /// Named group as the matches of its bound sub-pattern.
    pub fn nested(&self, name: &str) -> Result<&[TextMatch], DecodeError> {
        self.get(name)
            .ok_or_else(|| DecodeError::MissingField(name.into()))?
            .as_nested()
            .ok_or(DecodeError::TypeMismatch {
                field: name.into(),
                expected: "nested matches",
            })
    }
}

/// Chained construction of a [`TextPattern`]; group declarations are
/// positional and must line up with the expression's capture groups.
pub struct TextPatternBuilder {
    pattern: String,
    groups: Vec<GroupSpec>,
}

impl TextPattern {
    pub fn builder(pattern: impl Into<String>) -> TextPatternBuilder {
        TextPatternBuilder {
            pattern: pattern.into(),
            groups: Vec::new(),
        }
    }

    /// Collects every non-overlapping match in `data`, scanning forward from
    /// the end of the previous match. A zero-width match advances the scan
    /// by one character so the loop always terminates. The first failing
    /// sub-pattern aborts the whole scan.
    pub fn matches(&self, data: &str) -> Result<Vec<TextMatch>, DecodeError> {
        let mut result = Vec::new();
        let mut at = 0;

        while at <= data.len() {
            let Some(caps) = self.regex.captures_at(data, at) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };

            let mut groups = Vec::with_capacity(self.groups.len());
            for (i, spec) in self.groups.iter().enumerate() {
                let captured = caps.get(i + 1).map(|g| g.as_str()).unwrap_or("");
                let value = match &spec.sub {
                    Some(sub) => GroupValue::Nested(sub.matches(captured)?),
                    None => GroupValue::Text(captured.to_owned()),
                };
                groups.push((spec.name.clone(), value));
            }

            result.push(TextMatch {
                full: whole.as_str().to_owned(),
                groups,
            });

            at = if whole.end() > whole.start() {
                whole.end()
            } else {
                // zero-width match; step over the next character
                match data[whole.end()..].chars().next() {
                    Some(c) => whole.end() + c.len_utf8(),
                    None => break,
                }
            };
        }

        Ok(result)
    }
}

impl TextPatternBuilder {
    /// Declares the next capture group, reachable positionally only.
    pub fn group(mut self) -> Self {
        self.groups.push(GroupSpec {
            name: None,
            sub: None,
        });
        self
    }

    /// Declares the next capture group under a name.
    pub fn named(mut self, name: &str) -> Self {
        self.groups.push(GroupSpec {
            name: Some(name.into()),
            sub: None,
        });
        self
    }

    /// Declares the next capture group with a bound sub-pattern; the group's
    /// captured text is matched through it recursively.
    pub fn nested(mut self, name: &str, sub: TextPattern) -> Self {
        self.groups.push(GroupSpec {
            name: Some(name.into()),
            sub: Some(sub),
        });
        self
    }

    pub fn build(self) -> Result<TextPattern, DecodeError> {
        Ok(TextPattern {
            regex: Regex::new(&self.pattern)?,
            groups: self.groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_successive_matches_in_order() {
        let pattern = TextPattern::builder(r"(\w+)=(\d+)")
            .named("key")
            .named("value")
            .build()
            .unwrap();

        let found = pattern.matches("a=1 b=22 c=333").unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].full(), "a=1");
        assert_eq!(found[1].text("key").unwrap(), "b");
        assert_eq!(found[1].text("value").unwrap(), "22");
        // positional access mirrors the declared order
        assert_eq!(found[2].at(0).unwrap().as_text(), Some("c"));
        assert_eq!(found[2].at(1).unwrap().as_text(), Some("333"));
    }

    #[test]
    fn nested_sub_pattern_reparses_the_captured_text() {
        let pair = TextPattern::builder(r"(\d+),(\d+)")
            .named("left")
            .named("right")
            .build()
            .unwrap();
        let row = TextPattern::builder(r"(\d+):\s+((?:\d+,\d+\s*)+)")
            .named("index")
            .nested("pairs", pair)
            .build()
            .unwrap();

        let found = row.matches("0:  1,2 3,4\n1:  5,6\n").unwrap();
        assert_eq!(found.len(), 2);

        let pairs = found[0].nested("pairs").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].text("left").unwrap(), "3");
        assert_eq!(pairs[1].text("right").unwrap(), "4");

        assert_eq!(found[1].nested("pairs").unwrap().len(), 1);
    }

    #[test]
    fn zero_width_matches_terminate() {
        let pattern = TextPattern::builder(r"(\d*)").group().build().unwrap();
        // every position yields a (possibly empty) match; the scan must not spin
        let found = pattern.matches("ab12").unwrap();
        assert!(found.iter().any(|m| m.full() == "12"));
    }

    #[test]
    fn unnamed_groups_have_no_name_lookup() {
        let pattern = TextPattern::builder(r"(\d+)").group().build().unwrap();
        let found = pattern.matches("42").unwrap();
        assert_eq!(found[0].at(0).unwrap().as_text(), Some("42"));
        assert!(found[0].get("anything").is_none());
    }
}
