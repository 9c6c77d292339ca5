//! Topic filters for MqBus
//!
//! A topic is a `/`-separated list of levels. A filter is a topic that may
//! also contain the wildcards `+` (exactly one level) and `#` (all remaining
//! levels, last segment only). Filters without wildcards are concrete topics
//! and are the only ones accepted for publishing or as retained keys.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result, TopicError};

/// Maximum length of a topic string in bytes
pub const MAX_TOPIC_LEN_BYTES: usize = 65_535;

const TOPIC_SEPARATOR: char = '/';
const MULTI_LEVEL_WILDCARD: char = '#';
const MULTI_LEVEL_WILDCARD_STR: &str = "#";
const SINGLE_LEVEL_WILDCARD: char = '+';
const SINGLE_LEVEL_WILDCARD_STR: &str = "+";
const SYSTEM_PREFIX: char = '$';

/// A parsed topic or topic filter
///
/// Equality is structural: two filters are equal when their segment
/// sequences are identical. This is what `unsubscribe` uses, as opposed to
/// [`TopicFilter::matches`] which evaluates wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    segments: Vec<String>,
}

impl TopicFilter {
    /// Parse and validate a topic string.
    pub fn parse(topic: &str) -> Result<Self> {
        validate(topic).map_err(|reason| Error::MalformedTopic {
            topic: topic.to_string(),
            reason,
        })?;

        Ok(Self {
            segments: topic.split(TOPIC_SEPARATOR).map(str::to_string).collect(),
        })
    }

    /// Parse a topic from raw bytes, rejecting invalid UTF-8.
    pub fn parse_bytes(topic: &[u8]) -> Result<Self> {
        match std::str::from_utf8(topic) {
            Ok(topic) => Self::parse(topic),
            Err(_) => Err(Error::MalformedTopic {
                topic: String::from_utf8_lossy(topic).into_owned(),
                reason: TopicError::InvalidUtf8,
            }),
        }
    }

    /// Parse a topic that must not contain wildcards.
    pub fn parse_concrete(topic: &str) -> Result<Self> {
        let filter = Self::parse(topic)?;
        if filter.is_query() {
            return Err(Error::WildcardTopic(topic.to_string()));
        }
        Ok(filter)
    }

    /// The segments of this filter, in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if any segment is a wildcard
    pub fn is_query(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s == SINGLE_LEVEL_WILDCARD_STR || s == MULTI_LEVEL_WILDCARD_STR)
    }

    /// Match this filter against a concrete topic string.
    ///
    /// `#` matches the remaining levels, including none at all, so
    /// `sensors/#` matches `sensors`. `+` consumes exactly one level
    /// whatever its content. A filter starting with a wildcard never
    /// matches a topic whose first level starts with `$`.
    pub fn matches(&self, topic: &str) -> bool {
        let levels: Vec<&str> = topic.split(TOPIC_SEPARATOR).collect();

        if levels[0].starts_with(SYSTEM_PREFIX)
            && self.segments.first().is_some_and(|s| is_wildcard(s))
        {
            return false;
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment.as_str() {
                MULTI_LEVEL_WILDCARD_STR => return true,
                SINGLE_LEVEL_WILDCARD_STR => {
                    if i >= levels.len() {
                        return false;
                    }
                }
                literal => {
                    if levels.get(i) != Some(&literal) {
                        return false;
                    }
                }
            }
        }

        levels.len() == self.segments.len()
    }
}

fn is_wildcard(segment: &str) -> bool {
    segment == SINGLE_LEVEL_WILDCARD_STR || segment == MULTI_LEVEL_WILDCARD_STR
}

fn validate(topic: &str) -> std::result::Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    if topic.len() > MAX_TOPIC_LEN_BYTES {
        return Err(TopicError::TooLong(topic.len()));
    }
    if topic.contains('\0') {
        return Err(TopicError::ContainsNul);
    }

    let mut segments = topic.split(TOPIC_SEPARATOR).peekable();
    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        if segment == MULTI_LEVEL_WILDCARD_STR {
            if !is_last {
                return Err(TopicError::MisplacedMultiLevelWildcard);
            }
        } else if segment != SINGLE_LEVEL_WILDCARD_STR
            && segment.ends_with([MULTI_LEVEL_WILDCARD, SINGLE_LEVEL_WILDCARD])
        {
            // Empty segments are valid, only trailing wildcard characters are not.
            return Err(TopicError::InvalidWildcard(segment.to_string()));
        }
    }

    Ok(())
}

impl FromStr for TopicFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
