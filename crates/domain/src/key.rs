//! Attribute keys: parsing of the external key strings used by `get`,
//! `set` and `on`.
//!
//! | Key string | Parsed as |
//! |------------|-----------|
//! | `brightness` | [`Key::ByCode`] |
//! | `:brightness` | [`Key::ByPurpose`] (`iot-purpose:brightness`) |
//! | `iot-purpose:brightness` | [`Key::ByPurpose`] |
//! | `lamp/:on` | [`Key::Path`] into sub-entity `lamp` |

use std::fmt;

use crate::attribute::canonical_purpose;

/// Separator between sub-entity codes and the final attribute segment.
pub const PATH_SEPARATOR: char = '/';

/// Why a key is being resolved; drives role disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Get,
    Set,
    On,
}

/// A parsed attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ByCode(String),
    ByPurpose(String),
    /// Descend through the named sub-entities, then resolve the inner key.
    Path(Vec<String>, Box<Key>),
}

impl Key {
    /// Parse an external key string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(PATH_SEPARATOR) {
            Some((prefix, last)) => {
                let segments = prefix
                    .split(PATH_SEPARATOR)
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                let inner = Self::parse_segment(last);
                if segments.is_empty() {
                    inner
                } else {
                    Self::Path(segments, Box::new(inner))
                }
            }
            None => Self::parse_segment(raw),
        }
    }

    fn parse_segment(segment: &str) -> Self {
        if segment.contains(':') {
            Self::ByPurpose(canonical_purpose(segment))
        } else {
            Self::ByCode(segment.to_string())
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByCode(code) => f.write_str(code),
            Self::ByPurpose(purpose) => f.write_str(purpose),
            Self::Path(segments, inner) => {
                for segment in segments {
                    write!(f, "{segment}{PATH_SEPARATOR}")?;
                }
                inner.fmt(f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_plain_key_as_code() {
        assert_eq!(Key::parse("on"), Key::ByCode("on".to_string()));
    }

    #[test]
    fn should_parse_sigil_key_as_purpose() {
        assert_eq!(
            Key::parse(":on"),
            Key::ByPurpose("iot-purpose:on".to_string())
        );
    }

    #[test]
    fn should_parse_namespaced_key_as_purpose() {
        assert_eq!(
            Key::parse("iot-purpose:temperature"),
            Key::ByPurpose("iot-purpose:temperature".to_string())
        );
    }

    #[test]
    fn should_parse_path_into_subentities() {
        assert_eq!(
            Key::parse("lamp/bulb/:on"),
            Key::Path(
                vec!["lamp".to_string(), "bulb".to_string()],
                Box::new(Key::ByPurpose("iot-purpose:on".to_string()))
            )
        );
    }

    #[test]
    fn should_ignore_leading_separator() {
        assert_eq!(Key::parse("/on"), Key::ByCode("on".to_string()));
    }

    #[test]
    fn should_display_path_back_as_key_string() {
        assert_eq!(Key::parse("lamp/on").to_string(), "lamp/on");
    }
}
