//! String identifiers for topics, questions and learners.
//!
//! All three serialize as bare JSON strings. Parsing, whether through
//! `FromStr` or serde, trims surrounding whitespace and refuses blank input,
//! so ids from curriculum files or the command line are normalized once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when an id is parsed from an empty or whitespace-only string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cannot be blank", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }
        }
    };
}

string_id! {
    /// Curriculum node id, e.g. `t1`. Prerequisites refer to topics by this.
    TopicId
}

string_id! {
    /// Question bank key. Drafts without one get a fresh v4 UUID.
    QuestionId
}

string_id! {
    LearnerId
}

impl QuestionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_id_display() {
        let id = TopicId::new("t1");
        assert_eq!(id.to_string(), "t1");
    }

    #[test]
    fn test_learner_id_from_str_trims() {
        let id: LearnerId = "  student1 ".parse().unwrap();
        assert_eq!(id, LearnerId::new("student1"));
    }

    #[test]
    fn test_blank_id_is_rejected() {
        let result = "   ".parse::<TopicId>();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "TopicId cannot be blank");
    }

    #[test]
    fn test_generated_question_ids_are_unique() {
        let a = QuestionId::generate();
        let b = QuestionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&TopicId::new("t2")).unwrap();
        assert_eq!(json, "\"t2\"");
    }

    #[test]
    fn test_deserialized_ids_are_trimmed() {
        let id: TopicId = serde_json::from_str("\" t1 \"").unwrap();
        assert_eq!(id, TopicId::new("t1"));

        let err = serde_json::from_str::<LearnerId>("\"   \"").unwrap_err();
        assert!(err.to_string().contains("LearnerId cannot be blank"));
    }
}
