//! The verdict enum and its text codec.
//!
//! `NoMatch` is the sentinel meaning "this filter/rule did not apply"; it is
//! never returned to a caller outside the engine as a final verdict — the
//! engine substitutes the configuration's `default_action` instead.

use crate::error::ConfigError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoMatch,
    Accept,
    Reject,
    Virus,
    Phishing,
    Malware,
    AlwaysTrust,
}

impl Action {
    pub fn from_text(s: &str) -> Result<Self, ConfigError> {
        match s {
            "nomatch" => Ok(Action::NoMatch),
            "accept" => Ok(Action::Accept),
            "reject" => Ok(Action::Reject),
            "virus" => Ok(Action::Virus),
            "phishing" => Ok(Action::Phishing),
            "malware" => Ok(Action::Malware),
            "always_trust" => Ok(Action::AlwaysTrust),
            other => Err(ConfigError::UnknownAction(other.to_string())),
        }
    }

    pub fn to_text(self) -> &'static str {
        match self {
            Action::NoMatch => "nomatch",
            Action::Accept => "accept",
            Action::Reject => "reject",
            Action::Virus => "virus",
            Action::Phishing => "phishing",
            Action::Malware => "malware",
            Action::AlwaysTrust => "always_trust",
        }
    }

    #[inline]
    pub fn is_match(self) -> bool {
        !matches!(self, Action::NoMatch)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

impl serde::Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_text())
    }
}

impl<'de> serde::Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Action::from_text(&s).map_err(serde::de::Error::custom)
    }
}
