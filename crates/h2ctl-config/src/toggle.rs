//! On/off settings that take an explicit value on the command line.
//!
//! A plain `bool` field becomes a presence flag whose absence reads as
//! `false`, which would mask file and environment layers. [`Toggle`] parses
//! like any other valued setting (`--create-if-missing false`), so the
//! command-line layer only contributes when the flag is actually given.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A boolean setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Toggle(bool);

impl Toggle {
    /// The enabled state.
    pub const ON: Self = Self(true);
    /// The disabled state.
    pub const OFF: Self = Self(false);

    /// Whether the setting is enabled.
    #[must_use]
    pub const fn is_on(self) -> bool {
        self.0
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Toggle> for bool {
    fn from(value: Toggle) -> Self {
        value.0
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when text is neither `true` nor `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected `true` or `false`, got `{input}`")]
pub struct ToggleParseError {
    input: String,
}

impl FromStr for Toggle {
    type Err = ToggleParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.eq_ignore_ascii_case("true") {
            Ok(Self::ON)
        } else if input.eq_ignore_ascii_case("false") {
            Ok(Self::OFF)
        } else {
            Err(ToggleParseError {
                input: input.to_owned(),
            })
        }
    }
}
