//! Player identity and the composite key that namespaces persisted progress.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Separator used when composing store keys; forbidden inside ids.
pub(crate) const KEY_SEPARATOR: char = ':';

/// Identity of an authenticated player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw id. Surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let id = raw.as_ref().trim();
        if id.is_empty() {
            return Err(ValidationError::EmptyField("user_id".into()));
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(ValidationError::InvalidValue {
                field: "user_id".into(),
                message: format!("must not contain '{KEY_SEPARATOR}'"),
            });
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `(user, level, session)` triple. Levels and sessions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    user: UserId,
    level: u32,
    session: u32,
}

impl SessionKey {
    pub fn new(user: UserId, level: u32, session: u32) -> Result<Self, ValidationError> {
        check_positive("level", level)?;
        check_positive("session", session)?;
        Ok(Self {
            user,
            level,
            session,
        })
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn session(&self) -> u32 {
        self.session
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/level-{}/session-{}",
            self.user, self.level, self.session
        )
    }
}

pub(crate) fn check_positive(field: &str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::OutOfRange {
            field: field.into(),
            value: 0,
            min: 1,
        });
    }
    Ok(())
}
