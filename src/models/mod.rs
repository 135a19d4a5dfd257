pub mod subtask;
pub mod todo;
pub mod user;

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Longest title accepted for todos and subtasks (`varchar(255)`).
pub const TITLE_MAX_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Generates the wire-token conversions shared by the status and priority enums.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($token => Ok($name::$variant),)+
                    other => Err($crate::models::ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

/// Current time at the precision PostgreSQL stores (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a mutation of a row last touched at `previous`.
///
/// Always strictly later than `previous`, even when the clock has not moved
/// past it.
pub fn next_update(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Trims a title and checks it is non-empty and within [`TITLE_MAX_LEN`].
pub fn validate_title(title: Option<&str>, missing: &str) -> Result<String, ValidationError> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ValidationError::new(missing));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::new(format!(
            "Title must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

/// Lets a PATCH body tell an omitted field (`None`) from an explicit `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_update_is_strictly_monotonic() {
        let future = now() + Duration::seconds(30);
        assert_eq!(next_update(future), future + Duration::microseconds(1));

        let past = now() - Duration::seconds(30);
        assert!(next_update(past) > past);
    }

    #[test]
    fn validate_title_trims_and_rejects_blank() {
        assert_eq!(validate_title(Some("  Ship it "), "Title is required").unwrap(), "Ship it");
        assert_eq!(
            validate_title(Some("   "), "Title is required"),
            Err(ValidationError::new("Title is required"))
        );
        assert!(validate_title(None, "Title is required").is_err());
        assert!(validate_title(Some(&"x".repeat(256)), "Title is required").is_err());
    }
}
