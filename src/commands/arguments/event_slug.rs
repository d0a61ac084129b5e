use std::{fmt::Display, str::FromStr};

use crate::commands::CommandError;

use super::super::user_err;

const MAX_SLUG_LENGTH: usize = 64;

/// The name of an event in commands.
pub struct EventSlug(String);

impl FromStr for EventSlug {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let is_valid = !s.is_empty()
            && s.len() <= MAX_SLUG_LENGTH
            && s.chars()
                .all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_'));

        if is_valid {
            Ok(EventSlug(s.to_string()))
        } else {
            Err(user_err(format!("Invalid event slug: `{}`.\nIt must be 1 to {MAX_SLUG_LENGTH} characters long and can only contain a-z, A-Z, 0-9, a dash (-) or an underscore (_).", s.escape_default())))
        }
    }
}

impl Display for EventSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
