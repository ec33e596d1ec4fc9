use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// E-mail address, normalized to lower case on parsing
#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email)] String);

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.trim().to_lowercase());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Public user handle - letters, digits and underscore only
#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidUsername(#[garde(length(min = 3, max = 30), pattern(r"^[a-zA-Z0-9_]+$"))] String);

impl FromStr for ValidUsername {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = ValidUsername(s.trim().to_string());
        name.validate()?;
        Ok(name)
    }
}

impl AsRef<str> for ValidUsername {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
