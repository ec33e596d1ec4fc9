use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Claim carried by API tokens, identifies the calling user
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiClaim {
    pub sub: String,
    pub username: String,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim with no validity set - validity is given when token is issued
    pub fn new_expired(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            sub: user_id.to_string(),
            username: username.into(),
            exp: 0,
        }
    }

    /// Id of user, if subject is not numeric the claim cannot belong to a local user
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = unix_secs(until);
    }
}
