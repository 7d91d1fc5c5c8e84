use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

/// Ledger is the read retry policy applied around the ledger client
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Ledger {
    pub(super) retry_attempts: u32,
    pub(super) retry_backoff_ms: u64,
}

impl Ledger {
    pub fn get_retry_policy(&self) -> (u32, Duration) {
        (
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl ToValidate for Ledger {
    fn validate(&self) -> Result<(), CommonError> {
        if self.retry_attempts == 0 {
            return Err(CommonError::ValidationError(
                "config: ledger:retry_attempts must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
