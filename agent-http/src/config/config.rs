use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, App, Ledger};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Config {
    pub(super) app: App,
    pub(super) agent: Agent,

    #[serde(default)]
    pub(super) ledger: Ledger,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app: App) -> Self {
        self.app = app;
        self
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agent = agent;
        self
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.app.validate()?;
        self.agent.validate()?;
        self.ledger.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::helpers;
    use crate::common::types::CommonError;

    #[test]
    fn test_validation_failed() {
        let cfg = Config::default();
        let validation = helpers::validate(cfg);
        assert!(validation.is_err());
        assert!(matches!(
            validation.unwrap_err(),
            CommonError::ValidationError(_)
        ))
    }
}
