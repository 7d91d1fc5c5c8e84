use std::collections::BTreeSet;

use reqwest::Url;
use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

fn default_path() -> String {
    "/agent".to_string()
}

fn default_trial_limit() -> usize {
    16
}

/// Agent is the protocol side of the daemon: what peers see and how inbound envelopes
/// are routed
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Agent {
    pub(super) endpoint: String,

    #[serde(default = "default_path")]
    pub(super) path: String,

    #[serde(default)]
    pub(super) nym_always: bool,

    #[serde(default = "default_trial_limit")]
    pub(super) trial_limit: usize,

    #[serde(default)]
    pub(super) tenants: Vec<String>,
}

impl Agent {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn with_tenants(mut self, tenants: Vec<String>) -> Self {
        self.tenants = tenants;
        self
    }

    /// get_endpoint is the service endpoint advertised in invitations and DID documents
    pub fn get_endpoint(&self) -> String {
        self.endpoint.to_owned()
    }

    pub fn get_path(&self) -> String {
        self.path.to_owned()
    }

    pub fn get_nym_always(&self) -> bool {
        self.nym_always
    }

    pub fn get_trial_limit(&self) -> usize {
        self.trial_limit
    }

    pub fn get_tenants(&self) -> Vec<String> {
        self.tenants.to_owned()
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            endpoint: "".to_string(),
            path: default_path(),
            nym_always: false,
            trial_limit: default_trial_limit(),
            tenants: Vec::new(),
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        if self.endpoint.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:endpoint is missing".to_string(),
            ));
        }

        let endpoint = Url::parse(&self.endpoint).map_err(|err| {
            CommonError::ValidationError(format!(
                "config: agent:endpoint is not a valid url: {}: {}",
                self.endpoint, err
            ))
        })?;

        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(CommonError::ValidationError(format!(
                "config: agent:endpoint must be an http(s) url: {}",
                self.endpoint
            )));
        }

        if endpoint.host_str().map_or(true, str::is_empty) {
            return Err(CommonError::ValidationError(format!(
                "config: agent:endpoint has no host: {}",
                self.endpoint
            )));
        }

        if !self.path.starts_with('/') {
            return Err(CommonError::ValidationError(format!(
                "config: agent:path must start with '/': {}",
                self.path
            )));
        }

        if self.trial_limit == 0 {
            return Err(CommonError::ValidationError(
                "config: agent:trial_limit must be positive".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for tenant in &self.tenants {
            if tenant.is_empty() || !names.insert(tenant.as_str()) {
                return Err(CommonError::ValidationError(format!(
                    "config: agent:tenants has an empty or duplicated name: '{}'",
                    tenant
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    use rstdev_config::format::use_toml;
    use rstdev_config::parser::from_file;
    use rstdev_config::{types::ConfigError, Builder};
    use table_test::table_test;

    use crate::common::helpers;

    #[test]
    fn test_parse_agent_config() -> Result<(), ConfigError> {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        let toml_file = format!("{}/config_agent.toml", path.display());
        let config_agent: Agent = Builder::new(from_file(toml_file)).fetch()?.parse(use_toml)?;

        assert_eq!(config_agent.endpoint, "http://localhost:8181/agent");
        assert_eq!(config_agent.path, "/agent");
        assert!(config_agent.nym_always);
        assert_eq!(config_agent.trial_limit, 8);
        assert_eq!(config_agent.tenants, vec!["alice", "bob"]);
        Ok(())
    }

    #[test]
    fn test_agent_validation() {
        let table = vec![
            (("", "/agent", 16, vec!["alice"]), Some("agent:endpoint is missing")),
            (("ws://host", "/agent", 16, vec![]), Some("http(s) url")),
            (("http://", "/agent", 16, vec![]), Some("not a valid url")),
            (("http://bad host", "/agent", 16, vec![]), Some("not a valid url")),
            (("host/agent", "/agent", 16, vec![]), Some("not a valid url")),
            (("http://host", "agent", 16, vec![]), Some("agent:path")),
            (("http://host", "/agent", 0, vec![]), Some("agent:trial_limit")),
            (("http://host", "/agent", 16, vec!["a", "a"]), Some("agent:tenants")),
            (("http://host", "/agent", 16, vec![""]), Some("agent:tenants")),
            (("https://host", "/agent", 1, vec!["a", "b"]), None),
        ];

        for (validator, input, expected) in table_test!(table) {
            let (endpoint, path, trial_limit, tenants) = input;
            let agent = Agent {
                endpoint: endpoint.to_string(),
                path: path.to_string(),
                nym_always: false,
                trial_limit,
                tenants: tenants.iter().map(|name| name.to_string()).collect(),
            };

            let failure = helpers::validate(agent).err().map(|err| err.to_string());

            validator
                .given(endpoint)
                .when("validate agent config")
                .then("reports the offending field")
                .assert_eq(
                    expected.is_some(),
                    failure
                        .as_deref()
                        .is_some_and(|msg| msg.contains(expected.unwrap_or_default())),
                );
        }
    }
}
