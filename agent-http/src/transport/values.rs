use reqwest::Client;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_logging::log::debug;

use prople_agent_core::credential::{CredentialError, ValueSource};

/// HttpValueSource pulls credential values with a GET on the offer's value location, the
/// answer must be a JSON object
#[derive(Clone)]
pub struct HttpValueSource {
    client: Client,
}

impl HttpValueSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpValueSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueSource for HttpValueSource {
    async fn fetch(&self, location: &str) -> Result<Map<String, Value>, CredentialError> {
        debug!("fetching credential values: {}", location);

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|err| CredentialError::ValueSourceError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::ValueSourceError(format!(
                "{} answered {}",
                location, status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| CredentialError::ValueSourceError(err.to_string()))?;

        match body {
            Value::Object(values) => Ok(values),
            _ => Err(CredentialError::ValueSourceError(format!(
                "{} did not answer a json object",
                location
            ))),
        }
    }
}
