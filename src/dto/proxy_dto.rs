use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

pub const METHOD_REGISTER_WEBHOOK: &str = "registerWebhook";
pub const METHOD_TRIGGER_WEBHOOKS: &str = "triggerWebhooks";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRequest {
    /// Not used for routing by the webhook methods.
    #[serde(default)]
    pub entity: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: JsonValue,
}

impl ProxyRequest {
    /// Absent or null params decode as an empty object so that missing
    /// fields surface as validation errors rather than type errors.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        let params = match &self.params {
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other.clone(),
        };
        Ok(serde_json::from_value(params)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,
    pub data: JsonValue,
}

impl ProxyResponse {
    pub fn ok<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            success: true,
            data: serde_json::to_value(data)?,
        })
    }
}
