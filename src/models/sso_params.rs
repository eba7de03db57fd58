//! Flat key/value set exchanged between a website and the broker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SsoError};
use crate::models::settings::{SSO_REQUIRED, SSO_SIGNATURE};

/// SSO request parameters.
///
/// Values are JSON scalars; `Value::Null` is a nil value and behaves exactly like an absent key
/// for signing. Keys are kept sorted, which is the order the canonical message uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SsoParams {
    params: BTreeMap<String, Value>,
}

impl SsoParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Rendered value of a non-nil key.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.params.get(key).and_then(render_value)
    }

    pub fn signature(&self) -> Option<String> {
        self.get_str(SSO_SIGNATURE).filter(|s| !s.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_present(&self, key: &str) -> bool {
        self.get_str(key).is_some_and(|v| !v.is_empty())
    }

    pub fn required_present(&self) -> bool {
        match SSO_REQUIRED.iter().copied().find(|k| !self.is_present(k)) {
            Some(missing) => {
                warn!(
                    missing = %missing,
                    required = %SSO_REQUIRED.join(", "),
                    "missing parameter required for SSO"
                );
                false
            }
            None => true,
        }
    }

    pub fn validate(&self) -> Result<&Self> {
        match SSO_REQUIRED.iter().copied().find(|k| !self.is_present(k)) {
            Some(missing) => Err(SsoError::MissingField(missing)),
            None => Ok(self),
        }
    }

    /// Broker URL carrying every non-nil parameter as a query pair.
    pub fn redirect_url(&self, base: &str) -> std::result::Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(base)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                if let Some(rendered) = render_value(value) {
                    query.append_pair(key, &rendered);
                }
            }
        }
        Ok(url)
    }
}

impl FromIterator<(String, Value)> for SsoParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// Scalar rendering used for signing and URLs; `None` for nil.
pub(crate) fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
