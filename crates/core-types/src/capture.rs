//! Network calls observed while driving the browser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl CapturedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `METHOD url`, the form used in history entries and prompts.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Option<Value>,
}

impl CapturedResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_is_normalized() {
        let request = CapturedRequest::new("get", "https://api.example.com/items");
        assert_eq!(request.label(), "GET https://api.example.com/items");
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let request: CapturedRequest =
            serde_json::from_value(json!({"method": "POST", "url": "https://x"})).unwrap();
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }
}
