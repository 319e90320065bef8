//! Execution context shared by the actions of one recovery attempt.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Context passed to every handler in a workflow, in action order.
///
/// Keys are handler-specific (`pid`, `package`, `file_path`, ...) and are
/// not validated by the executor; each handler guards against the keys it
/// needs being absent. Handlers may also write values for later actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionContext {
    pub card_id: String,
    pub stage_name: Option<String>,
    pub data: HashMap<String, serde_json::Value>,
}

impl ActionContext {
    pub fn new(card_id: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            stage_name: None,
            data: HashMap::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage_name = Some(stage.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(|v| v.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let ctx = ActionContext::new("card-1")
            .with_stage("development")
            .with_value("pid", serde_json::json!(4242))
            .with_value("package", serde_json::json!("requests"));

        assert_eq!(ctx.get_u64("pid"), Some(4242));
        assert_eq!(ctx.get_str("package"), Some("requests"));
        assert!(ctx.get_str("pid").is_none());
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_set_overrides() {
        let mut ctx = ActionContext::new("card-1");
        ctx.set("timeout_secs", serde_json::json!(60));
        ctx.set("timeout_secs", serde_json::json!(120));
        assert_eq!(ctx.get_u64("timeout_secs"), Some(120));
    }
}
