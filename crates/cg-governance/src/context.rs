// context.rs - Who is asking, passed explicitly into every evaluation.
//
// The requester's role, team, environment and license tier travel with the
// call instead of being read from process-wide state, so two threads can
// evaluate on behalf of different tenants without interfering.

use serde::{Deserialize, Serialize};

/// Per-call requester context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluationContext {
    pub user_role: String,
    pub team: String,
    pub environment: String,
    /// Feature tier of the caller (e.g. "community", "pro", "enterprise").
    pub tier: String,
    /// Free-form extra fields forwarded to the policy evaluator.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            user_role: "agent".to_string(),
            team: "default".to_string(),
            environment: "development".to_string(),
            tier: "community".to_string(),
            metadata: serde_json::Map::new(),
        }
    }
}

impl EvaluationContext {
    pub fn new(
        user_role: impl Into<String>,
        team: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            user_role: user_role.into(),
            team: team.into(),
            environment: environment.into(),
            ..Default::default()
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    /// Add one metadata field and return self.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The JSON object handed to the policy evaluator as `metadata`.
    pub fn to_metadata(&self, description: &str) -> serde_json::Value {
        let mut map = self.metadata.clone();
        map.insert("user_role".into(), self.user_role.clone().into());
        map.insert("team".into(), self.team.clone().into());
        map.insert("environment".into(), self.environment.clone().into());
        map.insert("tier".into(), self.tier.clone().into());
        map.insert("description".into(), description.into());
        serde_json::Value::Object(map)
    }
}
