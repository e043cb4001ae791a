// tenant configuration document
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration document for one tenant of the voice-agent platform.
///
/// The caching layer treats the agent settings and calendar credentials as
/// opaque values: they travel through serialization untouched and are never
/// inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Tenant id (primary key, unique)
    pub tenant_id: String,
    /// Tenant display name
    pub name: String,
    /// Provisioned assistant id, absent until the assistant is created
    #[serde(default)]
    pub assistant_id: Option<String>,
    /// Full model/voice/tool settings for the tenant's agent
    pub agent: Value,
    /// Credentials for the tenant's booking calendar
    #[serde(default)]
    pub calendar_credentials: Value,
}

impl TenantConfig {
    /// Build a minimal document with empty agent settings and credentials.
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        TenantConfig {
            tenant_id: tenant_id.into(),
            name: name.into(),
            assistant_id: None,
            agent: Value::Object(serde_json::Map::new()),
            calendar_credentials: Value::Object(serde_json::Map::new()),
        }
    }
}
