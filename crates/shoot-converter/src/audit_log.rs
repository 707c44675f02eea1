//! Audit log tenant data
//!
//! Resolves the audit log tenant for a provider/region pair. The file-backed
//! source reads a JSON map shaped `{provider: {region: AuditLogData}}`.

use crate::error::AuditLogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tenant data written into the auditlog extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditLogData {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,

    #[serde(rename = "serviceURL")]
    pub service_url: String,

    #[serde(rename = "secretName")]
    pub secret_name: String,
}

impl AuditLogData {
    fn validate(&self) -> Result<(), AuditLogError> {
        if self.tenant_id.is_empty() {
            return Err(AuditLogError::Invalid("tenantID is empty".to_string()));
        }
        if self.secret_name.is_empty() {
            return Err(AuditLogError::Invalid("secretName is empty".to_string()));
        }
        if !(self.service_url.starts_with("https://") || self.service_url.starts_with("http://")) {
            return Err(AuditLogError::Invalid(format!("serviceURL is not a URL: {:?}", self.service_url)));
        }
        Ok(())
    }
}

/// Source of audit log tenant data.
pub trait AuditLogDataSource: Send + Sync {
    fn lookup(&self, provider: &str, region: &str) -> Result<AuditLogData, AuditLogError>;
}

/// Audit log tenants loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct FileAuditLogDataSource {
    tenants: BTreeMap<String, BTreeMap<String, AuditLogData>>,
}

impl FileAuditLogDataSource {
    /// Load the tenant map from disk.
    pub fn from_path(path: &str) -> Result<Self, AuditLogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AuditLogError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AuditLogError> {
        Ok(Self {
            tenants: serde_json::from_str(raw)?,
        })
    }
}

impl AuditLogDataSource for FileAuditLogDataSource {
    fn lookup(&self, provider: &str, region: &str) -> Result<AuditLogData, AuditLogError> {
        let regions = self
            .tenants
            .get(provider)
            .ok_or_else(|| AuditLogError::ProviderNotFound(provider.to_string()))?;
        let data = regions.get(region).ok_or_else(|| AuditLogError::RegionNotFound {
            provider: provider.to_string(),
            region: region.to_string(),
        })?;
        data.validate()?;
        Ok(data.clone())
    }
}
