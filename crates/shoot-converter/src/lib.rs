//! Shoot Converter
//!
//! Turns a Runtime into a Gardener Shoot document, either in full (create)
//! or as a patch of the fields this system owns on an existing Shoot.

pub mod audit_log;
pub mod config;
pub mod converter;
pub mod error;
pub mod extender;
pub mod maintenance;
pub mod provider;

pub use audit_log::{AuditLogData, AuditLogDataSource, FileAuditLogDataSource};
pub use config::ConverterConfig;
pub use converter::{Converter, CreateOpts, PatchOpts};
pub use error::{AuditLogError, ConverterError, MaintenanceError};
pub use extender::auditlogs::{AUDITLOG_EXTENSION_TYPE, audit_log_configured};
pub use maintenance::{FileMaintenanceWindowSource, MaintenanceWindowSource};
pub use provider::ProviderType;
