//! Organization Repository Port
//!
//! Defines the interface for accessing organizations and their quota context.

use crate::domain::entities::{FindResults, Organization, PagingOptions, UsageInfo};
use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("organization not found: {0}")]
    NotFound(String),
    #[error("organization has no id")]
    MissingId,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Repository for organizations.
///
/// The quota enforcer reads plan limits through this interface and writes
/// back usage snapshots; it never needs to know the storage details.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Store a new organization, assigning its id. Returns the stored copy.
    async fn add(&self, organization: Organization) -> Result<Organization, RepositoryError>;

    /// Get an organization by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<Organization>, RepositoryError>;

    /// Replace an existing organization.
    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError>;

    /// Remove an organization. Removing a missing id is not an error.
    async fn remove(&self, id: &str) -> Result<(), RepositoryError>;

    /// Remove every organization.
    async fn remove_all(&self) -> Result<(), RepositoryError>;

    /// Total number of organizations.
    async fn count(&self) -> Result<usize, RepositoryError>;

    /// Organizations with retention enabled (`retention_days > 0`), ordered by id.
    async fn get_by_retention_days_enabled(
        &self,
        paging: PagingOptions,
    ) -> Result<FindResults<Organization>, RepositoryError>;

    /// Record usage for one month on the organization.
    async fn update_usage(&self, id: &str, usage: UsageInfo) -> Result<(), RepositoryError>;
}
