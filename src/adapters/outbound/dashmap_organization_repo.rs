//! DashMap Organization Repository
//!
//! Implements OrganizationRepository using DashMap for concurrent access.

use crate::domain::entities::{FindResults, Organization, PagingOptions, UsageInfo};
use crate::domain::ports::{OrganizationRepository, RepositoryError};
use async_trait::async_trait;
use dashmap::DashMap;

/// DashMap-backed organization repository.
///
/// Ids are random UUIDs assigned on add. Queries return documents ordered
/// by id so paging is stable.
pub struct DashMapOrganizationRepository {
    organizations: DashMap<String, Organization>,
}

impl DashMapOrganizationRepository {
    /// Create a new repository.
    pub fn new() -> Self {
        Self {
            organizations: DashMap::new(),
        }
    }
}

impl Default for DashMapOrganizationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrganizationRepository for DashMapOrganizationRepository {
    async fn add(&self, mut organization: Organization) -> Result<Organization, RepositoryError> {
        let id = organization
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone();
        self.organizations.insert(id, organization.clone());
        Ok(organization)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Organization>, RepositoryError> {
        Ok(self.organizations.get(id).map(|e| e.value().clone()))
    }

    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError> {
        let id = organization.id.as_deref().ok_or(RepositoryError::MissingId)?;
        match self.organizations.get_mut(id) {
            Some(mut existing) => {
                *existing = organization.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        self.organizations.remove(id);
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), RepositoryError> {
        self.organizations.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.organizations.len())
    }

    async fn get_by_retention_days_enabled(
        &self,
        paging: PagingOptions,
    ) -> Result<FindResults<Organization>, RepositoryError> {
        let mut matches: Vec<Organization> = self
            .organizations
            .iter()
            .filter(|e| e.value().retention_days > 0)
            .map(|e| e.value().clone())
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));

        let total = matches.len();
        let documents = matches
            .into_iter()
            .skip(paging.skip())
            .take(paging.limit)
            .collect();

        Ok(FindResults { documents, total })
    }

    async fn update_usage(&self, id: &str, usage: UsageInfo) -> Result<(), RepositoryError> {
        match self.organizations.get_mut(id) {
            Some(mut org) => {
                org.set_usage(usage);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }
}
