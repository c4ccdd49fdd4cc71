//! License persistence boundary.
//!
//! Handlers talk to a [`LicenseStore`]. Every operation is scoped to a
//! tenant: a license is invisible to all tenants but its owner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use licensa_core::TenantId;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::models::{License, LicenseStatus, NewLicense};

/// Storage for licenses.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Insert a new pending license and assign its id and number.
    async fn create(
        &self,
        tenant: &TenantId,
        new: NewLicense,
        now: DateTime<Utc>,
    ) -> anyhow::Result<License>;

    /// All licenses of `tenant`, oldest first.
    async fn list(&self, tenant: &TenantId) -> anyhow::Result<Vec<License>>;

    /// One license of `tenant`, if it exists and belongs to that tenant.
    async fn get(&self, tenant: &TenantId, id: u64) -> anyhow::Result<Option<License>>;

    /// Persist changes to an existing license.
    async fn save(&self, license: &License) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    licenses: BTreeMap<u64, License>,
    sequences: HashMap<TenantId, u64>,
}

/// In-process [`LicenseStore`].
#[derive(Debug, Default)]
pub struct InMemoryLicenseStore {
    inner: RwLock<Inner>,
}

impl InMemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// License numbers have the form `LIC-<TENANT>-<seq>`, with the per-tenant
/// sequence zero-padded to six digits.
fn license_number(tenant: &TenantId, sequence: u64) -> String {
    format!("LIC-{}-{sequence:06}", tenant.as_str().to_ascii_uppercase())
}

#[async_trait]
impl LicenseStore for InMemoryLicenseStore {
    async fn create(
        &self,
        tenant: &TenantId,
        new: NewLicense,
        now: DateTime<Utc>,
    ) -> anyhow::Result<License> {
        let mut inner = self.inner.write().await;

        inner.next_id += 1;
        let id = inner.next_id;
        let sequence = inner.sequences.entry(tenant.clone()).or_insert(0);
        *sequence += 1;
        let license_number = license_number(tenant, *sequence);

        let license = License {
            id,
            license_number,
            applicant_name: new.applicant_name,
            applicant_email: new.applicant_email,
            license_type: new.license_type,
            status: LicenseStatus::Pending,
            amount: new.amount,
            expiry_date: new.expiry_date,
            tenant_id: tenant.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.licenses.insert(id, license.clone());
        Ok(license)
    }

    async fn list(&self, tenant: &TenantId) -> anyhow::Result<Vec<License>> {
        let inner = self.inner.read().await;
        Ok(inner
            .licenses
            .values()
            .filter(|license| &license.tenant_id == tenant)
            .cloned()
            .collect())
    }

    async fn get(&self, tenant: &TenantId, id: u64) -> anyhow::Result<Option<License>> {
        let inner = self.inner.read().await;
        Ok(inner
            .licenses
            .get(&id)
            .filter(|license| &license.tenant_id == tenant)
            .cloned())
    }

    async fn save(&self, license: &License) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        match inner.licenses.get_mut(&license.id) {
            Some(stored) if stored.tenant_id == license.tenant_id => {
                *stored = license.clone();
                Ok(())
            }
            _ => anyhow::bail!(
                "license {} does not exist for tenant {}",
                license.id,
                license.tenant_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    fn new_license(name: &str) -> NewLicense {
        NewLicense {
            applicant_name: name.to_string(),
            applicant_email: "owner@example.test".to_string(),
            license_type: "Retail".to_string(),
            amount: 100.0,
            expiry_date: Utc::now() + Duration::days(365),
        }
    }

    #[test]
    fn test_license_number_format() {
        assert_eq!(license_number(&tenant("ten-001"), 7), "LIC-TEN-001-000007");
    }

    #[tokio::test]
    async fn test_create_assigns_per_tenant_sequence() {
        let store = InMemoryLicenseStore::new();
        let a = tenant("TEN-A");
        let b = tenant("TEN-B");

        let first = store.create(&a, new_license("one"), Utc::now()).await.unwrap();
        let second = store.create(&b, new_license("two"), Utc::now()).await.unwrap();
        let third = store.create(&a, new_license("three"), Utc::now()).await.unwrap();

        assert_eq!(first.license_number, "LIC-TEN-A-000001");
        assert_eq!(second.license_number, "LIC-TEN-B-000001");
        assert_eq!(third.license_number, "LIC-TEN-A-000002");
        assert_eq!(first.status, LicenseStatus::Pending);
        assert_ne!(first.id, third.id);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryLicenseStore::new();
        let a = tenant("TEN-A");
        let b = tenant("TEN-B");

        let created = store.create(&a, new_license("one"), Utc::now()).await.unwrap();

        assert!(store.get(&a, created.id).await.unwrap().is_some());
        assert!(store.get(&b, created.id).await.unwrap().is_none());
        assert_eq!(store.list(&a).await.unwrap().len(), 1);
        assert!(store.list(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_updates_existing_only() {
        let store = InMemoryLicenseStore::new();
        let a = tenant("TEN-A");

        let mut license = store.create(&a, new_license("one"), Utc::now()).await.unwrap();
        license.status = LicenseStatus::Approved;
        store.save(&license).await.unwrap();
        assert_eq!(
            store.get(&a, license.id).await.unwrap().unwrap().status,
            LicenseStatus::Approved
        );

        license.tenant_id = tenant("TEN-B");
        assert!(store.save(&license).await.is_err());

        license.id = 999;
        assert!(store.save(&license).await.is_err());
    }
}
