//! PostgreSQL implementation of `ContactStore`

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries;
use crate::services::store::ContactStore;
use crate::types::{
    ContactKey, NewOrganization, OrgContactKey, OrgId, OrgRef, OrganizationPatch, StagedContact,
};

#[derive(Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn find_organizations_by_name(&self, names: &[String]) -> Result<Vec<OrgRef>> {
        queries::organization::find_by_names(&self.pool, names)
            .await
            .context("looking up organizations by name")
    }

    async fn create_organizations(&self, records: &[NewOrganization]) -> Result<Vec<OrgRef>> {
        queries::organization::insert_many(&self.pool, records)
            .await
            .context("inserting organizations")
    }

    async fn upsert_organizations(&self, patches: &[OrganizationPatch]) -> Result<()> {
        queries::organization::update_many(&self.pool, patches)
            .await
            .context("updating organizations")?;
        Ok(())
    }

    async fn find_contacts_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<OrgContactKey>> {
        queries::contact::find_keys_by_org_ids(&self.pool, org_ids)
            .await
            .context("loading contacts of organizations")
    }

    async fn find_all_contacts(&self) -> Result<Vec<ContactKey>> {
        queries::contact::find_all_keys(&self.pool)
            .await
            .context("loading all contacts")
    }

    async fn insert_contacts(&self, batch: &[StagedContact]) -> Result<()> {
        queries::contact::insert_many(&self.pool, batch)
            .await
            .context("inserting contacts")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
