//! Contact database queries

use anyhow::Result;
use sqlx::PgPool;

use crate::types::{ContactKey, OrgContactKey, OrgId, StagedContact};

/// Email/phone of every contact belonging to one of `org_ids`
pub async fn find_keys_by_org_ids(pool: &PgPool, org_ids: &[OrgId]) -> Result<Vec<OrgContactKey>> {
    if org_ids.is_empty() {
        return Ok(vec![]);
    }

    let keys = sqlx::query_as::<_, OrgContactKey>(
        r#"
        SELECT org_id, email, phone
        FROM contacts
        WHERE org_id = ANY($1)
        "#,
    )
    .bind(org_ids)
    .fetch_all(pool)
    .await?;

    Ok(keys)
}

/// Email/phone of every stored contact
pub async fn find_all_keys(pool: &PgPool) -> Result<Vec<ContactKey>> {
    let keys = sqlx::query_as::<_, ContactKey>(
        r#"
        SELECT email, phone
        FROM contacts
        WHERE email IS NOT NULL OR phone IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(keys)
}

/// Insert one batch as a single statement, so it lands completely or not at all
pub async fn insert_many(pool: &PgPool, batch: &[StagedContact]) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let org_ids: Vec<OrgId> = batch.iter().map(|c| c.org_id).collect();
    let person_names: Vec<Option<&str>> = batch.iter().map(|c| c.person_name.as_deref()).collect();
    let designations: Vec<Option<&str>> = batch.iter().map(|c| c.designation.as_deref()).collect();
    let emails: Vec<Option<&str>> = batch.iter().map(|c| c.email.as_deref()).collect();
    let phones: Vec<Option<&str>> = batch.iter().map(|c| c.phone.as_deref()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO contacts (org_id, person_name, designation, email, phone)
        SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::text[], $5::text[])
        "#,
    )
    .bind(&org_ids)
    .bind(&person_names)
    .bind(&designations)
    .bind(&emails)
    .bind(&phones)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
