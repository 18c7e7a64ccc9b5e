//! Organization database queries

use anyhow::Result;
use sqlx::PgPool;

use crate::types::{NewOrganization, OrgId, OrgRef, OrganizationPatch};

/// Organizations whose name exactly matches one of `names`
pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<OrgRef>> {
    if names.is_empty() {
        return Ok(vec![]);
    }

    let orgs = sqlx::query_as::<_, OrgRef>(
        r#"
        SELECT id, name
        FROM organizations
        WHERE name = ANY($1)
        "#,
    )
    .bind(names)
    .fetch_all(pool)
    .await?;

    Ok(orgs)
}

/// Insert organizations in one statement, returning the assigned ids
pub async fn insert_many(pool: &PgPool, records: &[NewOrganization]) -> Result<Vec<OrgRef>> {
    if records.is_empty() {
        return Ok(vec![]);
    }

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let websites: Vec<Option<&str>> = records.iter().map(|r| r.meta.website.as_deref()).collect();
    let sectors: Vec<Option<&str>> = records.iter().map(|r| r.meta.sector.as_deref()).collect();
    let cities: Vec<Option<&str>> = records.iter().map(|r| r.meta.city.as_deref()).collect();
    let countries: Vec<Option<&str>> = records.iter().map(|r| r.meta.country.as_deref()).collect();

    let created = sqlx::query_as::<_, OrgRef>(
        r#"
        INSERT INTO organizations (name, website, sector, city, country)
        SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[])
        RETURNING id, name
        "#,
    )
    .bind(&names)
    .bind(&websites)
    .bind(&sectors)
    .bind(&cities)
    .bind(&countries)
    .fetch_all(pool)
    .await?;

    Ok(created)
}

/// Patch organizations in one statement; NULL inputs keep the stored value
pub async fn update_many(pool: &PgPool, patches: &[OrganizationPatch]) -> Result<u64> {
    if patches.is_empty() {
        return Ok(0);
    }

    let ids: Vec<OrgId> = patches.iter().map(|p| p.id).collect();
    let websites: Vec<Option<&str>> = patches.iter().map(|p| p.meta.website.as_deref()).collect();
    let sectors: Vec<Option<&str>> = patches.iter().map(|p| p.meta.sector.as_deref()).collect();
    let cities: Vec<Option<&str>> = patches.iter().map(|p| p.meta.city.as_deref()).collect();
    let countries: Vec<Option<&str>> = patches.iter().map(|p| p.meta.country.as_deref()).collect();

    let result = sqlx::query(
        r#"
        UPDATE organizations AS o SET
            website = COALESCE(p.website, o.website),
            sector  = COALESCE(p.sector, o.sector),
            city    = COALESCE(p.city, o.city),
            country = COALESCE(p.country, o.country)
        FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::text[], $5::text[])
            AS p(id, website, sector, city, country)
        WHERE o.id = p.id
        "#,
    )
    .bind(&ids)
    .bind(&websites)
    .bind(&sectors)
    .bind(&cities)
    .bind(&countries)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
