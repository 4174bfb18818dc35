use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_label};
use crate::models::{DomainOverride, MasterDomainEntry};

fn row_to_master_entry(row: &Row) -> Result<MasterDomainEntry> {
    let classification: String = row.get("classification")?;
    Ok(MasterDomainEntry {
        domain: row.get("domain")?,
        classification: parse_label(&classification)?,
    })
}

fn row_to_override(row: &Row) -> Result<DomainOverride> {
    let classification: String = row.get("classification")?;
    Ok(DomainOverride {
        user_id: row.get("user_id")?,
        domain: row.get("domain")?,
        classification: parse_label(&classification)?,
    })
}

impl Database {
    pub async fn list_master_domains(&self) -> Result<Vec<MasterDomainEntry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT domain, classification
                 FROM master_domains
                 ORDER BY domain ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_master_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    pub async fn put_master_domain(&self, entry: &MasterDomainEntry) -> Result<()> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO master_domains (domain, classification)
                 VALUES (?1, ?2)
                 ON CONFLICT(domain) DO UPDATE SET classification = excluded.classification",
                params![record.domain, record.classification.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_overrides_for(&self, user_id: &str) -> Result<Vec<DomainOverride>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, domain, classification
                 FROM domain_overrides
                 WHERE user_id = ?1
                 ORDER BY domain ASC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut overrides = Vec::new();
            while let Some(row) = rows.next()? {
                overrides.push(row_to_override(row)?);
            }

            Ok(overrides)
        })
        .await
    }

    /// Insert or replace the override for (user, domain).
    pub async fn put_override(&self, entry: &DomainOverride) -> Result<()> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO domain_overrides (user_id, domain, classification)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, domain) DO UPDATE SET classification = excluded.classification",
                params![
                    record.user_id,
                    record.domain,
                    record.classification.as_str(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn remove_override(&self, user_id: &str, domain: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let domain = domain.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM domain_overrides WHERE user_id = ?1 AND domain = ?2",
                params![user_id, domain],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
