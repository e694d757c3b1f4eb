use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Company, CompanyKey, Contact, ContactId};

/// Most contacts a single listing will ever return.
pub const CONTACT_LIST_CAP: u32 = 100;

/// Read/write surface of the contact store used by the service layer.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Contacts ordered by display name, ties in insertion order.
    async fn list_contacts(&self, limit: u32) -> Result<Vec<Contact>>;
    async fn company_by_key(&self, key: &CompanyKey) -> Result<Option<Company>>;
    async fn contact_by_id(&self, contact_id: &ContactId) -> Result<Option<Contact>>;
    /// Returns `false` when no contact has that id.
    async fn mark_intro_sent(&self, contact_id: &ContactId, sent_at: DateTime<Utc>)
        -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewContact<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub company: Option<&'a CompanyKey>,
}

const CONTACT_COLUMNS: &str =
    "id, nombre_contacto, email_contacto, email_sent, email_sent_at, rut_empresa";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn upsert_company(&self, key: &CompanyKey, name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO empresas (rut_empresa, razon_social) VALUES (?, ?)
             ON CONFLICT(rut_empresa) DO UPDATE SET razon_social = excluded.razon_social",
        )
        .bind(key.as_str())
        .bind(name)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert company {key}"))?;
        Ok(())
    }

    pub async fn create_contact(&self, contact: NewContact<'_>) -> Result<ContactId> {
        let contact_id = ContactId::generate();
        self.insert_contact_with_id(&contact_id, contact).await?;
        Ok(contact_id)
    }

    /// Inserts a contact under a caller-chosen id, e.g. when importing rows
    /// that already have stable identifiers.
    pub async fn insert_contact_with_id(
        &self,
        contact_id: &ContactId,
        contact: NewContact<'_>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO personas (id, nombre_contacto, email_contacto, rut_empresa)
             VALUES (?, ?, ?, ?)",
        )
        .bind(contact_id.as_str())
        .bind(contact.name)
        .bind(contact.email)
        .bind(contact.company.map(CompanyKey::as_str))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert contact {contact_id}"))?;
        Ok(())
    }

    pub async fn list_contacts(&self, limit: u32) -> Result<Vec<Contact>> {
        let limit = limit.min(CONTACT_LIST_CAP);
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS}
             FROM personas
             ORDER BY nombre_contacto ASC, rowid ASC
             LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to list contacts")?;
        rows.iter().map(contact_from_row).collect()
    }

    pub async fn contact_by_id(&self, contact_id: &ContactId) -> Result<Option<Contact>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM personas WHERE id = ?"
        ))
        .bind(contact_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load contact {contact_id}"))?;
        row.as_ref().map(contact_from_row).transpose()
    }

    pub async fn company_by_key(&self, key: &CompanyKey) -> Result<Option<Company>> {
        let row = sqlx::query("SELECT rut_empresa, razon_social FROM empresas WHERE rut_empresa = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load company {key}"))?;
        Ok(row.map(|r| Company {
            key: CompanyKey(r.get::<String, _>(0)),
            name: r.get::<String, _>(1),
        }))
    }

    pub async fn mark_intro_sent(
        &self,
        contact_id: &ContactId,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE personas SET email_sent = 1, email_sent_at = ? WHERE id = ?",
        )
        .bind(sent_at)
        .bind(contact_id.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to mark intro sent for contact {contact_id}"))?
        .rows_affected();
        Ok(updated > 0)
    }

    /// Clears the sent flag; `None` resets every contact.
    pub async fn reset_intro_sent(&self, contact_id: Option<&ContactId>) -> Result<u64> {
        let result = match contact_id {
            Some(contact_id) => {
                sqlx::query(
                    "UPDATE personas SET email_sent = 0, email_sent_at = NULL WHERE id = ?",
                )
                .bind(contact_id.as_str())
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query("UPDATE personas SET email_sent = 0, email_sent_at = NULL")
                    .execute(&self.pool)
                    .await
            }
        }
        .context("failed to reset intro sent flag")?;
        Ok(result.rows_affected())
    }
}

fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    Ok(Contact {
        id: ContactId(row.try_get::<String, _>(0)?),
        name: row.try_get::<String, _>(1)?,
        email: row.try_get::<String, _>(2)?,
        intro_sent: row.try_get::<bool, _>(3)?,
        intro_sent_at: row.try_get::<Option<DateTime<Utc>>, _>(4)?,
        company: row.try_get::<Option<String>, _>(5)?.map(CompanyKey),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl ContactStore for Storage {
    async fn list_contacts(&self, limit: u32) -> Result<Vec<Contact>> {
        Storage::list_contacts(self, limit).await
    }

    async fn company_by_key(&self, key: &CompanyKey) -> Result<Option<Company>> {
        Storage::company_by_key(self, key).await
    }

    async fn contact_by_id(&self, contact_id: &ContactId) -> Result<Option<Contact>> {
        Storage::contact_by_id(self, contact_id).await
    }

    async fn mark_intro_sent(
        &self,
        contact_id: &ContactId,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        Storage::mark_intro_sent(self, contact_id, sent_at).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
