//! Database queries for certificate codes.

use std::collections::BTreeMap;

use certcode_core::db::unix_timestamp;

use super::db::{CertificateDatabase, DatabaseError};
use super::models::{Certificate, CodeStatistics, DATE_FORMAT, NewCertificate};

const INSERT_CERTIFICATE: &str = "INSERT INTO certificates (code, type, tags, generated, created_at, updated_at) \
     VALUES (?, ?, ?, 0, ?, ?) RETURNING *";

impl CertificateDatabase {
    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Count all rows.
    pub async fn count_total(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM certificates")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Count rows that have not been redeemed yet.
    pub async fn count_unused(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM certificates WHERE generated = 0")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Count unredeemed rows grouped by type.
    pub async fn count_unused_by_type(&self) -> Result<BTreeMap<String, i64>, DatabaseError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT type, COUNT(*) FROM certificates WHERE generated = 0 GROUP BY type",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Total, unused and unused-per-type counts in one value.
    pub async fn statistics(&self) -> Result<CodeStatistics, DatabaseError> {
        Ok(CodeStatistics {
            total: self.count_total().await?,
            unused: self.count_unused().await?,
            unused_by_type: self.count_unused_by_type().await?,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Fetch the row for `code` whose redemption state equals `generated`.
    ///
    /// `find_entry(code, false)` finds an available code,
    /// `find_entry(code, true)` an already redeemed one.
    pub async fn find_entry(
        &self,
        code: &str,
        generated: bool,
    ) -> Result<Certificate, DatabaseError> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE code = ? AND generated = ?",
        )
        .bind(code)
        .bind(generated)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {code}")))
    }

    /// Fetch a redeemed row whose stored email equals `email` exactly.
    pub async fn find_owned_entry(
        &self,
        code: &str,
        email: &str,
    ) -> Result<Certificate, DatabaseError> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE code = ? AND generated = 1 AND email = ?",
        )
        .bind(code)
        .bind(email)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {code}")))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Issue a single code. Fails if the code already exists.
    pub async fn create_entry(&self, entry: &NewCertificate) -> Result<Certificate, DatabaseError> {
        let now = unix_timestamp();

        let certificate = sqlx::query_as::<_, Certificate>(INSERT_CERTIFICATE)
            .bind(&entry.code)
            .bind(&entry.kind)
            .bind(&entry.tags)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool())
            .await?;

        Ok(certificate)
    }

    /// Issue a batch of codes in one transaction.
    ///
    /// Either every row is inserted or none is.
    pub async fn create_entries(
        &self,
        entries: &[NewCertificate],
    ) -> Result<Vec<Certificate>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;
        let mut created = Vec::with_capacity(entries.len());

        for entry in entries {
            let certificate = sqlx::query_as::<_, Certificate>(INSERT_CERTIFICATE)
                .bind(&entry.code)
                .bind(&entry.kind)
                .bind(&entry.tags)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
            created.push(certificate);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Redeem `code` for `name`/`email` and stamp today's date.
    ///
    /// A single conditional update: only a row that is still unredeemed
    /// matches, so of several concurrent redemptions exactly one succeeds
    /// and the rest get `NotFound`.
    pub async fn assign_entry(
        &self,
        code: &str,
        name: &str,
        email: &str,
    ) -> Result<Certificate, DatabaseError> {
        let now = unix_timestamp();
        let date = chrono::Local::now().format(DATE_FORMAT).to_string();

        sqlx::query_as::<_, Certificate>(
            "UPDATE certificates SET name = ?, email = ?, date = ?, generated = 1, updated_at = ? \
             WHERE code = ? AND generated = 0 RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(&date)
        .bind(now)
        .bind(code)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {code}")))
    }

    /// Delete every row matching `code`, whatever its state.
    ///
    /// Returns the number of removed rows (at most one).
    pub async fn delete_entry(&self, code: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM certificates WHERE code = ?")
            .bind(code)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete a redeemed row on behalf of its owner.
    ///
    /// Returns `false` when the code is unknown, not redeemed, or owned by a
    /// different email; callers cannot tell which.
    pub async fn delete_owned_entry(&self, code: &str, email: &str) -> Result<bool, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM certificates WHERE code = ? AND generated = 1 AND email = ?")
                .bind(code)
                .bind(email)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove unredeemed rows without a type.
    pub async fn purge_orphans(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM certificates WHERE type = '' AND generated = 0")
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
