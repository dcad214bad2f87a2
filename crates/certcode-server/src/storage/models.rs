//! Data models for certificate storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Format of the assignment date stamped on redemption (`MM.DD.YYYY`).
pub const DATE_FORMAT: &str = "%m.%d.%Y";

/// One certificate code and, once redeemed, its recipient.
///
/// `generated == false` means the code is issued and still available;
/// `true` means it was redeemed and `name`, `email` and `date` are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub code: String,
    /// Category label printed on the certificate.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub email: String,
    /// Free text, comma separated.
    pub tags: String,
    pub date: String,
    pub generated: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A code to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub code: String,
    pub kind: String,
    pub tags: String,
}

/// Aggregate counts over the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeStatistics {
    pub total: i64,
    pub unused: i64,
    pub unused_by_type: BTreeMap<String, i64>,
}
