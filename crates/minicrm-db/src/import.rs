//! # Customer Import Engine
//!
//! Offline CSV import of customer records, with dedup against the live
//! table and fill-empty-only merging. The `import_customers` binary is a
//! thin CLI over [`Importer`].
//!
//! ## Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CSV row                                                                │
//! │    │  ColumnMap::extract + normalize_row (minicrm-core, pure)          │
//! │    ▼                                                                    │
//! │  NormalizedRow ── warnings ──▶ report items (MISSING_*, INVALID_*)     │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  Dedup lookup: email first, then phone                                 │
//! │    │                                                                    │
//! │    ├── no match ──────────────▶ plan: created                          │
//! │    │                                                                    │
//! │    └── match ── merge_patch ──▶ non-empty patch: updated               │
//! │                                 empty patch:     unchanged             │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  dry-run? record the plan only : apply (insert / update)               │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  DB failure on one row → DB_ERROR item, import continues               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::DbError;
use crate::pool::Database;
use minicrm_core::import::{merge_patch, normalize_row, ColumnMap, NormalizedRow};

/// Import failures that abort the whole run (the file itself is
/// unreadable). Per-row database failures never abort; they land in the
/// report instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Import run options.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Compute and report planned actions without writing.
    pub dry_run: bool,
    /// Process at most this many data rows.
    pub limit: Option<usize>,
}

// =============================================================================
// Report
// =============================================================================

/// The JSON report written after every run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub meta: ReportMeta,
    pub summary: ImportSummary,
    pub items: Vec<ReportItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub file: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub warnings: usize,
    pub errors: usize,
    pub warnings_by_code: BTreeMap<String, usize>,
    pub errors_by_code: BTreeMap<String, usize>,
}

/// One report line, tied to a source row (1-based, header = row 1).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItem {
    pub row: usize,
    pub level: ReportLevel,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

/// What the run decided to do with one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Created,
    Updated,
    Unchanged,
}

impl Action {
    fn code(&self) -> &'static str {
        match self {
            Action::Created => "CREATED",
            Action::Updated => "UPDATED",
            Action::Unchanged => "UNCHANGED",
        }
    }
}

// =============================================================================
// Importer
// =============================================================================

/// Runs customer imports against a database.
#[derive(Debug, Clone)]
pub struct Importer {
    db: Database,
}

impl Importer {
    pub fn new(db: Database) -> Self {
        Importer { db }
    }

    /// Imports customers from a CSV file.
    ///
    /// The first record is the header row; columns are matched by
    /// candidate names (Turkish and English spellings). Dedup checks the
    /// live table even in dry-run mode, so the planned actions are real.
    pub async fn run(
        &self,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let started_at = Utc::now();
        info!(file = %path.display(), dry_run = options.dry_run, "Starting customer import");

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| ImportError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ImportError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();
        let columns = ColumnMap::detect(&headers);
        if columns.is_empty() {
            warn!("No recognizable columns in header row; every row will import as Unknown");
        }

        let mut report = ImportReport {
            meta: ReportMeta {
                file: path.display().to_string(),
                dry_run: options.dry_run,
                started_at,
                finished_at: None,
            },
            summary: ImportSummary::default(),
            items: Vec::new(),
        };

        for (index, record) in reader.records().enumerate() {
            if let Some(limit) = options.limit {
                if index >= limit {
                    break;
                }
            }
            // header occupies row 1
            let row_number = index + 2;
            report.summary.total_rows += 1;

            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    report.push(ReportItem {
                        row: row_number,
                        level: ReportLevel::Error,
                        code: "READ_ERROR".to_string(),
                        message: err.to_string(),
                        details: serde_json::Value::Null,
                    });
                    continue;
                }
            };
            let cells: Vec<String> = record.iter().map(str::to_string).collect();
            let normalized = normalize_row(&columns.extract(&cells));

            for warning in &normalized.warnings {
                report.push(ReportItem {
                    row: row_number,
                    level: ReportLevel::Warning,
                    code: warning.code.as_str().to_string(),
                    message: warning.message.clone(),
                    details: warning.details.clone(),
                });
            }

            match self.process_row(&normalized, options.dry_run).await {
                Ok((action, details)) => {
                    match action {
                        Action::Created => report.summary.created += 1,
                        Action::Updated => report.summary.updated += 1,
                        Action::Unchanged => report.summary.unchanged += 1,
                    }
                    let code = if options.dry_run {
                        format!("DRYRUN_{}", action.code())
                    } else {
                        action.code().to_string()
                    };
                    report.push(ReportItem {
                        row: row_number,
                        level: ReportLevel::Info,
                        code,
                        message: format!("Customer {}", action.code().to_lowercase()),
                        details,
                    });
                }
                Err(err) => {
                    report.push(ReportItem {
                        row: row_number,
                        level: ReportLevel::Error,
                        code: "DB_ERROR".to_string(),
                        message: err.to_string(),
                        details: err.details().unwrap_or(serde_json::Value::Null),
                    });
                }
            }
        }

        report.finalize();
        info!(
            total = report.summary.total_rows,
            created = report.summary.created,
            updated = report.summary.updated,
            unchanged = report.summary.unchanged,
            warnings = report.summary.warnings,
            errors = report.summary.errors,
            "Import finished"
        );
        Ok(report)
    }

    /// Dedups one normalized row and applies (or plans) the action.
    async fn process_row(
        &self,
        row: &NormalizedRow,
        dry_run: bool,
    ) -> Result<(Action, serde_json::Value), DbError> {
        let customers = self.db.customers();

        // email is the primary dedup key, phone the fallback
        let mut matched_on = None;
        let mut existing = None;
        if let Some(email) = row.dedup_email() {
            existing = customers.find_by_email(email).await?;
            if existing.is_some() {
                matched_on = Some("email");
            }
        }
        if existing.is_none() {
            if let Some(phone) = row.dedup_phone() {
                existing = customers.find_by_phone(phone).await?;
                if existing.is_some() {
                    matched_on = Some("phone");
                }
            }
        }

        match existing {
            None => {
                let details = serde_json::json!({ "matchedOn": serde_json::Value::Null });
                if dry_run {
                    return Ok((Action::Created, details));
                }
                let created = customers.insert(&row.customer).await?;
                Ok((
                    Action::Created,
                    serde_json::json!({ "id": created.id, "matchedOn": serde_json::Value::Null }),
                ))
            }
            Some(current) => {
                let patch = merge_patch(&current, &row.customer);
                let details = serde_json::json!({ "id": current.id, "matchedOn": matched_on });
                if patch.is_empty() {
                    return Ok((Action::Unchanged, details));
                }
                if dry_run {
                    return Ok((Action::Updated, details));
                }
                customers.update(current.id, &patch).await?;
                Ok((Action::Updated, details))
            }
        }
    }
}

impl ImportReport {
    fn push(&mut self, item: ReportItem) {
        match item.level {
            ReportLevel::Warning => {
                self.summary.warnings += 1;
                *self
                    .summary
                    .warnings_by_code
                    .entry(item.code.clone())
                    .or_default() += 1;
            }
            ReportLevel::Error => {
                self.summary.errors += 1;
                *self
                    .summary
                    .errors_by_code
                    .entry(item.code.clone())
                    .or_default() += 1;
            }
            ReportLevel::Info => {}
        }
        self.items.push(item);
    }

    fn finalize(&mut self) {
        self.meta.finished_at = Some(Utc::now());
    }

    /// True when at least one row failed to apply.
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use std::io::Write;

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        Database::new(DbConfig::new(dir.path().join("import.db")))
            .await
            .unwrap()
    }

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_creates_normalized_customers() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let csv = write_csv(
            &dir,
            "customers.csv",
            "Ad,Soyad,E-Posta,Telefon,Adres\n\
             Ali,Yılmaz,Ali@Example.COM,0555 123 45 67,Kadıköy\n\
             ,Demir,,+90 555 765 43 21,\n",
        );

        let report = Importer::new(db.clone())
            .run(&csv, &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(report.summary.total_rows, 2);
        assert_eq!(report.summary.created, 2);
        assert_eq!(report.summary.errors, 0);
        assert_eq!(
            report.summary.warnings_by_code.get("MISSING_FIRSTNAME"),
            Some(&1)
        );

        let ali = db
            .customers()
            .find_by_email("ali@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ali.phone.as_deref(), Some("+905551234567"));

        // lastName was promoted to firstName on the second row
        let demir = db
            .customers()
            .find_by_phone("+905557654321")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(demir.first_name, "Demir");
        assert_eq!(demir.last_name, None);
    }

    #[tokio::test]
    async fn test_reimport_fills_only_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;

        let first = write_csv(
            &dir,
            "first.csv",
            "firstname,email\nAli,ali@example.com\n",
        );
        let importer = Importer::new(db.clone());
        importer.run(&first, &ImportOptions::default()).await.unwrap();

        // same email: phone is merged in, the existing name stays
        let second = write_csv(
            &dir,
            "second.csv",
            "firstname,email,phone\nSomeone Else,ali@example.com,05551234567\n",
        );
        let report = importer.run(&second, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.summary.updated, 1);
        assert_eq!(report.summary.created, 0);

        let ali = db
            .customers()
            .find_by_email("ali@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ali.first_name, "Ali");
        assert_eq!(ali.phone.as_deref(), Some("+905551234567"));

        // identical rerun is a no-op
        let report = importer.run(&second, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.summary.unchanged, 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let csv = write_csv(&dir, "customers.csv", "firstname,email\nAli,ali@example.com\n");

        let report = Importer::new(db.clone())
            .run(
                &csv,
                &ImportOptions {
                    dry_run: true,
                    limit: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.summary.created, 1);
        assert!(report.items.iter().any(|i| i.code == "DRYRUN_CREATED"));
        assert!(db
            .customers()
            .find_by_email("ali@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_dedup_prefers_email_over_phone() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let importer = Importer::new(db.clone());

        let seed = write_csv(
            &dir,
            "seed.csv",
            "firstname,email,phone\nAli,ali@example.com,05551111111\nVeli,veli@example.com,05552222222\n",
        );
        importer.run(&seed, &ImportOptions::default()).await.unwrap();

        // row matches Ali by email and Veli by phone; email must win
        let clash = write_csv(
            &dir,
            "clash.csv",
            "firstname,lastname,email,phone\nX,Merged,ali@example.com,05552222222\n",
        );
        let report = importer.run(&clash, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.summary.updated, 1);
        let matched: Vec<_> = report
            .items
            .iter()
            .filter(|i| i.level == ReportLevel::Info)
            .map(|i| i.details["matchedOn"].as_str().map(str::to_string))
            .collect();
        assert_eq!(matched, vec![Some("email".to_string())]);

        let ali = db
            .customers()
            .find_by_email("ali@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ali.last_name.as_deref(), Some("Merged"));

        let veli = db
            .customers()
            .find_by_email("veli@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(veli.last_name, None);
    }

    #[tokio::test]
    async fn test_limit_caps_processed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let csv = write_csv(
            &dir,
            "customers.csv",
            "firstname,email\nA,a@example.com\nB,b@example.com\nC,c@example.com\n",
        );

        let report = Importer::new(db)
            .run(
                &csv,
                &ImportOptions {
                    dry_run: false,
                    limit: Some(2),
                },
            )
            .await
            .unwrap();

        assert_eq!(report.summary.total_rows, 2);
        assert_eq!(report.summary.created, 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;

        let err = Importer::new(db)
            .run(&dir.path().join("nope.csv"), &ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Read { .. }));
    }
}
