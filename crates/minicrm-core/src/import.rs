//! # Import Normalization
//!
//! Pure helpers for the offline customer-import utility: header
//! canonicalization, field cleanup, email/phone normalization, and the
//! merge-patch computation for rows matching an existing customer.
//!
//! Source data is messy Turkish-locale spreadsheets exported as CSV, so
//! header matching folds Turkish characters and phone normalization
//! defaults bare 10-digit numbers to the `+90` country code.
//!
//! ## Row Pipeline
//! ```text
//! CSV record
//!    │ ColumnMap::pick (candidate headers, first non-empty cell)
//!    ▼
//! RawCustomerRow ──▶ normalize_row ──▶ NormalizedRow
//!                         │               ├─ customer: ValidCustomer
//!                         │               └─ warnings: [RowWarning]
//!                         │
//!                  firstName fallback, email/phone checks,
//!                  dedup-key presence
//! ```

use serde::Serialize;

use crate::types::Customer;
use crate::validation::ValidCustomer;

// =============================================================================
// Text Primitives
// =============================================================================

/// Replaces Turkish-specific letters with their ASCII counterparts.
pub fn fold_turkish(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'İ' => 'I',
            'ı' => 'i',
            'Ğ' => 'G',
            'ğ' => 'g',
            'Ü' => 'U',
            'ü' => 'u',
            'Ş' => 'S',
            'ş' => 's',
            'Ö' => 'O',
            'ö' => 'o',
            'Ç' => 'C',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Canonicalizes a column header: Turkish folding, lowercase, snake_case,
/// ASCII alphanumerics only.
///
/// `"E-Posta Adresi"` → `"eposta_adresi"`, `"Müşteri Adı"` → `"musteri_adi"`.
pub fn normalize_header(header: &str) -> String {
    let folded = fold_turkish(header).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    for c in folded.trim().chars() {
        if c.is_whitespace() {
            out.push('_');
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        }
    }
    out.trim_matches('_').to_string()
}

/// Collapses runs of whitespace to single spaces and trims.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outcome of normalizing an optional, possibly-garbage field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Field was absent or blank.
    Empty,
    /// Field parsed to a canonical value.
    Valid(String),
    /// Field was present but unusable; import nulls it and warns.
    Invalid,
}

impl Normalized {
    pub fn value(&self) -> Option<&str> {
        match self {
            Normalized::Valid(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Normalized::Invalid)
    }
}

/// Lowercases an email and checks the liberal `local@domain.tld` shape.
pub fn normalize_import_email(raw: &str) -> Normalized {
    let email = clean_text(raw).to_lowercase();
    if email.is_empty() {
        return Normalized::Empty;
    }
    let ok = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if ok {
        Normalized::Valid(email)
    } else {
        Normalized::Invalid
    }
}

/// Normalizes a phone number towards E.164, Türkiye-first.
///
/// Strips `00`, `90`, and leading-`0` prefixes; a bare 10-digit national
/// number becomes `+90xxxxxxxxxx`. Numbers that arrived with an explicit
/// `+` and still have at least 10 digits keep their own country code.
pub fn normalize_import_phone(raw: &str) -> Normalized {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return Normalized::Empty;
    }
    let has_plus = cleaned.starts_with('+');

    let mut digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Normalized::Invalid;
    }
    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }
    if let Some(rest) = digits.strip_prefix("90") {
        digits = rest.to_string();
    }
    if let Some(rest) = digits.strip_prefix('0') {
        digits = rest.to_string();
    }

    if digits.len() == 10 {
        return Normalized::Valid(format!("+90{digits}"));
    }
    if has_plus && digits.len() >= 10 {
        return Normalized::Valid(format!("+{digits}"));
    }
    Normalized::Invalid
}

/// Name cleanup; currently whitespace normalization only.
pub fn sanitize_name(raw: &str) -> String {
    clean_text(raw)
}

// =============================================================================
// Column Detection
// =============================================================================

/// Accepted header spellings per field, Turkish and English, in priority
/// order.
const FIRST_NAME_HEADERS: &[&str] = &[
    "firstname",
    "first_name",
    "ad",
    "isim",
    "name",
    "musteriadi",
    "musteri_ad",
];
const LAST_NAME_HEADERS: &[&str] = &[
    "lastname",
    "last_name",
    "soyad",
    "surname",
    "familyname",
    "musterisoyadi",
    "musteri_soyad",
];
const EMAIL_HEADERS: &[&str] = &["email", "e_mail", "eposta", "e_posta", "mail"];
const PHONE_HEADERS: &[&str] = &[
    "phone",
    "telefon",
    "gsm",
    "mobile",
    "ceptelefonu",
    "cep_telefonu",
];
const ADDRESS_HEADERS: &[&str] = &[
    "address",
    "adres",
    "adres1",
    "fulladdress",
    "tamadres",
    "shippingaddress",
    "kargoadresi",
    "kargo_adresi",
];

/// Maps customer fields to source column indexes, resolved once from the
/// header row.
///
/// Each field keeps every matching column in candidate-priority order;
/// per row, the first non-empty cell wins, so a sparse `email` column can
/// fall back to a populated `eposta` one.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub first_name: Vec<usize>,
    pub last_name: Vec<usize>,
    pub email: Vec<usize>,
    pub phone: Vec<usize>,
    pub address: Vec<usize>,
}

impl ColumnMap {
    pub fn detect(headers: &[String]) -> ColumnMap {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let indexes = |candidates: &[&str]| -> Vec<usize> {
            candidates
                .iter()
                .filter_map(|candidate| normalized.iter().position(|h| h == candidate))
                .collect()
        };
        ColumnMap {
            first_name: indexes(FIRST_NAME_HEADERS),
            last_name: indexes(LAST_NAME_HEADERS),
            email: indexes(EMAIL_HEADERS),
            phone: indexes(PHONE_HEADERS),
            address: indexes(ADDRESS_HEADERS),
        }
    }

    /// True when no field matched any header at all.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty()
            && self.last_name.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.address.is_empty()
    }

    fn pick(record: &[String], columns: &[usize]) -> String {
        for &index in columns {
            if let Some(cell) = record.get(index) {
                let cleaned = clean_text(cell);
                if !cleaned.is_empty() {
                    return cleaned;
                }
            }
        }
        String::new()
    }

    /// Extracts the raw field values of one record.
    pub fn extract(&self, record: &[String]) -> RawCustomerRow {
        RawCustomerRow {
            first_name: Self::pick(record, &self.first_name),
            last_name: Self::pick(record, &self.last_name),
            email: Self::pick(record, &self.email),
            phone: Self::pick(record, &self.phone),
            address: Self::pick(record, &self.address),
        }
    }
}

/// Field values of one source row, cleaned but not yet normalized.
/// Empty string means the field was absent.
#[derive(Debug, Clone, Default)]
pub struct RawCustomerRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// Row Normalization
// =============================================================================

/// Warning codes emitted into the import report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningCode {
    #[serde(rename = "MISSING_FIRSTNAME")]
    MissingFirstName,
    #[serde(rename = "MISSING_NAME")]
    MissingName,
    #[serde(rename = "INVALID_EMAIL")]
    InvalidEmail,
    #[serde(rename = "INVALID_PHONE")]
    InvalidPhone,
    #[serde(rename = "NO_DEDUP_KEY")]
    NoDedupKey,
}

impl WarningCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WarningCode::MissingFirstName => "MISSING_FIRSTNAME",
            WarningCode::MissingName => "MISSING_NAME",
            WarningCode::InvalidEmail => "INVALID_EMAIL",
            WarningCode::InvalidPhone => "INVALID_PHONE",
            WarningCode::NoDedupKey => "NO_DEDUP_KEY",
        }
    }
}

/// One warning attached to a normalized row.
#[derive(Debug, Clone, Serialize)]
pub struct RowWarning {
    pub code: WarningCode,
    pub message: String,
    pub details: serde_json::Value,
}

/// A fully normalized import row: the insertable customer plus the
/// warnings its normalization produced.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub customer: ValidCustomer,
    pub warnings: Vec<RowWarning>,
}

impl NormalizedRow {
    /// Dedup lookup keys in match priority order: email first, then phone.
    pub fn dedup_email(&self) -> Option<&str> {
        self.customer.email.as_deref()
    }

    pub fn dedup_phone(&self) -> Option<&str> {
        self.customer.phone.as_deref()
    }
}

/// Normalizes one extracted row.
///
/// Name fallback: a missing first name is promoted from the last name; if
/// both are empty the row imports as `"Unknown"`. Unparseable emails and
/// phones become NULL with a warning instead of failing the row.
pub fn normalize_row(raw: &RawCustomerRow) -> NormalizedRow {
    let mut warnings = Vec::new();

    let mut first_name = sanitize_name(&raw.first_name);
    let mut last_name = sanitize_name(&raw.last_name);
    if first_name.is_empty() {
        if !last_name.is_empty() {
            warnings.push(RowWarning {
                code: WarningCode::MissingFirstName,
                message: "firstName was empty; promoted lastName".to_string(),
                details: serde_json::json!({ "originalLastName": last_name }),
            });
            first_name = std::mem::take(&mut last_name);
        } else {
            warnings.push(RowWarning {
                code: WarningCode::MissingName,
                message: "firstName/lastName both empty; defaulted to \"Unknown\"".to_string(),
                details: serde_json::Value::Null,
            });
            first_name = "Unknown".to_string();
        }
    }

    let email = normalize_import_email(&raw.email);
    if email.is_invalid() {
        warnings.push(RowWarning {
            code: WarningCode::InvalidEmail,
            message: "email format not recognized; stored as NULL".to_string(),
            details: serde_json::json!({ "value": raw.email }),
        });
    }
    let phone = normalize_import_phone(&raw.phone);
    if phone.is_invalid() {
        warnings.push(RowWarning {
            code: WarningCode::InvalidPhone,
            message: "phone format not recognized; stored as NULL".to_string(),
            details: serde_json::json!({ "value": raw.phone }),
        });
    }

    if email.value().is_none() && phone.value().is_none() {
        warnings.push(RowWarning {
            code: WarningCode::NoDedupKey,
            message: "no email or phone; duplicate detection impossible".to_string(),
            details: serde_json::Value::Null,
        });
    }

    let address = clean_text(&raw.address);
    NormalizedRow {
        customer: ValidCustomer {
            first_name,
            last_name: (!last_name.is_empty()).then_some(last_name),
            email: email.value().map(str::to_string),
            phone: phone.value().map(str::to_string),
            address: (!address.is_empty()).then_some(address),
        },
        warnings,
    }
}

// =============================================================================
// Merge Patch
// =============================================================================

/// Computes the fill-empty-only merge of an incoming row into an existing
/// customer.
///
/// A field appears in the patch only when the stored value is empty and the
/// incoming one is not; populated fields are never overwritten. An empty
/// patch means the row is `unchanged`.
pub fn merge_patch(existing: &Customer, incoming: &ValidCustomer) -> crate::payload::CustomerPatch {
    fn empty(value: Option<&str>) -> bool {
        value.map(str::trim).map_or(true, str::is_empty)
    }
    fn fill(current: Option<&str>, incoming: Option<&str>) -> Option<String> {
        if empty(current) && !empty(incoming) {
            incoming.map(str::to_string)
        } else {
            None
        }
    }

    crate::payload::CustomerPatch {
        first_name: fill(
            Some(existing.first_name.as_str()),
            Some(incoming.first_name.as_str()),
        ),
        last_name: fill(existing.last_name.as_deref(), incoming.last_name.as_deref()),
        email: fill(existing.email.as_deref(), incoming.email.as_deref()),
        phone: fill(existing.phone.as_deref(), incoming.phone.as_deref()),
        address: fill(existing.address.as_deref(), incoming.address.as_deref()),
        is_active: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_header("E-Posta Adresi"), "eposta_adresi");
        assert_eq!(normalize_header("Müşteri Adı"), "musteri_adi");
        assert_eq!(normalize_header("  Telefon  "), "telefon");
        assert_eq!(normalize_header("Soyad!"), "soyad");
        assert_eq!(normalize_header(""), "");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Ali \t Veli \n"), "Ali Veli");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            normalize_import_email(" Ali@Example.COM "),
            Normalized::Valid("ali@example.com".to_string())
        );
        assert_eq!(normalize_import_email(""), Normalized::Empty);
        assert_eq!(normalize_import_email("not-an-email"), Normalized::Invalid);
        assert_eq!(normalize_import_email("a@b"), Normalized::Invalid);
        assert_eq!(normalize_import_email("a@.com"), Normalized::Invalid);
    }

    #[test]
    fn test_phone_normalization_turkish_prefixes() {
        for raw in ["05551234567", "+905551234567", "905551234567", "00905551234567", "5551234567"]
        {
            assert_eq!(
                normalize_import_phone(raw),
                Normalized::Valid("+905551234567".to_string()),
                "raw: {raw}"
            );
        }
    }

    #[test]
    fn test_phone_normalization_foreign_and_garbage() {
        assert_eq!(
            normalize_import_phone("+1 415 555 2671"),
            Normalized::Valid("+14155552671".to_string())
        );
        assert_eq!(normalize_import_phone("12345"), Normalized::Invalid);
        assert_eq!(normalize_import_phone("abc"), Normalized::Invalid);
        assert_eq!(normalize_import_phone(""), Normalized::Empty);
    }

    #[test]
    fn test_column_detection_with_turkish_headers() {
        let headers: Vec<String> = ["Ad", "Soyad", "E-Posta", "Telefon", "Adres"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let map = ColumnMap::detect(&headers);
        assert_eq!(map.first_name, vec![0]);
        assert_eq!(map.last_name, vec![1]);
        assert_eq!(map.email, vec![2]);
        assert_eq!(map.phone, vec![3]);
        assert_eq!(map.address, vec![4]);
    }

    #[test]
    fn test_pick_falls_back_across_matching_columns() {
        let headers: Vec<String> = ["email", "eposta"].iter().map(|s| s.to_string()).collect();
        let map = ColumnMap::detect(&headers);
        let row = map.extract(&["".to_string(), "ali@example.com".to_string()]);
        assert_eq!(row.email, "ali@example.com");
    }

    #[test]
    fn test_normalize_row_name_fallbacks() {
        let promoted = normalize_row(&RawCustomerRow {
            last_name: "Yılmaz".to_string(),
            phone: "05551234567".to_string(),
            ..Default::default()
        });
        assert_eq!(promoted.customer.first_name, "Yılmaz");
        assert_eq!(promoted.customer.last_name, None);
        assert_eq!(promoted.warnings[0].code, WarningCode::MissingFirstName);

        let unknown = normalize_row(&RawCustomerRow::default());
        assert_eq!(unknown.customer.first_name, "Unknown");
        let codes: Vec<_> = unknown.warnings.iter().map(|w| w.code).collect();
        assert!(codes.contains(&WarningCode::MissingName));
        assert!(codes.contains(&WarningCode::NoDedupKey));
    }

    #[test]
    fn test_normalize_row_keeps_row_on_bad_contact() {
        let row = normalize_row(&RawCustomerRow {
            first_name: "Ali".to_string(),
            email: "broken@@".to_string(),
            phone: "123".to_string(),
            ..Default::default()
        });
        assert_eq!(row.customer.email, None);
        assert_eq!(row.customer.phone, None);
        let codes: Vec<_> = row.warnings.iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![
                WarningCode::InvalidEmail,
                WarningCode::InvalidPhone,
                WarningCode::NoDedupKey
            ]
        );
    }

    fn customer(email: Option<&str>, phone: Option<&str>, address: Option<&str>) -> Customer {
        Customer {
            id: 1,
            first_name: "Ali".to_string(),
            last_name: None,
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            address: address.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_patch_fills_only_empty_fields() {
        let existing = customer(Some("ali@example.com"), None, Some("Kadıköy"));
        let incoming = ValidCustomer {
            first_name: "Ali".to_string(),
            last_name: Some("Yılmaz".to_string()),
            email: Some("other@example.com".to_string()),
            phone: Some("+905551234567".to_string()),
            address: Some("Beşiktaş".to_string()),
        };
        let patch = merge_patch(&existing, &incoming);
        assert_eq!(patch.last_name.as_deref(), Some("Yılmaz"));
        assert_eq!(patch.phone.as_deref(), Some("+905551234567"));
        // populated fields stay untouched
        assert_eq!(patch.email, None);
        assert_eq!(patch.address, None);
        assert_eq!(patch.first_name, None);
    }

    #[test]
    fn test_merge_patch_empty_means_unchanged() {
        let existing = customer(Some("ali@example.com"), Some("+905551234567"), Some("Adres"));
        let incoming = ValidCustomer {
            first_name: "Ali".to_string(),
            last_name: None,
            email: Some("ali@example.com".to_string()),
            phone: None,
            address: None,
        };
        let patch = merge_patch(&existing, &incoming);
        assert!(patch.is_empty());
    }
}
