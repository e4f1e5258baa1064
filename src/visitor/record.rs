//! Visit records and their on-disk representation.

use chrono::{Local, NaiveDateTime, SubsecRound};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Wall-clock format used for every persisted and displayed timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Full visitor log keyed by full name, in sign-in order.
pub type VisitorMap = IndexMap<String, VisitRecord>;

/// One visit by a named visitor.
///
/// `signed_out` is derived from `sign_out_time`; it is only written out
/// explicitly to keep the file layout stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredVisit", into = "StoredVisit")]
pub struct VisitRecord {
    pub company: String,
    pub mobile_number: String,
    pub site_contact: String,
    sign_in_time: NaiveDateTime,
    sign_out_time: Option<NaiveDateTime>,
}

impl VisitRecord {
    /// Create an open visit starting at `sign_in_time` (truncated to seconds).
    pub fn new(
        company: impl Into<String>,
        mobile_number: impl Into<String>,
        site_contact: impl Into<String>,
        sign_in_time: NaiveDateTime,
    ) -> Self {
        Self {
            company: company.into(),
            mobile_number: mobile_number.into(),
            site_contact: site_contact.into(),
            sign_in_time: sign_in_time.trunc_subsecs(0),
            sign_out_time: None,
        }
    }

    pub fn sign_in_time(&self) -> NaiveDateTime {
        self.sign_in_time
    }

    pub fn sign_out_time(&self) -> Option<NaiveDateTime> {
        self.sign_out_time
    }

    /// Returns `true` once the visit has been closed.
    pub fn signed_out(&self) -> bool {
        self.sign_out_time.is_some()
    }

    /// Close the visit. Callers must check [`Self::signed_out`] first.
    pub(crate) fn close(&mut self, at: NaiveDateTime) {
        self.sign_out_time = Some(at.trunc_subsecs(0));
    }

    /// Undo a [`Self::close`] after a failed write.
    pub(crate) fn reopen(&mut self) {
        self.sign_out_time = None;
    }
}

/// Current local wall-clock time at second precision.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid {field} '{raw}': {e}"))
}

/// File layout of a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVisit {
    company: String,
    mobile_number: String,
    site_contact: String,
    sign_in_time: String,
    #[serde(default)]
    signed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sign_out_time: Option<String>,
}

impl TryFrom<StoredVisit> for VisitRecord {
    type Error = String;

    fn try_from(stored: StoredVisit) -> Result<Self, Self::Error> {
        let sign_in_time = parse_timestamp("sign_in_time", &stored.sign_in_time)?;
        let sign_out_time = stored
            .sign_out_time
            .as_deref()
            .map(|raw| parse_timestamp("sign_out_time", raw))
            .transpose()?;

        if stored.signed_out != sign_out_time.is_some() {
            return Err(format!(
                "signed_out={} disagrees with sign_out_time={:?}",
                stored.signed_out, stored.sign_out_time
            ));
        }

        Ok(Self {
            company: stored.company,
            mobile_number: stored.mobile_number,
            site_contact: stored.site_contact,
            sign_in_time,
            sign_out_time,
        })
    }
}

impl From<VisitRecord> for StoredVisit {
    fn from(record: VisitRecord) -> Self {
        Self {
            signed_out: record.signed_out(),
            company: record.company,
            mobile_number: record.mobile_number,
            site_contact: record.site_contact,
            sign_in_time: format_timestamp(record.sign_in_time),
            sign_out_time: record.sign_out_time.map(format_timestamp),
        }
    }
}
