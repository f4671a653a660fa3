//! Registry of the collections the service exposes.
//!
//! Each collection declares how its identifiers are minted (allocated by the
//! sequence allocator, or taken from a natural key in the payload) and which
//! payload schema validates request bodies.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::allocator::IdentifierKind;
use crate::model::{
    ClientPayload, EquipmentPayload, JobPayload, PrepRequestPayload, TestReportPayload, Validate,
    WelderCertificatePayload,
};

/// Where a collection's identifiers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Minted by the sequence allocator at insert time.
    Allocated(IdentifierKind),
    /// Taken from the named payload field; uniqueness enforced by the store.
    Natural(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Jobs,
    PrepRequests,
    Clients,
    Equipment,
    TestReports,
    WelderCertificates,
}

pub const ALL_COLLECTIONS: [CollectionKind; 6] = [
    CollectionKind::Jobs,
    CollectionKind::PrepRequests,
    CollectionKind::Clients,
    CollectionKind::Equipment,
    CollectionKind::TestReports,
    CollectionKind::WelderCertificates,
];

impl CollectionKind {
    /// Resolves a URL path segment to a collection.
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "jobs" => Some(Self::Jobs),
            "prep-requests" => Some(Self::PrepRequests),
            "clients" => Some(Self::Clients),
            "equipment" => Some(Self::Equipment),
            "test-reports" => Some(Self::TestReports),
            "welder-certificates" => Some(Self::WelderCertificates),
            _ => None,
        }
    }

    /// Name of the backing store collection.
    pub fn storage_name(&self) -> &'static str {
        match self {
            Self::Jobs => IdentifierKind::Job.collection(),
            Self::PrepRequests => IdentifierKind::PrepRequest.collection(),
            Self::Clients => "clients",
            Self::Equipment => "equipment",
            Self::TestReports => "test_reports",
            Self::WelderCertificates => "welder_certificates",
        }
    }

    pub fn identifier_source(&self) -> IdentifierSource {
        match self {
            Self::Jobs => IdentifierSource::Allocated(IdentifierKind::Job),
            Self::PrepRequests => IdentifierSource::Allocated(IdentifierKind::PrepRequest),
            Self::Clients => IdentifierSource::Natural("code"),
            Self::Equipment => IdentifierSource::Natural("serial_no"),
            Self::TestReports => IdentifierSource::Natural("report_no"),
            Self::WelderCertificates => IdentifierSource::Natural("certificate_no"),
        }
    }

    /// Validates a request body against the collection's payload schema.
    pub fn validate(&self, body: &Value) -> Result<(), String> {
        match self {
            Self::Jobs => check::<JobPayload>(body),
            Self::PrepRequests => check::<PrepRequestPayload>(body),
            Self::Clients => check::<ClientPayload>(body),
            Self::Equipment => check::<EquipmentPayload>(body),
            Self::TestReports => check::<TestReportPayload>(body),
            Self::WelderCertificates => check::<WelderCertificatePayload>(body),
        }
    }

    /// Extracts the natural identifier from a validated body, if this
    /// collection uses one. Taken verbatim: validation has already rejected
    /// keys with surrounding whitespace, so the identifier always matches
    /// the stored body field.
    pub fn natural_identifier(&self, body: &Value) -> Option<String> {
        match self.identifier_source() {
            IdentifierSource::Natural(field) => body
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
            IdentifierSource::Allocated(_) => None,
        }
    }
}

fn check<P: DeserializeOwned + Validate>(body: &Value) -> Result<(), String> {
    let payload: P = serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;
    payload.validate()
}
