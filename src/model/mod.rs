//! Typed payload schemas for the LIMS collections.
//!
//! Request bodies are deserialized into these structs for validation before
//! anything touches the store; the stored document keeps the raw JSON body.
//! Unknown fields are rejected so typos surface as 400s instead of silently
//! persisted garbage.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Field-level checks that serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("field '{field}' must not be empty"))
    } else {
        Ok(())
    }
}

/// Checks a natural-key field. Keys become document identifiers verbatim, so
/// surrounding whitespace is rejected rather than silently normalized away.
fn require_key(field: &str, value: &str) -> Result<(), String> {
    require(field, value)?;
    if value != value.trim() {
        return Err(format!(
            "field '{field}' must not have leading or trailing whitespace"
        ));
    }
    Ok(())
}

/// Sample-information job. The `MTL-YYYY-NNNN` identifier is allocated at
/// insert time, never supplied by the caller.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobPayload {
    pub client: String,
    pub material: String,
    #[serde(default)]
    pub specification: Option<String>,
    #[serde(default)]
    pub sample_description: Option<String>,
    #[serde(default)]
    pub tests_requested: Vec<String>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl Validate for JobPayload {
    fn validate(&self) -> Result<(), String> {
        require("client", &self.client)?;
        require("material", &self.material)
    }
}

/// Sample-preparation request, identified by an allocated `REQ-YYYY-NNN`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrepRequestPayload {
    /// Job the preparation work belongs to (`MTL-YYYY-NNNN`).
    pub job_id: String,
    pub requested_by: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub needed_by: Option<DateTime<Utc>>,
}

impl Validate for PrepRequestPayload {
    fn validate(&self) -> Result<(), String> {
        require("job_id", &self.job_id)?;
        require("requested_by", &self.requested_by)
    }
}

/// Client record, identified by its natural `code`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientPayload {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Validate for ClientPayload {
    fn validate(&self) -> Result<(), String> {
        require_key("code", &self.code)?;
        require("name", &self.name)?;
        if self.code.contains(char::is_whitespace) {
            return Err("field 'code' must not contain whitespace".into());
        }
        Ok(())
    }
}

/// Lab equipment, identified by serial number.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentPayload {
    pub serial_no: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub calibration_due: Option<DateTime<Utc>>,
}

impl Validate for EquipmentPayload {
    fn validate(&self) -> Result<(), String> {
        require_key("serial_no", &self.serial_no)?;
        require("name", &self.name)
    }
}

/// Test report issued for a job, identified by report number.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestReportPayload {
    pub report_no: String,
    pub job_id: String,
    pub test_type: String,
    pub result: String,
    pub tested_by: String,
    #[serde(default)]
    pub tested_at: Option<DateTime<Utc>>,
}

impl Validate for TestReportPayload {
    fn validate(&self) -> Result<(), String> {
        require_key("report_no", &self.report_no)?;
        require("job_id", &self.job_id)?;
        require("test_type", &self.test_type)?;
        require("result", &self.result)?;
        require("tested_by", &self.tested_by)
    }
}

/// Welder certificate, identified by certificate number.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WelderCertificatePayload {
    pub certificate_no: String,
    pub welder_name: String,
    pub process: String,
    #[serde(default)]
    pub pqr_no: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Validate for WelderCertificatePayload {
    fn validate(&self) -> Result<(), String> {
        require_key("certificate_no", &self.certificate_no)?;
        require("welder_name", &self.welder_name)?;
        require("process", &self.process)
    }
}
