//! License entity, request payloads and lifecycle rules.

use chrono::{DateTime, Months, Utc};
use licensa_core::{Fault, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationErrors};

/// Fee applied when a create request does not state one.
pub const DEFAULT_LICENSE_AMOUNT: f64 = 100.00;

/// Lifecycle status of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LicenseStatus::Pending => "Pending",
            LicenseStatus::Approved => "Approved",
            LicenseStatus::Rejected => "Rejected",
            LicenseStatus::Expired => "Expired",
        };
        f.write_str(name)
    }
}

/// A business license owned by one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: u64,
    pub license_number: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub license_type: String,
    pub status: LicenseStatus,
    pub amount: f64,
    pub expiry_date: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    /// Move a pending license to `target`.
    pub fn decide(&mut self, target: Decision, now: DateTime<Utc>) -> Result<(), Fault> {
        if self.status != LicenseStatus::Pending {
            return Err(Fault::invalid_operation(format!(
                "Cannot change status of a license that is {}",
                self.status
            )));
        }

        self.status = match target {
            Decision::Approve => LicenseStatus::Approved,
            Decision::Reject => LicenseStatus::Rejected,
        };
        self.updated_at = now;
        Ok(())
    }

    /// Extend an approved or expired license by one year.
    ///
    /// The year is added to the current expiry date, or to `now` if the
    /// license has already lapsed. A renewed license is approved.
    pub fn renew(&mut self, now: DateTime<Utc>) -> Result<(), Fault> {
        if !matches!(self.status, LicenseStatus::Approved | LicenseStatus::Expired) {
            return Err(Fault::invalid_operation(format!(
                "Cannot renew a license that is {}",
                self.status
            )));
        }

        let base = self.expiry_date.max(now);
        self.expiry_date = base
            .checked_add_months(Months::new(12))
            .ok_or_else(|| Fault::internal(format!("expiry date overflow renewing license {}", self.id)))?;
        self.status = LicenseStatus::Approved;
        self.updated_at = now;
        Ok(())
    }
}

/// Outcome of an administrator's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Body of `POST /api/licenses`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLicenseRequest {
    #[validate(length(min = 1))]
    pub applicant_name: String,
    #[validate(length(min = 1), email(message = "must be a valid email address"))]
    pub applicant_email: String,
    #[validate(length(min = 1))]
    pub license_type: String,
    pub amount: Option<f64>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Validated input for creating a license.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLicense {
    pub applicant_name: String,
    pub applicant_email: String,
    pub license_type: String,
    pub amount: f64,
    pub expiry_date: DateTime<Utc>,
}

/// Derived checks in reporting order, with the field's wire name.
const CHECKED_FIELDS: [(&str, &str); 3] = [
    ("applicant_name", "applicantName"),
    ("applicant_email", "applicantEmail"),
    ("license_type", "licenseType"),
];

impl CreateLicenseRequest {
    /// Check the request and produce the license input, reporting the first
    /// problem found.
    pub fn into_new_license(self, now: DateTime<Utc>) -> Result<NewLicense, Fault> {
        let request = self.trimmed();
        request.validate().map_err(first_field_fault)?;

        let amount = request.amount.unwrap_or(DEFAULT_LICENSE_AMOUNT);
        if amount.is_nan() || amount <= 0.0 {
            return Err(Fault::invalid("amount", "must be greater than zero"));
        }

        let expiry_date = request
            .expiry_date
            .ok_or_else(|| Fault::missing("expiryDate"))?;
        if expiry_date <= now {
            return Err(Fault::invalid("expiryDate", "must be in the future"));
        }

        Ok(NewLicense {
            applicant_name: request.applicant_name,
            applicant_email: request.applicant_email,
            license_type: request.license_type,
            amount,
            expiry_date,
        })
    }

    fn trimmed(mut self) -> Self {
        self.applicant_name = self.applicant_name.trim().to_string();
        self.applicant_email = self.applicant_email.trim().to_string();
        self.license_type = self.license_type.trim().to_string();
        self
    }
}

/// A failed length check means the value was left blank.
fn first_field_fault(errors: ValidationErrors) -> Fault {
    let field_errors = errors.field_errors();
    for (field, wire_name) in CHECKED_FIELDS {
        let Some(problems) = field_errors.get(field) else {
            continue;
        };
        if problems.iter().any(|problem| problem.code == "length") {
            return Fault::missing(wire_name);
        }
        if let Some(problem) = problems.first() {
            let message = problem
                .message
                .as_ref()
                .map_or_else(|| format!("failed {} check", problem.code), ToString::to_string);
            return Fault::invalid(wire_name, message);
        }
    }
    Fault::invalid("body", errors.to_string())
}

/// Body of `PUT /api/licenses/:id/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    pub reason: Option<String>,
}

impl UpdateStatusRequest {
    /// The decision the request asks for.
    pub fn decision(&self) -> Result<Decision, Fault> {
        match self.status.trim() {
            "" => Err(Fault::missing("status")),
            s if s.eq_ignore_ascii_case("approved") => Ok(Decision::Approve),
            s if s.eq_ignore_ascii_case("rejected") => Ok(Decision::Reject),
            other => Err(Fault::invalid(
                "status",
                format!("must be Approved or Rejected, got {other:?}"),
            )),
        }
    }
}
