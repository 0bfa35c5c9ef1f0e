//! Lead records and the requests that create and change them

use crate::classification::{CallDisposition, LeadType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prospective customer moving through creation, assignment and outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub postcode: String,
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_disposition: Option<CallDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Lead-generator that created the lead
    pub created_by: String,
    /// Telemarketer holding the lead; `None` while in the unassigned pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// An agent has recorded an outcome
    pub fn is_touched(&self) -> bool {
        self.call_disposition.is_some()
    }

    /// Disposition recorded and remarks written
    pub fn is_worked(&self) -> bool {
        self.is_touched() && self.remarks.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    pub fn is_booked(&self) -> bool {
        self.call_disposition == Some(CallDisposition::Booked)
    }

    /// Normalized (name, phone digits) pair used for duplicate detection
    pub fn identity_key(&self) -> (String, String) {
        identity_key(&self.name, &self.phone_number)
    }

    /// Apply a patch and stamp `updated_at`
    pub fn apply(&mut self, patch: &LeadPatch, at: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(lead_type) = patch.lead_type {
            self.lead_type = lead_type;
        }
        if let Some(phone) = &patch.phone_number {
            self.phone_number = phone.clone();
        }
        if let Some(street) = &patch.street_address {
            self.street_address = street.clone();
        }
        if let Some(city) = &patch.city {
            self.city = city.clone();
        }
        if let Some(postcode) = &patch.postcode {
            self.postcode = postcode.clone();
        }
        if let Some(email) = &patch.email_address {
            self.email_address = email.clone();
        }
        if let Some(disposition) = patch.call_disposition {
            self.call_disposition = Some(disposition);
        }
        if let Some(remarks) = &patch.remarks {
            self.remarks = Some(remarks.clone());
        }
        match &patch.assignment {
            Some(Assignment::To { agent_id, at }) => {
                self.assigned_to = Some(agent_id.clone());
                self.distributed_at = Some(*at);
            }
            // Released leads keep distributed_at; it orders them ahead of
            // never-distributed ones on the next replenishment.
            Some(Assignment::Clear) => self.assigned_to = None,
            None => {}
        }
        self.updated_at = at;
    }
}

pub(crate) fn identity_key(name: &str, phone: &str) -> (String, String) {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    (name, digits)
}

/// Assignment change carried by a [`LeadPatch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Assignment {
    /// Hand the lead to an agent
    To { agent_id: String, at: DateTime<Utc> },
    /// Return the lead to the unassigned pool
    Clear,
}

/// Store-level partial update of a lead; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub name: Option<String>,
    pub lead_type: Option<LeadType>,
    pub phone_number: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub email_address: Option<String>,
    pub call_disposition: Option<CallDisposition>,
    pub remarks: Option<String>,
    pub assignment: Option<Assignment>,
}

impl LeadPatch {
    /// Claim patch used by the distribution engine
    pub fn assign(agent_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { assignment: Some(Assignment::To { agent_id: agent_id.into(), at }), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lead creation request as submitted by a lead-generator
///
/// Fields are loosely typed so validation can report every offending field
/// at once instead of failing on the first bad value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLead {
    pub name: String,
    #[serde(rename = "type")]
    pub lead_type: String,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub postcode: String,
    pub email_address: String,
    pub remarks: Option<String>,
}

impl NewLead {
    /// Validate and build an unassigned, untouched lead
    pub fn into_lead(self, created_by: &str, now: DateTime<Utc>) -> crate::Result<Lead> {
        let mut invalid = super::blank_fields(&[
            ("name", self.name.as_str()),
            ("type", self.lead_type.as_str()),
            ("phoneNumber", self.phone_number.as_str()),
            ("streetAddress", self.street_address.as_str()),
            ("city", self.city.as_str()),
            ("postcode", self.postcode.as_str()),
            ("emailAddress", self.email_address.as_str()),
        ]);

        let lead_type = self.lead_type.parse::<LeadType>().ok();
        if lead_type.is_none() && !invalid.contains(&"type") {
            invalid.push("type");
        }
        if !self.email_address.trim().is_empty() && !self.email_address.contains('@') {
            invalid.push("emailAddress");
        }

        let lead_type = match lead_type {
            Some(t) if invalid.is_empty() => t,
            _ => return Err(crate::Error::validation(invalid)),
        };

        Ok(Lead {
            id: super::new_id(),
            name: self.name.trim().to_string(),
            lead_type,
            phone_number: self.phone_number.trim().to_string(),
            street_address: self.street_address.trim().to_string(),
            city: self.city.trim().to_string(),
            postcode: self.postcode.trim().to_string(),
            email_address: self.email_address.trim().to_string(),
            call_disposition: None,
            remarks: self.remarks.filter(|r| !r.trim().is_empty()),
            created_by: created_by.to_string(),
            assigned_to: None,
            distributed_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Lead update request: an agent recording an outcome, or an edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    pub phone_number: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub email_address: Option<String>,
    pub call_disposition: Option<String>,
    pub remarks: Option<String>,
    /// Return the lead to the unassigned pool
    pub release: bool,
}

impl LeadUpdate {
    /// Validate supplied fields and build the store patch
    pub fn into_patch(self) -> crate::Result<LeadPatch> {
        let mut invalid: Vec<&str> = Vec::new();
        let mut required = |field: &'static str, value: Option<String>| -> Option<String> {
            match value {
                Some(v) if v.trim().is_empty() => {
                    invalid.push(field);
                    None
                }
                other => other.map(|v| v.trim().to_string()),
            }
        };

        let name = required("name", self.name);
        let phone_number = required("phoneNumber", self.phone_number);
        let street_address = required("streetAddress", self.street_address);
        let city = required("city", self.city);
        let postcode = required("postcode", self.postcode);
        let email_address = required("emailAddress", self.email_address);

        if email_address.as_deref().is_some_and(|e| !e.contains('@')) {
            invalid.push("emailAddress");
        }

        let lead_type = match self.lead_type {
            Some(raw) => match raw.parse::<LeadType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    invalid.push("type");
                    None
                }
            },
            None => None,
        };
        let call_disposition = match self.call_disposition {
            Some(raw) => match raw.parse::<CallDisposition>() {
                Ok(d) => Some(d),
                Err(_) => {
                    invalid.push("callDisposition");
                    None
                }
            },
            None => None,
        };

        if !invalid.is_empty() {
            return Err(crate::Error::validation(invalid));
        }

        Ok(LeadPatch {
            name,
            lead_type,
            phone_number,
            street_address,
            city,
            postcode,
            email_address,
            call_disposition,
            remarks: self.remarks,
            assignment: self.release.then_some(Assignment::Clear),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
    }

    fn valid_request() -> NewLead {
        NewLead {
            name: "Blue Door Cafe".to_string(),
            lead_type: "cafe".to_string(),
            phone_number: "020 7946 0958".to_string(),
            street_address: "12 High Street".to_string(),
            city: "London".to_string(),
            postcode: "N1 9GU".to_string(),
            email_address: "owner@bluedoor.example".to_string(),
            remarks: None,
        }
    }

    #[test]
    fn test_new_lead_starts_unassigned_and_untouched() {
        let lead = valid_request().into_lead("gen-1", now()).unwrap();
        assert_eq!(lead.lead_type, LeadType::Cafe);
        assert_eq!(lead.created_by, "gen-1");
        assert!(!lead.is_assigned());
        assert!(!lead.is_touched());
        assert_eq!(lead.created_at, lead.updated_at);
    }

    #[test]
    fn test_validation_reports_every_bad_field() {
        let request = NewLead {
            name: "  ".to_string(),
            lead_type: "Spaceport".to_string(),
            email_address: "not-an-email".to_string(),
            ..valid_request()
        };
        match request.into_lead("gen-1", now()) {
            Err(crate::Error::Validation { fields }) => {
                assert_eq!(fields, vec!["name", "type", "emailAddress"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_deserialize_as_blank() {
        let request: NewLead = serde_json::from_str(r#"{"name":"Corner Gym"}"#).unwrap();
        let err = request.into_lead("gen-1", now()).unwrap_err();
        match err {
            crate::Error::Validation { fields } => {
                assert!(fields.contains(&"type".to_string()));
                assert!(fields.contains(&"postcode".to_string()));
                assert!(!fields.contains(&"name".to_string()));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_worked_requires_disposition_and_remarks() {
        let mut lead = valid_request().into_lead("gen-1", now()).unwrap();
        lead.call_disposition = Some(CallDisposition::NoAnswer);
        assert!(lead.is_touched());
        assert!(!lead.is_worked());

        lead.remarks = Some("   ".to_string());
        assert!(!lead.is_worked());

        lead.remarks = Some("try again friday".to_string());
        assert!(lead.is_worked());
    }

    #[test]
    fn test_release_keeps_distributed_at() {
        let mut lead = valid_request().into_lead("gen-1", now()).unwrap();
        let at = now() + chrono::Duration::minutes(5);
        lead.apply(&LeadPatch::assign("tm-1", at), at);
        assert_eq!(lead.assigned_to.as_deref(), Some("tm-1"));
        assert_eq!(lead.distributed_at, Some(at));

        let later = at + chrono::Duration::minutes(5);
        let release = LeadPatch { assignment: Some(Assignment::Clear), ..LeadPatch::default() };
        lead.apply(&release, later);
        assert!(!lead.is_assigned());
        assert_eq!(lead.distributed_at, Some(at));
        assert_eq!(lead.updated_at, later);
    }

    #[test]
    fn test_update_parses_disposition_label() {
        let update = LeadUpdate {
            call_disposition: Some("booked".to_string()),
            remarks: Some("Thursday 3pm".to_string()),
            ..LeadUpdate::default()
        };
        let patch = update.into_patch().unwrap();
        assert_eq!(patch.call_disposition, Some(CallDisposition::Booked));
        assert_eq!(patch.assignment, None);
    }

    #[test]
    fn test_update_rejects_blank_and_unknown_values() {
        let update = LeadUpdate {
            city: Some("".to_string()),
            call_disposition: Some("Maybe".to_string()),
            ..LeadUpdate::default()
        };
        match update.into_patch() {
            Err(crate::Error::Validation { fields }) => {
                assert_eq!(fields, vec!["city", "callDisposition"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_key_normalizes() {
        let a = identity_key("Blue  Door Cafe", "020 7946 0958");
        let b = identity_key("blue door cafe ", "(020) 7946-0958");
        assert_eq!(a, b);
    }
}
