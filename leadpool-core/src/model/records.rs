//! Append-only records: bookings, notifications and the email log

use crate::classification::Team;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized snapshot of a lead booked by a telemarketer
///
/// Carries names rather than references so it stays meaningful after the
/// lead or the user is edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub lead_id: String,
    pub lead_name: String,
    pub telemarketer_id: String,
    pub telemarketer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Booking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub lead_id: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn for_booking(booking: &Booking) -> Self {
        let team = booking.team.map(|t| format!(" ({})", t)).unwrap_or_default();
        Self {
            id: super::new_id(),
            kind: NotificationKind::Booking,
            message: format!(
                "{}{} booked {}",
                booking.telemarketer_name, team, booking.lead_name
            ),
            lead_id: booking.lead_id.clone(),
            created_at: booking.created_at,
            read: false,
        }
    }
}

/// Sent email, counted on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailEntry {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEmail {
    pub recipient: String,
    pub subject: String,
}

impl NewEmail {
    pub fn into_entry(self, now: DateTime<Utc>) -> crate::Result<EmailEntry> {
        let invalid = super::blank_fields(&[
            ("recipient", self.recipient.as_str()),
            ("subject", self.subject.as_str()),
        ]);
        if !invalid.is_empty() {
            return Err(crate::Error::validation(invalid));
        }
        Ok(EmailEntry {
            id: super::new_id(),
            recipient: self.recipient.trim().to_string(),
            subject: self.subject.trim().to_string(),
            sent_at: now,
            updated_at: now,
        })
    }
}
