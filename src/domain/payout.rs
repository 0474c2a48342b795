use super::outcome::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    /// `completed` and `failed` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payout status '{other}'")),
        }
    }
}

/// A payout request as last reported by the payout service.
///
/// Read-only on the client: a newer state only ever arrives by re-fetching.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PayoutRecord {
    pub id: String,
    pub status: PayoutStatus,
    pub amount: Amount,
    /// Human-readable method label, e.g. "UPI" or "Bank transfer".
    pub payout_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Display projection of a payout record.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PayoutView {
    pub headline: String,
    pub detail: String,
    pub status: PayoutStatus,
    pub amount: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Whether the view should keep showing a progress indicator.
    pub in_progress: bool,
}

impl From<&PayoutRecord> for PayoutView {
    fn from(record: &PayoutRecord) -> Self {
        let (headline, detail) = match record.status {
            PayoutStatus::Pending => (
                "Payout requested",
                "Your request is queued and will be processed shortly.",
            ),
            PayoutStatus::Processing => (
                "Payout processing",
                "Your payout is being transferred.",
            ),
            PayoutStatus::Completed => ("Payout completed", "The amount has been sent."),
            PayoutStatus::Failed => (
                "Payout failed",
                "The payout could not be completed. The amount was returned to your wallet.",
            ),
        };
        Self {
            headline: headline.to_string(),
            detail: detail.to_string(),
            status: record.status,
            amount: record.amount.to_string(),
            method: record.payout_method.clone(),
            reference: record.reference_id.clone(),
            note: record.admin_note.clone(),
            in_progress: !record.status.is_terminal(),
        }
    }
}
