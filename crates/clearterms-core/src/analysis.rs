//! The analysis report contract.
//!
//! Field names follow the JSON contract the model is asked to produce
//! (`Risk_Score`, `The_Gist`, ...), so a hardened [`Analysis`] serializes
//! back into exactly the shape the schema in [`crate::schema`] describes.

use serde::{Deserialize, Serialize};

/// Legal-risk category a red flag is filed under.
///
/// `Other` is the catch-all for anything the model labels with an unknown
/// category; it carries no points in the risk rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseType {
    ForcedArbitrationClassWaiver,
    BroadUserContentLicense,
    DataSaleOrAdSharing,
    AiTrainingOnUserData,
    UnilateralPolicyChanges,
    AutoRenewalOrDifficultCancellation,
    NoRefunds,
    BroadLiabilityDisclaimers,
    Other,
}

impl ClauseType {
    /// All clause types, in schema enum order.
    pub const ALL: [ClauseType; 9] = [
        Self::ForcedArbitrationClassWaiver,
        Self::BroadUserContentLicense,
        Self::DataSaleOrAdSharing,
        Self::AiTrainingOnUserData,
        Self::UnilateralPolicyChanges,
        Self::AutoRenewalOrDifficultCancellation,
        Self::NoRefunds,
        Self::BroadLiabilityDisclaimers,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForcedArbitrationClassWaiver => "forced_arbitration_class_waiver",
            Self::BroadUserContentLicense => "broad_user_content_license",
            Self::DataSaleOrAdSharing => "data_sale_or_ad_sharing",
            Self::AiTrainingOnUserData => "ai_training_on_user_data",
            Self::UnilateralPolicyChanges => "unilateral_policy_changes",
            Self::AutoRenewalOrDifficultCancellation => "auto_renewal_or_difficult_cancellation",
            Self::NoRefunds => "no_refunds",
            Self::BroadLiabilityDisclaimers => "broad_liability_disclaimers",
            Self::Other => "other",
        }
    }

    /// Parse a model-supplied label. Unknown labels return `None`.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// Points this category contributes to the risk score.
    pub fn points(&self) -> u32 {
        match self {
            Self::ForcedArbitrationClassWaiver => 20,
            Self::BroadUserContentLicense => 15,
            Self::DataSaleOrAdSharing => 15,
            Self::AiTrainingOnUserData => 15,
            Self::UnilateralPolicyChanges => 10,
            Self::AutoRenewalOrDifficultCancellation => 10,
            Self::NoRefunds => 8,
            Self::BroadLiabilityDisclaimers => 7,
            Self::Other => 0,
        }
    }
}

/// Coarse risk band derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Bands in descending order; the first whose minimum is met wins.
    pub const BANDS: [(u32, RiskLevel); 4] = [
        (75, RiskLevel::Extreme),
        (50, RiskLevel::High),
        (25, RiskLevel::Medium),
        (0, RiskLevel::Low),
    ];

    pub fn from_score(score: u32) -> Self {
        Self::BANDS
            .iter()
            .find(|(min, _)| score >= *min)
            .map(|(_, level)| *level)
            .unwrap_or(RiskLevel::Low)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Extreme => "Extreme",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A risky clause, backed by at least one verbatim quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub clause_type: ClauseType,
    pub title: String,
    pub why_it_matters: String,
    pub evidence_quotes: Vec<String>,
}

/// A right the user holds over their data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRight {
    pub right: String,
    pub details: String,
    pub evidence_quotes: Vec<String>,
}

/// A step the user can take to opt out, cancel, or leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscapeStep {
    pub step: String,
    pub details: String,
    pub evidence_quotes: Vec<String>,
}

/// A schema-valid, evidence-backed risk report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(rename = "Risk_Score")]
    pub risk_score: u32,
    #[serde(rename = "Risk_Level")]
    pub risk_level: RiskLevel,
    #[serde(rename = "The_Gist")]
    pub the_gist: String,
    #[serde(rename = "Red_Flags")]
    pub red_flags: Vec<RedFlag>,
    #[serde(rename = "Data_Rights")]
    pub data_rights: Vec<DataRight>,
    #[serde(rename = "The_Escape")]
    pub the_escape: Vec<EscapeStep>,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    #[serde(rename = "Disclaimers")]
    pub disclaimers: Vec<String>,
}

impl Analysis {
    /// True when none of the evidence-bearing sections has an item.
    pub fn has_no_evidence_items(&self) -> bool {
        self.red_flags.is_empty() && self.data_rights.is_empty() && self.the_escape.is_empty()
    }
}
