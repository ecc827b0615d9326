use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::valuation::PortfolioValuation;

/// Outcome of the most recent AI commentary generation for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Success,
    Failed,
}

/// Cached AI-generated portfolio commentary plus the holdings fingerprint
/// it was computed from. Exactly one record per user (upsert semantics).
///
/// `content` is trusted by callers only when `status == Success` and
/// `fingerprint` matches the current holdings fingerprint. A `Failed`
/// record always carries `content: None` — partial or garbled AI output
/// is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub user_id: u64,
    pub fingerprint: String,
    pub content: Option<String>,
    pub status: AnalysisStatus,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn success(user_id: u64, fingerprint: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id,
            fingerprint: fingerprint.into(),
            content: Some(content.into()),
            status: AnalysisStatus::Success,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(user_id: u64, fingerprint: impl Into<String>) -> Self {
        Self {
            user_id,
            fingerprint: fingerprint.into(),
            content: None,
            status: AnalysisStatus::Failed,
            updated_at: Utc::now(),
        }
    }
}

/// What the analysis endpoint hands back to callers.
///
/// Only the narrative `commentary` is ever cached — the valuation figures
/// are recomputed from current prices on every request, since prices drift
/// continuously even when holdings don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Freshly computed valuation (never cached).
    pub valuation: PortfolioValuation,

    /// AI commentary, or the deterministic fallback summary when the last
    /// generation failed. Never empty.
    pub commentary: String,

    /// Status of the persisted record backing this report.
    pub status: AnalysisStatus,

    /// `true` when the commentary was served from the cache rather than
    /// regenerated on this request.
    pub from_cache: bool,
}
