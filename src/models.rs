use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scholarship owned by an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scholarship {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub is_active: bool,
    pub application_deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    /// Maps a stored status string to the typed status. Unknown values
    /// default to `Pending` at the intake boundary.
    pub fn from_store(value: &str) -> Self {
        match value {
            "under_review" => Self::UnderReview,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "withdrawn" => Self::Withdrawn,
            _ => Self::Pending,
        }
    }
}

/// One candidacy against a scholarship. Status is mutated externally;
/// the analytics engine never writes these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub scholarship_id: Uuid,
    pub student_id: Uuid,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub nationality: Option<String>,
    pub country: Option<String>,
}

/// One entry in the append-only event log attributed to an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub event_type: String,
    pub user_id: Uuid,
    pub scholarship_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub event_data: serde_json::Value,
}

/// One calendar-day slot in a time series. `date` is the canonical join
/// key across series; `label` is the short day/month form for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub date: NaiveDate,
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Delta between the older and the recent half of the lookback window.
/// `value` is signed; `percentage` is its magnitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub value: f64,
    pub direction: TrendDirection,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub next_week: u64,
    pub next_month: u64,
    pub confidence: Confidence,
}

/// Per-scholarship counters. Field names stay snake_case on the wire;
/// the consuming dashboard reads them that way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScholarshipPerformance {
    pub scholarship_id: Uuid,
    pub title: String,
    pub applications_count: u64,
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub pending_count: u64,
    pub views_count: u64,
    pub conversion_rate: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub total_views: u64,
    pub unique_viewers: u64,
    pub conversion_rate: f64,
    pub engagement_rate: f64,
    pub bounce_rate: f64,
    pub avg_time_to_apply_days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TopPerformer,
    LowAcceptance,
    GeographicDiversity,
    ExpiredScholarships,
    Conversion,
}

/// A rule-triggered narrative fact about the institution's metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_scholarships: u64,
    pub active_scholarships: u64,
    pub total_award_amount: f64,
    pub total_applications: u64,
    pub accepted_applications: u64,
    pub rejected_applications: u64,
    pub pending_applications: u64,
    pub success_rate: f64,
    pub total_views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub applications_by_day: Vec<TimeBucket>,
    pub views_by_day: Vec<TimeBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Geographic {
    pub applications_by_country: Vec<CountryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub application_trend: Trend,
    pub acceptance_trend: Trend,
    pub popularity_trend: Trend,
}

/// Everything the engine derives for one institution and timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub overview: Overview,
    pub time_series: TimeSeries,
    pub geographic: Geographic,
    pub scholarship_performance: Vec<ScholarshipPerformance>,
    pub trends: Trends,
    pub predictions: Prediction,
    pub engagement: EngagementMetrics,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoints {
    pub scholarships: u64,
    pub applications: u64,
    pub events: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub institution_id: Uuid,
    pub timeframe: String,
    pub generated_at: DateTime<Utc>,
    pub data_points: DataPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub data: AggregationResult,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: "INSTITUTION_ANALYTICS_ERROR".to_string(),
                message: message.into(),
            },
        }
    }
}
