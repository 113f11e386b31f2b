use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::analytics::{self, Timeframe};
use crate::db;
use crate::models::{DataPoints, ResponseMetadata, SuccessEnvelope};

/// The analytics entry point's request shape. Both fields arrive as
/// raw strings and are validated before any data access.
#[derive(Debug, Clone)]
pub struct AnalyticsRequest {
    pub institution_id: String,
    pub timeframe: Option<String>,
}

pub fn resolve_institution(raw: &str) -> anyhow::Result<Uuid> {
    let trimmed = raw.trim();
    anyhow::ensure!(!trimmed.is_empty(), "institution id is required");
    Uuid::parse_str(trimmed).with_context(|| format!("invalid institution id {trimmed:?}"))
}

pub fn resolve_timeframe(raw: Option<&str>) -> anyhow::Result<Timeframe> {
    match raw {
        Some(code) => code.parse(),
        None => Ok(Timeframe::default()),
    }
}

pub async fn handle(pool: &PgPool, request: &AnalyticsRequest) -> anyhow::Result<SuccessEnvelope> {
    let institution_id = resolve_institution(&request.institution_id)?;
    let timeframe = resolve_timeframe(request.timeframe.as_deref())?;
    let now = Utc::now();
    let since = now - Duration::days(timeframe.days());

    // Three sequential reads; any failure aborts with no partial result.
    let scholarships = db::fetch_scholarships(pool, institution_id).await?;
    let applications = db::fetch_applications(pool, institution_id, since).await?;
    let events = db::fetch_events(pool, institution_id, since).await?;

    let data = analytics::aggregate(now, timeframe, &scholarships, &applications, &events);

    Ok(SuccessEnvelope {
        success: true,
        metadata: ResponseMetadata {
            institution_id,
            timeframe: timeframe.code().to_string(),
            generated_at: now,
            data_points: DataPoints {
                scholarships: scholarships.len() as u64,
                applications: applications.len() as u64,
                events: events.len() as u64,
            },
        },
        data,
    })
}
