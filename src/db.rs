use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AnalyticsEvent, Application, ApplicationStatus, Scholarship};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_scholarships(
    pool: &PgPool,
    institution_id: Uuid,
) -> anyhow::Result<Vec<Scholarship>> {
    let rows = sqlx::query(
        "SELECT id, institution_id, title, amount, is_active, application_deadline \
         FROM institution_analytics.scholarships \
         WHERE institution_id = $1 \
         ORDER BY title",
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await
    .context("failed to load scholarships")?;

    let mut scholarships = Vec::new();
    for row in rows {
        scholarships.push(Scholarship {
            id: row.get("id"),
            institution_id: row.get("institution_id"),
            title: row.get("title"),
            amount: row.get("amount"),
            is_active: row.get("is_active"),
            application_deadline: row.get("application_deadline"),
        });
    }

    Ok(scholarships)
}

pub async fn fetch_applications(
    pool: &PgPool,
    institution_id: Uuid,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<Application>> {
    let rows = sqlx::query(
        "SELECT a.id, a.scholarship_id, a.student_id, a.status, a.created_at, \
         a.reviewed_at, a.nationality, a.country \
         FROM institution_analytics.applications a \
         JOIN institution_analytics.scholarships s ON s.id = a.scholarship_id \
         WHERE s.institution_id = $1 AND a.created_at >= $2 \
         ORDER BY a.created_at",
    )
    .bind(institution_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .context("failed to load applications")?;

    let mut applications = Vec::new();
    for row in rows {
        let status: String = row.get("status");
        applications.push(Application {
            id: row.get("id"),
            scholarship_id: row.get("scholarship_id"),
            student_id: row.get("student_id"),
            status: ApplicationStatus::from_store(&status),
            created_at: row.get("created_at"),
            reviewed_at: row.get("reviewed_at"),
            nationality: row.get("nationality"),
            country: row.get("country"),
        });
    }

    Ok(applications)
}

pub async fn fetch_events(
    pool: &PgPool,
    institution_id: Uuid,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<AnalyticsEvent>> {
    let rows = sqlx::query(
        "SELECT id, institution_id, event_type, user_id, scholarship_id, created_at, event_data \
         FROM institution_analytics.analytics_events \
         WHERE institution_id = $1 AND created_at >= $2 \
         ORDER BY created_at",
    )
    .bind(institution_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .context("failed to load analytics events")?;

    let mut events = Vec::new();
    for row in rows {
        events.push(AnalyticsEvent {
            id: row.get("id"),
            institution_id: row.get("institution_id"),
            event_type: row.get("event_type"),
            user_id: row.get("user_id"),
            scholarship_id: row.get("scholarship_id"),
            created_at: row.get("created_at"),
            event_data: row.get("event_data"),
        });
    }

    Ok(events)
}

fn seed_id(block: u64, index: u64) -> Uuid {
    Uuid::from_u128(((block as u128) << 64) | index as u128)
}

/// Loads a demo institution with scholarships, applications, and view
/// events spread over the trailing month. Idempotent: ids are fixed and
/// inserts skip existing rows.
pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let institution_id = Uuid::parse_str("9f2c7a1e-5b44-4c43-9e5d-2f6a8c0d1b3a")?;
    let now = Utc::now();

    let scholarships = [
        (seed_id(1, 1), "STEM Excellence Award", 5000.0, true, 40),
        (seed_id(1, 2), "Global Leaders Grant", 10000.0, true, -5),
        (seed_id(1, 3), "Community Impact Bursary", 2500.0, false, 20),
    ];

    for (id, title, amount, is_active, deadline_in_days) in scholarships {
        sqlx::query(
            r#"
            INSERT INTO institution_analytics.scholarships
            (id, institution_id, title, amount, is_active, application_deadline)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                amount = EXCLUDED.amount,
                is_active = EXCLUDED.is_active,
                application_deadline = EXCLUDED.application_deadline
            "#,
        )
        .bind(id)
        .bind(institution_id)
        .bind(title)
        .bind(amount)
        .bind(is_active)
        .bind(now + Duration::days(deadline_in_days))
        .execute(pool)
        .await?;
    }

    let applications = [
        (1u64, seed_id(1, 1), "accepted", "Kenya", 26),
        (2, seed_id(1, 1), "accepted", "India", 21),
        (3, seed_id(1, 1), "rejected", "Brazil", 19),
        (4, seed_id(1, 1), "under_review", "Kenya", 12),
        (5, seed_id(1, 1), "pending", "Vietnam", 8),
        (6, seed_id(1, 1), "pending", "Nigeria", 4),
        (7, seed_id(1, 1), "pending", "Mexico", 2),
        (8, seed_id(1, 2), "rejected", "India", 17),
        (9, seed_id(1, 2), "pending", "Ghana", 6),
        (10, seed_id(1, 2), "pending", "Poland", 1),
    ];

    for (index, scholarship_id, status, nationality, days_ago) in applications {
        sqlx::query(
            r#"
            INSERT INTO institution_analytics.applications
            (id, scholarship_id, student_id, status, created_at, reviewed_at, nationality, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(seed_id(2, index))
        .bind(scholarship_id)
        .bind(seed_id(3, index))
        .bind(status)
        .bind(now - Duration::days(days_ago))
        .bind(matches!(status, "accepted" | "rejected").then(|| now - Duration::days(days_ago - 1)))
        .bind(nationality)
        .bind(Option::<&str>::None)
        .execute(pool)
        .await?;
    }

    // Each application gets a view from the same student the day before
    // it was filed, plus a spread of anonymous browse traffic.
    let mut event_index = 0u64;
    for (index, scholarship_id, _, _, days_ago) in applications {
        event_index += 1;
        insert_event(
            pool,
            seed_id(4, event_index),
            institution_id,
            "scholarship_view",
            seed_id(3, index),
            Some(scholarship_id),
            now - Duration::days(days_ago + 1),
        )
        .await?;
    }
    for day in 0..28u64 {
        for slot in 0..3u64 {
            event_index += 1;
            let scholarship_id = scholarships[(slot % 2) as usize].0;
            insert_event(
                pool,
                seed_id(4, event_index),
                institution_id,
                if slot == 2 {
                    "recommendation_viewed"
                } else {
                    "scholarship_view"
                },
                seed_id(5, day * 3 + slot),
                Some(scholarship_id),
                now - Duration::days(day as i64),
            )
            .await?;
        }
    }

    Ok(institution_id)
}

async fn insert_event(
    pool: &PgPool,
    id: Uuid,
    institution_id: Uuid,
    event_type: &str,
    user_id: Uuid,
    scholarship_id: Option<Uuid>,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO institution_analytics.analytics_events
        (id, institution_id, event_type, user_id, scholarship_id, created_at, event_data)
        VALUES ($1, $2, $3, $4, $5, $6, '{}'::jsonb)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(institution_id)
    .bind(event_type)
    .bind(user_id)
    .bind(scholarship_id)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        institution_id: Uuid,
        event_type: String,
        user_id: Uuid,
        scholarship_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        event_data: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let event_data: serde_json::Value = match row.event_data.as_deref() {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .with_context(|| format!("invalid event_data payload {raw:?}"))?,
            _ => serde_json::json!({}),
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO institution_analytics.analytics_events
            (id, institution_id, event_type, user_id, scholarship_id, created_at, event_data, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.institution_id)
        .bind(&row.event_type)
        .bind(row.user_id)
        .bind(row.scholarship_id)
        .bind(row.created_at)
        .bind(event_data)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
