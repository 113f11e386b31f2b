use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::insights;
use crate::models::{
    AggregationResult, AnalyticsEvent, Application, ApplicationStatus, Confidence, CountryCount,
    EngagementMetrics, Geographic, Overview, Prediction, Scholarship, ScholarshipPerformance,
    TimeBucket, TimeSeries, Trend, TrendDirection, Trends,
};

pub const VIEW_EVENT: &str = "scholarship_view";
pub const UNSPECIFIED_ORIGIN: &str = "Unspecified";

const GEOGRAPHIC_LIMIT: usize = 10;
const POPULARITY_DEAD_BAND: f64 = 5.0;
const FORECAST_WINDOW_DAYS: usize = 7;

/// Coarse lookback window controlling all date-bounded queries and
/// bucket counts. Unknown codes are rejected at the request boundary
/// instead of silently collapsing to a zero-length window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Week,
    Month,
    Quarter,
    Year,
}

impl Timeframe {
    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::Month
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "1y" => Ok(Self::Year),
            other => Err(anyhow::anyhow!(
                "unknown timeframe {other:?} (expected 7d, 30d, 90d, or 1y)"
            )),
        }
    }
}

/// Derives the full analytics payload for one institution. Pure: the
/// same inputs and `now` always produce the same output.
pub fn aggregate(
    now: DateTime<Utc>,
    timeframe: Timeframe,
    scholarships: &[Scholarship],
    applications: &[Application],
    events: &[AnalyticsEvent],
) -> AggregationResult {
    let today = now.date_naive();
    let days = timeframe.days();
    let midpoint = now - Duration::days(days / 2);
    let views: Vec<&AnalyticsEvent> = events
        .iter()
        .filter(|event| event.event_type == VIEW_EVENT)
        .collect();

    let overview = build_overview(scholarships, applications, views.len() as u64);
    let applications_by_day =
        bucket_by_day(applications.iter().map(|app| app.created_at), days, today);
    let views_by_day = bucket_by_day(views.iter().map(|view| view.created_at), days, today);
    let performance = scholarship_performance(scholarships, applications, &views);
    let engagement = engagement_metrics(applications, &views);
    let predictions = predict(&applications_by_day);
    let insights = insights::generate(
        now,
        scholarships,
        applications,
        &performance,
        &engagement,
        &overview,
    );

    AggregationResult {
        trends: Trends {
            application_trend: application_trend(applications, midpoint),
            acceptance_trend: acceptance_trend(applications, midpoint),
            popularity_trend: popularity_trend(&views, midpoint),
        },
        geographic: Geographic {
            applications_by_country: applications_by_country(applications),
        },
        time_series: TimeSeries {
            applications_by_day,
            views_by_day,
        },
        overview,
        scholarship_performance: performance,
        predictions,
        engagement,
        insights,
    }
}

/// Percentage with a zero-guarded denominator. Consumers never see
/// `NaN` or infinities.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

pub fn build_overview(
    scholarships: &[Scholarship],
    applications: &[Application],
    total_views: u64,
) -> Overview {
    let accepted = count_status(applications, ApplicationStatus::Accepted);
    let rejected = count_status(applications, ApplicationStatus::Rejected);
    let pending = applications
        .iter()
        .filter(|app| {
            matches!(
                app.status,
                ApplicationStatus::Pending | ApplicationStatus::UnderReview
            )
        })
        .count() as u64;
    let total = applications.len() as u64;

    Overview {
        total_scholarships: scholarships.len() as u64,
        active_scholarships: scholarships.iter().filter(|s| s.is_active).count() as u64,
        total_award_amount: scholarships
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.amount)
            .sum(),
        total_applications: total,
        accepted_applications: accepted,
        rejected_applications: rejected,
        pending_applications: pending,
        success_rate: rate(accepted, total),
        total_views,
    }
}

/// Buckets timestamps into one slot per calendar day over the trailing
/// window. Exactly `days` buckets come back, oldest first, the last
/// dated `today`; days without records are zero-filled, never omitted.
pub fn bucket_by_day(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    days: i64,
    today: NaiveDate,
) -> Vec<TimeBucket> {
    let mut counts: HashMap<NaiveDate, u64> = HashMap::new();
    for timestamp in timestamps {
        *counts.entry(timestamp.date_naive()).or_insert(0) += 1;
    }

    (0..days)
        .map(|offset| {
            let date = today - Duration::days(days - 1 - offset);
            TimeBucket {
                date,
                label: date.format("%b %-d").to_string(),
                value: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Relative change between the older and recent half of the window.
/// When the older half is empty the change is reported as 0, not as an
/// infinite jump.
pub fn trend_between(recent: f64, older: f64, dead_band: f64) -> Trend {
    let change = if older > 0.0 {
        (recent - older) / older * 100.0
    } else {
        0.0
    };
    trend_from_change(change, dead_band)
}

fn trend_from_change(change: f64, dead_band: f64) -> Trend {
    let direction = if change > dead_band {
        TrendDirection::Up
    } else if change < -dead_band {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };
    Trend {
        value: change,
        direction,
        percentage: change.abs(),
    }
}

pub fn application_trend(applications: &[Application], midpoint: DateTime<Utc>) -> Trend {
    let recent = applications
        .iter()
        .filter(|app| app.created_at > midpoint)
        .count() as f64;
    let older = applications.len() as f64 - recent;
    trend_between(recent, older, 0.0)
}

/// Percentage-point delta between the two halves' acceptance rates,
/// not a relative ratio.
pub fn acceptance_trend(applications: &[Application], midpoint: DateTime<Utc>) -> Trend {
    let mut recent = (0u64, 0u64);
    let mut older = (0u64, 0u64);
    for app in applications {
        let half = if app.created_at > midpoint {
            &mut recent
        } else {
            &mut older
        };
        half.0 += 1;
        if app.status == ApplicationStatus::Accepted {
            half.1 += 1;
        }
    }
    let recent_rate = rate(recent.1, recent.0);
    let older_rate = rate(older.1, older.0);
    trend_from_change(recent_rate - older_rate, 0.0)
}

/// View-volume trend with a ±5% dead-band so low-volume noise reads as
/// stable.
pub fn popularity_trend(views: &[&AnalyticsEvent], midpoint: DateTime<Utc>) -> Trend {
    let recent = views
        .iter()
        .filter(|view| view.created_at > midpoint)
        .count() as f64;
    let older = views.len() as f64 - recent;
    trend_between(recent, older, POPULARITY_DEAD_BAND)
}

/// Naive forecast from the trailing week of the application series.
pub fn predict(applications_by_day: &[TimeBucket]) -> Prediction {
    let start = applications_by_day
        .len()
        .saturating_sub(FORECAST_WINDOW_DAYS);
    let window: Vec<u64> = applications_by_day[start..]
        .iter()
        .map(|bucket| bucket.value)
        .collect();

    if window.is_empty() {
        return Prediction {
            next_week: 0,
            next_month: 0,
            confidence: Confidence::Low,
        };
    }

    let avg_daily = window.iter().sum::<u64>() as f64 / window.len() as f64;
    let factor = if window.len() == FORECAST_WINDOW_DAYS {
        let early = window[..3].iter().sum::<u64>() as f64 / 3.0;
        let late = window[window.len() - 3..].iter().sum::<u64>() as f64 / 3.0;
        if late > early {
            1.1
        } else if late < early {
            0.9
        } else {
            1.0
        }
    } else {
        1.0
    };

    // A window shorter than a week, or a week with no applications at
    // all, is too thin to call the forecast medium-confidence.
    let confidence = if window.len() < FORECAST_WINDOW_DAYS || window.iter().all(|&v| v == 0) {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    Prediction {
        next_week: (avg_daily * 7.0 * factor).round() as u64,
        next_month: (avg_daily * 30.0 * factor).round() as u64,
        confidence,
    }
}

/// Per-scholarship counters, sorted by application volume. The sort is
/// stable, so ties keep the input order.
pub fn scholarship_performance(
    scholarships: &[Scholarship],
    applications: &[Application],
    views: &[&AnalyticsEvent],
) -> Vec<ScholarshipPerformance> {
    let mut apps_by_scholarship: HashMap<Uuid, Vec<&Application>> = HashMap::new();
    for app in applications {
        apps_by_scholarship
            .entry(app.scholarship_id)
            .or_default()
            .push(app);
    }
    let mut views_by_scholarship: HashMap<Uuid, u64> = HashMap::new();
    for view in views {
        if let Some(scholarship_id) = view.scholarship_id {
            *views_by_scholarship.entry(scholarship_id).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<ScholarshipPerformance> = scholarships
        .iter()
        .map(|scholarship| {
            let apps = apps_by_scholarship
                .get(&scholarship.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let applications_count = apps.len() as u64;
            let accepted_count = apps
                .iter()
                .filter(|app| app.status == ApplicationStatus::Accepted)
                .count() as u64;
            let rejected_count = apps
                .iter()
                .filter(|app| app.status == ApplicationStatus::Rejected)
                .count() as u64;
            let pending_count = apps
                .iter()
                .filter(|app| {
                    matches!(
                        app.status,
                        ApplicationStatus::Pending | ApplicationStatus::UnderReview
                    )
                })
                .count() as u64;
            let views_count = views_by_scholarship
                .get(&scholarship.id)
                .copied()
                .unwrap_or(0);

            ScholarshipPerformance {
                scholarship_id: scholarship.id,
                title: scholarship.title.clone(),
                applications_count,
                accepted_count,
                rejected_count,
                pending_count,
                views_count,
                conversion_rate: rate(applications_count, views_count),
                success_rate: rate(accepted_count, applications_count),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.applications_count.cmp(&a.applications_count));
    rows
}

/// Groups applications by applicant origin (nationality, falling back
/// to country, then a sentinel) and keeps the top entries. Ties break
/// by name so the output is deterministic.
pub fn applications_by_country(applications: &[Application]) -> Vec<CountryCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for app in applications {
        let name = app
            .nationality
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| app.country.as_deref().filter(|value| !value.is_empty()))
            .unwrap_or(UNSPECIFIED_ORIGIN);
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut rows: Vec<CountryCount> = counts
        .into_iter()
        .map(|(name, value)| CountryCount {
            name: name.to_string(),
            value,
        })
        .collect();
    rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(GEOGRAPHIC_LIMIT);
    rows
}

pub fn engagement_metrics(
    applications: &[Application],
    views: &[&AnalyticsEvent],
) -> EngagementMetrics {
    let total_views = views.len() as u64;
    let unique_viewers = views
        .iter()
        .map(|view| view.user_id)
        .collect::<HashSet<Uuid>>()
        .len() as u64;
    let application_count = applications.len() as u64;

    // Average days from the last view of a scholarship to applying for
    // it. Applications with no matching prior view are excluded from
    // the average rather than counted as zero.
    let mut matched = 0u64;
    let mut total_days = 0.0;
    for app in applications {
        let prior_view = views
            .iter()
            .filter(|view| {
                view.user_id == app.student_id
                    && view.scholarship_id == Some(app.scholarship_id)
                    && view.created_at < app.created_at
            })
            .max_by_key(|view| view.created_at);
        if let Some(view) = prior_view {
            total_days += (app.created_at - view.created_at).num_seconds() as f64 / 86_400.0;
            matched += 1;
        }
    }
    let avg_time_to_apply_days = if matched == 0 {
        0.0
    } else {
        total_days / matched as f64
    };

    EngagementMetrics {
        total_views,
        unique_viewers,
        conversion_rate: rate(application_count, total_views),
        engagement_rate: rate(application_count, unique_viewers),
        bounce_rate: rate(total_views.saturating_sub(unique_viewers), total_views),
        avg_time_to_apply_days,
    }
}

fn count_status(applications: &[Application], status: ApplicationStatus) -> u64 {
    applications
        .iter()
        .filter(|app| app.status == status)
        .count() as u64
}
