use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{
    Application, EngagementMetrics, Insight, InsightKind, Overview, Scholarship,
    ScholarshipPerformance,
};

// Rule thresholds are policy, not estimates.
const LOW_ACCEPTANCE_RATE: f64 = 10.0;
const LOW_ACCEPTANCE_MIN_APPLICATIONS: u64 = 20;
const DIVERSITY_MIN_NATIONALITIES: usize = 10;
const STRONG_CONVERSION_RATE: f64 = 15.0;
const WEAK_CONVERSION_RATE: f64 = 5.0;
const WEAK_CONVERSION_MIN_VIEWS: u64 = 50;

/// Runs the fixed rule list over the aggregated metrics. Rules are
/// independent; each emits at most one insight and none suppresses
/// another.
pub fn generate(
    now: DateTime<Utc>,
    scholarships: &[Scholarship],
    applications: &[Application],
    performance: &[ScholarshipPerformance],
    engagement: &EngagementMetrics,
    overview: &Overview,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(top) = performance.first().filter(|row| row.applications_count > 0) {
        insights.push(Insight {
            kind: InsightKind::TopPerformer,
            title: "Top performing scholarship".to_string(),
            description: format!(
                "{} leads with {} applications in this period.",
                top.title, top.applications_count
            ),
            actionable: false,
            suggestion: None,
        });
    }

    if overview.success_rate < LOW_ACCEPTANCE_RATE
        && overview.total_applications > LOW_ACCEPTANCE_MIN_APPLICATIONS
    {
        insights.push(Insight {
            kind: InsightKind::LowAcceptance,
            title: "Low acceptance rate".to_string(),
            description: format!(
                "Only {:.1}% of {} applications were accepted.",
                overview.success_rate, overview.total_applications
            ),
            actionable: true,
            suggestion: Some(
                "Review award criteria or application guidance so more applicants are a fit."
                    .to_string(),
            ),
        });
    }

    let nationalities: HashSet<&str> = applications
        .iter()
        .filter_map(|app| app.nationality.as_deref())
        .filter(|value| !value.is_empty())
        .collect();
    if nationalities.len() > DIVERSITY_MIN_NATIONALITIES {
        insights.push(Insight {
            kind: InsightKind::GeographicDiversity,
            title: "Broad geographic reach".to_string(),
            description: format!(
                "Applicants from {} nationalities applied in this period.",
                nationalities.len()
            ),
            actionable: false,
            suggestion: None,
        });
    }

    let expired = scholarships
        .iter()
        .filter(|scholarship| scholarship.is_active && scholarship.application_deadline < now)
        .count();
    if expired > 0 {
        insights.push(Insight {
            kind: InsightKind::ExpiredScholarships,
            title: "Active scholarships past their deadline".to_string(),
            description: format!(
                "{expired} active scholarship(s) have application deadlines in the past."
            ),
            actionable: true,
            suggestion: Some(
                "Close or extend these listings so students stop applying to expired awards."
                    .to_string(),
            ),
        });
    }

    // The two conversion branches are mutually exclusive by construction.
    if engagement.conversion_rate > STRONG_CONVERSION_RATE {
        insights.push(Insight {
            kind: InsightKind::Conversion,
            title: "Strong view-to-application conversion".to_string(),
            description: format!(
                "{:.1}% of scholarship views turn into applications.",
                engagement.conversion_rate
            ),
            actionable: false,
            suggestion: None,
        });
    } else if engagement.conversion_rate < WEAK_CONVERSION_RATE
        && engagement.total_views > WEAK_CONVERSION_MIN_VIEWS
    {
        insights.push(Insight {
            kind: InsightKind::Conversion,
            title: "Low view-to-application conversion".to_string(),
            description: format!(
                "Only {:.1}% of {} views became applications.",
                engagement.conversion_rate, engagement.total_views
            ),
            actionable: true,
            suggestion: Some(
                "Clarify eligibility up front and simplify the application form.".to_string(),
            ),
        });
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics;
    use crate::models::{AnalyticsEvent, ApplicationStatus};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn scholarship(now: DateTime<Utc>, title: &str, active: bool, deadline_in_days: i64) -> Scholarship {
        Scholarship {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            title: title.to_string(),
            amount: 2500.0,
            is_active: active,
            application_deadline: now + Duration::days(deadline_in_days),
        }
    }

    fn application(
        now: DateTime<Utc>,
        scholarship_id: Uuid,
        status: ApplicationStatus,
        nationality: &str,
    ) -> Application {
        Application {
            id: Uuid::new_v4(),
            scholarship_id,
            student_id: Uuid::new_v4(),
            status,
            created_at: now - Duration::days(2),
            reviewed_at: None,
            nationality: Some(nationality.to_string()),
            country: None,
        }
    }

    fn view(now: DateTime<Utc>, scholarship_id: Uuid) -> AnalyticsEvent {
        AnalyticsEvent {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            event_type: analytics::VIEW_EVENT.to_string(),
            user_id: Uuid::new_v4(),
            scholarship_id: Some(scholarship_id),
            created_at: now - Duration::days(1),
            event_data: serde_json::json!({}),
        }
    }

    fn run_rules(
        now: DateTime<Utc>,
        scholarships: &[Scholarship],
        applications: &[Application],
        events: &[AnalyticsEvent],
    ) -> Vec<Insight> {
        let views: Vec<&AnalyticsEvent> = events
            .iter()
            .filter(|event| event.event_type == analytics::VIEW_EVENT)
            .collect();
        let performance =
            analytics::scholarship_performance(scholarships, applications, &views);
        let engagement = analytics::engagement_metrics(applications, &views);
        let overview =
            analytics::build_overview(scholarships, applications, views.len() as u64);
        generate(
            now,
            scholarships,
            applications,
            &performance,
            &engagement,
            &overview,
        )
    }

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|insight| insight.kind).collect()
    }

    #[test]
    fn top_performer_needs_at_least_one_application() {
        let now = fixed_now();
        let award = scholarship(now, "Merit Award", true, 30);
        assert!(run_rules(now, &[award.clone()], &[], &[]).is_empty());

        let applications = vec![application(now, award.id, ApplicationStatus::Pending, "Ghana")];
        let insights = run_rules(now, &[award], &applications, &[]);
        assert_eq!(insights[0].kind, InsightKind::TopPerformer);
        assert!(insights[0].description.contains("Merit Award"));
        assert!(!insights[0].actionable);
    }

    #[test]
    fn low_acceptance_requires_both_rate_and_volume() {
        let now = fixed_now();
        let award = scholarship(now, "Merit Award", true, 30);

        // 25 applications, 1 accepted: 4% success over the 20-app floor.
        let mut applications = Vec::new();
        applications.push(application(now, award.id, ApplicationStatus::Accepted, "Ghana"));
        for _ in 0..24 {
            applications.push(application(now, award.id, ApplicationStatus::Rejected, "Ghana"));
        }
        let insights = run_rules(now, &[award.clone()], &applications, &[]);
        let low = insights
            .iter()
            .find(|insight| insight.kind == InsightKind::LowAcceptance)
            .unwrap();
        assert!(low.actionable);
        assert!(low.description.contains("4.0%"));

        // Same rate but only 20 applications: below the volume floor.
        applications.truncate(20);
        let insights = run_rules(now, &[award], &applications, &[]);
        assert!(!kinds(&insights).contains(&InsightKind::LowAcceptance));
    }

    #[test]
    fn diversity_triggers_above_ten_nationalities() {
        let now = fixed_now();
        let award = scholarship(now, "Merit Award", true, 30);
        let applications: Vec<Application> = (0..11)
            .map(|i| {
                application(
                    now,
                    award.id,
                    ApplicationStatus::Pending,
                    &format!("Nationality {i}"),
                )
            })
            .collect();
        let insights = run_rules(now, &[award.clone()], &applications, &[]);
        assert!(kinds(&insights).contains(&InsightKind::GeographicDiversity));

        let insights = run_rules(now, &[award], &applications[..10], &[]);
        assert!(!kinds(&insights).contains(&InsightKind::GeographicDiversity));
    }

    #[test]
    fn expired_rule_counts_only_active_scholarships() {
        let now = fixed_now();
        let expired_active = scholarship(now, "Stale", true, -3);
        let expired_inactive = scholarship(now, "Archived", false, -30);
        let current = scholarship(now, "Fresh", true, 20);

        let insights = run_rules(
            now,
            &[expired_active, expired_inactive, current],
            &[],
            &[],
        );
        let insight = insights
            .iter()
            .find(|insight| insight.kind == InsightKind::ExpiredScholarships)
            .unwrap();
        assert!(insight.actionable);
        assert!(insight.description.starts_with("1 active"));
    }

    #[test]
    fn conversion_branches_are_mutually_exclusive() {
        let now = fixed_now();
        let award = scholarship(now, "Merit Award", true, 30);

        // 20 views, 4 applications: 20% conversion, the strong branch.
        let events: Vec<AnalyticsEvent> = (0..20).map(|_| view(now, award.id)).collect();
        let applications: Vec<Application> = (0..4)
            .map(|_| application(now, award.id, ApplicationStatus::Pending, "Ghana"))
            .collect();
        let insights = run_rules(now, &[award.clone()], &applications, &events);
        let conversion = insights
            .iter()
            .find(|insight| insight.kind == InsightKind::Conversion)
            .unwrap();
        assert!(!conversion.actionable);

        // 60 views, 2 applications: 3.3% conversion over the view floor.
        let events: Vec<AnalyticsEvent> = (0..60).map(|_| view(now, award.id)).collect();
        let applications: Vec<Application> = (0..2)
            .map(|_| application(now, award.id, ApplicationStatus::Pending, "Ghana"))
            .collect();
        let insights = run_rules(now, &[award.clone()], &applications, &events);
        let conversion = insights
            .iter()
            .find(|insight| insight.kind == InsightKind::Conversion)
            .unwrap();
        assert!(conversion.actionable);

        // 40 views, 4 applications: 10% sits between the thresholds.
        let events: Vec<AnalyticsEvent> = (0..40).map(|_| view(now, award.id)).collect();
        let applications: Vec<Application> = (0..4)
            .map(|_| application(now, award.id, ApplicationStatus::Pending, "Ghana"))
            .collect();
        let insights = run_rules(now, &[award], &applications, &events);
        assert!(!kinds(&insights).contains(&InsightKind::Conversion));
    }

    #[test]
    fn rules_emit_in_fixed_order_and_do_not_suppress_each_other() {
        let now = fixed_now();
        let award = scholarship(now, "Stale Flagship", true, -1);
        let mut applications = Vec::new();
        applications.push(application(now, award.id, ApplicationStatus::Accepted, "N 0"));
        for i in 1..25 {
            applications.push(application(
                now,
                award.id,
                ApplicationStatus::Rejected,
                &format!("N {i}"),
            ));
        }
        let events: Vec<AnalyticsEvent> = (0..600).map(|_| view(now, award.id)).collect();

        let insights = run_rules(now, &[award], &applications, &events);
        assert_eq!(
            kinds(&insights),
            vec![
                InsightKind::TopPerformer,
                InsightKind::LowAcceptance,
                InsightKind::GeographicDiversity,
                InsightKind::ExpiredScholarships,
                InsightKind::Conversion,
            ]
        );
    }
}
