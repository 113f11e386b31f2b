use std::fmt::Write;

use crate::models::{SuccessEnvelope, Trend, TrendDirection};

fn direction_label(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Up => "up",
        TrendDirection::Down => "down",
        TrendDirection::Stable => "stable",
    }
}

fn trend_line(output: &mut String, name: &str, trend: &Trend) {
    let _ = writeln!(
        output,
        "- {}: {} ({:+.1}%)",
        name,
        direction_label(trend.direction),
        trend.value
    );
}

pub fn build_report(envelope: &SuccessEnvelope) -> String {
    let data = &envelope.data;
    let meta = &envelope.metadata;
    let mut output = String::new();

    let _ = writeln!(output, "# Institution Analytics Report");
    let _ = writeln!(
        output,
        "Institution {} over the last {} (generated {})",
        meta.institution_id, meta.timeframe, meta.generated_at
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- {} scholarships ({} active, ${:.0} in active awards)",
        data.overview.total_scholarships,
        data.overview.active_scholarships,
        data.overview.total_award_amount
    );
    let _ = writeln!(
        output,
        "- {} applications: {} accepted, {} rejected, {} pending (success rate {:.1}%)",
        data.overview.total_applications,
        data.overview.accepted_applications,
        data.overview.rejected_applications,
        data.overview.pending_applications,
        data.overview.success_rate
    );
    let _ = writeln!(
        output,
        "- {} scholarship views from {} unique viewers (conversion {:.1}%, bounce {:.1}%)",
        data.engagement.total_views,
        data.engagement.unique_viewers,
        data.engagement.conversion_rate,
        data.engagement.bounce_rate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Scholarships");
    if data.scholarship_performance.is_empty() {
        let _ = writeln!(output, "No scholarships for this institution.");
    } else {
        for row in data.scholarship_performance.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {} applications ({} accepted), {} views, conversion {:.1}%",
                row.title,
                row.applications_count,
                row.accepted_count,
                row.views_count,
                row.conversion_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Applicant Origins");
    if data.geographic.applications_by_country.is_empty() {
        let _ = writeln!(output, "No applications in this window.");
    } else {
        for entry in data.geographic.applications_by_country.iter() {
            let _ = writeln!(output, "- {}: {}", entry.name, entry.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trends & Forecast");
    trend_line(&mut output, "Applications", &data.trends.application_trend);
    trend_line(&mut output, "Acceptance rate", &data.trends.acceptance_trend);
    trend_line(&mut output, "Popularity", &data.trends.popularity_trend);
    let _ = writeln!(
        output,
        "- Forecast: {} applications next week, {} next month ({} confidence)",
        data.predictions.next_week,
        data.predictions.next_month,
        match data.predictions.confidence {
            crate::models::Confidence::Low => "low",
            crate::models::Confidence::Medium => "medium",
        }
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    if data.insights.is_empty() {
        let _ = writeln!(output, "Nothing noteworthy in this window.");
    } else {
        for insight in data.insights.iter() {
            let _ = writeln!(output, "- **{}** — {}", insight.title, insight.description);
            if let Some(suggestion) = &insight.suggestion {
                let _ = writeln!(output, "  - Suggested action: {suggestion}");
            }
        }
    }

    output
}
