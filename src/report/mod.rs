//! Plain-text rendering of analysis results

use crate::analyzer::{FileAnalysis, SystemAnalysis};
use crate::RiskLevel;
use std::fmt::Write;

/// Longest line excerpt shown for a security issue
const LINE_EXCERPT: usize = 80;
/// Compliance remediation items listed in the summary
const TIMELINE_ITEMS: usize = 10;

fn level_marker(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "🔴",
        RiskLevel::High => "🟠",
        RiskLevel::Medium => "🟡",
        RiskLevel::Low => "🟢",
        RiskLevel::Minimal => "⚪",
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

/// Full report for a system analysis
pub fn render_summary(analysis: &SystemAnalysis) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "🛡️ AgentRisk Analysis {}", analysis.analysis_hash);
    let _ = writeln!(out, "═══════════════════════════════════");
    let _ = writeln!(
        out,
        "Date: {}  Catalog: {}  Profile: {}  Mode: {}",
        analysis.analysis_date.format("%Y-%m-%d %H:%M:%S UTC"),
        analysis.catalog_version,
        analysis.profile,
        analysis.mode
    );
    let _ = writeln!(
        out,
        "Files: {} analyzed, {} skipped, {} lines",
        analysis.files_analyzed,
        analysis.skipped_files.len(),
        analysis.total_lines
    );
    let _ = writeln!(
        out,
        "\n{} Global risk score: {:.1} ({})",
        level_marker(analysis.global_level),
        analysis.global_score,
        analysis.global_level
    );
    let _ = writeln!(
        out,
        "Architecture completeness: {:.0}%",
        analysis.architecture.completeness
    );
    if !analysis.architecture.missing.is_empty() {
        let missing: Vec<String> = analysis
            .architecture
            .missing
            .iter()
            .map(|c| c.to_string())
            .collect();
        let _ = writeln!(out, "Missing layers: {}", missing.join(", "));
    }

    if !analysis.cross_file_risks.is_empty() {
        let _ = writeln!(out, "\n── Cross-file risks ──");
        for risk in &analysis.cross_file_risks {
            let _ = writeln!(out, "  {} [{}] {}", level_marker(risk.severity), risk.risk_type, risk.description);
            if !risk.affected_files.is_empty() {
                let _ = writeln!(out, "     Affected: {}", risk.affected_files.join(", "));
            }
        }
    }

    if !analysis.top_risks.is_empty() {
        let _ = writeln!(out, "\n── Top risks ──");
        for risk in &analysis.top_risks {
            let _ = writeln!(
                out,
                "  {} {:>5.1} {} {} ({})",
                level_marker(risk.level),
                risk.score,
                risk.risk_id,
                risk.risk_name,
                risk.filename
            );
        }
    }

    let review = &analysis.system_review;
    let _ = writeln!(out, "\n── System review ({}) ──", review.mode);
    let _ = writeln!(out, "Architecture: {}", review.architecture_assessment);
    let _ = writeln!(out, "Security posture: {}", review.security_posture);
    let _ = writeln!(out, "Scalability: {}", review.scalability_analysis);
    let _ = writeln!(
        out,
        "Maintainability: {:.0}  Technical debt: {}  Deployment: {}",
        review.maintainability_score, review.technical_debt_level, review.deployment_readiness
    );
    if !review.risk_hotspots.is_empty() {
        let _ = writeln!(out, "Hotspots: {}", review.risk_hotspots.join(", "));
    }
    for recommendation in &review.strategic_recommendations {
        let _ = writeln!(out, "  → {}", recommendation);
    }
    for warning in &analysis.warnings {
        let _ = writeln!(out, "  ℹ️ {}", warning);
    }

    let _ = writeln!(out, "\n── Files ──");
    for file in &analysis.files_data {
        out.push_str(&render_file(file));
    }

    for skipped in &analysis.skipped_files {
        let _ = writeln!(out, "  ⏭️ {} skipped: {}", skipped.filename, skipped.reason);
    }

    let compliance = &analysis.compliance;
    let _ = writeln!(out, "\n── Compliance ──");
    let _ = writeln!(
        out,
        "Overall: {:.1} ({})",
        compliance.overall_score, compliance.status
    );
    for framework in &compliance.frameworks {
        let _ = writeln!(
            out,
            "  {:<20} {:>5.1} {:<14} {} violation(s)",
            framework.name,
            framework.score,
            framework.status.to_string(),
            framework.violations_count
        );
    }

    if !compliance.penalty_exposure.is_empty() {
        let _ = writeln!(out, "\nPenalty exposure:");
        for exposure in &compliance.penalty_exposure {
            let _ = writeln!(
                out,
                "  {} {}: {}",
                level_marker(exposure.highest_severity),
                exposure.name,
                exposure.penalty
            );
        }
    }

    let timeline = &compliance.remediation_timeline;
    let _ = writeln!(
        out,
        "\nRemediation: {} immediate, {} short term, {} medium term (estimated {})",
        timeline.immediate, timeline.short_term, timeline.medium_term, timeline.estimated_total_time
    );
    for item in timeline.details.iter().take(TIMELINE_ITEMS) {
        let _ = writeln!(
            out,
            "  {} {} {} in {} - {}",
            level_marker(item.severity),
            item.framework,
            item.article,
            item.filename,
            item.timeline
        );
    }

    out
}

/// One file block
pub fn render_file(file: &FileAnalysis) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "  {} {} [{} / {}] score {:.1} ({})",
        level_marker(file.risk_level),
        file.filename,
        file.file_type,
        file.classification,
        file.file_score,
        file.risk_level
    );
    let _ = writeln!(
        out,
        "     {} {} ({}, relevance {}/10), security review {:.0}/100",
        level_marker(file.profile.criticality),
        file.profile.category,
        truncate(&file.profile.purpose, LINE_EXCERPT),
        file.profile.security_relevance,
        file.security_review.security_score
    );
    for issue in &file.security_review.critical_issues {
        let _ = writeln!(out, "     ❗ {}", truncate(issue, LINE_EXCERPT));
    }
    if let Some(deps) = &file.dependency_risk {
        let _ = writeln!(
            out,
            "     📦 {} dependencies, risk {:.0}",
            deps.dependencies.len(),
            deps.risk_score
        );
        for alert in &deps.vulnerability_alerts {
            let _ = writeln!(out, "        {}", truncate(alert, LINE_EXCERPT));
        }
    }
    for issue in &file.security_issues {
        let _ = writeln!(
            out,
            "     ⚠️ line {} {}: {}",
            issue.line_number,
            issue.issue_type,
            truncate(&issue.line_text, LINE_EXCERPT)
        );
    }
    for warning in &file.warnings {
        let _ = writeln!(out, "     ℹ️ {}", warning);
    }

    out
}
