use chrono::NaiveDate;
use clap::Args;
use hiring_pulse::config::AppConfig;
use hiring_pulse::error::AppError;
use hiring_pulse::telemetry;
use hiring_pulse::workflows::pulse::{
    route_query, AnalysisRequest, DigestModel, PulseEngine, Stakeholder, TrendResult,
};
use hiring_pulse::workflows::sequences::{SequenceDirectory, SequenceStatImporter};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct DigestArgs {
    /// JSON analysis request (pipeline data plus optional sourcing periods)
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Sequence export CSV replacing the request's current-period sourcing stats
    #[arg(long)]
    pub(crate) sequences: Option<PathBuf>,
    /// Produce a weekly goal for the week starting on this date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) week_start: Option<NaiveDate>,
    /// Print the digest model as JSON instead of the text layout
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QueryArgs {
    /// Question to route, e.g. "who is stuck in GTM?"
    pub(crate) question: String,
    /// JSON analysis request (pipeline data plus optional sourcing periods)
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Sequence export CSV replacing the request's current-period sourcing stats
    #[arg(long)]
    pub(crate) sequences: Option<PathBuf>,
}

pub(crate) fn run_digest(args: DigestArgs) -> Result<(), AppError> {
    let engine = engine()?;
    let mut request = load_request(
        &args.request,
        args.sequences.as_deref(),
        &engine.config().sequences,
    )?;
    if args.week_start.is_some() {
        request.week_start = args.week_start;
    }

    let digest = engine.analyze(&request)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&digest)?);
    } else {
        print!("{}", DigestView(&digest));
    }
    Ok(())
}

pub(crate) fn run_query(args: QueryArgs) -> Result<(), AppError> {
    let engine = engine()?;
    let request = load_request(
        &args.request,
        args.sequences.as_deref(),
        &engine.config().sequences,
    )?;

    let digest = engine.analyze(&request)?;
    let context = route_query(&args.question, &digest);
    info!(topics = ?context.topics, roles = ?context.mentioned_roles, "question routed");
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

fn engine() -> Result<PulseEngine, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(PulseEngine::new(config.analysis.load()?))
}

pub(crate) fn load_request(
    path: &Path,
    sequences: Option<&Path>,
    directory: &SequenceDirectory,
) -> Result<AnalysisRequest, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let mut request: AnalysisRequest = serde_json::from_str(&raw)?;

    if let Some(csv) = sequences {
        let summary = SequenceStatImporter::from_path(csv, directory)?;
        info!(
            path = %csv.display(),
            imported = summary.stats.len(),
            skipped = summary.skipped.len(),
            "sequence export loaded"
        );
        request.sourcing.this_period = summary.stats;
    }
    Ok(request)
}

/// Plain-text layout of a digest, one section per concern.
pub(crate) struct DigestView<'a>(pub(crate) &'a DigestModel);

impl fmt::Display for DigestView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digest = self.0;
        writeln!(f, "HIRING PULSE: {}", digest.date.format("%A, %B %-d, %Y"))?;

        writeln!(f, "\nPIPELINE HEALTH")?;
        for role in &digest.roles {
            writeln!(
                f,
                "- {} ({}) [{}]",
                role.role_name,
                role.priority,
                role.health.label()
            )?;
            let flow: Vec<String> = role
                .stages
                .iter()
                .map(|stage| format!("{}: {}", stage.stage, stage.count))
                .collect();
            writeln!(f, "  {}", flow.join(" -> "))?;
            writeln!(
                f,
                "  Gap to hire: ~{} at the top per hire, {} more screens needed",
                role.gap_to_hire, role.screens_still_needed
            )?;
            if let Some(label) = &role.bottleneck_label {
                writeln!(f, "  Bottleneck: {label}")?;
            }
        }
        let summary = &digest.summary;
        writeln!(
            f,
            "Summary: {} active candidates | ~{} screens still needed | {} stuck | {} bottlenecked",
            summary.active_candidates,
            summary.screens_still_needed,
            summary.stuck_candidates,
            summary.bottlenecked_roles
        )?;

        writeln!(f, "\nSOURCING MOMENTUM")?;
        let totals = &digest.sourcing.totals;
        writeln!(
            f,
            "{} sent | {} replied | {:.1}% reply rate",
            totals.sent, totals.replied, digest.sourcing.reply_rate_pct
        )?;
        match &digest.sourcing.trends {
            Some(trends) => {
                write_trend(f, "Outreach volume", &trends.sent, "")?;
                write_trend(f, "Replies", &trends.replied, "")?;
                write_trend(f, "Reply rate", &trends.reply_rate, "%")?;
            }
            None => writeln!(f, "No comparison period available")?,
        }

        write_list(f, "WHAT'S WORKING", &digest.highlights.working)?;
        write_list(f, "NEEDS ATTENTION", &digest.highlights.needs_attention)?;

        for stakeholder in Stakeholder::ordered() {
            writeln!(f, "\n{} ACTIONS", stakeholder.label().to_uppercase())?;
            match digest.plan_for(stakeholder) {
                Some(plan) if !plan.items.is_empty() => {
                    for item in &plan.items {
                        writeln!(
                            f,
                            "{}. [{}] {}",
                            item.number,
                            item.category.label(),
                            item.action
                        )?;
                    }
                }
                _ => writeln!(f, "- nothing flagged today")?,
            }
        }

        let capacity: u32 = digest.allocations.iter().map(|a| a.outreaches).sum();
        writeln!(f, "\nSOURCING ALLOCATION THIS WEEK ({capacity} outreaches)")?;
        for allocation in &digest.allocations {
            writeln!(
                f,
                "- {}: {} ({:.0}%), {}",
                allocation.role_name,
                allocation.outreaches,
                allocation.share * 100.0,
                allocation.reason
            )?;
        }

        writeln!(f, "\nSTUCK CANDIDATES")?;
        let mut any_stuck = false;
        for role in &digest.roles {
            for candidate in &role.stuck {
                any_stuck = true;
                writeln!(
                    f,
                    "- {}: {}, {} for {} days (limit {})",
                    role.role_name,
                    candidate.name,
                    candidate.stage,
                    candidate.days_in_stage,
                    candidate.threshold
                )?;
            }
        }
        if !any_stuck {
            writeln!(f, "- none, pipeline is moving")?;
        }

        writeln!(f, "\nWEEKLY GOAL")?;
        match &digest.goal {
            Some(goal) => {
                writeln!(
                    f,
                    "Week of {}: {} recruiter screens for {}",
                    goal.week_start, goal.target, goal.role_name
                )?;
                writeln!(f, "{}", goal.rationale)?;
            }
            None => writeln!(f, "No goal requested")?,
        }

        if !digest.issues.is_empty() {
            writeln!(f, "\nDATA ISSUES")?;
            for issue in &digest.issues {
                writeln!(f, "- [{}] {}: {}", issue.kind.label(), issue.entity, issue.detail)?;
            }
        }
        Ok(())
    }
}

fn write_trend(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    trend: &TrendResult,
    unit: &str,
) -> fmt::Result {
    match trend.percent_change {
        Some(change) => writeln!(
            f,
            "{label}: {:.1}{unit} -> {:.1}{unit} ({}, {:+.0}%)",
            trend.last_period,
            trend.this_period,
            trend.momentum.label(),
            change
        ),
        None => writeln!(
            f,
            "{label}: {:.1}{unit} ({})",
            trend.this_period,
            trend.momentum.label()
        ),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, heading: &str, lines: &[String]) -> fmt::Result {
    writeln!(f, "\n{heading}")?;
    if lines.is_empty() {
        return writeln!(f, "- nothing to report");
    }
    for line in lines {
        writeln!(f, "- {line}")?;
    }
    Ok(())
}
