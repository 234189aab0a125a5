use charter_score::error::AppError;
use charter_score::scoring::period;
use charter_score::scoring::{
    EntityRef, GroupId, ItemId, PeriodType, ProjectId, ProjectResume, ScoreView, WindowRequest,
};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::infra::{cli_service, parse_date, parse_month, parse_period_type};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum EntityKind {
    Item,
    Group,
    Project,
}

impl EntityKind {
    fn entity(self, id: u64) -> EntityRef {
        match self {
            EntityKind::Item => EntityRef::Item(ItemId(id)),
            EntityKind::Group => EntityRef::Group(GroupId(id)),
            EntityKind::Project => EntityRef::Project(ProjectId(id)),
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Kind of entity to score
    #[arg(value_enum)]
    pub(crate) kind: EntityKind,
    /// Entity id
    pub(crate) id: u64,
    /// Window start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Window end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: Option<NaiveDate>,
    /// Override "today" for open windows and timeline weighting
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Charter snapshot (JSON); defaults to APP_DATA_PATH or the demo charter
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Score without timeline weighting
    #[arg(long)]
    pub(crate) no_timeline: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ResumeArgs {
    /// Project id
    pub(crate) project: u64,
    /// Reporting month (YYYY-MM)
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: NaiveDate,
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    #[arg(long)]
    pub(crate) no_timeline: bool,
}

#[derive(Args, Debug)]
pub(crate) struct PeriodsArgs {
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: NaiveDate,
    /// weekly, monthly, quarterly, semester, or yearly
    #[arg(long = "type", value_parser = parse_period_type, default_value = "monthly")]
    pub(crate) period_type: PeriodType,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let service = cli_service(args.data, args.today, args.no_timeline)?;
    let window = WindowRequest {
        start: args.start,
        end: args.end,
    };
    let view = service.score(args.kind.entity(args.id), window)?;
    println!("{}", render_score(&view));
    Ok(())
}

pub(crate) fn run_resume(args: ResumeArgs) -> Result<(), AppError> {
    let service = cli_service(args.data, args.today, args.no_timeline)?;
    let resume = service.project_resume(ProjectId(args.project), args.month)?;
    for line in render_resume(&resume) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn run_periods(args: PeriodsArgs) -> Result<(), AppError> {
    for period in period::generate(args.start, args.end, args.period_type) {
        println!("{:<22} {} .. {}", period.label, period.start, period.end);
    }
    Ok(())
}

fn render_score(view: &ScoreView) -> String {
    let window = match (view.window_start, view.window_end) {
        (None, None) => "full range".to_string(),
        (start, end) => format!(
            "{} .. {}",
            start.map_or_else(|| "open".to_string(), |date| date.to_string()),
            end.map_or_else(|| "today".to_string(), |date| date.to_string())
        ),
    };
    match view.score {
        Some(score) => format!("{} [{}]: {:.1}%", view.entity, window, score * 100.0),
        None => format!("{} [{}]: no data", view.entity, window),
    }
}

fn render_resume(resume: &ProjectResume) -> Vec<String> {
    vec![
        format!(
            "{}{} ({} .. {})",
            resume.project_name,
            if resume.is_child { " [child project]" } else { "" },
            resume.month_start,
            resume.month_end
        ),
        format!("  Baseline: {:.2}", resume.baseline),
        format!(
            "  Monthly: {:.1}% -> {}",
            resume.monthly.score * 100.0,
            resume.monthly.status.label()
        ),
        format!(
            "  Up to month: {:.1}% -> {}",
            resume.up_to_month.score * 100.0,
            resume.up_to_month.status.label()
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn score_lines_show_window_and_percentage() {
        let view = ScoreView {
            entity: EntityKind::Project.entity(4),
            window_start: Some(date(2024, 1, 1)),
            window_end: None,
            score: Some(0.75),
        };
        assert_eq!(render_score(&view), "project 4 [2024-01-01 .. today]: 75.0%");

        let unknown = ScoreView {
            entity: EntityKind::Item.entity(9),
            window_start: None,
            window_end: None,
            score: None,
        };
        assert_eq!(render_score(&unknown), "item 9 [full range]: no data");
    }
}
