use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Args;
use std::sync::Arc;

use charter_score::config::AppConfig;
use charter_score::error::AppError;
use charter_score::scoring::period::{last_day_of_month, months_in_range, weeks_in_month};
use charter_score::scoring::{
    CharterData, EntityRef, Group, GroupId, GroupKind, InMemoryScoringStore, Item, ItemId,
    PeriodType, PeriodicTarget, Polarity, Project, ProjectId, Realization, RealizationId, Rollup,
    ScoringService, TargetId, WindowRequest,
};

const DEMO_YEAR: i32 = 2024;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date used for statuses and open windows (defaults to 2024-06-30).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Reporting month for the resume section as YYYY-MM (defaults to March 2024).
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: Option<NaiveDate>,
    /// Score without timeline weighting.
    #[arg(long)]
    pub(crate) no_timeline: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        month,
        no_timeline,
    } = args;

    let today = today.unwrap_or_else(|| day(6, 30));
    let month = month.unwrap_or_else(|| day(3, 1));

    let mut scoring = AppConfig::load()?.scoring;
    if no_timeline {
        scoring.timeline_weighting = false;
    }
    let service = ScoringService::new(Arc::new(demo_store()), scoring).with_today(today);

    println!("Charter scoring demo (today {today})");
    println!("Project scores (full range)");
    for project in service.projects()? {
        let score = service.score(EntityRef::Project(project.id), WindowRequest::unbounded());
        let status = service.project_status(project.id, None);
        match (score, status) {
            (Ok(score), Ok(status)) => println!(
                "- [{}] {} ({}): {:.1}% | {}",
                project.id,
                project.name,
                project.department,
                score.score.unwrap_or(0.0) * 100.0,
                status.status_label
            ),
            (Err(err), _) | (_, Err(err)) => {
                println!("- [{}] {}: unavailable ({})", project.id, project.name, err)
            }
        }
    }

    println!("\nMonthly resume for {}", month.format("%B %Y"));
    for project in service.projects()? {
        match service.project_resume(project.id, month) {
            Ok(resume) => println!(
                "- {}{}: monthly {:.1}% ({}) | up to month {:.1}% ({}) | baseline {:.2}",
                resume.project_name,
                if resume.is_child { " [child]" } else { "" },
                resume.monthly.score * 100.0,
                resume.monthly.status.label(),
                resume.up_to_month.score * 100.0,
                resume.up_to_month.status.label(),
                resume.baseline
            ),
            Err(err) => println!("- {}: resume unavailable ({})", project.name, err),
        }
    }

    println!("\nChild projects");
    for child in service.child_projects()? {
        println!(
            "- {} -> item '{}' of {}: {:.1}%",
            child.child_name,
            child.parent_item_name.as_deref().unwrap_or("?"),
            child.parent_project_name.as_deref().unwrap_or("?"),
            child.score * 100.0
        );
    }

    println!("\nWeight audit");
    for project in service.projects()? {
        let audit = service.weight_audit(project.id)?;
        if audit.is_clean() {
            println!("- {}: clean", project.name);
        }
        for warning in &audit.warnings {
            println!("- {}: {}", project.name, warning.summary());
        }
    }

    println!("\nStaff onboarding by week");
    for point in service.item_series(ItemId(2))?.into_iter().take(8) {
        match point.score {
            Some(score) => println!("- {}: {:.1}%", point.period.label, score * 100.0),
            None => println!("- {}: no data", point.period.label),
        }
    }

    Ok(())
}

/// Seed charter: a regional expansion whose fit-out item is delegated to a child project.
pub(crate) fn demo_store() -> InMemoryScoringStore {
    let mut charter = DemoCharter::default();
    let year_start = day(1, 1);
    let year_end = day(12, 31);
    let first_half = months_in_range(year_start, day(6, 30));

    charter.data.projects.push(Project {
        id: ProjectId(1),
        name: "Regional expansion".to_string(),
        department: "Operations".to_string(),
        responsible: "Regional director".to_string(),
        start_date: year_start,
        end_date: year_end,
        parent_item_id: None,
    });
    charter.data.projects.push(Project {
        id: ProjectId(2),
        name: "Branch fit-out works".to_string(),
        department: "Facilities".to_string(),
        responsible: "Site manager".to_string(),
        start_date: year_start,
        end_date: day(6, 30),
        parent_item_id: Some(ItemId(1)),
    });
    charter.group(1, 1, GroupKind::Activity, 60.0);
    charter.group(2, 1, GroupKind::Success, 40.0);
    charter.group(3, 2, GroupKind::Activity, 100.0);

    charter.item(1, 1, "Branch fit-out", 50.0, Polarity::Max, Rollup::Summary);
    charter.item(2, 1, "Staff onboarding", 50.0, Polarity::Max, Rollup::Summary);
    charter.item(3, 2, "New accounts", 70.0, Polarity::Max, Rollup::Summary);
    charter.item(4, 2, "Complaint rate", 30.0, Polarity::Min, Rollup::Latest);
    charter.item(5, 3, "Budget variance", 40.0, Polarity::Stable, Rollup::Average);
    charter.item(6, 3, "Construction progress", 60.0, Polarity::Max, Rollup::Latest);
    charter.data.items[1].period_type = PeriodType::Weekly;
    charter.data.items[2].uom = "accounts".to_string();

    charter.target(6, year_start, day(6, 30), 100.0);
    for (index, month) in first_half.iter().enumerate() {
        let month_end = last_day_of_month(*month);
        charter.target(2, *month, month_end, 4.0);
        charter.target(3, *month, month_end, 20.0);
        charter.target(4, *month, month_end, 5.0);
        charter.target(5, *month, month_end, 100.0);

        if index >= 3 {
            continue;
        }
        let step = index as f64;
        for week in weeks_in_month(DEMO_YEAR, index as u32 + 1) {
            charter.realize(2, week.thursday, 1.0, None);
        }
        charter.realize(3, *month + Duration::days(14), 12.0 + 4.0 * step, None);
        charter.realize(5, *month + Duration::days(9), 96.0 + 3.0 * step, None);
        charter.realize(6, month_end, 20.0 + 25.0 * step, None);

        let complaint_day = *month + Duration::days(27);
        charter.realize(4, complaint_day, 6.5 - step, at(complaint_day, 9));
        // corrected later the same day
        charter.realize(4, complaint_day, 6.0 - step, at(complaint_day, 17));
    }

    InMemoryScoringStore::new(charter.data)
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(DEMO_YEAR, month, day).unwrap_or_default()
}

fn at(date: NaiveDate, hour: u32) -> Option<NaiveDateTime> {
    date.and_hms_opt(hour, 0, 0)
}

#[derive(Default)]
struct DemoCharter {
    data: CharterData,
}

impl DemoCharter {
    fn group(&mut self, id: u64, project: u64, kind: GroupKind, weight: f64) {
        self.data.groups.push(Group {
            id: GroupId(id),
            project_id: ProjectId(project),
            kind,
            weight,
        });
    }

    fn item(
        &mut self,
        id: u64,
        group: u64,
        name: &str,
        weight: f64,
        polarity: Polarity,
        rollup: Rollup,
    ) {
        self.data.items.push(Item {
            id: ItemId(id),
            group_id: GroupId(group),
            name: name.to_string(),
            weight,
            uom: "%".to_string(),
            polarity,
            period_type: PeriodType::Monthly,
            rollup,
            start_date: Some(day(1, 1)),
            end_date: Some(day(6, 30)),
        });
    }

    fn target(&mut self, item: u64, start: NaiveDate, end: NaiveDate, value: f64) {
        let id = TargetId(self.data.targets.len() as u64 + 1);
        self.data.targets.push(PeriodicTarget {
            id,
            item_id: ItemId(item),
            period_start: start,
            period_end: end,
            target_value: value,
        });
    }

    fn realize(
        &mut self,
        item: u64,
        date: NaiveDate,
        value: f64,
        recorded_at: Option<NaiveDateTime>,
    ) {
        let id = RealizationId(self.data.realizations.len() as u64 + 1);
        self.data.realizations.push(Realization {
            id,
            item_id: ItemId(item),
            date,
            value,
            recorded_at,
        });
    }
}
