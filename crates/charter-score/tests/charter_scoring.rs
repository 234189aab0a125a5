use std::sync::Arc;

use charter_score::config::ScoringConfig;
use charter_score::scoring::period::{assigned_period_label, weeks_in_month};
use charter_score::scoring::{
    EntityRef, Group, GroupId, GroupKind, InMemoryScoringStore, Item, ItemId, PeriodType,
    PeriodicTarget, Polarity, Project, ProjectId, Realization, RealizationId, RepositoryError,
    Rollup, ScoringService, TargetId, WindowRequest,
};
use chrono::NaiveDate;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn flat_config() -> ScoringConfig {
    ScoringConfig {
        timeline_weighting: false,
        ..ScoringConfig::default()
    }
}

fn project(id: u64, name: &str) -> Project {
    Project {
        id: ProjectId(id),
        name: name.to_string(),
        department: "Field Operations".to_string(),
        responsible: "Regional lead".to_string(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        parent_item_id: None,
    }
}

fn weekly_item(id: u64, group: u64) -> Item {
    Item {
        id: ItemId(id),
        group_id: GroupId(group),
        name: format!("Weekly visits {id}"),
        weight: 100.0,
        uom: "%".to_string(),
        polarity: Polarity::Max,
        period_type: PeriodType::Weekly,
        rollup: Rollup::Summary,
        start_date: Some(date(2024, 1, 1)),
        end_date: Some(date(2024, 12, 31)),
    }
}

/// Parent project whose only item is fed by weekly entries on each week's Thursday.
fn weekly_store() -> InMemoryScoringStore {
    let store = InMemoryScoringStore::default();
    store.add_project(project(1, "Store visits")).expect("project");
    store
        .add_group(Group {
            id: GroupId(1),
            project_id: ProjectId(1),
            kind: GroupKind::Activity,
            weight: 100.0,
        })
        .expect("group");
    store.add_item(weekly_item(1, 1)).expect("item");
    store
        .add_target(PeriodicTarget {
            id: TargetId(1),
            item_id: ItemId(1),
            period_start: date(2024, 3, 1),
            period_end: date(2024, 3, 31),
            target_value: 40.0,
        })
        .expect("target");

    for (index, week) in weeks_in_month(2024, 3).into_iter().enumerate() {
        assert_eq!(assigned_period_label(week.thursday), "March 2024");
        store
            .record_realization(Realization {
                id: RealizationId(index as u64 + 1),
                item_id: ItemId(1),
                date: week.thursday,
                value: 10.0,
                recorded_at: None,
            })
            .expect("weekly realization");
    }
    store
}

#[test]
fn weekly_entries_on_thursdays_complete_the_monthly_target() {
    let service = ScoringService::new(Arc::new(weekly_store()), flat_config())
        .with_today(date(2024, 12, 31));
    let march = WindowRequest::between(date(2024, 3, 1), date(2024, 3, 31));

    let item = service
        .score(EntityRef::Item(ItemId(1)), march)
        .expect("item score");
    assert_eq!(item.score, Some(1.0));

    let project = service
        .score(EntityRef::Project(ProjectId(1)), march)
        .expect("project score");
    assert_eq!(project.score, Some(1.0));
}

#[test]
fn child_project_replaces_item_evidence_until_unlinked() {
    let store = Arc::new(weekly_store());
    store.add_project(project(2, "Pilot stores")).expect("child");
    store
        .add_group(Group {
            id: GroupId(2),
            project_id: ProjectId(2),
            kind: GroupKind::Activity,
            weight: 100.0,
        })
        .expect("child group");
    store.add_item(weekly_item(2, 2)).expect("child item");
    store
        .add_target(PeriodicTarget {
            id: TargetId(2),
            item_id: ItemId(2),
            period_start: date(2024, 3, 1),
            period_end: date(2024, 3, 31),
            target_value: 10.0,
        })
        .expect("child target");
    store
        .record_realization(Realization {
            id: RealizationId(50),
            item_id: ItemId(2),
            date: date(2024, 3, 14),
            value: 2.5,
            recorded_at: None,
        })
        .expect("child realization");
    store
        .link_child_project(ProjectId(2), ItemId(1))
        .expect("link child");

    let service = ScoringService::new(Arc::clone(&store), flat_config())
        .with_today(date(2024, 12, 31));
    let march = WindowRequest::between(date(2024, 3, 1), date(2024, 3, 31));
    let parent = service
        .score(EntityRef::Project(ProjectId(1)), march)
        .expect("parent score");
    assert_eq!(parent.score, Some(0.25));

    let err = store.delete_item(ItemId(1)).expect_err("linked item protected");
    assert!(matches!(err, RepositoryError::LinkedChildProject { .. }));

    let children = service.child_projects().expect("children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].parent_project_id, Some(ProjectId(1)));
}

#[test]
fn lenient_json_snapshot_loads_and_scores() {
    let document = r#"{
        "projects": [{
            "id": 1, "name": "Imported", "department": "Finance", "responsible": "Controller",
            "start_date": "2024-01-01", "end_date": "2024-12-31", "parent_item_id": null
        }],
        "groups": [{ "id": 1, "project_id": 1, "kind": "ACTIVITY", "weight": 100.0 }],
        "items": [
            {
                "id": 1, "group_id": 1, "name": "Ledger close", "weight": 50.0, "uom": "%",
                "polarity": "MAX", "period_type": "monthly", "rollup": "LATEST",
                "start_date": "2024-01-01", "end_date": "2024-12-31"
            },
            {
                "id": 2, "group_id": 1, "name": "Legacy metric", "weight": 50.0, "uom": "%",
                "polarity": "UPWARD", "period_type": "monthly", "rollup": "SUMMARY",
                "start_date": "not a date", "end_date": null
            }
        ],
        "targets": [
            { "id": 1, "item_id": 1, "period_start": "2024-02-01", "period_end": "2024-02-29", "target_value": 100.0 }
        ],
        "realizations": [
            { "id": 1, "item_id": 1, "date": "2024-02-10", "value": 60.0, "recorded_at": null },
            { "id": 2, "item_id": 1, "date": "2024-02-20", "value": 80.0, "recorded_at": null }
        ]
    }"#;

    let store = InMemoryScoringStore::from_reader(document.as_bytes()).expect("snapshot parses");
    let service =
        ScoringService::new(Arc::new(store), flat_config()).with_today(date(2024, 12, 31));
    let february = WindowRequest::between(date(2024, 2, 1), date(2024, 2, 29));

    let legacy = service
        .score(EntityRef::Item(ItemId(2)), february)
        .expect("legacy score");
    assert_eq!(legacy.score, None);

    let project = service
        .score(EntityRef::Project(ProjectId(1)), february)
        .expect("project score");
    let score = project.score.expect("project always scores");
    assert!((score - 0.4).abs() < 1e-9, "unexpected score {score}");
}

fn correction_snapshot(morning: &str, afternoon: &str) -> String {
    format!(
        r#"{{
        "projects": [{{
            "id": 1, "name": "Corrections", "department": "Sales", "responsible": "Analyst",
            "start_date": "2024-01-01", "end_date": "2024-12-31", "parent_item_id": null
        }}],
        "groups": [{{ "id": 1, "project_id": 1, "kind": "ACTIVITY", "weight": 100.0 }}],
        "items": [{{
            "id": 1, "group_id": 1, "name": "Orders booked", "weight": 100.0, "uom": "%",
            "polarity": "MAX", "period_type": "monthly", "rollup": "SUMMARY",
            "start_date": "2024-01-01", "end_date": "2024-12-31"
        }}],
        "targets": [
            {{ "id": 1, "item_id": 1, "period_start": "2024-05-01", "period_end": "2024-05-31", "target_value": 20.0 }}
        ],
        "realizations": [
            {{ "id": 1, "item_id": 1, "date": "2024-05-02", "value": 10.0, "recorded_at": "{morning}" }},
            {{ "id": 2, "item_id": 1, "date": "2024-05-02", "value": 15.0, "recorded_at": "{afternoon}" }}
        ]
    }}"#
    )
}

#[test]
fn corrections_loaded_from_json_keep_the_latest_recording() {
    let may = WindowRequest::between(date(2024, 5, 1), date(2024, 5, 31));
    let shapes = [
        ("2024-05-02T09:00", "2024-05-02T14:00"),
        ("2024-05-02 09:00:00", "2024-05-02 14:00:00"),
        ("2024-05-02T09:00", "2024-05-02 14:00:00"),
    ];

    for (morning, afternoon) in shapes {
        let document = correction_snapshot(morning, afternoon);
        let store = InMemoryScoringStore::from_reader(document.as_bytes())
            .unwrap_or_else(|err| panic!("{morning} / {afternoon} should load: {err}"));
        let service =
            ScoringService::new(Arc::new(store), flat_config()).with_today(date(2024, 12, 31));

        let score = service
            .score(EntityRef::Item(ItemId(1)), may)
            .expect("item score")
            .score
            .expect("item has evidence");
        assert!(
            (score - 0.75).abs() < 1e-9,
            "{morning} / {afternoon} scored {score}"
        );
    }
}
