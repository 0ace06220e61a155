//! Worked report scenarios run through the public aggregation API.

use chrono::{TimeZone, Utc};

use trainboard_core::aggregate::{
    compute_feedback_stats, compute_module_metrics, compute_student_metrics, module_metrics,
    student_metrics,
};
use trainboard_core::charts::{module_average_bar, status_pie};
use trainboard_core::config::ReportConfig;
use trainboard_core::index::SnapshotIndex;
use trainboard_core::model::{
    AnswerRecord, FeedbackRecord, Module, ModuleStatus, Profile, ProgressRecord, ProgressStatus,
    Role, Snapshot,
};
use trainboard_core::ranking::{filter, sort, toggle_sort, ModuleField, SortDirection, StudentField};
use trainboard_core::table::{dashboard_report, Cell, DashboardSelection};

fn profile(id: &str, name: &str) -> Profile {
    Profile {
        id: id.into(),
        name: name.into(),
        email: format!("{id}@acme.com"),
        role: Role::Collaborator,
        active: true,
    }
}

fn module(id: &str, title: &str) -> Module {
    Module {
        id: id.into(),
        title: title.into(),
        status: ModuleStatus::Published,
    }
}

fn progress(user: &str, module: &str, status: ProgressStatus, score: Option<f64>) -> ProgressRecord {
    ProgressRecord {
        user_id: user.into(),
        module_id: module.into(),
        status,
        score_percent: score,
        completed_at: (status == ProgressStatus::Completed)
            .then(|| Utc.with_ymd_and_hms(2025, 10, 2, 9, 30, 0).unwrap()),
    }
}

fn feedback(user: &str, module: &str, rating: u8) -> FeedbackRecord {
    FeedbackRecord {
        user_id: user.into(),
        module_id: module.into(),
        rating,
        comment: None,
    }
}

#[test]
fn scenario_a_student_metrics() {
    let profiles = vec![profile("s1", "Ana"), profile("s2", "Bruno"), profile("s3", "Carla")];
    let rows = vec![
        progress("s1", "m1", ProgressStatus::Completed, Some(80.0)),
        progress("s2", "m1", ProgressStatus::Completed, Some(60.0)),
    ];

    let metrics = compute_student_metrics(&profiles, &rows, &[]);
    let summary: Vec<(u32, u32, bool)> = metrics
        .iter()
        .map(|m| (m.completion_rate, m.average_score, m.has_scores))
        .collect();
    assert_eq!(
        summary,
        vec![(100, 80, true), (100, 60, true), (0, 0, false)]
    );
    assert_eq!(metrics[2].total_modules, 0);
}

#[test]
fn scenario_b_module_metrics() {
    let modules = vec![module("m1", "Ética")];
    let rows = vec![
        progress("s1", "m1", ProgressStatus::Completed, None),
        progress("s2", "m1", ProgressStatus::Completed, None),
        progress("s3", "m1", ProgressStatus::InProgress, None),
        progress("s4", "m1", ProgressStatus::NotStarted, None),
    ];

    let m = &compute_module_metrics(&modules, &rows, &[])[0];
    assert_eq!(m.total_users, 4);
    assert_eq!(m.completed_count, 2);
    assert_eq!(m.in_progress_count, 1);
    assert_eq!(m.completion_rate, 50);
    assert!(!m.has_scores);
    assert_eq!(m.average_score, 0);
}

#[test]
fn scenario_c_feedback_stats() {
    let rows: Vec<FeedbackRecord> = [5, 5, 4, 3, 5]
        .iter()
        .enumerate()
        .map(|(i, &r)| feedback(&format!("s{i}"), "m1", r))
        .collect();

    let stats = compute_feedback_stats(&rows).unwrap();
    assert_eq!(stats.total_count, 5);
    assert_eq!(stats.distribution, [0, 0, 1, 1, 3]);
    assert_eq!(stats.average_rating, 4.4);
}

#[test]
fn module_score_falls_back_to_answers_only_without_progress_scores() {
    let modules = vec![module("m1", "Ética")];
    let rows = vec![progress("s1", "m1", ProgressStatus::Completed, None)];
    let answers = vec![
        AnswerRecord {
            user_id: "s1".into(),
            module_id: "m1".into(),
            question_id: "q1".into(),
            is_correct: Some(true),
        },
        AnswerRecord {
            user_id: "s1".into(),
            module_id: "m1".into(),
            question_id: "q2".into(),
            is_correct: Some(false),
        },
        AnswerRecord {
            user_id: "s1".into(),
            module_id: "m1".into(),
            question_id: "q3".into(),
            is_correct: None,
        },
    ];

    let m = &compute_module_metrics(&modules, &rows, &answers)[0];
    assert!(m.has_scores);
    assert_eq!(m.average_score, 50);
}

#[test]
fn ranking_toggle_round_trip() {
    let profiles = vec![profile("s1", "Ana"), profile("s2", "Bruno"), profile("s3", "Carla")];
    let rows = vec![
        progress("s1", "m1", ProgressStatus::Completed, Some(70.0)),
        progress("s2", "m1", ProgressStatus::Completed, Some(90.0)),
        progress("s3", "m1", ProgressStatus::Completed, Some(70.0)),
    ];
    let mut metrics = compute_student_metrics(&profiles, &rows, &[]);

    let (field, direction) = toggle_sort(StudentField::Name, SortDirection::Asc, StudentField::AverageScore);
    assert_eq!(direction, SortDirection::Asc);
    sort(&mut metrics, field, direction);
    let asc: Vec<String> = metrics.iter().map(|m| m.student.id.clone()).collect();
    assert_eq!(asc, vec!["s1", "s3", "s2"]);

    let (field, direction) = toggle_sort(field, direction, StudentField::AverageScore);
    sort(&mut metrics, field, direction);
    let desc: Vec<String> = metrics.iter().map(|m| m.student.id.clone()).collect();
    let mut reversed = asc.clone();
    reversed.reverse();
    assert_eq!(desc, reversed);

    let found = filter(&metrics, "carla");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].student.id, "s3");
}

#[test]
fn module_ranking_and_chart_share_numbers() {
    let snapshot = Snapshot {
        profiles: vec![profile("s1", "Ana"), profile("s2", "Bruno")],
        modules: vec![module("m1", "Ética"), module("m2", "Segurança")],
        progress: vec![
            progress("s1", "m1", ProgressStatus::Completed, Some(80.0)),
            progress("s2", "m1", ProgressStatus::Completed, Some(61.0)),
            progress("s1", "m2", ProgressStatus::InProgress, Some(95.0)),
        ],
        ..Default::default()
    };
    let index = SnapshotIndex::build(&snapshot);
    let mut metrics = module_metrics(&index, snapshot.modules.iter());
    sort(&mut metrics, ModuleField::AverageScore, SortDirection::Desc);

    let chart = module_average_bar(&metrics).unwrap();
    assert_eq!(chart.labels, vec!["Segurança", "Ética"]);
    assert_eq!(chart.data, vec![95, 71]);
}

#[test]
fn dashboard_report_matches_metrics() {
    let snapshot = Snapshot {
        profiles: vec![profile("s1", "Ana"), profile("s2", "Bruno")],
        modules: vec![module("m1", "Ética")],
        progress: vec![
            progress("s1", "m1", ProgressStatus::Completed, Some(80.0)),
            progress("s2", "m1", ProgressStatus::NotStarted, None),
        ],
        ..Default::default()
    };
    let index = SnapshotIndex::build(&snapshot);
    let report =
        dashboard_report(&index, &ReportConfig::default(), &DashboardSelection::default()).unwrap();
    let mut students = student_metrics(&index, snapshot.profiles.iter());
    sort(&mut students, StudentField::CompletionRate, SortDirection::Desc);

    let grid = report.section("Colaboradores").unwrap();
    for (row, m) in grid.rows.iter().zip(&students) {
        assert_eq!(row[0], Cell::text(&m.student.name));
        assert_eq!(row[6], Cell::Percent(m.completion_rate));
    }

    let pie = status_pie(trainboard_core::aggregate::status_breakdown(&snapshot.progress)).unwrap();
    assert_eq!(pie.percentages, vec![50, 0, 50]);
}

#[test]
fn aggregation_is_deterministic() {
    let profiles: Vec<Profile> = (0..20).map(|i| profile(&format!("s{i:02}"), "Mesmo Nome")).collect();
    let rows: Vec<ProgressRecord> = (0..20)
        .map(|i| {
            progress(
                &format!("s{i:02}"),
                "m1",
                ProgressStatus::Completed,
                Some(f64::from(i % 3) * 10.0),
            )
        })
        .collect();

    let first = compute_student_metrics(&profiles, &rows, &[]);
    let second = compute_student_metrics(&profiles, &rows, &[]);
    assert_eq!(first, second);

    let mut a = first.clone();
    let mut b = second.clone();
    sort(&mut a, StudentField::Name, SortDirection::Asc);
    sort(&mut b, StudentField::Name, SortDirection::Asc);
    assert_eq!(a, b);
    let ids: Vec<&str> = a.iter().map(|m| m.student.id.as_str()).collect();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn invalid_rating_fails_fast() {
    let rows = vec![feedback("s1", "m1", 5), feedback("s2", "m1", 0)];
    assert!(compute_feedback_stats(&rows).is_err());
}
