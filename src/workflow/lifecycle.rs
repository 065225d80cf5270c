//! Report state machine.
//!
//! `Draft -> Pending -> {Approved, Rejected}`, with Approved and Rejected
//! reachable from each other. Every transition is a pure function returning
//! the next report and the side effects the store must apply with it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::notifications::{notification_for, Outcome};
use crate::errors::AppError;
use crate::models::notification::NewNotification;
use crate::models::report::{FormAction, ObstacleForm, Report, ReportStatus};

pub const MIN_HEIGHT: f64 = 0.0;
pub const MAX_HEIGHT: f64 = 200.0;
pub const MAX_TYPE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_LOCATION_LENGTH: usize = 1000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("report is not a draft")]
    NotADraft,
    #[error("report #{0} has not been submitted")]
    NotSubmitted(i64),
    #[error("{0}")]
    InvalidAssignment(String),
}

impl From<LifecycleError> for AppError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Validation(message) => AppError::validation(message),
            LifecycleError::NotADraft => AppError::not_found("draft not found"),
            err @ LifecycleError::NotSubmitted(_) => AppError::validation(err.to_string()),
            LifecycleError::InvalidAssignment(message) => AppError::invalid_assignment(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify(NewNotification),
    DeleteNotificationsForReport(i64),
    DeleteReport(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub report: Report,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn quiet(report: Report) -> Self {
        Self { report, effects: Vec::new() }
    }
}

/// A report that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub user_id: Uuid,
    pub obstacle_type: Option<String>,
    pub obstacle_height: Option<i32>,
    pub obstacle_description: Option<String>,
    pub obstacle_location: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Registrar assignment request after the target user has been looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Clear,
    To { user_id: Uuid, holds_registrar: bool },
    /// The id did not parse or no such user exists.
    Unknown,
}

struct Fields {
    obstacle_type: Option<String>,
    obstacle_height: Option<i32>,
    obstacle_description: Option<String>,
    obstacle_location: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn check_length(field: &str, value: Option<&String>, max: usize) -> Result<(), LifecycleError> {
    match value {
        Some(v) if v.chars().count() > max => Err(LifecycleError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn convert_height(height: Option<f64>) -> Result<Option<i32>, LifecycleError> {
    match height {
        None => Ok(None),
        Some(h) if !h.is_finite() || !(MIN_HEIGHT..=MAX_HEIGHT).contains(&h) => Err(LifecycleError::Validation(
            format!("obstacle_height must be between {MIN_HEIGHT} and {MAX_HEIGHT} meters"),
        )),
        Some(h) => Ok(Some(h.round() as i32)),
    }
}

/// Accepts a GeoJSON Point or LineString geometry, bare or wrapped in a Feature.
pub fn validate_location(location: &str) -> Result<(), LifecycleError> {
    let invalid = || LifecycleError::Validation("obstacle_location must be a GeoJSON Point or LineString".into());

    let value: serde_json::Value = serde_json::from_str(location).map_err(|_| invalid())?;
    let geometry = match value.get("type").and_then(|t| t.as_str()) {
        Some("Feature") => value.get("geometry").ok_or_else(invalid)?,
        _ => &value,
    };

    let coordinates = geometry
        .get("coordinates")
        .and_then(|c| c.as_array())
        .ok_or_else(invalid)?;
    let is_position = |v: &serde_json::Value| {
        v.as_array()
            .is_some_and(|p| p.len() >= 2 && p.iter().all(serde_json::Value::is_number))
    };

    match geometry.get("type").and_then(|t| t.as_str()) {
        Some("Point") if coordinates.len() >= 2 && coordinates.iter().all(serde_json::Value::is_number) => Ok(()),
        Some("LineString") if coordinates.len() >= 2 && coordinates.iter().all(is_position) => Ok(()),
        _ => Err(invalid()),
    }
}

fn validate_fields(fields: &Fields, target: ReportStatus) -> Result<(), LifecycleError> {
    check_length("obstacle_type", fields.obstacle_type.as_ref(), MAX_TYPE_LENGTH)?;
    check_length(
        "obstacle_description",
        fields.obstacle_description.as_ref(),
        MAX_DESCRIPTION_LENGTH,
    )?;
    check_length("obstacle_location", fields.obstacle_location.as_ref(), MAX_LOCATION_LENGTH)?;

    let location = fields
        .obstacle_location
        .as_deref()
        .ok_or_else(|| LifecycleError::Validation("obstacle_location is required".into()))?;
    validate_location(location)?;

    if target == ReportStatus::Pending {
        let mut missing = Vec::new();
        if fields.obstacle_type.is_none() {
            missing.push("obstacle_type");
        }
        if fields.obstacle_height.is_none() {
            missing.push("obstacle_height");
        }
        if fields.obstacle_description.is_none() {
            missing.push("obstacle_description");
        }
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!(
                "{} required to submit",
                missing.join(", ")
            )));
        }
    }

    Ok(())
}

/// Create a new report owned by `owner`, either as a draft or submitted.
pub fn create(owner: Uuid, form: &ObstacleForm, now: DateTime<Utc>) -> Result<NewReport, LifecycleError> {
    let fields = Fields {
        obstacle_type: non_empty(form.obstacle_type.as_deref()),
        obstacle_height: convert_height(form.obstacle_height)?,
        obstacle_description: non_empty(form.obstacle_description.as_deref()),
        obstacle_location: non_empty(form.obstacle_location.as_deref()),
    };
    let status = form.action.target_status();
    validate_fields(&fields, status)?;

    Ok(NewReport {
        user_id: owner,
        obstacle_type: fields.obstacle_type,
        obstacle_height: fields.obstacle_height,
        obstacle_description: fields.obstacle_description,
        obstacle_location: fields.obstacle_location,
        status,
        created_at: now,
    })
}

/// Merge a form into an existing draft. Empty form fields keep the stored value.
pub fn update_draft(report: &Report, form: &ObstacleForm) -> Result<Transition, LifecycleError> {
    if !report.status.is_draft() {
        return Err(LifecycleError::NotADraft);
    }

    let fields = Fields {
        obstacle_type: non_empty(form.obstacle_type.as_deref()).or_else(|| report.obstacle_type.clone()),
        obstacle_height: convert_height(form.obstacle_height)?.or(report.obstacle_height),
        obstacle_description: non_empty(form.obstacle_description.as_deref())
            .or_else(|| report.obstacle_description.clone()),
        obstacle_location: non_empty(form.obstacle_location.as_deref())
            .or_else(|| report.obstacle_location.clone()),
    };
    let status = form.action.target_status();
    validate_fields(&fields, status)?;

    Ok(Transition::quiet(Report {
        obstacle_type: fields.obstacle_type,
        obstacle_height: fields.obstacle_height,
        obstacle_description: fields.obstacle_description,
        obstacle_location: fields.obstacle_location,
        status,
        ..report.clone()
    }))
}

fn ensure_submitted(report: &Report) -> Result<(), LifecycleError> {
    if report.status.is_draft() {
        Err(LifecycleError::NotSubmitted(report.id))
    } else {
        Ok(())
    }
}

fn notify(report: &Report, outcome: Outcome<'_>, actor_email: Option<&str>) -> Vec<Effect> {
    notification_for(report, outcome, actor_email)
        .map(Effect::Notify)
        .into_iter()
        .collect()
}

pub fn approve(report: &Report, actor_email: Option<&str>, now: DateTime<Utc>) -> Result<Transition, LifecycleError> {
    ensure_submitted(report)?;

    let next = Report {
        status: ReportStatus::Approved,
        rejection_reason: None,
        processed_at: Some(now),
        ..report.clone()
    };
    let effects = notify(&next, Outcome::Approved, actor_email);
    Ok(Transition { report: next, effects })
}

pub fn reject(
    report: &Report,
    reason: Option<&str>,
    actor_email: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    let reason = non_empty(reason)
        .ok_or_else(|| LifecycleError::Validation("rejection_reason is required".into()))?;
    ensure_submitted(report)?;

    let next = Report {
        status: ReportStatus::Rejected,
        rejection_reason: Some(reason.clone()),
        processed_at: Some(now),
        ..report.clone()
    };
    let effects = notify(&next, Outcome::Rejected { reason: &reason }, actor_email);
    Ok(Transition { report: next, effects })
}

pub fn assign_registrar(report: &Report, assignment: Assignment) -> Result<Transition, LifecycleError> {
    ensure_submitted(report)?;

    let assigned = match assignment {
        Assignment::Clear => None,
        Assignment::To { user_id, holds_registrar: true } => Some(user_id),
        Assignment::To { holds_registrar: false, .. } => {
            return Err(LifecycleError::InvalidAssignment(
                "selected user is not a registrar".into(),
            ))
        }
        Assignment::Unknown => {
            return Err(LifecycleError::InvalidAssignment("selected registrar does not exist".into()))
        }
    };

    Ok(Transition::quiet(Report {
        assigned_registrar_id: assigned,
        ..report.clone()
    }))
}

/// Deleting clears the report's notifications first, then announces the
/// deletion to the former owner under the removed id.
pub fn delete(report: &Report, actor_email: Option<&str>) -> Transition {
    let mut effects = vec![
        Effect::DeleteNotificationsForReport(report.id),
        Effect::DeleteReport(report.id),
    ];
    effects.extend(notify(report, Outcome::Deleted, actor_email));

    Transition {
        report: report.clone(),
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const POINT: &str = r#"{"type":"Point","coordinates":[10.75,59.91]}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap()
    }

    fn report(status: ReportStatus) -> Report {
        Report {
            id: 12,
            user_id: Some(Uuid::new_v4()),
            obstacle_type: Some("Crane".into()),
            obstacle_height: Some(45),
            obstacle_description: Some("Harbour crane".into()),
            obstacle_location: Some(POINT.into()),
            status,
            assigned_registrar_id: None,
            rejection_reason: None,
            processed_at: None,
            created_at: now(),
            version: 0,
        }
    }

    fn full_form(height: f64) -> ObstacleForm {
        ObstacleForm {
            obstacle_type: Some("Mast".into()),
            obstacle_height: Some(height),
            obstacle_description: Some("Radio mast".into()),
            obstacle_location: Some(POINT.into()),
            action: FormAction::Submit,
        }
    }

    #[test]
    fn submit_with_all_fields_is_pending() {
        let owner = Uuid::new_v4();
        let created = create(owner, &full_form(50.0), now()).unwrap();
        assert_eq!(created.status, ReportStatus::Pending);
        assert_eq!(created.user_id, owner);
        assert_eq!(created.obstacle_height, Some(50));
    }

    #[test]
    fn height_out_of_range_is_rejected() {
        let err = create(Uuid::new_v4(), &full_form(250.0), now()).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        assert!(create(Uuid::new_v4(), &full_form(-1.0), now()).is_err());
    }

    #[test]
    fn fractional_height_is_rounded() {
        let created = create(Uuid::new_v4(), &full_form(12.6), now()).unwrap();
        assert_eq!(created.obstacle_height, Some(13));
    }

    #[test]
    fn draft_needs_only_location() {
        let form = ObstacleForm {
            obstacle_location: Some(POINT.into()),
            action: FormAction::Draft,
            ..ObstacleForm::default()
        };
        let created = create(Uuid::new_v4(), &form, now()).unwrap();
        assert_eq!(created.status, ReportStatus::Draft);

        let missing = ObstacleForm {
            action: FormAction::Draft,
            ..ObstacleForm::default()
        };
        assert!(create(Uuid::new_v4(), &missing, now()).is_err());
    }

    #[test]
    fn submit_reports_missing_fields() {
        let form = ObstacleForm {
            obstacle_location: Some(POINT.into()),
            obstacle_type: Some("   ".into()),
            ..ObstacleForm::default()
        };
        let err = create(Uuid::new_v4(), &form, now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Validation(
                "obstacle_type, obstacle_height, obstacle_description required to submit".into()
            )
        );
    }

    #[test]
    fn location_must_be_point_or_line() {
        assert!(validate_location(POINT).is_ok());
        assert!(validate_location(r#"{"type":"LineString","coordinates":[[10.0,59.0],[10.1,59.1]]}"#).is_ok());
        assert!(validate_location(
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[10.0,59.0]},"properties":{}}"#
        )
        .is_ok());
        assert!(validate_location(r#"{"type":"Polygon","coordinates":[]}"#).is_err());
        assert!(validate_location("59.91,10.75").is_err());
    }

    #[test]
    fn draft_edit_merges_non_empty_fields() {
        let mut draft = report(ReportStatus::Draft);
        draft.obstacle_description = None;

        let form = ObstacleForm {
            obstacle_type: Some(String::new()),
            obstacle_description: Some("Now described".into()),
            action: FormAction::Draft,
            ..ObstacleForm::default()
        };
        let next = update_draft(&draft, &form).unwrap().report;
        assert_eq!(next.obstacle_type.as_deref(), Some("Crane"));
        assert_eq!(next.obstacle_description.as_deref(), Some("Now described"));
        assert_eq!(next.status, ReportStatus::Draft);

        let submit = ObstacleForm::default();
        let submitted = update_draft(&next, &submit).unwrap().report;
        assert_eq!(submitted.status, ReportStatus::Pending);
    }

    #[test]
    fn submitting_incomplete_draft_fails() {
        let mut draft = report(ReportStatus::Draft);
        draft.obstacle_height = None;
        assert!(matches!(
            update_draft(&draft, &ObstacleForm::default()),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn only_drafts_are_editable() {
        let pending = report(ReportStatus::Pending);
        assert_eq!(
            update_draft(&pending, &ObstacleForm::default()).unwrap_err(),
            LifecycleError::NotADraft
        );
    }

    #[test]
    fn approve_sets_processed_and_clears_reason() {
        let mut rejected = report(ReportStatus::Rejected);
        rejected.rejection_reason = Some("blurry".into());

        let transition = approve(&rejected, Some("reg@example.com"), now()).unwrap();
        assert_eq!(transition.report.status, ReportStatus::Approved);
        assert_eq!(transition.report.rejection_reason, None);
        assert_eq!(transition.report.processed_at, Some(now()));
        assert_eq!(transition.effects.len(), 1);
        match &transition.effects[0] {
            Effect::Notify(n) => assert!(n.title.contains("approved")),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn reject_requires_reason() {
        let pending = report(ReportStatus::Pending);
        assert!(matches!(
            reject(&pending, Some("  "), None, now()),
            Err(LifecycleError::Validation(_))
        ));
        assert!(reject(&pending, None, None, now()).is_err());

        let transition = reject(&pending, Some("Wrong place"), None, now()).unwrap();
        assert_eq!(transition.report.status, ReportStatus::Rejected);
        assert_eq!(transition.report.rejection_reason.as_deref(), Some("Wrong place"));
        assert!(transition.report.processed_at.is_some());
    }

    #[test]
    fn drafts_cannot_be_processed() {
        let draft = report(ReportStatus::Draft);
        assert_eq!(approve(&draft, None, now()).unwrap_err(), LifecycleError::NotSubmitted(12));
    }

    #[test]
    fn assignment_requires_registrar() {
        let pending = report(ReportStatus::Pending);
        let registrar = Uuid::new_v4();

        let assigned = assign_registrar(
            &pending,
            Assignment::To { user_id: registrar, holds_registrar: true },
        )
        .unwrap();
        assert_eq!(assigned.report.assigned_registrar_id, Some(registrar));
        assert!(assigned.effects.is_empty());

        let cleared = assign_registrar(&assigned.report, Assignment::Clear).unwrap();
        assert_eq!(cleared.report.assigned_registrar_id, None);

        assert!(matches!(
            assign_registrar(&pending, Assignment::To { user_id: registrar, holds_registrar: false }),
            Err(LifecycleError::InvalidAssignment(_))
        ));
        assert!(matches!(
            assign_registrar(&pending, Assignment::Unknown),
            Err(LifecycleError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn delete_orders_cleanup_before_notice() {
        let pending = report(ReportStatus::Pending);
        let transition = delete(&pending, Some("reg@example.com"));

        assert_eq!(transition.effects[0], Effect::DeleteNotificationsForReport(12));
        assert_eq!(transition.effects[1], Effect::DeleteReport(12));
        match &transition.effects[2] {
            Effect::Notify(n) => {
                assert_eq!(n.report_id, 12);
                assert_eq!(Some(n.user_id), pending.user_id);
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(transition.effects.len(), 3);
    }

    #[test]
    fn ownerless_report_produces_no_notice() {
        let mut orphan = report(ReportStatus::Pending);
        orphan.user_id = None;
        assert!(approve(&orphan, None, now()).unwrap().effects.is_empty());
        assert_eq!(delete(&orphan, None).effects.len(), 2);
    }
}
