use crate::models::notification::NewNotification;
use crate::models::report::Report;

const FALLBACK_ACTOR: &str = "a registrar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<'a> {
    Approved,
    Rejected { reason: &'a str },
    Deleted,
}

/// Notice for the report's owner about what a registrar did to it.
/// Reports without an owner produce nothing.
pub fn notification_for(report: &Report, outcome: Outcome<'_>, actor_email: Option<&str>) -> Option<NewNotification> {
    let user_id = report.user_id?;
    let id = report.id;
    let actor = actor_email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(FALLBACK_ACTOR);

    let (title, message) = match outcome {
        Outcome::Approved => (
            format!("Report #{id} approved"),
            format!("Your report #{id} has been approved by {actor}."),
        ),
        Outcome::Rejected { reason } => (
            format!("Report #{id} rejected"),
            format!("Your report #{id} has been rejected by {actor}. Reason: {reason}"),
        ),
        Outcome::Deleted => (
            format!("Report #{id} deleted"),
            format!("Your report #{id} has been deleted by {actor}."),
        ),
    };

    Some(NewNotification {
        user_id,
        report_id: id,
        title,
        message,
    })
}
