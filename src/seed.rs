//! Baseline data for a fresh database: the standard organizations and a
//! default administrator.

use sqlx::SqlitePool;

use crate::authz::Role;
use crate::db::{organizations, users};
use crate::errors::AppResult;
use crate::utils::{hash_password, utc_now};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Admin123!";

const ORGANIZATIONS: [(&str, &str); 4] = [
    ("Kartverket", "Employees at Kartverket"),
    ("NLA", "Employees at Norsk luftambulanse"),
    ("Luftforsvaret", "Air Force personnel"),
    ("Politiets helikoptertjeneste", "Police helicopter service personnel"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations_created: usize,
    pub admin_created: bool,
}

/// Idempotent: existing organizations and users are left alone, and the
/// default admin is only created while nobody holds the Admin role.
pub async fn run(pool: &SqlitePool, admin_email: &str, admin_password: &str) -> AppResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    let mut tx = pool.begin().await?;
    let now = utc_now();

    for (name, description) in ORGANIZATIONS {
        if organizations::find_by_name(&mut tx, name).await?.is_none() {
            organizations::insert(&mut tx, name, Some(description), now).await?;
            summary.organizations_created += 1;
        }
    }

    if users::any_with_role(&mut tx, Role::Admin).await? {
        tracing::debug!("an admin already exists; default admin skipped");
    } else {
        let admin_id = match users::find_by_email(&mut tx, admin_email).await? {
            Some(existing) => crate::db::row_parsers::parse_uuid(&existing.id)?,
            None => {
                let password_hash = hash_password(admin_password)?;
                summary.admin_created = true;
                users::insert(&mut tx, admin_email, &password_hash, now).await?.id
            }
        };
        users::grant_role(&mut tx, admin_id, Role::Admin, now).await?;
    }

    tx.commit().await?;
    tracing::info!(
        organizations_created = summary.organizations_created,
        admin_created = summary.admin_created,
        "seed complete"
    );
    Ok(summary)
}
