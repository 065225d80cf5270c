//! Report list query: ordering is pushed into SQL, search runs afterwards over
//! the materialized rows.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::models::report::ReportListItem;

/// Display format searched for creation dates, e.g. "Nov 14, 2025".
pub const SEARCH_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    CreatedAt,
    Sender,
    OrganizationName,
    ObstacleType,
    Status,
}

impl SortKey {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "id" => Some(SortKey::Id),
            "createdat" => Some(SortKey::CreatedAt),
            "sender" => Some(SortKey::Sender),
            "organizationname" => Some(SortKey::OrganizationName),
            "obstacletype" => Some(SortKey::ObstacleType),
            "status" => Some(SortKey::Status),
            _ => None,
        }
    }

    /// Column expression in the list projection query.
    fn expression(self) -> &'static str {
        match self {
            SortKey::Id => "r.id",
            SortKey::CreatedAt => "r.created_at",
            // Ownerless rows sort under the label they are displayed with.
            SortKey::Sender => "COALESCE(u.email, '(unknown)')",
            SortKey::OrganizationName => "COALESCE(o.name, '')",
            SortKey::ObstacleType => "COALESCE(r.obstacle_type, '')",
            SortKey::Status => "r.status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(order) if order.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            key: SortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl Sort {
    /// Unknown keys fall back to the default ordering, ignoring the requested direction.
    pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        match sort_by.map(SortKey::parse) {
            Some(Some(key)) => Sort {
                key,
                order: SortOrder::parse(sort_order),
            },
            Some(None) => Sort::default(),
            None => Sort {
                key: SortKey::CreatedAt,
                order: SortOrder::parse(sort_order),
            },
        }
    }

    /// `ORDER BY` body with an id tiebreak so equal keys stay stable.
    pub fn order_by(&self) -> String {
        let dir = self.order.keyword();
        if self.key == SortKey::Id {
            format!("r.id {dir}")
        } else {
            format!("{} {dir}, r.id {dir}", self.key.expression())
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// id, createdAt, sender, organizationName, obstacleType or status
    pub sort_by: Option<String>,
    /// "asc"; anything else sorts descending
    pub sort_order: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn sort(&self) -> Sort {
        Sort::from_params(self.sort_by.as_deref(), self.sort_order.as_deref())
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn matches(item: &ReportListItem, needle: &str) -> bool {
    let date = item.created_at.format(SEARCH_DATE_FORMAT).to_string();
    let candidates = [
        Some(item.id.to_string()),
        Some(item.sender.clone()),
        item.organization_name.clone(),
        item.obstacle_type.clone(),
        Some(date),
        Some(item.status.as_str().to_string()),
    ];

    candidates
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Case-insensitive substring filter; preserves the incoming order.
pub fn filter_items(items: Vec<ReportListItem>, search: Option<&str>) -> Vec<ReportListItem> {
    let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return items;
    };
    let needle = needle.to_lowercase();

    items.into_iter().filter(|item| matches(item, &needle)).collect()
}
