use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::trials::{TrialRequest, TrialStatus};
use crate::CoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialSortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Status,
}

impl TrialSortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrialSortKey::CreatedAt => "created_at",
            TrialSortKey::UpdatedAt => "updated_at",
            TrialSortKey::Status => "status",
        }
    }
}

impl FromStr for TrialSortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "created_at" => Ok(TrialSortKey::CreatedAt),
            "updated_at" => Ok(TrialSortKey::UpdatedAt),
            "status" => Ok(TrialSortKey::Status),
            _ => Err(CoreError::UnknownVariant {
                kind: "sort key",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(CoreError::UnknownVariant {
                kind: "sort direction",
                value: s.to_owned(),
            }),
        }
    }
}

/// Listing criteria shared by the gateway query string and the local
/// fallback. Defaults to newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialFilter {
    pub status: Option<TrialStatus>,
    pub search: Option<String>,
    pub sort_by: TrialSortKey,
    pub direction: SortDirection,
}

impl TrialFilter {
    #[must_use]
    pub fn with_status(mut self, status: TrialStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn sorted(mut self, sort_by: TrialSortKey, direction: SortDirection) -> Self {
        self.sort_by = sort_by;
        self.direction = direction;
        self
    }

    /// True when no record is filtered out, so a listing is complete.
    #[must_use]
    pub fn selects_all(&self) -> bool {
        self.status.is_none() && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    #[must_use]
    pub fn matches(&self, request: &TrialRequest) -> bool {
        self.status.is_none_or(|s| request.status == s)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| request.matches_search(needle))
    }

    /// Filters and orders `requests`. Pure: the same input always yields the
    /// same output, with ties broken by creation time and then id.
    #[must_use]
    pub fn apply(&self, requests: impl IntoIterator<Item = TrialRequest>) -> Vec<TrialRequest> {
        let mut out: Vec<TrialRequest> = requests.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| {
            let primary = match self.sort_by {
                TrialSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                TrialSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                TrialSortKey::Status => a.status.cmp(&b.status),
            };
            let ordered = primary
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id));
            match self.direction {
                SortDirection::Asc => ordered,
                SortDirection::Desc => ordered.reverse(),
            }
        });
        out
    }
}
