//! Organization data model.
//!
//! These types deserialize from the camel-cased data documents
//! (`orgName`, `orgChartDirection`, ...). Unknown fields are ignored so the
//! same records can carry presentation-only data used by templates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named link attached to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedUrl {
    pub name: String,
    pub url: String,
}

/// A named phone number attached to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPhone {
    pub name: String,
    pub phone: String,
}

/// A person as it appears in an organization's staff tree.
///
/// Only `name` and `team` are required. Two persons are considered the same
/// person when both of those match, see [`Person::same_person`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<NamedUrl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<NamedPhone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_user: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

impl Person {
    /// Create a person with only the required fields set.
    pub fn new(name: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            title: None,
            specialties: None,
            url: None,
            urls: None,
            email: None,
            phone: None,
            phones: None,
            portal_user: None,
            notes: None,
        }
    }

    #[inline]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[inline]
    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = Some(specialties.into_iter().map(Into::into).collect());
        self
    }

    #[inline]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Value identity: same `name` and same `team`.
    pub fn same_person(&self, other: &Person) -> bool {
        self.name == other.name && self.team == other.team
    }

    /// The person's primary link: `url`, else the first of `urls`.
    pub fn primary_url(&self) -> Option<&str> {
        self.url.as_deref().or_else(|| {
            self.urls
                .as_ref()
                .and_then(|urls| urls.first())
                .map(|named| named.url.as_str())
        })
    }
}

/// A node of the staff tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<Vec<StaffMember>>,
}

impl StaffMember {
    pub fn new(person: Person) -> Self {
        Self {
            person,
            staff: None,
        }
    }

    #[inline]
    pub fn with_staff(mut self, staff: Vec<StaffMember>) -> Self {
        self.staff = Some(staff);
        self
    }

    /// Direct reports, empty when there are none.
    pub fn reports(&self) -> &[StaffMember] {
        self.staff.as_deref().unwrap_or_default()
    }

    /// A member without direct reports. An empty `staff` list counts as none.
    pub fn is_leaf(&self) -> bool {
        self.reports().is_empty()
    }
}

/// Layout direction of an org chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Left to right
    #[serde(rename = "LR")]
    LeftToRight,
    /// Top to bottom
    #[serde(rename = "TB")]
    TopToBottom,
}

impl Direction {
    /// The Graphviz `rankdir` value.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::LeftToRight => "LR",
            Direction::TopToBottom => "TB",
        }
    }
}

/// Which end of the hierarchy is aligned on a common rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justification {
    Roots,
    Leaves,
}

/// An organization and its staff tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub org_name: String,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people: Option<IndexMap<String, Person>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_chart_direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_chart_justification: Option<Justification>,
}

impl Organization {
    pub fn new(org_name: impl Into<String>, staff: Vec<StaffMember>) -> Self {
        Self {
            org_name: org_name.into(),
            staff,
            people: None,
            org_chart_direction: None,
            org_chart_justification: None,
        }
    }

    #[inline]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.org_chart_direction = Some(direction);
        self
    }

    #[inline]
    pub fn with_justification(mut self, justification: Justification) -> Self {
        self.org_chart_justification = Some(justification);
        self
    }
}
