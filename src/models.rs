use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Postgres `integer` identity columns
pub type Id = i32;

/// Stored department row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Id,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartment {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Stored subject row. `code` is unique across all departments.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Id,
    pub department_id: Id,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub department_id: Id,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubject {
    pub department_id: Option<Id>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Repository-level subject listing criteria.
#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
    pub department_id: Option<Id>,
    /// Case-insensitive substring matched against name and code.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}

fn trim(s: String) -> String {
    let t = s.trim();
    if t.len() == s.len() { s } else { t.to_string() }
}

fn trim_opt(s: Option<String>) -> Option<String> {
    s.map(trim)
}

impl NewDepartment {
    /// Strip surrounding whitespace so blank values fail length validation.
    pub fn normalized(self) -> Self {
        Self {
            code: trim(self.code),
            name: trim(self.name),
            description: trim_opt(self.description),
        }
    }
}

impl UpdateDepartment {
    pub fn normalized(self) -> Self {
        Self {
            code: trim_opt(self.code),
            name: trim_opt(self.name),
            description: trim_opt(self.description),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.name.is_none() && self.description.is_none()
    }
}

impl NewSubject {
    pub fn normalized(self) -> Self {
        Self {
            department_id: self.department_id,
            name: trim(self.name),
            code: trim(self.code),
            description: trim_opt(self.description),
        }
    }
}

impl UpdateSubject {
    pub fn normalized(self) -> Self {
        Self {
            department_id: self.department_id,
            name: trim_opt(self.name),
            code: trim_opt(self.code),
            description: trim_opt(self.description),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.department_id.is_none()
            && self.name.is_none()
            && self.code.is_none()
            && self.description.is_none()
    }
}
