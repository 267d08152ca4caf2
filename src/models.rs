use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    editor::{Entity, Field, FieldKind},
    store::{OrderBy, Table},
};

// --- Content Schemas (Mapped to Tables) ---

/// Profile
///
/// The singleton row of the `profile` table: contact details, social links and the
/// status lines shown on the home and contact pages. Every column is optional so a
/// half-filled profile still renders.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: i64,
    pub email_personal: Option<String>,
    pub email_college: Option<String>,
    pub phone_in: Option<String>,
    pub phone_np: Option<String>,
    pub address_temp: Option<String>,
    pub address_perm: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub leetcode: Option<String>,
    // e.g. "B.E. Student at ..."
    pub status_text: Option<String>,
    // e.g. "Open to internship and full-time opportunities"
    pub open_for: Option<String>,
}

/// Education
///
/// One row of the `education` table, shown on the about page in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Education {
    pub id: i64,
    pub institution: String,
    pub degree: String,
    pub period: String,
    // Free text such as "CGPA: 7.2/10".
    pub score: String,
}

/// Experience
///
/// An internship or job from the `experiences` table. `description` holds one bullet
/// per entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Experience {
    pub id: i64,
    pub title: String,
    pub company_name: String,
    pub period: String,

    /// Maps column "type" to Rust field "kind" (`type` is a keyword).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub description: Vec<String>,
    // Link to the completion certificate, if any.
    pub internship_url: Option<String>,
}

/// Project
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub period: String,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub github_url: Option<String>,
}

/// SkillCategory
///
/// A named group of skill labels ("Languages": Rust, Java, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct SkillCategory {
    pub id: i64,
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Certification
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Certification {
    pub id: i64,
    pub name: String,
    pub issuer: String,
    pub url: Option<String>,
}

/// Message
///
/// A contact-form submission from the `messages` table. Inserted by visitors, read and
/// deleted by the owner; the inbox lists newest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Entity bindings (table, ordering, field schema) ---

impl Entity for Profile {
    const TABLE: Table = Table::Profile;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Profile";
    const FIELDS: &'static [Field] = &[
        Field::new("email_personal", "Personal Email", FieldKind::OptionalText),
        Field::new("email_college", "College Email", FieldKind::OptionalText),
        Field::new("phone_in", "Phone (IN)", FieldKind::OptionalText),
        Field::new("phone_np", "Phone (NP)", FieldKind::OptionalText),
        Field::new("address_temp", "Temporary Address", FieldKind::OptionalText),
        Field::new("address_perm", "Permanent Address", FieldKind::OptionalText),
        Field::new("github", "GitHub URL", FieldKind::Link),
        Field::new("linkedin", "LinkedIn URL", FieldKind::Link),
        Field::new("leetcode", "LeetCode URL", FieldKind::Link),
        Field::new("status_text", "Current Status Text", FieldKind::OptionalText),
        Field::new("open_for", "Open For Text", FieldKind::OptionalText),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Education {
    const TABLE: Table = Table::Education;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Education";
    const FIELDS: &'static [Field] = &[
        Field::new("institution", "Institution", FieldKind::Text).listed(),
        Field::new("degree", "Degree", FieldKind::Text).listed(),
        Field::new("period", "Period", FieldKind::Text).listed(),
        Field::new("score", "Score (e.g. CGPA: 7.2/10)", FieldKind::Text).listed(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Experience {
    const TABLE: Table = Table::Experiences;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Experience";
    const FIELDS: &'static [Field] = &[
        Field::new("title", "Job Title", FieldKind::Text).listed(),
        Field::new("company_name", "Company Name", FieldKind::Text).listed(),
        Field::new("period", "Period", FieldKind::Text).listed(),
        Field::new("type", "Type", FieldKind::Text).listed(),
        Field::new("description", "Description (one point per line)", FieldKind::Lines),
        Field::new("internship_url", "Certificate URL", FieldKind::Link),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Project {
    const TABLE: Table = Table::Projects;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Project";
    const FIELDS: &'static [Field] = &[
        Field::new("title", "Title", FieldKind::Text).listed(),
        Field::new("period", "Period", FieldKind::Text).listed(),
        Field::new("description", "Description", FieldKind::LongText),
        Field::new("highlights", "Highlights (one per line)", FieldKind::Lines),
        Field::new("tags", "Tags (comma separated)", FieldKind::Tags).listed(),
        Field::new("github_url", "Github Repo URL", FieldKind::Link),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for SkillCategory {
    const TABLE: Table = Table::Skills;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Skill Category";
    const FIELDS: &'static [Field] = &[
        Field::new("category", "Category", FieldKind::Text).listed(),
        Field::new("items", "Skills (comma separated)", FieldKind::Tags).listed(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Certification {
    const TABLE: Table = Table::Certifications;
    const ORDER: OrderBy = OrderBy::asc("id");
    const LABEL: &'static str = "Certification";
    const FIELDS: &'static [Field] = &[
        Field::new("name", "Name", FieldKind::Text).listed(),
        Field::new("issuer", "Issuer", FieldKind::Text).listed(),
        Field::new("url", "Certificate URL", FieldKind::Link).listed(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Message {
    const TABLE: Table = Table::Messages;
    const ORDER: OrderBy = OrderBy::desc("created_at");
    const LABEL: &'static str = "Message";
    const FIELDS: &'static [Field] = &[
        Field::new("name", "Name", FieldKind::Text).listed(),
        Field::new("email", "Email", FieldKind::Text).listed(),
        Field::new("message", "Message", FieldKind::LongText).listed(),
        Field::new("created_at", "Received", FieldKind::Timestamp).listed(),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn prepare_insert(record: &mut Map<String, Value>) {
        record.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
    }
}

// --- Request Payloads (Input Schemas) ---

/// ContactRequest
///
/// Input payload for the public contact form (POST /contact, POST /api/messages).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub message: String,
}

/// LoginForm
///
/// Credential pair posted by the admin login form. The password is only passed through
/// to the auth service, never stored or logged.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}
