use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{collections::HashMap, marker::PhantomData};

use crate::{
    error::{EditorError, FormError, StoreError},
    store::{OrderBy, StoreState, Table},
};

/// Raw `application/x-www-form-urlencoded` fields of a manager form.
pub type FormInput = HashMap<String, String>;

// --- Field schema ---

/// How a form field maps onto a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text, must not be blank.
    Text,
    /// Single-line text, blank becomes `null`.
    OptionalText,
    /// Multi-line text stored as one string, must not be blank.
    LongText,
    /// One array entry per non-blank line.
    Lines,
    /// Comma separated labels stored as an array.
    Tags,
    /// Optional URL, blank becomes `null`.
    Link,
    /// Set by the store or the entity; shown but never edited.
    Timestamp,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Whether the column shows in the manager's table.
    pub listed: bool,
}

impl Field {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, listed: false }
    }

    pub const fn listed(mut self) -> Self {
        self.listed = true;
        self
    }

    pub fn editable(&self) -> bool {
        self.kind != FieldKind::Timestamp
    }

    /// Converts the submitted text for this field into its column value.
    pub fn parse(&self, raw: Option<&str>) -> Result<Value, FormError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        let required = || FormError::Required {
            field: self.name,
            label: self.label,
        };

        let value = match self.kind {
            FieldKind::Text | FieldKind::LongText => {
                if raw.is_empty() {
                    return Err(required());
                }
                Value::String(raw.to_string())
            }
            FieldKind::OptionalText | FieldKind::Link => {
                if raw.is_empty() {
                    Value::Null
                } else {
                    Value::String(raw.to_string())
                }
            }
            FieldKind::Lines => split_into(raw, '\n'),
            FieldKind::Tags => split_into(raw, ','),
            FieldKind::Timestamp => Value::Null,
        };
        Ok(value)
    }

    /// Inverse of `parse`: the text an edit form is pre-filled with.
    pub fn display(&self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) if self.kind == FieldKind::Timestamp => {
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|_| s.clone())
            }
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => {
                let separator = if self.kind == FieldKind::Tags { ", " } else { "\n" };
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(separator)
            }
            Some(other) => other.to_string(),
        }
    }
}

fn split_into(raw: &str, separator: char) -> Value {
    Value::Array(
        raw.split(separator)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    )
}

// --- Entity ---

/// Entity
///
/// A record type bound to one table. The table, ordering key and field schema are all
/// a `ListEditor` needs to list, create, update and delete it.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;
    const ORDER: OrderBy;
    /// Singular, human-readable name ("Project").
    const LABEL: &'static str;
    const FIELDS: &'static [Field];

    fn id(&self) -> i64;

    /// Hook for columns the entity fills itself on insert.
    fn prepare_insert(_record: &mut Map<String, Value>) {}
}

/// Builds the column map for `E` from submitted form fields.
pub fn build_record<E: Entity>(form: &FormInput) -> Result<Map<String, Value>, FormError> {
    let mut record = Map::new();
    for field in E::FIELDS.iter().filter(|f| f.editable()) {
        let value = field.parse(form.get(field.name).map(String::as_str))?;
        record.insert(field.name.to_string(), value);
    }
    Ok(record)
}

// --- Notices & confirmation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient, user-visible outcome of a mutation (the "toast").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Answer to the "are you sure?" prompt in front of every delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_answer(answer: Option<&str>) -> Self {
        match answer.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
            Some("yes" | "true" | "on" | "1") => Confirmation::Confirmed,
            _ => Confirmation::Declined,
        }
    }
}

/// Result of a submit or delete: the list as re-read after the mutation, plus the
/// notice to show. `notice` is `None` when nothing was attempted.
#[derive(Debug, Clone)]
pub struct Submission<E> {
    pub items: Vec<E>,
    pub notice: Option<Notice>,
}

#[derive(Clone, Copy)]
enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    fn success(self) -> &'static str {
        match self {
            Mutation::Create => "Created successfully",
            Mutation::Update => "Updated successfully",
            Mutation::Delete => "Deleted successfully",
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Mutation::Create => "Failed to create",
            Mutation::Update => "Failed to update",
            Mutation::Delete => "Failed to delete",
        }
    }
}

// --- ListEditor ---

/// ListEditor
///
/// The manager pattern written once: fetch all, insert-or-update by id, delete after
/// confirmation, and refetch once the mutation has completed.
pub struct ListEditor<E> {
    store: StoreState,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for ListEditor<E> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), _entity: PhantomData }
    }
}

impl<E: Entity> ListEditor<E> {
    pub fn new(store: StoreState) -> Self {
        Self { store, _entity: PhantomData }
    }

    /// All rows in the entity's order. A store failure is logged and yields an empty list
    /// so the page stays usable.
    pub async fn load(&self) -> Vec<E> {
        match self.try_load().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(table = E::TABLE.name(), error = %e, "failed to fetch list");
                vec![]
            }
        }
    }

    pub async fn try_load(&self) -> Result<Vec<E>, StoreError> {
        let rows = self.store.list(E::TABLE, Some(E::ORDER)).await?;
        Ok(rows.into_iter().filter_map(decode::<E>).collect())
    }

    /// The row of a one-row table, `None` if it is empty or unreachable.
    pub async fn load_single(&self) -> Option<E> {
        match self.store.get_single(E::TABLE).await {
            Ok(row) => row.and_then(decode::<E>),
            Err(e) => {
                tracing::warn!(table = E::TABLE.name(), error = %e, "failed to fetch record");
                None
            }
        }
    }

    pub async fn find(&self, id: i64) -> Option<E> {
        self.load().await.into_iter().find(|item| item.id() == id)
    }

    /// Inserts a new row built from `form`.
    pub async fn create(&self, form: &FormInput) -> Result<E, EditorError> {
        let mut record = build_record::<E>(form)?;
        E::prepare_insert(&mut record);
        let row = self.store.insert(E::TABLE, Value::Object(record)).await?;
        decode::<E>(row).ok_or_else(|| {
            EditorError::Store(StoreError::Unavailable(format!(
                "{} returned an unreadable row",
                E::TABLE.name()
            )))
        })
    }

    /// Updates row `id` with the fields of `form`.
    pub async fn update(&self, id: i64, form: &FormInput) -> Result<E, EditorError> {
        let record = build_record::<E>(form)?;
        let row = self
            .store
            .update(E::TABLE, id, Value::Object(record))
            .await?
            .ok_or(EditorError::Missing { label: E::LABEL, id })?;
        decode::<E>(row).ok_or(EditorError::Missing { label: E::LABEL, id })
    }

    /// Form submit: `Some(id)` updates that row, `None` inserts. The list is re-read after
    /// the mutation finishes.
    pub async fn submit(&self, id: Option<i64>, form: &FormInput) -> Submission<E> {
        let (mutation, result) = match id {
            Some(id) => (Mutation::Update, self.update(id, form).await.map(|_| ())),
            None => (Mutation::Create, self.create(form).await.map(|_| ())),
        };
        let notice = self.notice(mutation, result);
        Submission { items: self.load().await, notice: Some(notice) }
    }

    /// Deletes row `id` only when the visitor confirmed.
    pub async fn remove(&self, id: i64, confirmation: Confirmation) -> Submission<E> {
        if confirmation == Confirmation::Declined {
            return Submission { items: self.load().await, notice: None };
        }

        let result = match self.store.delete(E::TABLE, id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(EditorError::Missing { label: E::LABEL, id }),
            Err(e) => Err(e.into()),
        };
        let notice = self.notice(Mutation::Delete, result);
        Submission { items: self.load().await, notice: Some(notice) }
    }

    fn notice(&self, mutation: Mutation, result: Result<(), EditorError>) -> Notice {
        match result {
            Ok(()) => Notice::success(mutation.success()),
            Err(EditorError::Form(e)) => Notice::error(e.to_string()),
            Err(e) => {
                tracing::warn!(table = E::TABLE.name(), error = %e, "{}", mutation.failure());
                Notice::error(mutation.failure())
            }
        }
    }
}

fn decode<E: Entity>(row: Value) -> Option<E> {
    match serde_json::from_value(row) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(table = E::TABLE.name(), error = %e, "skipping unreadable row");
            None
        }
    }
}
