//! SQL DDL for the content tables.
//!
//! In production the hosted platform owns the schema; locally `init_schema` applies this
//! DDL at startup so a fresh Postgres container is usable immediately.

use sqlx::PgPool;

use crate::error::StoreError;

/// Postgres schema with:
/// - `BIGSERIAL` ids (the numeric `id` every record carries)
/// - `TEXT[]` for list-valued fields (description lines, highlights, tags, skill items)
/// - `messages.created_at` defaulting to `now()` so inbox ordering never sees NULLs
pub const POSTGRES_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS profile (
    id BIGSERIAL PRIMARY KEY,
    email_personal TEXT NULL,
    email_college TEXT NULL,
    phone_in TEXT NULL,
    phone_np TEXT NULL,
    address_temp TEXT NULL,
    address_perm TEXT NULL,
    github TEXT NULL,
    linkedin TEXT NULL,
    leetcode TEXT NULL,
    status_text TEXT NULL,
    open_for TEXT NULL
);

CREATE TABLE IF NOT EXISTS education (
    id BIGSERIAL PRIMARY KEY,
    institution TEXT NOT NULL,
    degree TEXT NOT NULL,
    period TEXT NOT NULL,
    score TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS experiences (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    company_name TEXT NOT NULL,
    period TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'Internship',
    description TEXT[] NOT NULL DEFAULT '{}',
    internship_url TEXT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    period TEXT NOT NULL,
    description TEXT NOT NULL,
    highlights TEXT[] NOT NULL DEFAULT '{}',
    tags TEXT[] NOT NULL DEFAULT '{}',
    github_url TEXT NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id BIGSERIAL PRIMARY KEY,
    category TEXT NOT NULL,
    items TEXT[] NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS certifications (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    issuer TEXT NOT NULL,
    url TEXT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at DESC)
"#;

/// Executes the bundled DDL one statement at a time (prepared statements cannot carry
/// several commands).
pub async fn init_schema(pool: &PgPool) -> Result<(), StoreError> {
    for stmt in POSTGRES_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
