//! SQL schema for the Fledge SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per applicant. Fee fields and the payment reference are frozen at
-- insert; only status and reviewed_at are ever updated.
CREATE TABLE IF NOT EXISTS registrations (
    registration_id    TEXT PRIMARY KEY,
    guardian_name      TEXT NOT NULL,
    guardian_email     TEXT NOT NULL,
    student_first_name TEXT NOT NULL,
    student_last_name  TEXT NOT NULL,
    student_birth_date TEXT,            -- ISO 8601 date or NULL
    school_name        TEXT NOT NULL,
    base_fee           TEXT NOT NULL,   -- decimal as text, two places
    discount_code      TEXT,
    final_fee          TEXT NOT NULL,
    discount_applied   INTEGER NOT NULL,
    payment_reference  TEXT NOT NULL UNIQUE,
    status             TEXT NOT NULL,   -- 'submitted' | 'payment_uploaded' | 'approved' | 'rejected'
    created_at         TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    reviewed_at        TEXT
);

-- Uploaded proof-of-payment pointers; untrusted, for human review only.
CREATE TABLE IF NOT EXISTS payment_artifacts (
    artifact_id       TEXT PRIMARY KEY,
    registration_id   TEXT NOT NULL REFERENCES registrations(registration_id),
    claimed_reference TEXT NOT NULL,
    artifact_url      TEXT NOT NULL,
    uploaded_at       TEXT NOT NULL
);

-- Discount catalog; written by the admin collaborator, read-only to the
-- registration flow apart from the times_used ledger.
CREATE TABLE IF NOT EXISTS discount_codes (
    code        TEXT PRIMARY KEY,       -- stored uppercase
    policy_json TEXT NOT NULL,
    valid_from  TEXT,
    valid_until TEXT,
    usage_cap   INTEGER,
    times_used  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS registrations_status_idx   ON registrations(status);
CREATE INDEX IF NOT EXISTS registrations_guardian_idx ON registrations(guardian_email);
CREATE INDEX IF NOT EXISTS artifacts_registration_idx ON payment_artifacts(registration_id);

PRAGMA user_version = 1;
";
