//! Database schema.
//!
//! Monetary values are stored as exact decimal strings, never REAL. JSON
//! columns hold serde-serialized values with stable key order.

/// Schema version recorded in `system_config`.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Full schema, idempotent (`IF NOT EXISTS` throughout).
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY,
    owner_id      TEXT NOT NULL REFERENCES users(id),
    name          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    status        TEXT NOT NULL DEFAULT 'active',
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS cases (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    case_type     TEXT NOT NULL DEFAULT 'aml',
    status        TEXT NOT NULL DEFAULT 'open',
    data_dir      TEXT NOT NULL DEFAULT '',
    metadata      TEXT NOT NULL DEFAULT '{}',
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS case_files (
    id            TEXT PRIMARY KEY,
    case_id       TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    file_type     TEXT NOT NULL,
    file_name     TEXT NOT NULL,
    file_path     TEXT NOT NULL,
    mime_type     TEXT NOT NULL DEFAULT '',
    size_bytes    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS statements (
    id                      TEXT PRIMARY KEY,
    case_id                 TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    bank_id                 TEXT NOT NULL DEFAULT '',
    bank_name               TEXT NOT NULL DEFAULT '',
    account_number          TEXT NOT NULL DEFAULT '',
    account_holder          TEXT NOT NULL DEFAULT '',
    period_from             TEXT,
    period_to               TEXT,
    opening_balance         TEXT,
    closing_balance         TEXT,
    available_balance       TEXT,
    currency                TEXT NOT NULL DEFAULT 'PLN',
    declared_credits_sum    TEXT,
    declared_credits_count  INTEGER,
    declared_debits_sum     TEXT,
    declared_debits_count   INTEGER,
    parse_method            TEXT NOT NULL DEFAULT '',
    ocr_used                INTEGER NOT NULL DEFAULT 0,
    ocr_confidence          REAL NOT NULL DEFAULT 0,
    parser_version          TEXT NOT NULL DEFAULT '',
    pdf_hash                TEXT NOT NULL DEFAULT '',
    balance_valid           INTEGER NOT NULL DEFAULT 1,
    warnings                TEXT NOT NULL DEFAULT '[]',
    created_at              TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_statements_case ON statements(case_id);
CREATE INDEX IF NOT EXISTS idx_statements_pdf_hash ON statements(pdf_hash);

CREATE TABLE IF NOT EXISTS transactions (
    id               TEXT PRIMARY KEY,
    statement_id     TEXT NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    counterparty_id  TEXT REFERENCES counterparties(id) ON DELETE SET NULL,
    booking_date     TEXT NOT NULL,
    tx_date          TEXT NOT NULL,
    amount           TEXT NOT NULL,
    currency         TEXT NOT NULL DEFAULT 'PLN',
    direction        TEXT NOT NULL,
    balance_after    TEXT,
    channel          TEXT NOT NULL DEFAULT 'OTHER',
    category         TEXT NOT NULL DEFAULT '',
    subcategory      TEXT NOT NULL DEFAULT '',
    risk_tags        TEXT NOT NULL DEFAULT '[]',
    risk_score       INTEGER NOT NULL DEFAULT 0,
    title            TEXT NOT NULL DEFAULT '',
    counterparty_raw TEXT NOT NULL DEFAULT '',
    bank_category    TEXT NOT NULL DEFAULT '',
    raw_text         TEXT NOT NULL DEFAULT '',
    rule_explains    TEXT NOT NULL DEFAULT '[]',
    urls             TEXT NOT NULL DEFAULT '[]',
    is_recurring     INTEGER NOT NULL DEFAULT 0,
    recurring_group  TEXT NOT NULL DEFAULT '',
    tx_hash          TEXT NOT NULL,
    UNIQUE (statement_id, tx_hash)
);

CREATE INDEX IF NOT EXISTS idx_transactions_statement ON transactions(statement_id);
CREATE INDEX IF NOT EXISTS idx_transactions_counterparty ON transactions(counterparty_id);

CREATE TABLE IF NOT EXISTS counterparties (
    id               TEXT PRIMARY KEY,
    canonical_name   TEXT NOT NULL,
    name_normalized  TEXT NOT NULL UNIQUE,
    label            TEXT NOT NULL DEFAULT 'neutral',
    note             TEXT NOT NULL DEFAULT '',
    confidence       REAL NOT NULL DEFAULT 1.0,
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS counterparty_aliases (
    id               TEXT PRIMARY KEY,
    counterparty_id  TEXT NOT NULL REFERENCES counterparties(id) ON DELETE CASCADE,
    alias            TEXT NOT NULL,
    alias_normalized TEXT NOT NULL,
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    UNIQUE (counterparty_id, alias_normalized)
);

CREATE INDEX IF NOT EXISTS idx_aliases_normalized ON counterparty_aliases(alias_normalized);

CREATE TABLE IF NOT EXISTS learning_queue (
    id               TEXT PRIMARY KEY,
    suggested_name   TEXT NOT NULL,
    suggested_label  TEXT NOT NULL DEFAULT 'neutral',
    evidence_tx_ids  TEXT NOT NULL DEFAULT '[]',
    status           TEXT NOT NULL DEFAULT 'pending',
    decision         TEXT NOT NULL DEFAULT '',
    label            TEXT NOT NULL DEFAULT '',
    note             TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    resolved_at      TEXT
);

CREATE TABLE IF NOT EXISTS account_profiles (
    id               TEXT PRIMARY KEY,
    account_number   TEXT NOT NULL UNIQUE,
    account_holder   TEXT NOT NULL DEFAULT '',
    bank_id          TEXT NOT NULL DEFAULT '',
    first_seen       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    last_seen        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    statement_count  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS parse_templates (
    id              TEXT PRIMARY KEY,
    bank_id         TEXT NOT NULL,
    bank_name       TEXT NOT NULL DEFAULT '',
    name            TEXT NOT NULL,
    column_mapping  TEXT NOT NULL DEFAULT '{}',
    sample_headers  TEXT NOT NULL DEFAULT '[]',
    is_default      INTEGER NOT NULL DEFAULT 0,
    times_used      INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_templates_bank ON parse_templates(bank_id);

CREATE TABLE IF NOT EXISTS tx_classifications (
    id            TEXT PRIMARY KEY,
    tx_id         TEXT NOT NULL UNIQUE REFERENCES transactions(id) ON DELETE CASCADE,
    statement_id  TEXT NOT NULL,
    classification TEXT NOT NULL,
    note          TEXT NOT NULL DEFAULT '',
    created_by    TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS field_rules (
    id            TEXT PRIMARY KEY,
    bank_id       TEXT NOT NULL,
    rule_type     TEXT NOT NULL,
    source_field  TEXT NOT NULL,
    target_field  TEXT NOT NULL,
    condition_json TEXT NOT NULL DEFAULT '{}',
    note          TEXT NOT NULL DEFAULT '',
    priority      INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS risk_assessments (
    id              TEXT PRIMARY KEY,
    statement_id    TEXT NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    total_score     REAL NOT NULL,
    score_breakdown TEXT NOT NULL DEFAULT '{}',
    risk_reasons    TEXT NOT NULL DEFAULT '[]',
    rules_version   TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS audit_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    TEXT NOT NULL DEFAULT '',
    case_id    TEXT NOT NULL DEFAULT '',
    action     TEXT NOT NULL,
    details    TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS graph_nodes (
    id          TEXT PRIMARY KEY,
    case_id     TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    node_type   TEXT NOT NULL,
    label       TEXT NOT NULL DEFAULT '',
    entity_id   TEXT NOT NULL DEFAULT '',
    risk_level  TEXT NOT NULL DEFAULT 'none',
    cluster     TEXT NOT NULL DEFAULT 'NORMAL',
    metadata    TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_graph_nodes_case ON graph_nodes(case_id);

CREATE TABLE IF NOT EXISTS graph_edges (
    id           TEXT PRIMARY KEY,
    case_id      TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    source_id    TEXT NOT NULL,
    target_id    TEXT NOT NULL,
    edge_type    TEXT NOT NULL,
    tx_count     INTEGER NOT NULL DEFAULT 0,
    total_amount TEXT NOT NULL DEFAULT '0',
    first_date   TEXT,
    last_date    TEXT,
    tx_ids       TEXT NOT NULL DEFAULT '[]',
    metadata     TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_graph_edges_case ON graph_edges(case_id);

CREATE TABLE IF NOT EXISTS system_config (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
