//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Accounts
-- ============================================================

CREATE TABLE IF NOT EXISTS accounts (
    user_id INTEGER PRIMARY KEY,
    tokens INTEGER NOT NULL DEFAULT 0 CHECK (tokens >= 0),
    created_at INTEGER NOT NULL
);

-- ============================================================
-- Chapter lock metadata
-- ============================================================

CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY,
    comic_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    is_locked INTEGER NOT NULL DEFAULT 0,
    cost INTEGER NOT NULL DEFAULT 0 CHECK (cost >= 0),
    free_days INTEGER NOT NULL DEFAULT 0,
    free_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_chapters_comic ON chapters(comic_id);

-- ============================================================
-- Entitlements (one row per user and comic)
-- ============================================================

CREATE TABLE IF NOT EXISTS entitlements (
    user_id INTEGER NOT NULL,
    comic_id INTEGER NOT NULL,
    purchased TEXT NOT NULL DEFAULT '[]',
    bookmarked TEXT NOT NULL DEFAULT '[]',
    liked TEXT NOT NULL DEFAULT '[]',
    viewed TEXT NOT NULL DEFAULT '[]',
    latest_viewed INTEGER,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, comic_id)
);

CREATE INDEX IF NOT EXISTS idx_entitlements_updated ON entitlements(user_id, updated_at);

-- ============================================================
-- Token transactions (append-only)
-- ============================================================

CREATE TABLE IF NOT EXISTS token_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    amount INTEGER NOT NULL,
    price REAL NOT NULL DEFAULT 0.0,
    payment_method TEXT NOT NULL DEFAULT '',
    package_label TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    timestamp INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'COMPLETED'
);

CREATE INDEX IF NOT EXISTS idx_tx_user_time ON token_transactions(user_id, timestamp);
"#;
