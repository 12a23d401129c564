use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            text        TEXT NOT NULL,
            author      TEXT NOT NULL,
            user_id     TEXT,
            avatar_url  TEXT,
            channel     TEXT,              -- NULL is the legacy spelling of 'general'
            file_url    TEXT,
            file_name   TEXT,
            file_type   TEXT,
            created_at  INTEGER NOT NULL   -- unix millis
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id);

        -- Full-text index over message text, external-content form.
        -- The triggers keep it in sync; message text is never updated in place.
        CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
            text,
            content='messages',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS messages_fts_insert
            AFTER INSERT ON messages BEGIN
                INSERT INTO messages_fts(rowid, text) VALUES (new.rowid, new.text);
            END;

        CREATE TRIGGER IF NOT EXISTS messages_fts_delete
            AFTER DELETE ON messages BEGIN
                INSERT INTO messages_fts(messages_fts, rowid, text)
                    VALUES ('delete', old.rowid, old.text);
            END;

        CREATE TABLE IF NOT EXISTS reactions (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            username    TEXT NOT NULL,
            emoji       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(message_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON reactions(message_id);

        CREATE TABLE IF NOT EXISTS channels (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT,
            created_by  TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            auth_id     TEXT NOT NULL UNIQUE,
            username    TEXT NOT NULL,
            avatar_url  TEXT,
            last_seen   INTEGER NOT NULL,  -- unix millis
            is_online   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_users_online
            ON users(is_online);

        CREATE TABLE IF NOT EXISTS files (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT,
            size        INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );

        -- Seed the default general channel
        INSERT OR IGNORE INTO channels (id, name, created_by, created_at)
            VALUES (
                '00000000-0000-0000-0000-000000000001',
                'general',
                'system',
                CAST(strftime('%s', 'now') AS INTEGER) * 1000
            );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
