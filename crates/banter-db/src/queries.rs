use crate::Database;
use crate::models::{ChannelRow, FileRow, MessageRow, ReactionRow, UserRow};
use anyhow::Result;
use rusqlite::{OptionalExtension, params};

const MESSAGE_COLS: &str =
    "m.id, m.text, m.author, m.user_id, m.avatar_url, m.channel, m.file_url, m.file_name, m.file_type, m.created_at";

fn map_message(row: &rusqlite::Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        author: row.get(2)?,
        user_id: row.get(3)?,
        avatar_url: row.get(4)?,
        channel: row.get(5)?,
        file_url: row.get(6)?,
        file_name: row.get(7)?,
        file_type: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_channel(row: &rusqlite::Row) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Build an FTS5 MATCH expression from raw user input. Every whitespace
/// token becomes a quoted phrase so FTS query syntax (`*`, `-`, `OR`) is
/// matched literally instead of interpreted.
fn fts_match_expr(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Database {
    // -- Messages --

    pub fn insert_message(&self, msg: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages
                     (id, text, author, user_id, avatar_url, channel, file_url, file_name, file_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    msg.id,
                    msg.text,
                    msg.author,
                    msg.user_id,
                    msg.avatar_url,
                    msg.channel,
                    msg.file_url,
                    msg.file_name,
                    msg.file_type,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Most recent messages for a channel, newest first. Rows with a NULL
    /// channel are legacy data and belong to 'general'.
    pub fn get_messages(&self, channel: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS}
                 FROM messages m
                 WHERE m.channel = ?1 OR (m.channel IS NULL AND ?1 = 'general')
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2"
            ))?;

            let rows = stmt
                .query_map(params![channel, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn message_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM messages WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Full-text matches scoped to a channel, best match first.
    pub fn search_messages(&self, query: &str, channel: &str, limit: u32) -> Result<Vec<MessageRow>> {
        let match_expr = fts_match_expr(query);
        if match_expr.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS}
                 FROM messages_fts
                 JOIN messages m ON m.rowid = messages_fts.rowid
                 WHERE messages_fts MATCH ?1
                   AND (m.channel = ?2 OR (m.channel IS NULL AND ?2 = 'general'))
                 ORDER BY messages_fts.rank
                 LIMIT ?3"
            ))?;

            let rows = stmt
                .query_map(params![match_expr, channel, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Reactions --

    /// Toggle a reaction. The leading DELETE removes any existing
    /// (user, emoji) entry, so the subsequent insert can never violate the
    /// one-per-pair invariant. Returns true if the reaction was added,
    /// false if it was removed.
    pub fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        username: &str,
        emoji: &str,
        now_ms: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                params![message_id, user_id, emoji],
            )?;

            if removed > 0 {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO reactions (message_id, user_id, username, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![message_id, user_id, username, emoji, now_ms],
            )?;
            Ok(true)
        })
    }

    /// Batch-fetch reactions for a set of message IDs, in insertion order.
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT message_id, user_id, username, emoji, created_at
                 FROM reactions
                 WHERE message_id IN ({})
                 ORDER BY rowid",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReactionRow {
                        message_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Channels --

    pub fn get_channels(&self) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_by, created_at FROM channels",
            )?;
            let rows = stmt
                .query_map([], map_channel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_channel_by_name(&self, name: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description, created_by, created_at
                     FROM channels WHERE name = ?1",
                    [name],
                    map_channel,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_channel_by_id(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description, created_by, created_at
                     FROM channels WHERE id = ?1",
                    [id],
                    map_channel,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn insert_channel(&self, channel: &ChannelRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO channels (id, name, description, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    channel.id,
                    channel.name,
                    channel.description,
                    channel.created_by,
                    channel.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Delete a channel and re-point its messages at 'general'. Both
    /// statements run in one transaction so no orphaned reference can
    /// survive a partial failure. Returns the number of re-pointed messages.
    pub fn delete_channel(&self, id: &str, name: &str) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM channels WHERE id = ?1", [id])?;
            let moved = tx.execute(
                "UPDATE messages SET channel = 'general' WHERE channel = ?1",
                [name],
            )?;
            tx.commit()?;
            Ok(moved as u64)
        })
    }

    // -- Presence --

    /// Insert-or-refresh a presence record keyed by auth_id.
    pub fn upsert_presence(
        &self,
        new_id: &str,
        auth_id: &str,
        username: &str,
        avatar_url: Option<&str>,
        now_ms: i64,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, auth_id, username, avatar_url, last_seen, is_online)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)
                 ON CONFLICT(auth_id) DO UPDATE SET
                     username   = excluded.username,
                     avatar_url = excluded.avatar_url,
                     last_seen  = excluded.last_seen,
                     is_online  = 1",
                params![new_id, auth_id, username, avatar_url, now_ms],
            )?;
            Ok(())
        })
    }

    /// Users online right now: flagged online AND seen since `cutoff_ms`.
    /// The time window is what decides — a stale flag alone never counts.
    pub fn online_count(&self, cutoff_ms: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE is_online = 1 AND last_seen >= ?1",
                [cutoff_ms],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Clear the online flag for users whose last_seen fell out of the
    /// window. Returns how many rows changed.
    pub fn expire_stale_presence(&self, cutoff_ms: i64) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_online = 0 WHERE is_online = 1 AND last_seen < ?1",
                [cutoff_ms],
            )?;
            Ok(changed as u64)
        })
    }

    pub fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, auth_id, username, avatar_url, last_seen, is_online
                     FROM users WHERE auth_id = ?1",
                    [auth_id],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            auth_id: row.get(1)?,
                            username: row.get(2)?,
                            avatar_url: row.get(3)?,
                            last_seen: row.get(4)?,
                            is_online: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Files --

    pub fn insert_file(&self, id: &str, owner_id: Option<&str>, size: i64, now_ms: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO files (id, owner_id, size, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, owner_id, size, now_ms],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, owner_id, size, created_at FROM files WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(FileRow {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            size: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Bulk clears (destructive, non-production) --

    /// Deletes every message. Reactions go with them via FK cascade and the
    /// FTS index is synced by the delete trigger.
    pub fn clear_messages(&self) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM messages", [])?;
            Ok(deleted as u64)
        })
    }

    pub fn clear_channels(&self) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM channels", [])?;
            Ok(deleted as u64)
        })
    }

    pub fn clear_users(&self) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users", [])?;
            Ok(deleted as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("in-memory db")
    }

    fn msg(id: &str, text: &str, channel: Option<&str>, created_at: i64) -> MessageRow {
        MessageRow {
            id: id.into(),
            text: text.into(),
            author: "bob".into(),
            user_id: None,
            avatar_url: None,
            channel: channel.map(Into::into),
            file_url: None,
            file_name: None,
            file_type: None,
            created_at,
        }
    }

    #[test]
    fn seeds_general_channel() {
        let db = test_db();
        let general = db.get_channel_by_name("general").unwrap();
        assert!(general.is_some());
    }

    #[test]
    fn toggle_pair_restores_original_reactions() {
        let db = test_db();
        db.insert_message(&msg("m1", "hi", Some("general"), 1)).unwrap();

        let added = db.toggle_reaction("m1", "u1", "alice", "👍", 10).unwrap();
        assert!(added);
        let removed = db.toggle_reaction("m1", "u1", "alice", "👍", 20).unwrap();
        assert!(!removed);

        let reactions = db.get_reactions_for_messages(&["m1".into()]).unwrap();
        assert!(reactions.is_empty());
    }

    #[test]
    fn reactions_unique_per_user_and_emoji() {
        let db = test_db();
        db.insert_message(&msg("m1", "hi", Some("general"), 1)).unwrap();

        db.toggle_reaction("m1", "u1", "alice", "👍", 10).unwrap();
        db.toggle_reaction("m1", "u2", "carol", "👍", 11).unwrap();
        db.toggle_reaction("m1", "u1", "alice", "🎉", 12).unwrap();

        let reactions = db.get_reactions_for_messages(&["m1".into()]).unwrap();
        assert_eq!(reactions.len(), 3);
        // Insertion order preserved
        assert_eq!(reactions[0].user_id, "u1");
        assert_eq!(reactions[1].user_id, "u2");
        assert_eq!(reactions[2].emoji, "🎉");
    }

    #[test]
    fn legacy_null_channel_reads_as_general() {
        let db = test_db();
        db.insert_message(&msg("m1", "old message", None, 1)).unwrap();
        db.insert_message(&msg("m2", "new message", Some("general"), 2)).unwrap();
        db.insert_message(&msg("m3", "elsewhere", Some("random"), 3)).unwrap();

        let general = db.get_messages("general", 100).unwrap();
        assert_eq!(general.len(), 2);

        let random = db.get_messages("random", 100).unwrap();
        assert_eq!(random.len(), 1);
        assert_eq!(random[0].id, "m3");
    }

    #[test]
    fn messages_newest_first_with_limit() {
        let db = test_db();
        for i in 0..5 {
            db.insert_message(&msg(&format!("m{i}"), "hi", Some("general"), i)).unwrap();
        }

        let rows = db.get_messages("general", 3).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m4", "m3", "m2"]);
    }

    #[test]
    fn delete_channel_repoints_every_message() {
        let db = test_db();
        db.insert_channel(&ChannelRow {
            id: "c1".into(),
            name: "random".into(),
            description: None,
            created_by: "u1".into(),
            created_at: 1,
        })
        .unwrap();
        db.insert_message(&msg("m1", "one", Some("random"), 1)).unwrap();
        db.insert_message(&msg("m2", "two", Some("random"), 2)).unwrap();
        db.insert_message(&msg("m3", "three", Some("general"), 3)).unwrap();

        let moved = db.delete_channel("c1", "random").unwrap();
        assert_eq!(moved, 2);

        assert!(db.get_channel_by_id("c1").unwrap().is_none());
        assert!(db.get_messages("random", 100).unwrap().is_empty());
        assert_eq!(db.get_messages("general", 100).unwrap().len(), 3);
    }

    #[test]
    fn presence_window_is_authoritative() {
        let db = test_db();
        let now = 10_000_000;
        db.upsert_presence("id1", "auth1", "alice", None, now).unwrap();

        // Seen exactly at the cutoff still counts
        assert_eq!(db.online_count(now).unwrap(), 1);
        // One millisecond past the window does not, flag or no flag
        assert_eq!(db.online_count(now + 1).unwrap(), 0);
    }

    #[test]
    fn presence_upsert_refreshes_not_duplicates() {
        let db = test_db();
        db.upsert_presence("id1", "auth1", "alice", None, 100).unwrap();
        db.upsert_presence("id2", "auth1", "alice2", Some("http://a/b.png"), 200).unwrap();

        let user = db.get_user_by_auth_id("auth1").unwrap().unwrap();
        assert_eq!(user.id, "id1"); // original row kept
        assert_eq!(user.username, "alice2");
        assert_eq!(user.last_seen, 200);
        assert_eq!(db.online_count(0).unwrap(), 1);
    }

    #[test]
    fn expire_clears_stale_flags_only() {
        let db = test_db();
        db.upsert_presence("id1", "auth1", "alice", None, 100).unwrap();
        db.upsert_presence("id2", "auth2", "bob", None, 500).unwrap();

        let changed = db.expire_stale_presence(300).unwrap();
        assert_eq!(changed, 1);
        assert!(!db.get_user_by_auth_id("auth1").unwrap().unwrap().is_online);
        assert!(db.get_user_by_auth_id("auth2").unwrap().unwrap().is_online);
    }

    #[test]
    fn search_is_scoped_to_channel() {
        let db = test_db();
        db.insert_message(&msg("m1", "hello world", Some("general"), 1)).unwrap();
        db.insert_message(&msg("m2", "hello there", Some("random"), 2)).unwrap();
        db.insert_message(&msg("m3", "goodbye", Some("general"), 3)).unwrap();

        let hits = db.search_messages("hello", "general", 50).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "m1");
    }

    #[test]
    fn search_finds_legacy_null_channel_rows_in_general() {
        let db = test_db();
        db.insert_message(&msg("m1", "ancient greeting", None, 1)).unwrap();

        let hits = db.search_messages("greeting", "general", 50).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn search_treats_query_syntax_literally() {
        let db = test_db();
        db.insert_message(&msg("m1", "plain text", Some("general"), 1)).unwrap();

        // None of these may error, whatever FTS5 thinks of the characters
        assert!(db.search_messages("\"quoted\"", "general", 50).unwrap().is_empty());
        assert!(db.search_messages("foo*", "general", 50).unwrap().is_empty());
        assert!(db.search_messages("a-b OR c", "general", 50).unwrap().is_empty());
        // All-whitespace input short-circuits to empty
        assert!(db.search_messages("   ", "general", 50).unwrap().is_empty());
    }

    #[test]
    fn fts_expr_quotes_tokens() {
        assert_eq!(fts_match_expr("hello world"), "\"hello\" \"world\"");
        assert_eq!(fts_match_expr("say \"hi\""), "\"say\" \"\"\"hi\"\"\"");
        assert_eq!(fts_match_expr("  "), "");
    }

    #[test]
    fn duplicate_channel_name_rejected_by_schema() {
        let db = test_db();
        let dup = db.insert_channel(&ChannelRow {
            id: "c9".into(),
            name: "general".into(),
            description: None,
            created_by: "u1".into(),
            created_at: 1,
        });
        assert!(dup.is_err());
    }

    #[test]
    fn clear_messages_takes_reactions_and_fts_along() {
        let db = test_db();
        db.insert_message(&msg("m1", "searchable words", Some("general"), 1)).unwrap();
        db.toggle_reaction("m1", "u1", "alice", "👍", 2).unwrap();

        let deleted = db.clear_messages().unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_reactions_for_messages(&["m1".into()]).unwrap().is_empty());
        assert!(db.search_messages("searchable", "general", 50).unwrap().is_empty());
    }

    #[test]
    fn clear_channels_and_users_report_counts() {
        let db = test_db();
        db.upsert_presence("id1", "auth1", "alice", None, 1).unwrap();

        assert_eq!(db.clear_channels().unwrap(), 1); // the seeded general
        assert_eq!(db.clear_users().unwrap(), 1);
    }

    #[test]
    fn files_roundtrip() {
        let db = test_db();
        db.insert_file("f1", Some("u1"), 42, 1).unwrap();

        let file = db.get_file("f1").unwrap().unwrap();
        assert_eq!(file.size, 42);
        assert_eq!(file.owner_id.as_deref(), Some("u1"));
        assert!(db.get_file("missing").unwrap().is_none());
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banter.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_message(&msg("m1", "durable", Some("general"), 1)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_messages("general", 100).unwrap().len(), 1);
    }
}
