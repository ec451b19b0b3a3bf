use crate::errors::{AppError, AppResult};
use crate::models::{JournalEntry, Mood, SharingGroup, User};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const JOURNAL_ENTRIES_KEY: &str = "journal_entries";
const SHARING_GROUPS_KEY: &str = "sharing_groups";
const USER_SESSION_KEY: &str = "user";

// ユーザーあたりのグループ上限（作成時に強制）
const MAX_GROUPS: usize = 4;

/// ローカル永続化ストア
/// 固定キーごとにJSON配列を1つ保持するkey-valueコレクション。
/// ゲストモードでは唯一のストア、ログイン後はオフラインキャッシュとして使う。
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> AppResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> AppResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    // 生のJSON文字列を書き込む（テストでの破損データ注入にも使う）
    pub async fn put_raw(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(conn: &Connection, key: &str) -> AppResult<Vec<T>> {
        let json: Option<String> = conn
            .query_row("SELECT value FROM store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            None => Ok(Vec::new()),
            Some(text) => match serde_json::from_str(&text) {
                Ok(items) => Ok(items),
                Err(e) => {
                    // 壊れたデータは空コレクション扱い（呼び出し側には伝播させない）
                    log::error!("Error parsing stored collection '{}': {}", key, e);
                    Ok(Vec::new())
                }
            },
        }
    }

    fn write_collection<T: Serialize>(conn: &Connection, key: &str, items: &[T]) -> AppResult<()> {
        let json = serde_json::to_string(items)?;
        conn.execute(
            "INSERT OR REPLACE INTO store (key, value) VALUES (?1, ?2)",
            params![key, json],
        )?;
        Ok(())
    }

    /// 全エントリーを日付の降順で返す
    pub async fn get_all_entries(&self) -> AppResult<Vec<JournalEntry>> {
        let conn = self.conn.lock().await;
        let mut entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    pub async fn get_entry(&self, id: &str) -> AppResult<Option<JournalEntry>> {
        let conn = self.conn.lock().await;
        let entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
        Ok(entries.into_iter().find(|entry| entry.id == id))
    }

    /// 新規エントリーを保存する。idと日付は呼び出し側の値を無視してここで振り直す
    pub async fn save_entry(&self, entry: JournalEntry) -> AppResult<JournalEntry> {
        let new_entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            date: Utc::now(),
            // 省略されたオプション項目は保存時に既定値へ寄せる
            kick_count: entry.kick_count.or(Some(0)),
            ..entry
        };

        let conn = self.conn.lock().await;
        let mut entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
        entries.insert(0, new_entry.clone());
        Self::write_collection(&conn, JOURNAL_ENTRIES_KEY, &entries)?;
        Ok(new_entry)
    }

    /// エントリーをそのまま先頭に挿入する（リモート失敗時のフォールバックで
    /// 楽観的に採番済みのidを保持するため）
    pub async fn insert_entry(&self, entry: JournalEntry) -> AppResult<()> {
        let conn = self.conn.lock().await;
        let mut entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
        entries.insert(0, entry);
        Self::write_collection(&conn, JOURNAL_ENTRIES_KEY, &entries)?;
        Ok(())
    }

    /// idが一致するエントリーを置き換える。見つからなければ何もしない
    pub async fn update_entry(&self, updated: JournalEntry) -> AppResult<Option<JournalEntry>> {
        let conn = self.conn.lock().await;
        let mut entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;

        let mut replaced = None;
        for entry in entries.iter_mut() {
            if entry.id == updated.id {
                *entry = updated.clone();
                replaced = Some(updated.clone());
                break;
            }
        }

        if replaced.is_some() {
            Self::write_collection(&conn, JOURNAL_ENTRIES_KEY, &entries)?;
        }
        Ok(replaced)
    }

    /// idで削除する。存在しないidの削除はエラーにしない
    pub async fn delete_entry(&self, id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().await;
        let entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
        let before = entries.len();
        let filtered: Vec<JournalEntry> =
            entries.into_iter().filter(|entry| entry.id != id).collect();
        let removed = filtered.len() != before;
        Self::write_collection(&conn, JOURNAL_ENTRIES_KEY, &filtered)?;
        Ok(removed)
    }

    /// お気に入りを反転し、新しい値を返す。エントリーがなければNone
    pub async fn toggle_favorite(&self, id: &str) -> AppResult<Option<bool>> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.favorite = !entry.favorite;
                let favorite = entry.favorite;
                self.update_entry(entry).await?;
                Ok(Some(favorite))
            }
            None => Ok(None),
        }
    }

    pub async fn update_mood(&self, id: &str, mood: Option<Mood>) -> AppResult<bool> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.mood = mood;
                self.update_entry(entry).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn update_sharing(
        &self,
        id: &str,
        is_shared: bool,
        groups: Option<Vec<String>>,
    ) -> AppResult<bool> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.is_shared = is_shared;
                if let Some(groups) = groups {
                    entry.shared_with_groups = groups;
                }
                self.update_entry(entry).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn update_kick_count(&self, id: &str, kick_count: u32) -> AppResult<bool> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.kick_count = Some(kick_count);
                self.update_entry(entry).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn get_favorites(&self) -> AppResult<Vec<JournalEntry>> {
        let entries = self.get_all_entries().await?;
        Ok(entries.into_iter().filter(|entry| entry.favorite).collect())
    }

    /// グループに共有されているエントリーを日付の降順で返す
    pub async fn get_entries_shared_with_group(
        &self,
        group_id: &str,
    ) -> AppResult<Vec<JournalEntry>> {
        let entries = self.get_all_entries().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry.is_shared && entry.shared_with_groups.iter().any(|g| g == group_id)
            })
            .collect())
    }

    pub async fn get_all_groups(&self) -> AppResult<Vec<SharingGroup>> {
        let conn = self.conn.lock().await;
        Self::read_collection(&conn, SHARING_GROUPS_KEY)
    }

    /// グループを作成する。上限（4つ）を超える作成は拒否
    pub async fn create_group(&self, name: &str) -> AppResult<SharingGroup> {
        if name.trim().is_empty() {
            return Err(AppError::ValidationError {
                message: "Group name cannot be empty".to_string(),
            });
        }

        let conn = self.conn.lock().await;
        let mut groups: Vec<SharingGroup> = Self::read_collection(&conn, SHARING_GROUPS_KEY)?;
        if groups.len() >= MAX_GROUPS {
            return Err(AppError::InvalidOperation {
                message: format!("Cannot create more than {} sharing groups", MAX_GROUPS),
            });
        }

        let group = SharingGroup::new(name.trim().to_string());
        groups.push(group.clone());
        Self::write_collection(&conn, SHARING_GROUPS_KEY, &groups)?;
        Ok(group)
    }

    /// グループを削除し、各エントリーのshared_with_groups参照も掃除する
    pub async fn delete_group(&self, id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().await;
        let groups: Vec<SharingGroup> = Self::read_collection(&conn, SHARING_GROUPS_KEY)?;
        let before = groups.len();
        let filtered: Vec<SharingGroup> =
            groups.into_iter().filter(|group| group.id != id).collect();
        let removed = filtered.len() != before;
        Self::write_collection(&conn, SHARING_GROUPS_KEY, &filtered)?;

        if removed {
            let mut entries: Vec<JournalEntry> = Self::read_collection(&conn, JOURNAL_ENTRIES_KEY)?;
            let mut dirty = false;
            for entry in entries.iter_mut() {
                let len = entry.shared_with_groups.len();
                entry.shared_with_groups.retain(|g| g != id);
                if entry.shared_with_groups.len() != len {
                    dirty = true;
                }
            }
            if dirty {
                Self::write_collection(&conn, JOURNAL_ENTRIES_KEY, &entries)?;
            }
        }

        Ok(removed)
    }

    /// メンバーを追加する。既に登録済みのメールならfalse（エラーにはしない）
    pub async fn add_member_to_group(&self, group_id: &str, email: &str) -> AppResult<bool> {
        let conn = self.conn.lock().await;
        let mut groups: Vec<SharingGroup> = Self::read_collection(&conn, SHARING_GROUPS_KEY)?;

        let Some(group) = groups.iter_mut().find(|group| group.id == group_id) else {
            return Ok(false);
        };

        let email = email.trim().to_lowercase();
        if group.members.iter().any(|member| member == &email) {
            return Ok(false);
        }

        group.members.push(email);
        group.member_count += 1;
        Self::write_collection(&conn, SHARING_GROUPS_KEY, &groups)?;
        Ok(true)
    }

    pub async fn get_user(&self) -> AppResult<Option<User>> {
        let conn = self.conn.lock().await;
        let json: Option<String> = conn
            .query_row(
                "SELECT value FROM store WHERE key = ?1",
                params![USER_SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            None => Ok(None),
            Some(text) => match serde_json::from_str(&text) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    log::error!("Error parsing stored user session: {}", e);
                    Ok(None)
                }
            },
        }
    }

    pub async fn set_user(&self, user: &User) -> AppResult<()> {
        let json = serde_json::to_string(user)?;
        self.put_raw(USER_SESSION_KEY, &json).await
    }

    pub async fn clear_user(&self) -> AppResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM store WHERE key = ?1",
            params![USER_SESSION_KEY],
        )?;
        Ok(())
    }
}
