use crate::config::RemoteConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{JournalEntry, MediaItem, Mood};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// リモート永続化アダプターの操作面。
/// テストでは常時失敗・インメモリのフェイクに差し替える。
#[allow(async_fn_in_trait)]
pub trait RemoteEntryStore {
    async fn fetch_entries(&self, user_id: &str) -> AppResult<Vec<JournalEntry>>;
    async fn fetch_entry(&self, id: &str) -> AppResult<Option<JournalEntry>>;
    async fn create_entry(&self, entry: &JournalEntry) -> AppResult<JournalEntry>;
    async fn update_entry(&self, entry: &JournalEntry) -> AppResult<Option<JournalEntry>>;
    async fn delete_entry(&self, id: &str) -> AppResult<bool>;
    async fn upsert_entries(&self, entries: &[JournalEntry]) -> AppResult<()>;
}

/// journal_entriesテーブルの行。mediaはJSONカラムなので
/// 境界でValueとして受けてから型付きにパースする
#[derive(Debug, Serialize, Deserialize)]
struct EntryRow {
    id: String,
    title: String,
    content: String,
    date: DateTime<Utc>,
    #[serde(default)]
    favorite: bool,
    #[serde(default)]
    mood: Option<Mood>,
    #[serde(default)]
    kick_count: Option<u32>,
    #[serde(default)]
    is_shared: bool,
    #[serde(default)]
    shared_with_groups: Vec<String>,
    #[serde(default)]
    media: Value,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl EntryRow {
    fn from_entry(entry: &JournalEntry) -> AppResult<Self> {
        Ok(Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            date: entry.date,
            favorite: entry.favorite,
            mood: entry.mood,
            kick_count: entry.kick_count,
            is_shared: entry.is_shared,
            shared_with_groups: entry.shared_with_groups.clone(),
            media: serde_json::to_value(&entry.media)?,
            user_id: entry.user_id.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        })
    }

    fn into_entry(self) -> AppResult<JournalEntry> {
        Ok(JournalEntry {
            id: self.id,
            title: self.title,
            content: self.content,
            date: self.date,
            favorite: self.favorite,
            media: parse_media_column(self.media)?,
            mood: self.mood,
            kick_count: self.kick_count,
            is_shared: self.is_shared,
            shared_with_groups: self.shared_with_groups,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// mediaカラムの明示的なスキーマ検証。
/// null→空、配列→型付きデシリアライズ、それ以外はデコードエラー
pub(crate) fn parse_media_column(value: Value) -> AppResult<Vec<MediaItem>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => Err(AppError::StorageParse {
            message: format!("media column is not an array: {}", other),
        }),
    }
}

/// ホスト側バックエンド（PostgRESTスタイルのjournal_entriesテーブル）への
/// リモート永続化アダプター。全操作は非同期かつネットワーク起因で失敗しうる
pub struct RemoteStore {
    config: RemoteConfig,
    client: Client,
}

impl RemoteStore {
    pub fn new(config: RemoteConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn entries_url(&self) -> String {
        format!("{}/rest/v1/journal_entries", self.config.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    fn check_status(response: &reqwest::Response) -> AppResult<()> {
        if !response.status().is_success() {
            return Err(AppError::RemoteUnavailable {
                message: format!("Remote API returned status: {}", response.status()),
            });
        }
        Ok(())
    }

    async fn decode_rows(response: reqwest::Response) -> AppResult<Vec<JournalEntry>> {
        let rows: Vec<EntryRow> = response.json().await?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }
}

impl RemoteEntryStore for RemoteStore {
    async fn fetch_entries(&self, user_id: &str) -> AppResult<Vec<JournalEntry>> {
        let url = format!(
            "{}?user_id=eq.{}&order=date.desc",
            self.entries_url(),
            user_id
        );
        log::debug!("📡 Fetching remote entries: {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::check_status(&response)?;
        Self::decode_rows(response).await
    }

    async fn fetch_entry(&self, id: &str) -> AppResult<Option<JournalEntry>> {
        let url = format!("{}?id=eq.{}&limit=1", self.entries_url(), id);

        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::check_status(&response)?;
        let mut entries = Self::decode_rows(response).await?;
        Ok(if entries.is_empty() {
            None
        } else {
            Some(entries.remove(0))
        })
    }

    /// idとタイムスタンプは呼び出し側で採番済みの値をそのまま書き込む。
    /// 同じidがローカルフォールバックでも使えるようにするため
    async fn create_entry(&self, entry: &JournalEntry) -> AppResult<JournalEntry> {
        let row = EntryRow::from_entry(entry)?;

        let response = self
            .authorized(self.client.post(self.entries_url()))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::check_status(&response)?;

        let mut created = Self::decode_rows(response).await?;
        Ok(if created.is_empty() {
            entry.clone()
        } else {
            created.remove(0)
        })
    }

    /// 書き込み前に必ずupdated_atを打ち直す
    async fn update_entry(&self, entry: &JournalEntry) -> AppResult<Option<JournalEntry>> {
        let mut stamped = entry.clone();
        stamped.updated_at = Some(Utc::now());
        let row = EntryRow::from_entry(&stamped)?;

        let url = format!("{}?id=eq.{}", self.entries_url(), entry.id);
        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::check_status(&response)?;

        let mut updated = Self::decode_rows(response).await?;
        Ok(if updated.is_empty() {
            None
        } else {
            Some(updated.remove(0))
        })
    }

    async fn delete_entry(&self, id: &str) -> AppResult<bool> {
        let url = format!("{}?id=eq.{}", self.entries_url(), id);
        let response = self
            .authorized(self.client.delete(&url))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::check_status(&response)?;

        let deleted: Vec<EntryRow> = response.json().await?;
        Ok(!deleted.is_empty())
    }

    /// idをキーにバッチでupsertする（存在すれば上書き、なければ挿入）
    async fn upsert_entries(&self, entries: &[JournalEntry]) -> AppResult<()> {
        let rows: Vec<EntryRow> = entries
            .iter()
            .map(EntryRow::from_entry)
            .collect::<AppResult<_>>()?;

        let url = format!("{}?on_conflict=id", self.entries_url());
        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows)
            .send()
            .await?;
        Self::check_status(&response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use serde_json::json;

    #[test]
    fn test_parse_media_column_array() {
        let value = json!([
            {"type": "audio", "url": "/tmp/rec.wav"},
            {"type": "photo", "url": "https://example.com/p.jpg"}
        ]);
        let media = parse_media_column(value).unwrap();
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].media_type, MediaType::Audio);
        assert_eq!(media[1].media_type, MediaType::Photo);
    }

    #[test]
    fn test_parse_media_column_null_is_empty() {
        assert!(parse_media_column(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_media_column_rejects_non_array() {
        let result = parse_media_column(json!({"type": "audio"}));
        assert!(matches!(result, Err(AppError::StorageParse { .. })));
    }

    #[test]
    fn test_parse_media_column_rejects_malformed_item() {
        let result = parse_media_column(json!([{"type": "hologram", "url": "x"}]));
        assert!(result.is_err());
    }
}
