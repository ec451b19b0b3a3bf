use crate::errors::{validate_entry_title, validate_member_email, AppResult};
use crate::models::{JournalEntry, Mood, SharingGroup, User};
use crate::remote::{RemoteEntryStore, RemoteStore};
use crate::storage::LocalStore;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// エントリーの読み書きルーティングと同期。
/// セッションがあればリモートを試し、失敗したらローカルへフォールバック、
/// ゲストモードでは常にローカルを使う。このルールは全操作で同一
pub struct JournalService<R: RemoteEntryStore = RemoteStore> {
    local: Arc<LocalStore>,
    remote: Option<Arc<R>>,
    session: Arc<Mutex<Option<User>>>,
}

impl JournalService<RemoteStore> {
    /// ゲストモード専用（リモートなし）
    pub fn local_only(local: Arc<LocalStore>) -> Self {
        Self::new(local, None)
    }
}

impl<R: RemoteEntryStore> JournalService<R> {
    pub fn new(local: Arc<LocalStore>, remote: Option<Arc<R>>) -> Self {
        Self {
            local,
            remote,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// ルーティング規則の一元化。
    /// remote_opがSome（＝セッションあり・リモートあり）ならまず試し、
    /// エラーはログに落としてローカル結果を返す
    async fn route<T, RF, LF>(&self, remote_op: Option<RF>, local_op: LF) -> AppResult<T>
    where
        RF: Future<Output = AppResult<T>>,
        LF: Future<Output = AppResult<T>>,
    {
        if let Some(remote_fut) = remote_op {
            match remote_fut.await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::error!("Remote operation failed, falling back to local store: {}", e);
                }
            }
        }
        local_op.await
    }

    // セッションとリモートが両方あるときだけSome
    async fn remote_session(&self) -> Option<(Arc<R>, User)> {
        let session = self.session.lock().await;
        match (&self.remote, session.as_ref()) {
            (Some(remote), Some(user)) => Some((remote.clone(), user.clone())),
            _ => None,
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.lock().await.clone()
    }

    /// 保存済みセッションを復元する（起動時に一度呼ぶ）
    pub async fn restore_session(&self) -> AppResult<Option<User>> {
        let user = self.local.get_user().await?;
        let mut session = self.session.lock().await;
        *session = user.clone();
        Ok(user)
    }

    /// ログイン／サインアップ時に一度だけ呼ばれる。
    /// セッションを確立し、ゲストモードのデータをリモートへ同期する。
    /// 同期の失敗はログインを妨げない（ログのみ）
    pub async fn login(&self, user: User) -> AppResult<()> {
        self.local.set_user(&user).await?;
        {
            let mut session = self.session.lock().await;
            *session = Some(user.clone());
        }

        if let Err(e) = self.sync_local_entries(&user.id).await {
            log::error!("Error syncing local entries to remote store: {}", e);
        }
        Ok(())
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.local.clear_user().await?;
        let mut session = self.session.lock().await;
        *session = None;
        Ok(())
    }

    /// ローカルの全エントリーをユーザーidでタグ付けし、idをキーに
    /// リモートへ一括upsertする。ローカルはバックアップとして残す
    pub async fn sync_local_entries(&self, user_id: &str) -> AppResult<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };

        let local_entries = self.local.get_all_entries().await?;
        if local_entries.is_empty() {
            return Ok(());
        }

        let count = local_entries.len();
        let tagged: Vec<JournalEntry> = local_entries
            .into_iter()
            .map(|entry| entry.with_user_id(user_id.to_string()))
            .collect();

        remote.upsert_entries(&tagged).await?;
        log::info!("✅ Synced {} local entries to remote store", count);
        Ok(())
    }

    pub async fn get_entries(&self) -> AppResult<Vec<JournalEntry>> {
        let remote_op = self.remote_session().await.map(|(remote, user)| async move {
            remote.fetch_entries(&user.id).await
        });
        self.route(remote_op, self.local.get_all_entries()).await
    }

    pub async fn get_entry(&self, id: &str) -> AppResult<Option<JournalEntry>> {
        let id_owned = id.to_string();
        let remote_op = self.remote_session().await.map(|(remote, _)| async move {
            remote.fetch_entry(&id_owned).await
        });
        self.route(remote_op, self.local.get_entry(id)).await
    }

    pub async fn get_favorites(&self) -> AppResult<Vec<JournalEntry>> {
        let entries = self.get_entries().await?;
        Ok(entries.into_iter().filter(|entry| entry.favorite).collect())
    }

    /// 新規エントリーを作成する。
    /// タイトルの検証は永続化より前。idとタイムスタンプはここで採番するので、
    /// リモートが落ちてもローカルフォールバックが同じidを使える
    pub async fn create_entry(&self, draft: JournalEntry) -> AppResult<JournalEntry> {
        validate_entry_title(&draft.title)?;

        let now = Utc::now();
        let mut entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            created_at: Some(now),
            updated_at: Some(now),
            kick_count: draft.kick_count.or(Some(0)),
            ..draft
        };

        let session = self.remote_session().await;
        if let Some((_, user)) = &session {
            entry.user_id = Some(user.id.clone());
        }

        let remote_op = session.map(|(remote, _)| {
            let entry = entry.clone();
            async move { remote.create_entry(&entry).await }
        });
        let local_entry = entry.clone();
        let local = self.local.clone();
        self.route(remote_op, async move {
            local.insert_entry(local_entry.clone()).await?;
            Ok(local_entry)
        })
        .await
    }

    /// エントリー全体の置き換え。書き込み前にupdated_atを打ち直す
    pub async fn update_entry(&self, entry: JournalEntry) -> AppResult<Option<JournalEntry>> {
        let mut stamped = entry;
        stamped.updated_at = Some(Utc::now());

        let remote_op = self.remote_session().await.map(|(remote, _)| {
            let entry = stamped.clone();
            async move { remote.update_entry(&entry).await }
        });
        self.route(remote_op, self.local.update_entry(stamped.clone()))
            .await
    }

    pub async fn delete_entry(&self, id: &str) -> AppResult<bool> {
        let id_owned = id.to_string();
        let remote_op = self.remote_session().await.map(|(remote, _)| async move {
            remote.delete_entry(&id_owned).await
        });
        self.route(remote_op, self.local.delete_entry(id)).await
    }

    /// 以下の単一フィールド更新は、ルーティング済みの取得＋全体更新による
    /// read-modify-writeで実現する
    pub async fn toggle_favorite(&self, id: &str) -> AppResult<Option<JournalEntry>> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.favorite = !entry.favorite;
                self.update_entry(entry).await
            }
            None => Ok(None),
        }
    }

    pub async fn update_mood(&self, id: &str, mood: Option<Mood>) -> AppResult<Option<JournalEntry>> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.mood = mood;
                self.update_entry(entry).await
            }
            None => Ok(None),
        }
    }

    pub async fn update_sharing(
        &self,
        id: &str,
        is_shared: bool,
        groups: Option<Vec<String>>,
    ) -> AppResult<Option<JournalEntry>> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.is_shared = is_shared;
                if let Some(groups) = groups {
                    entry.shared_with_groups = groups;
                }
                self.update_entry(entry).await
            }
            None => Ok(None),
        }
    }

    pub async fn update_kick_count(
        &self,
        id: &str,
        kick_count: u32,
    ) -> AppResult<Option<JournalEntry>> {
        match self.get_entry(id).await? {
            Some(mut entry) => {
                entry.kick_count = Some(kick_count);
                self.update_entry(entry).await
            }
            None => Ok(None),
        }
    }

    // グループはローカルのみ（リモートスキーマにグループテーブルはない）
    pub async fn get_all_groups(&self) -> AppResult<Vec<SharingGroup>> {
        self.local.get_all_groups().await
    }

    pub async fn create_group(&self, name: &str) -> AppResult<SharingGroup> {
        self.local.create_group(name).await
    }

    pub async fn delete_group(&self, id: &str) -> AppResult<bool> {
        self.local.delete_group(id).await
    }

    pub async fn add_member_to_group(&self, group_id: &str, email: &str) -> AppResult<bool> {
        validate_member_email(email)?;
        self.local.add_member_to_group(group_id, email).await
    }

    pub async fn get_entries_shared_with_group(
        &self,
        group_id: &str,
    ) -> AppResult<Vec<JournalEntry>> {
        self.local.get_entries_shared_with_group(group_id).await
    }
}
