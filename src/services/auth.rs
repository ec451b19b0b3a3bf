use crate::errors::AppResult;
use crate::models::User;
use crate::remote::RemoteEntryStore;
use crate::services::journal::JournalService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

// バックエンド呼び出しのシミュレーション
const AUTH_DELAY_MS: u64 = 300;

/// モック認証サービス。
/// 本番の認証に置き換わるまでのスタブで、パスワードは検証しない。
/// ログイン／サインアップ成功時にゲストデータの同期が一度だけ走る
pub struct AuthService<R: RemoteEntryStore> {
    journal: Arc<JournalService<R>>,
}

impl<R: RemoteEntryStore> AuthService<R> {
    pub fn new(journal: Arc<JournalService<R>>) -> Self {
        Self { journal }
    }

    pub async fn login(&self, email: &str, _password: &str) -> AppResult<User> {
        sleep(Duration::from_millis(AUTH_DELAY_MS)).await;

        let name = email.split('@').next().unwrap_or(email).to_string();
        let user = User::new(name, email.to_string());

        self.journal.login(user.clone()).await?;
        log::info!("User logged in: {}", user.email);
        Ok(user)
    }

    pub async fn signup(&self, name: &str, email: &str, _password: &str) -> AppResult<User> {
        sleep(Duration::from_millis(AUTH_DELAY_MS)).await;

        let user = User::new(name.to_string(), email.to_string());

        self.journal.login(user.clone()).await?;
        log::info!("User signed up: {}", user.email);
        Ok(user)
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.journal.logout().await
    }

    pub async fn current_user(&self) -> Option<User> {
        self.journal.current_user().await
    }
}
