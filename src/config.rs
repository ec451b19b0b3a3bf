use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// アプリケーションのローカルデータ配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: base.join("bump-journal"),
        }
    }
}

impl AppConfig {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("journal.db")
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.data_dir.join("recordings")
    }

    // データディレクトリが存在しない場合は作成
    pub fn ensure_dirs(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)?;
        }
        let recordings = self.recordings_dir();
        if !recordings.exists() {
            fs::create_dir_all(&recordings)?;
        }
        Ok(())
    }
}

/// ホスト側バックエンドの接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
        }
    }
}
