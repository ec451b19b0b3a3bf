use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Recording error: {message}")]
    Recording { message: String },

    #[error("Audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("No active recording session")]
    NoActiveRecording,

    #[error("Remote store unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("Stored data corrupted: {message}")]
    StorageParse { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// エントリー保存前のバリデーション（永続化の前に必ず呼ぶ）
pub fn validate_entry_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::ValidationError {
            message: "Entry title cannot be empty".to_string(),
        });
    }

    if title.len() > 200 {
        return Err(AppError::ValidationError {
            message: "Entry title too long (max: 200 characters)".to_string(),
        });
    }

    Ok(())
}

// グループ招待用メールアドレスの簡易チェック
pub fn validate_member_email(email: &str) -> AppResult<()> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(AppError::ValidationError {
            message: "Please enter a valid email address".to_string(),
        });
    }

    Ok(())
}
