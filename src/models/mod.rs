use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Content,
    Neutral,
    Sad,
    Stressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Gallery,
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
}

impl MediaItem {
    pub fn new(media_type: MediaType, url: String) -> Self {
        Self { media_type, url }
    }

    pub fn audio(url: String) -> Self {
        Self::new(MediaType::Audio, url)
    }

    pub fn photo(url: String) -> Self {
        Self::new(MediaType::Photo, url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kick_count: Option<u32>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn new(title: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            date: Utc::now(),
            favorite: false,
            media: Vec::new(),
            mood: None,
            kick_count: None,
            is_shared: false,
            shared_with_groups: Vec::new(),
            user_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_media(mut self, media: Vec<MediaItem>) -> Self {
        self.media = media;
        self
    }

    pub fn add_media(mut self, item: MediaItem) -> Self {
        self.media.push(item);
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_kick_count(mut self, kick_count: u32) -> Self {
        self.kick_count = Some(kick_count);
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    pub fn with_sharing(mut self, is_shared: bool, groups: Vec<String>) -> Self {
        self.is_shared = is_shared;
        self.shared_with_groups = groups;
        self
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// メディアを取り外して返す。音声の場合は呼び出し側が裏のファイルを解放する
    pub fn remove_media(&mut self, index: usize) -> Option<MediaItem> {
        if index < self.media.len() {
            Some(self.media.remove(index))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingGroup {
    pub id: String,
    pub name: String,
    pub member_count: usize,
    #[serde(default)]
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SharingGroup {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            member_count: 1, // オーナー自身
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: format!("user-{}", &Uuid::new_v4().to_string()[..8]),
            name,
            email,
        }
    }
}
