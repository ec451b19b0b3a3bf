use bump_journal_lib::config::AppConfig;
use bump_journal_lib::errors::AppResult;
use bump_journal_lib::models::{JournalEntry, MediaType, Mood};
use bump_journal_lib::services::audio_capture_mock::AudioCapture;
use bump_journal_lib::services::auth::AuthService;
use bump_journal_lib::services::journal::JournalService;
use bump_journal_lib::services::recorder::{release_media, AudioRecorder};
use bump_journal_lib::services::transcription::{MockTranscriber, TranscriptionService};
use bump_journal_lib::storage::LocalStore;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// 完全なワークフローテスト：録音 → 書き起こし → エントリー作成 → 更新 → 再取得
#[tokio::test]
async fn test_complete_recording_journal_workflow() -> AppResult<()> {
    bump_journal_lib::init_logging();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = AppConfig::with_data_dir(temp_dir.path().to_path_buf());
    config.ensure_dirs()?;
    let recordings_dir = config.recordings_dir();

    let local = Arc::new(LocalStore::new(config.db_path())?);
    let service = JournalService::local_only(local);
    let mut recorder = AudioRecorder::new(AudioCapture::new(), recordings_dir.clone())?;
    let transcriber = MockTranscriber::new();

    // Step 1: 録音（2秒）
    recorder.start_recording().await?;
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
    let recording = recorder.stop_recording().await?;

    assert!(recording.audio_path.exists());
    assert!(recorder.backend().is_released());

    // Step 2: 書き起こし（スタブのディレイ内に非空のテキストが返る）
    let started = Instant::now();
    let transcript = transcriber.transcribe(&recording.wav_bytes).await?;
    assert!(!transcript.is_empty());
    assert!(started.elapsed().as_secs() < 5);

    // Step 3: 書き起こしを本文に、音声を添付にしてエントリー作成
    let audio_item = recording.clone().into_media_item();
    let created = service
        .create_entry(
            JournalEntry::new("Voice note".to_string(), transcript.clone())
                .add_media(audio_item.clone())
                .with_mood(Mood::Content),
        )
        .await?;

    // Step 4: 再取得して内容確認
    let loaded = service
        .get_entry(&created.id)
        .await?
        .expect("Entry should exist");
    assert_eq!(loaded.content, transcript);
    assert_eq!(loaded.media.len(), 1);
    assert_eq!(loaded.media[0].media_type, MediaType::Audio);

    // Step 5: 単一フィールドの更新が他フィールドを壊さない
    service.toggle_favorite(&created.id).await?;
    service.update_kick_count(&created.id, 5).await?;

    let updated = service
        .get_entry(&created.id)
        .await?
        .expect("Entry should exist");
    assert!(updated.favorite);
    assert_eq!(updated.kick_count, Some(5));
    assert_eq!(updated.content, transcript);
    assert_eq!(updated.mood, Some(Mood::Content));

    // Step 6: 添付を外したら裏の音声ファイルを解放する
    let mut editable = updated.clone();
    let removed = editable.remove_media(0).expect("Media should exist");
    release_media(&removed, &recordings_dir);
    assert!(!recording.audio_path.exists());

    service.update_entry(editable).await?;
    let final_entry = service
        .get_entry(&created.id)
        .await?
        .expect("Entry should exist");
    assert!(final_entry.media.is_empty());

    // Step 7: 削除
    assert!(service.delete_entry(&created.id).await?);
    assert!(service.get_entry(&created.id).await?.is_none());

    Ok(())
}

/// セッションはディスク上のストアから復元できる
#[tokio::test]
async fn test_session_persists_across_restart() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("journal.db");

    let email;
    {
        let local = Arc::new(LocalStore::new(&db_path)?);
        let service = Arc::new(JournalService::local_only(local));
        let auth = AuthService::new(service.clone());

        let user = auth.login("mika@example.com", "secret").await?;
        email = user.email.clone();
        assert!(auth.current_user().await.is_some());
    }

    // 再起動を模して開き直す
    let local = Arc::new(LocalStore::new(&db_path)?);
    let service = JournalService::local_only(local);
    assert!(service.current_user().await.is_none());

    let restored = service.restore_session().await?.expect("Session should be stored");
    assert_eq!(restored.email, email);
    assert!(service.current_user().await.is_some());

    Ok(())
}

/// サインアップでもセッションが張られ、ゲストデータが残っている
#[tokio::test]
async fn test_signup_establishes_session() -> AppResult<()> {
    let local = Arc::new(LocalStore::in_memory()?);
    local
        .save_entry(JournalEntry::new("Guest era".to_string(), "".to_string()))
        .await?;

    let service = Arc::new(JournalService::local_only(local.clone()));
    let auth = AuthService::new(service.clone());

    let user = auth.signup("Mika", "mika@example.com", "secret").await?;
    assert!(user.id.starts_with("user-"));
    assert_eq!(user.name, "Mika");

    // リモートなし構成なので同期は黙ってスキップ、ローカルはそのまま
    assert_eq!(local.get_all_entries().await?.len(), 1);

    auth.logout().await?;
    assert!(auth.current_user().await.is_none());

    Ok(())
}

/// エントリーは作成した順に関係なく日付降順で一覧される
#[tokio::test]
async fn test_multiple_entries_listing() -> AppResult<()> {
    let local = Arc::new(LocalStore::in_memory()?);
    let service = JournalService::local_only(local);

    const NUM_ENTRIES: usize = 3;
    let mut ids = Vec::new();
    for i in 0..NUM_ENTRIES {
        let created = service
            .create_entry(JournalEntry::new(format!("Entry {}", i), "".to_string()))
            .await?;
        ids.push(created.id);
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    let entries = service.get_entries().await?;
    assert_eq!(entries.len(), NUM_ENTRIES);
    for window in entries.windows(2) {
        assert!(window[0].date >= window[1].date);
    }

    Ok(())
}
