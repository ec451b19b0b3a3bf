use bump_journal_lib::errors::{AppError, AppResult};
use bump_journal_lib::services::audio_capture_mock::AudioCapture;
use bump_journal_lib::services::recorder::{AudioRecorder, RecorderState};
use tempfile::TempDir;

fn new_recorder(temp_dir: &TempDir) -> AppResult<AudioRecorder<AudioCapture>> {
    AudioRecorder::new(AudioCapture::new(), temp_dir.path().join("recordings"))
}

/// 録音開始→停止で再生可能なWAVハンドルと生バイト列が得られ、
/// デバイスが解放されている
#[tokio::test]
async fn test_record_and_stop_produces_playable_result() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    assert_eq!(recorder.state(), RecorderState::Idle);

    recorder.start_recording().await?;
    assert_eq!(recorder.state(), RecorderState::Recording);
    assert!(recorder.is_recording());

    tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;

    let result = recorder.stop_recording().await?;
    assert_eq!(recorder.state(), RecorderState::Stopped);

    // WAVファイルが実際に書き出されている
    assert!(result.audio_path.exists());
    assert!(!result.wav_bytes.is_empty());
    assert!(result.duration.as_millis() > 0);

    // WAVヘッダ（RIFF）から始まる
    assert_eq!(&result.wav_bytes[..4], b"RIFF");

    // マイクは解放済み
    assert!(recorder.backend().is_released());

    Ok(())
}

/// マイクはシングルトン：録音中の再取得は待たずに失敗する
#[tokio::test]
async fn test_start_while_recording_fails_fast() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    recorder.start_recording().await?;
    let second = recorder.start_recording().await;
    assert!(matches!(second, Err(AppError::Recording { .. })));

    // 元のセッションは生きている
    assert_eq!(recorder.state(), RecorderState::Recording);
    recorder.cancel_recording();

    Ok(())
}

/// 録音していない状態でのstopはNoActiveRecording
#[tokio::test]
async fn test_stop_without_start_fails() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    let result = recorder.stop_recording().await;
    assert!(matches!(result, Err(AppError::NoActiveRecording)));

    Ok(())
}

/// pause/resumeは対象状態以外では黙って無視される
#[tokio::test]
async fn test_pause_resume_are_noops_outside_their_states() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    // idleからのpause/resumeは何も起こさない
    recorder.pause_recording();
    assert_eq!(recorder.state(), RecorderState::Idle);
    recorder.resume_recording();
    assert_eq!(recorder.state(), RecorderState::Idle);

    recorder.start_recording().await?;

    // recording中のresumeは無視
    recorder.resume_recording();
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.pause_recording();
    assert_eq!(recorder.state(), RecorderState::Paused);

    // paused中のpauseも無視
    recorder.pause_recording();
    assert_eq!(recorder.state(), RecorderState::Paused);

    recorder.resume_recording();
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.cancel_recording();
    Ok(())
}

/// 一時停止中の時間はキャプチャ時間に含まれない
#[tokio::test]
async fn test_paused_time_excluded_from_duration() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    recorder.start_recording().await?;
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    recorder.pause_recording();
    tokio::time::sleep(tokio::time::Duration::from_millis(400)).await;
    recorder.resume_recording();

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    let result = recorder.stop_recording().await?;

    // 経過時間はおよそ700msだが、キャプチャされたのは300ms前後
    assert!(result.duration.as_millis() < 600);
    assert!(result.duration.as_millis() >= 250);

    Ok(())
}

/// cancelはどの状態からでも安全で、デバイスを解放する
#[tokio::test]
async fn test_cancel_is_safe_from_any_state() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    // idleからのcancelは何もしない
    recorder.cancel_recording();
    assert_eq!(recorder.state(), RecorderState::Idle);

    recorder.start_recording().await?;
    recorder.cancel_recording();
    assert_eq!(recorder.state(), RecorderState::Cancelled);
    assert!(recorder.backend().is_released());

    // 2回目のcancelも安全
    recorder.cancel_recording();

    // cancel後はstopできない
    let result = recorder.stop_recording().await;
    assert!(matches!(result, Err(AppError::NoActiveRecording)));

    // 新しいセッションは開始できる
    recorder.start_recording().await?;
    assert_eq!(recorder.state(), RecorderState::Recording);
    recorder.cancel_recording();

    Ok(())
}

/// pausedからもcancelできる
#[tokio::test]
async fn test_cancel_from_paused() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = new_recorder(&temp_dir)?;

    recorder.start_recording().await?;
    recorder.pause_recording();
    recorder.cancel_recording();

    assert_eq!(recorder.state(), RecorderState::Cancelled);
    assert!(recorder.backend().is_released());

    Ok(())
}

/// デバイスがない・アクセス拒否ならDeviceUnavailableで失敗し、idleに戻る
#[tokio::test]
async fn test_device_unavailable() -> AppResult<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut recorder = AudioRecorder::new(
        AudioCapture::unavailable(),
        temp_dir.path().join("recordings"),
    )?;

    let result = recorder.start_recording().await;
    assert!(matches!(result, Err(AppError::DeviceUnavailable { .. })));
    assert_eq!(recorder.state(), RecorderState::Idle);

    Ok(())
}
