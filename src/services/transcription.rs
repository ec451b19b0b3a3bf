use crate::errors::AppResult;
use crate::services::audio_capture_mock::rand;
use std::time::Duration;
use tokio::time::sleep;

/// 音声バイト列をテキストに変換する能力の境界。
/// 実際の音声認識サービスに差し替えられるよう、呼び出し側には
/// この面だけを注入する
#[allow(async_fn_in_trait)]
pub trait TranscriptionService {
    async fn transcribe(&self, audio: &[u8]) -> AppResult<String>;
}

const TRANSCRIPTION_DELAY_MS: u64 = 1500;

const CANNED_TRANSCRIPTS: [&str; 5] = [
    "I'm feeling much better today compared to yesterday. The morning sickness has finally subsided.",
    "Had a doctor's appointment this morning. Everything looks good, and the baby is growing well!",
    "Just felt the baby kick for the first time! It was such an amazing moment that I'll never forget.",
    "I've been thinking about names lately. I'm having trouble deciding between a few favorites.",
    "Today was a bit challenging with the back pain, but some gentle stretching helped a lot.",
];

/// モック書き起こし実装。
/// 固定ディレイの後、定型文プールからランダムに1つ返す（常に成功）
pub struct MockTranscriber {
    delay: Duration,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(TRANSCRIPTION_DELAY_MS),
        }
    }

    // テストで待ち時間を短縮するため
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionService for MockTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> AppResult<String> {
        log::info!("🎤 Transcribing {} bytes of audio (mock)", audio.len());
        sleep(self.delay).await;

        let pick = (rand::random::<f32>() * CANNED_TRANSCRIPTS.len() as f32) as usize
            % CANNED_TRANSCRIPTS.len();
        Ok(CANNED_TRANSCRIPTS[pick].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transcriber_returns_pool_text() {
        let transcriber = MockTranscriber::with_delay(Duration::from_millis(10));
        let text = transcriber.transcribe(&[0u8; 16]).await.unwrap();
        assert!(!text.is_empty());
        assert!(CANNED_TRANSCRIPTS.contains(&text.as_str()));
    }
}
