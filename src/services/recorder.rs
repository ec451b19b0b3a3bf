use crate::errors::{AppError, AppResult};
use crate::models::{MediaItem, MediaType};
use hound::{WavSpec, WavWriter};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const SAMPLE_RATE: u32 = 16000; // 16kHz、書き起こしサービスの入力に合わせる
pub const CHANNELS: u16 = 1; // Mono

/// マイクキャプチャのバックエンド境界。
/// 本物はCPAL実装、テストと開発ではモック実装に差し替える
pub trait CaptureBackend {
    /// デバイスを取得してサンプルのバッファリングを開始する。
    /// デバイスが無い・アクセス拒否ならDeviceUnavailable
    fn acquire(&mut self) -> AppResult<()>;

    /// バッファリングを一時停止する（デバイスは保持したまま）
    fn pause(&mut self);

    /// バッファリングを再開する
    fn resume(&mut self);

    /// バッファ済みサンプルを確定し、デバイスを解放する
    fn finish(&mut self) -> AppResult<Vec<f32>>;

    /// バッファを破棄してデバイスを解放する。未取得の状態でも安全
    fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopped,
    Cancelled,
}

/// 停止時に得られる再生可能なハンドルと生バイト列
#[derive(Debug, Clone)]
pub struct RecordingResult {
    pub audio_path: PathBuf,
    pub wav_bytes: Vec<u8>,
    pub duration: Duration,
}

impl RecordingResult {
    pub fn into_media_item(self) -> MediaItem {
        MediaItem::new(MediaType::Audio, self.audio_path.to_string_lossy().to_string())
    }
}

/// 録音デバイスアダプター。
/// 状態遷移は idle → recording → (paused ⇄ recording) → stopped、
/// recording/paused からは cancelled に抜けられる。
/// マイクはシングルトン資源：取得中の再取得は待たずに失敗させる
pub struct AudioRecorder<B: CaptureBackend> {
    backend: B,
    state: RecorderState,
    recordings_dir: PathBuf,
}

impl<B: CaptureBackend> AudioRecorder<B> {
    pub fn new(backend: B, recordings_dir: PathBuf) -> AppResult<Self> {
        if !recordings_dir.exists() {
            fs::create_dir_all(&recordings_dir)?;
        }

        Ok(Self {
            backend,
            state: RecorderState::Idle,
            recordings_dir,
        })
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn start_recording(&mut self) -> AppResult<()> {
        if matches!(self.state, RecorderState::Recording | RecorderState::Paused) {
            return Err(AppError::Recording {
                message: "Recording is already in progress".to_string(),
            });
        }

        self.backend.acquire()?;
        self.state = RecorderState::Recording;
        log::info!("Audio recording started");
        Ok(())
    }

    /// 録音中でなければ黙って無視する（エラーにしない）
    pub fn pause_recording(&mut self) {
        if self.state == RecorderState::Recording {
            self.backend.pause();
            self.state = RecorderState::Paused;
        }
    }

    /// 一時停止中でなければ黙って無視する
    pub fn resume_recording(&mut self) {
        if self.state == RecorderState::Paused {
            self.backend.resume();
            self.state = RecorderState::Recording;
        }
    }

    /// バッファを単一のWAVに確定し、再生可能なハンドルと生バイト列を返す。
    /// デバイスはここで解放される
    pub async fn stop_recording(&mut self) -> AppResult<RecordingResult> {
        if !matches!(self.state, RecorderState::Recording | RecorderState::Paused) {
            return Err(AppError::NoActiveRecording);
        }

        let samples = self.backend.finish()?;
        self.state = RecorderState::Stopped;

        let duration =
            Duration::from_secs_f64(samples.len() as f64 / f64::from(SAMPLE_RATE));
        let wav_bytes = encode_wav(&samples)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AppError::InvalidOperation {
                message: "Failed to get system time".to_string(),
            })?
            .as_secs();
        // タイムスタンプだけでは同秒内の停止で衝突するため、短いidを添える
        let filename = format!(
            "recording_{}_{}.wav",
            timestamp,
            &Uuid::new_v4().to_string()[..8]
        );
        let audio_path = self.recordings_dir.join(&filename);
        fs::write(&audio_path, &wav_bytes)?;

        log::info!(
            "Audio recording stopped: {} samples, {:.1}s",
            samples.len(),
            duration.as_secs_f64()
        );

        Ok(RecordingResult {
            audio_path,
            wav_bytes,
            duration,
        })
    }

    /// バッファを破棄してデバイスを解放する。どの状態から呼んでも安全
    pub fn cancel_recording(&mut self) {
        self.backend.abort();
        if matches!(self.state, RecorderState::Recording | RecorderState::Paused) {
            self.state = RecorderState::Cancelled;
            log::info!("Audio recording cancelled");
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }
}

impl<B: CaptureBackend> Drop for AudioRecorder<B> {
    // 破棄時にもデバイスを必ず解放する
    fn drop(&mut self) {
        self.backend.abort();
    }
}

fn encode_wav(samples: &[f32]) -> AppResult<Vec<u8>> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| AppError::Recording {
            message: format!("Failed to create WAV writer: {}", e),
        })?;

        for &sample in samples {
            let i16_sample = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(i16_sample)
                .map_err(|e| AppError::Recording {
                    message: format!("Failed to write audio sample: {}", e),
                })?;
        }

        writer.finalize().map_err(|e| AppError::Recording {
            message: format!("Failed to finalize WAV data: {}", e),
        })?;
    }

    Ok(cursor.into_inner())
}

/// エントリーから外された音声メディアの裏ファイルを解放する。
/// recordings_dir配下のローカルファイルだけが対象
pub fn release_media(item: &MediaItem, recordings_dir: &Path) {
    if item.media_type != MediaType::Audio {
        return;
    }

    let path = Path::new(&item.url);
    if path.starts_with(recordings_dir) && path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to release audio file {:?}: {}", path, e);
        }
    }
}
