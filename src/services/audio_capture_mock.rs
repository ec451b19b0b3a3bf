use crate::errors::{AppError, AppResult};
use crate::services::recorder::{CaptureBackend, SAMPLE_RATE};
use std::time::{Duration, Instant};

/// モック音声キャプチャ実装。
/// 実デバイスの代わりに、取得〜確定の経過時間ぶんの合成音声を生成する。
/// テストからデバイス解放を確認できるようにis_releasedを公開する
pub struct AudioCapture {
    available: bool,
    acquired: bool,
    released: bool,
    paused: bool,
    started_at: Option<Instant>,
    pause_started: Option<Instant>,
    paused_total: Duration,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            available: true,
            acquired: false,
            released: true,
            paused: false,
            started_at: None,
            pause_started: None,
            paused_total: Duration::ZERO,
        }
    }

    /// マイクが存在しない・アクセス拒否の状況を再現する
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    // 一時停止を除いた実キャプチャ時間
    fn captured_duration(&self) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let mut paused = self.paused_total;
        if let Some(pause_started) = self.pause_started {
            paused += pause_started.elapsed();
        }
        started_at.elapsed().saturating_sub(paused)
    }

    fn release(&mut self) {
        self.acquired = false;
        self.released = true;
        self.paused = false;
        self.started_at = None;
        self.pause_started = None;
        self.paused_total = Duration::ZERO;
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for AudioCapture {
    fn acquire(&mut self) -> AppResult<()> {
        if !self.available {
            return Err(AppError::DeviceUnavailable {
                message: "Microphone access denied".to_string(),
            });
        }
        if self.acquired {
            return Err(AppError::Recording {
                message: "Capture device is already acquired".to_string(),
            });
        }

        self.acquired = true;
        self.released = false;
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.pause_started = None;
        self.paused_total = Duration::ZERO;
        Ok(())
    }

    fn pause(&mut self) {
        if self.acquired && !self.paused {
            self.paused = true;
            self.pause_started = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if self.acquired && self.paused {
            self.paused = false;
            if let Some(pause_started) = self.pause_started.take() {
                self.paused_total += pause_started.elapsed();
            }
        }
    }

    fn finish(&mut self) -> AppResult<Vec<f32>> {
        if !self.acquired {
            return Err(AppError::Recording {
                message: "Capture device is not acquired".to_string(),
            });
        }

        let duration = self.captured_duration();
        self.release();

        let sample_count = (duration.as_secs_f64() * f64::from(SAMPLE_RATE)) as usize;
        Ok(synthesize_voice(sample_count.max(1)))
    }

    fn abort(&mut self) {
        self.release();
    }
}

// 話し声に似たパターンを合成する
fn synthesize_voice(sample_count: usize) -> Vec<f32> {
    let mut samples = Vec::with_capacity(sample_count);

    for i in 0..sample_count {
        let time = i as f32 / SAMPLE_RATE as f32;

        // 基本周波数とフォルマントを重ねた擬似音声
        let base_freq = 180.0 + 40.0 * (time * 0.8).sin();
        let vowel_pattern = 400.0 + 200.0 * (time * 3.0).cos();
        let consonant_pattern = 800.0 + 400.0 * (time * 7.0).sin();

        // 抑揚と強弱の揺らぎ
        let pitch_variation = 1.0 + 0.3 * (time * 1.5).sin() + 0.2 * (time * 4.0).cos();
        let rhythm = 0.8 + 0.4 * (time * 6.0).sin().abs();
        let amplitude = 0.25 * rhythm * pitch_variation;

        let fundamental = amplitude * (2.0 * std::f32::consts::PI * base_freq * time).sin();
        let vowel = amplitude * 0.6 * (2.0 * std::f32::consts::PI * vowel_pattern * time).sin();
        let consonant =
            amplitude * 0.3 * (2.0 * std::f32::consts::PI * consonant_pattern * time).sin();

        // 呼吸音のノイズ成分
        let breath_noise = amplitude * 0.1 * (rand::random::<f32>() - 0.5);

        samples.push(fundamental + vowel + consonant + breath_noise);
    }

    samples
}

// モック用のランダム数生成
pub(crate) mod rand {
    use std::cell::Cell;

    thread_local! {
        static RNG_STATE: Cell<u64> = Cell::new(1);
    }

    pub fn random<T: From<f32>>() -> T {
        RNG_STATE.with(|state| {
            let mut x = state.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            state.set(x);

            T::from((x as f32) / (u64::MAX as f32))
        })
    }
}
