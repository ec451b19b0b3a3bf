use crate::errors::{AppError, AppResult};
use crate::services::recorder::{CaptureBackend, CHANNELS, SAMPLE_RATE};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// CPAL音声キャプチャ実装（スレッドベース）。
/// cpalのStreamはスレッドをまたげないため、取得から解放まで
/// 専用スレッドがストリームを所有する
pub struct AudioCapture {
    capturing: Arc<Mutex<bool>>,
    stop: Arc<Mutex<bool>>,
    samples: Arc<Mutex<Vec<f32>>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            capturing: Arc::new(Mutex::new(false)),
            stop: Arc::new(Mutex::new(false)),
            samples: Arc::new(Mutex::new(Vec::new())),
            thread: None,
        }
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for AudioCapture {
    fn acquire(&mut self) -> AppResult<()> {
        if self.thread.is_some() {
            return Err(AppError::Recording {
                message: "Capture device is already acquired".to_string(),
            });
        }

        set_flag(&self.capturing, true);
        set_flag(&self.stop, false);
        self.samples
            .lock()
            .map(|mut samples| samples.clear())
            .ok();

        // デバイスの取得結果はチャネル経由で受け取る
        let (ready_tx, ready_rx) = mpsc::channel();
        let capturing = self.capturing.clone();
        let stop = self.stop.clone();
        let samples = self.samples.clone();

        let handle = thread::spawn(move || {
            capture_thread(ready_tx, capturing, stop, samples);
        });
        self.thread = Some(handle);

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                Err(e)
            }
            Err(_) => {
                set_flag(&self.stop, true);
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                Err(AppError::DeviceUnavailable {
                    message: "Timed out waiting for audio device".to_string(),
                })
            }
        }
    }

    fn pause(&mut self) {
        set_flag(&self.capturing, false);
    }

    fn resume(&mut self) {
        set_flag(&self.capturing, true);
    }

    fn finish(&mut self) -> AppResult<Vec<f32>> {
        set_flag(&self.stop, true);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }

        let samples = self
            .samples
            .lock()
            .map(|mut samples| std::mem::take(&mut *samples))
            .unwrap_or_default();

        if samples.is_empty() {
            return Err(AppError::Recording {
                message: "No audio data recorded".to_string(),
            });
        }

        Ok(samples)
    }

    fn abort(&mut self) {
        set_flag(&self.stop, true);
        set_flag(&self.capturing, false);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.samples
            .lock()
            .map(|mut samples| samples.clear())
            .ok();
    }
}

fn set_flag(flag: &Arc<Mutex<bool>>, value: bool) {
    if let Ok(mut guard) = flag.lock() {
        *guard = value;
    }
}

// 専用スレッドで実行されるキャプチャ本体。
// セットアップの成否をreadyチャネルで報告し、stopが立つまでストリームを保持する
fn capture_thread(
    ready: Sender<AppResult<()>>,
    capturing: Arc<Mutex<bool>>,
    stop: Arc<Mutex<bool>>,
    samples: Arc<Mutex<Vec<f32>>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready.send(Err(AppError::DeviceUnavailable {
                message: "No default input device available".to_string(),
            }));
            return;
        }
    };

    log::info!(
        "Using audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config = StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let capturing_for_callback = capturing.clone();
    let samples_for_callback = samples.clone();

    let stream = match device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // push型：デバイスから届いたチャンクをそのままバッファへ
            let is_capturing = capturing_for_callback
                .lock()
                .map(|guard| *guard)
                .unwrap_or(false);
            if is_capturing {
                if let Ok(mut buffer) = samples_for_callback.lock() {
                    buffer.extend_from_slice(data);
                }
            }
        },
        move |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(AppError::DeviceUnavailable {
                message: format!("Failed to build audio stream: {}", e),
            }));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(AppError::DeviceUnavailable {
            message: format!("Failed to start audio stream: {}", e),
        }));
        return;
    }

    let _ = ready.send(Ok(()));

    // 停止要求が来るまで待機
    loop {
        thread::sleep(Duration::from_millis(50));
        let stop_requested = stop.lock().map(|guard| *guard).unwrap_or(true);
        if stop_requested {
            break;
        }
    }

    // ストリームのdropでマイクが解放される
    drop(stream);
}

// 利用可能な入力デバイス名を列挙する
pub fn get_audio_devices() -> AppResult<Vec<String>> {
    let host = cpal::default_host();
    let mut device_names = Vec::new();

    let input_devices = host.input_devices().map_err(|e| AppError::DeviceUnavailable {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    for device in input_devices {
        if let Ok(name) = device.name() {
            device_names.push(name);
        }
    }

    if device_names.is_empty() {
        device_names.push("Default Microphone".to_string());
    }

    Ok(device_names)
}
