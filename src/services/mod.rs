#[cfg(feature = "cpal-backend")]
pub mod audio_capture_cpal;
pub mod audio_capture_mock;
pub mod auth;
pub mod journal;
pub mod recorder;
pub mod transcription;

pub use auth::AuthService;
pub use journal::JournalService;
pub use recorder::{AudioRecorder, RecorderState, RecordingResult};
pub use transcription::{MockTranscriber, TranscriptionService};
