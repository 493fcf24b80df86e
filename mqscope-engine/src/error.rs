use mqscope_capture::CaptureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
