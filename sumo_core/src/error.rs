use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SumoError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("calibration store error: {0}")]
    Store(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing range sensor")]
    MissingRange,
    #[error("missing drive motors")]
    MissingMotors,
    #[error("missing encoders")]
    MissingEncoders,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
