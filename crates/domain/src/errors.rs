use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ProbeError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid record data: {0}")]
    InvalidRecordData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Probe scheduler is stopped")]
    SchedulerStopped,
}
