use thiserror::Error;

pub type HscResult<T> = Result<T, HscError>;

#[derive(Debug, Error)]
pub enum HscError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("padding anomaly: trailing byte {0} does not describe valid padding")]
    PaddingAnomaly(u8),

    #[error("key format error: {0}")]
    KeyFormat(String),

    #[error("session key mismatch: unwrapped key differs from the drawn key")]
    SessionKeyMismatch,

    #[error("cipher has no key: call set_key first")]
    NotKeyed,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_padding_anomaly() {
        let err = HscError::PaddingAnomaly(0x42);
        assert_eq!(
            err.to_string(),
            "padding anomaly: trailing byte 66 does not describe valid padding"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> HscResult<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here/hsc")?)
        }
        assert!(matches!(open_missing(), Err(HscError::Io(_))));
    }
}
