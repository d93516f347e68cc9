//! Error types for the Scout client

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("unexpected reply: expected cmd {expected_cmd} arg {expected_arg}, got cmd {cmd} arg {arg}")]
    UnexpectedReply {
        expected_cmd: u8,
        expected_arg: u16,
        cmd: u8,
        arg: u16,
    },

    #[error("truncated frame: need {need} bytes, have {have}")]
    TruncatedFrame { need: usize, have: usize },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("missing value of primary key")]
    MissingPrimaryKey,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("rebuild error: {0}")]
    Rebuild(String),

    #[error("connection is closed")]
    Closed,
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
