//! Configuration errors.

/// Why `glint.toml` or an environment override could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read, or does not exist at all.
    #[error("cannot read glint.toml: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid TOML for the expected schema.
    #[error("cannot parse glint.toml: {0}")]
    ParseError(String),

    /// A field that must not be empty is empty.
    #[error("`{0}` must not be empty")]
    MissingField(String),

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}
