use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Input error: {0}")]
    InputError(String),

    #[error("Geometry error: {0}")]
    GeometryError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Document sink error: {0}")]
    SinkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`LayerError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl LayerError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create an input error (missing or undecodable image / rectangle file).
    input => InputError,
    /// Create a geometry error (degenerate rectangle, impossible fit).
    geometry => GeometryError,
    /// Create an encode error.
    encode => EncodeError,
    /// Create a document sink error.
    sink => SinkError,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a cache error.
    cache => CacheError,
}

impl From<lopdf::Error> for LayerError {
    fn from(e: lopdf::Error) -> Self {
        Self::SinkError(e.to_string())
    }
}

impl From<serde_yml::Error> for LayerError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<image::ImageError> for LayerError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
