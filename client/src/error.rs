use thiserror::Error;

/// Invalid viewport input handed to the coordinate math.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("scale must be finite, got {0}")]
    NonFiniteScale(f64),
    #[error("scale must be positive, got {0}")]
    NonPositiveScale(f64),
    #[error("offset must be finite, got ({x}, {y})")]
    NonFiniteOffset { x: f64, y: f64 },
    #[error("canvas must have finite positive dimensions, got {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },
    #[error("scale {scale} is below the smallest zoom level {min}")]
    ScaleBelowMinimum { scale: f64, min: f64 },
}

/// A chunk fetch that did not produce a usable payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("upstream status {status}; body preview: {preview}")]
    Status { status: u16, preview: String },
    #[error("failed to decode map range payload: {message}; body preview: {preview}")]
    Decode { message: String, preview: String },
}

const BODY_PREVIEW_CHARS: usize = 200;

pub(crate) fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FetchError, TransformError, body_preview};

    #[test]
    fn messages_name_the_offending_values() {
        assert_eq!(
            TransformError::InvalidCanvas {
                width: 0.0,
                height: 600.0
            }
            .to_string(),
            "canvas must have finite positive dimensions, got 0x600"
        );
        let err = FetchError::Status {
            status: 502,
            preview: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "upstream status 502; body preview: bad gateway");
    }

    #[test]
    fn preview_is_truncated() {
        let body = "x".repeat(500);
        assert_eq!(body_preview(body.as_bytes()).len(), 200);
    }
}
