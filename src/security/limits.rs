//! Body size limits.
//!
//! # Responsibilities
//! - Recognize a body that was cut off by a length limit
//!
//! # Design Decisions
//! - Limits are enforced while buffering (`axum::body::to_bytes`), so chunked
//!   bodies without `Content-Length` are covered too
//! - Inbound overflow returns 413 Payload Too Large; backend overflow 502

use std::error::Error as StdError;

use http_body_util::LengthLimitError;

/// Whether buffering failed because the body exceeded its limit.
///
/// The limit error may be wrapped by several body layers, so the whole
/// source chain is searched.
pub fn exceeds_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = StdError::source(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}
