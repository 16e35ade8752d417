pub mod correlation;
pub mod logging;

pub use correlation::{
    CORRELATION_ID_HEADER, REQUEST_ID_HEADER, extract_correlation_id, inject_correlation_headers,
};
pub use logging::init_tracing;
