//! HTTP protocol layer module
//!
//! Response builders, MIME detection, form decoding and flash cookies,
//! kept apart from the conversion logic.

pub mod flash;
pub mod form;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use flash::{FlashCategory, FlashMessage, FlashSigner};
pub use form::{parse_form, read_body, BodyError, FormData, FormError};
pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response,
    build_attachment_response, build_health_response, build_html_response,
    build_options_response, build_see_other_response,
};
