//! Image validation and content classification.
//!
//! Every placement goes through size, aspect, content, decoration, duplicate
//! and relevance stages. A rejection is a [`Verdict`], never an error.

mod config;
mod validator;

pub use config::ValidatorConfig;
pub use validator::{
    ContentRule, ImageAnalysis, ImageType, ImageValidator, Shape, ValidationContext, Verdict,
    CONTENT_RULES,
};
