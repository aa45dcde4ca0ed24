//! Adaptive Card template.

pub mod template;

pub use template::CardTemplate;
