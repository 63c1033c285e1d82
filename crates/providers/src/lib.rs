//! Assistant collaborator implementations for hcplog.
//!
//! All collaborators implement the `hcplog_core::Assistant` trait.
//! The router builds the configured one.

mod crm_tools;
pub mod http_backend;
pub mod openai_compat;
pub mod router;

pub use http_backend::HttpAssistant;
pub use openai_compat::OpenAiCompatAssistant;
pub use router::build_from_config;
