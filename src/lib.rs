#![deny(missing_docs)]

//! A multimodal chat client for the Google Gemini AI API.
//!
//! The crate keeps an append-only conversation, turns it into
//! `generateContent` requests, folds every API outcome into a displayable
//! reply, and renders replies (Markdown, code blocks, images) for a terminal.

pub mod attachment;
pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod render;

pub use chat::{ChatSession, Reply, SendOutcome};
pub use client::{ContentGenerator, GeminiClient};
pub use config::{ChatConfig, ConfigState};
pub use conversation::{Conversation, Message};
pub use error::ChatError;
