//! kbrag: retrieval-augmented question answering over one local knowledge file
//!
//! The knowledge file is split into passages, each passage is embedded once and
//! cached on disk, and questions are answered by a chat model from the passages
//! closest to the question.

pub mod chunk;
pub mod commands;
pub mod complete;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod progress;
pub mod provider_backend;
pub mod rag;
pub mod store;
