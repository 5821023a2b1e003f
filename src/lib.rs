//! Compliance Inquiry API Library
//!
//! Expands a CPF or CNPJ into a bounded graph of related records fetched from
//! the BigData provider, has the aggregate rated by a language-model risk
//! classifier and persists the resulting report.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core inquiry logic.
//! - `data`: Data access layer.
//! - `integrations`: External service integrations.
//! - `analysis`: Risk classifier contract and reply post-processing.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `db_storage`: Report store implementations.
//! - `document`: CPF/CNPJ normalization.
//! - `errors`: Error handling types.
//! - `expansion`: Bounded expansion of a document into an aggregate.
//! - `extraction`: Related-document discovery inside provider records.
//! - `handlers`: HTTP request handlers.
//! - `inquiry`: End-to-end inquiry workflow.
//! - `models`: Core data models.
//! - `openai_client`: OpenAI chat-completions transport.
//! - `services`: BigData provider client.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;

pub mod analysis;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod document;
pub mod errors;
pub mod expansion;
pub mod extraction;
pub mod handlers;
pub mod inquiry;
pub mod models;
pub mod openai_client;
pub mod services;
