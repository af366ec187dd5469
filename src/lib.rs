//! # Sahayaka Mitra
//!
//! **Farmer advisory portal backend — soil record lookup and a
//! government-scheme chatbot.**
//!
//! The portal serves a static HTML UI and two JSON operations: a point
//! lookup of a farmer's soil/land record by RTC number, and a chat endpoint
//! that forwards scheme questions (together with a fixed knowledge base) to
//! the Gemini completion API and relays the answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐
//! │ soil CSV     │──▶│ RecordStore   │─────┐
//! └──────────────┘   └───────────────┘     │
//! ┌──────────────┐   ┌───────────────┐     ▼
//! │ schemes JSON │──▶│ KnowledgeBase │──▶ AppState ──▶ HTTP (axum) ──▶ JSON
//! └──────────────┘   └───────────────┘     ▲
//! ┌──────────────┐   ┌───────────────┐     │
//! │ GEMINI_API_  │──▶│ Completion    │─────┘
//! │ KEY (env)    │   │ (Gemini)      │
//! └──────────────┘   └───────────────┘
//! ```
//!
//! Everything on the left is loaded exactly once, before the first request;
//! the loaded state is read-only for the process lifetime and shared across
//! handlers without locking. A component that fails to load degrades its
//! feature (lookups or chat) instead of taking the process down.
//!
//! ## Request Flow
//!
//! 1. The **front door** ([`server`]) receives a JSON request and validates
//!    presence of the required field.
//! 2. For lookups, the **record store** ([`records`]) normalizes the RTC
//!    number and scans for the first matching row.
//! 3. For chat, the **prompt composer** ([`prompt`]) combines the persona
//!    rules, the serialized knowledge base ([`knowledge`]), and the user's
//!    question; the **completion client** ([`completion`]) performs one
//!    blocking call to the provider.
//! 4. The result is shaped into `{success, data|reply|error, elapsed}` JSON.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, fully defaulted |
//! | [`records`] | CSV record store: normalized keys, typed column schema, lookup |
//! | [`knowledge`] | Scheme knowledge base: JSON load + prompt text serialization |
//! | [`prompt`] | Deterministic chat prompt composition |
//! | [`completion`] | Completion backend seam and the Gemini client |
//! | [`error`] | Portal error taxonomy, mapped to HTTP at the front door |
//! | [`server`] | Axum front door: routes, state, error translation |

pub mod completion;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod prompt;
pub mod records;
pub mod server;
