//! # Chat Moderation Filter
//!
//! A real-time content filter for chat streams. Each incoming message is
//! checked against restricted terms and price-sharing patterns; offenders get
//! a warning reply and every trigger is written to an audit log channel.
//!
//! ## Features
//!
//! - **Rule Compilation**: restricted terms, price keywords and exception
//!   patterns compiled once into case-insensitive literal matchers
//! - **Exception Overrides**: any exception phrase cancels a trigger outright
//! - **Warning Cooldowns**: per user and channel, with bounded memory
//! - **Daily Metrics**: trigger counts by channel and rule, reset at UTC midnight
//! - **Pluggable Transport**: the chat platform sits behind a narrow async trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatguard::prelude::*;
//! use chatguard::platforms::console::ConsoleConnection;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ModerationConfig::from_env()?;
//!     config.validate()?;
//!
//!     let transport = Arc::new(ConsoleConnection::new(tokio::io::stdout()));
//!     let bot = ModerationBot::new(config, transport)?;
//!
//!     let (sender, receiver) = tokio::sync::mpsc::channel(64);
//!     drop(sender);
//!     bot.run(receiver).await;
//!
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod config;
pub mod platforms;
pub mod bot;

// Re-export commonly used items
pub mod prelude {
    pub use crate::bot::{ModerationBot, ModerationOutcome};
    pub use crate::bot::classifier::classify;
    pub use crate::bot::rules::{CompiledRules, RuleSet};
    pub use crate::bot::session::ModerationSession;
    pub use crate::config::ModerationConfig;
    pub use crate::platforms::{LogTarget, ModerationTransport, TransportError};
    pub use crate::types::{
        ChannelHandle, ChannelKind, MessageEvent, TriggerType, Verdict, WarningStatus,
    };
    pub use anyhow::Result;
}
