//! # Kwamirpg - RPG engine core for a chat-platform guild companion
//!
//! Kwamirpg is the game engine behind a chat-platform companion bot:
//! persistent player profiles, derived stats, luck-modulated randomness,
//! daily/weekly/story quests, counter-driven achievements with hidden-class
//! unlocks, inventory and artifact sets, a gold ledger with cooldowns, and
//! a turn-based combat resolver.
//!
//! The chat gateway, command parser, UI renderers, moderation and chatbot
//! layers are external collaborators. They call the async [`rpg::RpgEngine`]
//! facade and render the returned [`rpg::ResultBundle`]s; the engine never
//! formats end-user text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kwamirpg::config::Config;
//! use kwamirpg::rpg::{PlayerEvent, RpgEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let engine = RpgEngine::open(config)?;
//!
//!     engine.ensure("user123").await?;
//!     let bundle = engine
//!         .apply_event("user123", PlayerEvent::XpGained { amount: 150 })
//!         .await?;
//!     println!("level ups: {}", bundle.level_ups);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`rpg`] - The engine core: one submodule per component, fronted by
//!   [`rpg::RpgEngine`]
//! - [`config`] - TOML configuration with validation and defaults
//! - [`logutil`] - Log sanitization for user-supplied identifiers
//!
//! ## Architecture
//!
//! Every state change runs as a transactional mutator: load the player
//! document under its per-player lock, apply the change, validate every
//! invariant against the pre-image, persist. A failed mutator leaves the
//! stored document untouched. Cross-player work runs in parallel; static
//! catalogs are read-only after startup.

pub mod config;
pub mod logutil;
pub mod rpg;
