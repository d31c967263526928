//! nb Core - block lifecycle and delegated event dispatch
//!
//! Block types are defined once and compiled into factories. Instances are
//! created lazily, one per (node, type), and platform events reach them
//! through a single root listener per event kind.
//!
//! ```ignore
//! let engine = Engine::new(Config::default());
//! engine.define(BlockDefinition::named("button").on("click", |block, _| {
//!     block.set_mod("button_pressed", true)?;
//!     Ok(Flow::Continue)
//! }))?;
//! engine.emit(&Event::click(node))?;
//! ```

mod block;
mod cache;
mod compiler;
mod config;
mod definition;
mod dispatcher;
mod engine;
mod error;
mod factory;
mod handler;
mod listeners;

pub use block::{Block, LifecycleState};
pub use compiler::EventTable;
pub use config::Config;
pub use definition::{BlockDefinition, HandlerSpec};
pub use engine::{Engine, EngineStats};
pub use error::BlockError;
pub use factory::Factory;
pub use handler::{Flow, Handler, HandlerResult, Payload};

pub use nb_dom;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
