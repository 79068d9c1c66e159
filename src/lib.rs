//! Tsukemono: a behaviour-driven test engine.
//!
//! Feature text is parsed into an [`ast::Feature`], each step is bound to a
//! registered [`steps::StepDefinition`] through the expression
//! [`matcher`], and the resulting [`tree::TestTree`] runs under the
//! [`scheduler`] with retries, timeouts, bail, cooperative abort and
//! `only`/`skip` selection. Test trees can also be built directly with
//! `describe`/`test` registrations on an [`engine::Engine`].
//!
//! ```rust
//! use tsukemono::engine::Engine;
//! use tsukemono::tree::action;
//!
//! # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
//! let mut engine = Engine::default();
//! engine
//!     .describe("maths", |tree| tree.test("adds", action(|| async {
//!         anyhow::ensure!(1 + 1 == 2);
//!         Ok(())
//!     })))
//!     .expect("registration");
//! let results = engine.run().await;
//! assert!(results.passed());
//! # });
//! ```

pub mod ast;
pub mod cli;
pub mod definitions;
pub mod engine;
pub mod hasher;
pub mod hooks;
pub mod matcher;
pub mod params;
pub mod parser;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod steps;
pub mod tree;
pub mod workspace;
pub mod world;

pub use definitions::Definitions;
pub use engine::{Callbacks, Engine, EngineConfig};
pub use result::{RunResult, RunResults, RunStats, build_result};
pub use runner::{FeatureRunner, FeatureSource, RunOptions, run, run_tests};
pub use workspace::Workspace;
pub use world::World;
