//! Chess move picker driven by Monte Carlo Tree Search with random playouts.
//!
//! The search itself ([`mcts`]) knows nothing about chess: it talks to the
//! game through the [`environment::Environment`] trait. [`chess::Game`]
//! implements it on top of the `shakmaty` rules engine, and [`Engine`]
//! exposes the whole thing over the [Universal Chess Interface].
//!
//! [Universal Chess Interface]: https://www.chessprogramming.org/UCI

// Rustdoc lints.
#![warn(
    rustdoc::missing_crate_level_docs,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::bare_urls
)]
// Performance is extremely important.
#![deny(clippy::perf)]

pub mod chess;
pub mod environment;
pub mod mcts;

mod engine;
pub use engine::{bench, Engine, NULL_MOVE};
use shadow_rs::shadow;

shadow!(build);

/// Returns the full engine version that can be used to identify how it was
/// built in the first place.
#[must_use]
pub fn engine_version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints informations about the engine version, author and repository on
/// engine startup.
pub fn print_engine_info() {
    println!("{} {}", env!("CARGO_PKG_NAME"), engine_version());
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Prints information about the build type, target and whether the build is
/// clean.
pub fn print_binary_info() {
    println!("Release build: {}", !shadow_rs::is_debug());
    println!("Target: {}", build::BUILD_TARGET);
    if !build::GIT_CLEAN {
        println!("Warning: built with uncommitted changes");
    }
    println!();
}
