//! Recast Source Trees
//!
//! Immutable, structurally shared source trees with identity-based equality.
//!
//! # Core Concepts
//!
//! - [`Tree<K>`]: Persistent tree value of a given [`TreeKind`]
//! - [`TreeId`]: Identity tag drawn on every tree allocation
//! - [`SourceFile`] / [`Source`]: Type-erased view used by the scheduler
//! - [`Fingerprint`]: Blake3 content digest for diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_tree::{Tree, same_source};
//!
//! let pom = Tree::<PomKind>::new("pom.xml", parsed)?;
//! let source = pom.clone().into_source();
//!
//! // A rebuilt tree is a different value even if its content is equal
//! let rebuilt = pom.with_content(pom.content().clone()).into_source();
//! assert!(!same_source(&source, &rebuilt));
//! ```

#![warn(unreachable_pub)]

mod fingerprint;
mod source;
mod tree;

pub use fingerprint::{Fingerprint, FingerprintError};
pub use source::{downcast, same_slot, same_source, Source, SourceFile};
pub use tree::{Tree, TreeError, TreeId, TreeKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
