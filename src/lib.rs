//! # bundler
//!
//! A static text-inclusion bundler. Include directives such as
//! `//include(path/to/file.js)` are replaced, recursively, by the contents of the
//! file they name, and the composed result is written next to the source under a
//! new name.
//!
//! ## Features
//!
//! - Streaming scanner for `<left><path><right>` directives with custom delimiters
//! - Includes resolve relative to the including file
//! - Cycle detection and a configurable nesting ceiling
//! - Directory mode with symlink following and ignore rules
//! - Content fingerprinted output names for cache busting
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use bundler::{BundleConfig, bundle_file};
//! use std::path::Path;
//!
//! let config = BundleConfig::default();
//! match bundle_file(Path::new("assets/app.js"), None, &config) {
//!     Ok(file) => println!("{}", file.new_path.display()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Bundle a file into app-<fingerprint>.js
//! bundler assets/app.js
//!
//! # Bundle a whole tree, naming outputs <stem>-prod.<ext>
//! bundler assets -o prod --ignore '/vendor/'
//!
//! # Bundle stdin to stdout
//! cat app.js | bundler - -b assets
//! ```

pub mod bundle;
pub mod composer;
pub mod config;
pub mod error;
pub mod filter;
pub mod naming;
pub mod scanner;
pub mod walker;

// Re-export main types and functions for convenience
pub use bundle::{bundle_directory, bundle_file, bundle_stream};
pub use config::{BundleConfig, DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM, Delimiters};
pub use error::{BundlerError, Result};
pub use filter::{IgnorePredicate, IgnoreRules, NoIgnore};
pub use naming::{OutputName, ProcessedFile};
pub use scanner::{Scanner, Token, TokenKind, scan};
