// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use linre::prelude::*;
//!
//! // [0-9]+
//! let re = Regex::new(&Expr::plus(Expr::class(&[('0', '9')]))).unwrap();
//! let m = re.find("answer: 42").unwrap();
//! assert_eq!(m.as_str(), "42");
//! ```

pub use crate::api::{Captures, CapturesIter, FindIter, Match, Regex, RegexBuilder};
pub use crate::compile::Expr;
pub use crate::error::RegexError;
pub use crate::machine::{Anchor, MatchKind};
