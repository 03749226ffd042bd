//! # linre
//!
//! Linear-time regular expression execution: a Thompson NFA program and a
//! Pike VM that runs it with submatch tracking, without backtracking.
//! Search time is bounded by `O(len(input) * len(program))` whatever the
//! pattern looks like.
//!
//! There is no pattern syntax. Expressions are built as [`compile::Expr`]
//! trees, or programs are assembled directly with [`prog::ProgBuilder`].
//!
//! ## Quick Start
//!
//! ```rust
//! use linre::prelude::*;
//!
//! // ([0-9]{4})-([0-9]{2})
//! let d = || Expr::class(&[('0', '9')]);
//! let expr = Expr::cat(vec![
//!     Expr::group(1, Expr::repeat(d(), 4, Some(4))),
//!     Expr::lit('-'),
//!     Expr::group(2, Expr::repeat(d(), 2, Some(2))),
//! ]);
//! let re = Regex::new(&expr).unwrap();
//! let caps = re.captures("Date: 2026-02").unwrap();
//! assert_eq!(caps.get(0).unwrap().as_str(), "2026-02");
//! assert_eq!(caps.get(1).unwrap().as_str(), "2026");
//! ```
//!
//! ## Low-Level Machine API
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use linre::compile::{compile, Expr};
//! use linre::input::Utf8Input;
//! use linre::machine::{Anchor, Machine, MatchKind};
//!
//! // a|ab
//! let prog = compile(&Expr::alt(vec![Expr::lit('a'), Expr::str("ab")])).unwrap();
//! let mut m = Machine::new(Arc::new(prog), MatchKind::LeftmostLongest);
//! assert!(m.match_input(&Utf8Input::from("xab"), 0, Anchor::Unanchored));
//! assert_eq!(m.submatches(), vec![1, 3]);
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`empty`] | Zero-width assertion flags and boundary context |
//! | [`inst`] | Instructions and symbol classes |
//! | [`prog`] | Program builder, patch lists, linking, prefix analysis |
//! | [`compile`] | Expression trees to programs |
//! | [`queue`] | Run queue of threads |
//! | [`pool`] | Capture buffer free list |
//! | [`input`] | UTF-8 and UTF-16 input sources |
//! | [`machine`] | Pike VM |
//! | [`api`] | `Regex`, `Match`, `Captures`, `FindIter` |
//! | [`error`] | Error type |

// Enable #[coverage(off)] attribute when running under cargo-llvm-cov on nightly.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod compile;
pub mod empty;
pub mod error;
pub mod inst;
pub mod input;
pub mod machine;
pub mod pool;
pub mod prelude;
pub mod prog;
pub mod queue;
