// compat_limits.rs - Process-wide limits.
//
// These change global settings, so they live in their own test binary and
// run as a single test.

use std::sync::Arc;
use std::time::Duration;

use linre::api::Regex;
use linre::compile::{compile, program_size_limit, set_program_size_limit, Expr};
use linre::error::RegexError;
use linre::input::Utf8Input;
use linre::machine::{set_time_limit, time_limit, Anchor, Machine, MatchKind};

fn size_limit() {
    assert_eq!(program_size_limit(), 1_000_000);
    let expr = Expr::repeat(Expr::lit('a'), 100, Some(100));

    set_program_size_limit(50);
    assert_eq!(program_size_limit(), 50);
    let err = compile(&expr).unwrap_err();
    assert!(matches!(err, RegexError::ProgramTooLarge { limit: 50, .. }));
    assert!(matches!(Regex::new(&expr), Err(RegexError::ProgramTooLarge { .. })));
    // A per-regex limit wins over the global one.
    assert!(Regex::builder(&expr).size_limit(1000).build().is_ok());

    set_program_size_limit(1_000_000);
    assert!(compile(&expr).is_ok());
}

fn match_time_limit() {
    assert_eq!(time_limit(), 0);
    // (a|b)*z never matches a run of a's, so every position is visited.
    let expr = Expr::cat(vec![
        Expr::star(Expr::alt(vec![Expr::lit('a'), Expr::lit('b')])),
        Expr::lit('z'),
    ]);
    let prog = Arc::new(compile(&expr).unwrap());
    let text = "a".repeat(1 << 21);
    let input = Utf8Input::from(text.as_str());

    set_time_limit(1);
    assert_eq!(time_limit(), 1);
    let mut m = Machine::new(Arc::clone(&prog), MatchKind::LeftmostFirst);
    assert_eq!(
        m.try_match(&input, 0, Anchor::Unanchored),
        Err(RegexError::TimeLimitOver)
    );
    assert!(!m.match_input(&input, 0, Anchor::Unanchored));

    // A per-machine limit wins over the global one.
    m.set_time_limit(Some(Duration::from_secs(600)));
    assert_eq!(m.try_match(&input, 0, Anchor::Unanchored), Ok(false));

    set_time_limit(0);
    let mut m = Machine::new(prog, MatchKind::LeftmostFirst);
    assert_eq!(m.try_match(&input, 0, Anchor::Unanchored), Ok(false));
}

#[test]
fn global_limits() {
    size_limit();
    match_time_limit();
}
