// empty.rs - Zero-width (empty-width) assertion flags and boundary context.

use bitflags::bitflags;

/// A decoded input symbol: a Unicode scalar value, or a lone UTF-16
/// surrogate unit when matching UTF-16 input.
pub type CodePoint = u32;

bitflags! {
    /// Zero-width conditions that hold at a position between two symbols.
    ///
    /// An `EmptyWidth` instruction passes when its condition is a subset of
    /// the flags satisfied at the current position.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EmptyFlags: u32 {
        const BEGIN_LINE = 1 << 0;
        const END_LINE = 1 << 1;
        const BEGIN_TEXT = 1 << 2;
        const END_TEXT = 1 << 3;
        const WORD_BOUNDARY = 1 << 4;
        const NO_WORD_BOUNDARY = 1 << 5;
    }
}

const NEWLINE: CodePoint = '\n' as CodePoint;

/// ASCII word character test used by `\b` and `\B`: `[0-9A-Za-z_]`.
#[inline]
pub fn is_word_char(r: CodePoint) -> bool {
    matches!(r, 0x30..=0x39 | 0x41..=0x5a | 0x61..=0x7a | 0x5f)
}

/// Returns the zero-width conditions satisfied between `before` and `after`.
/// `None` stands for the edge of the text on that side.
pub fn empty_op_context(before: Option<CodePoint>, after: Option<CodePoint>) -> EmptyFlags {
    let mut op = EmptyFlags::empty();
    match before {
        None => op |= EmptyFlags::BEGIN_TEXT | EmptyFlags::BEGIN_LINE,
        Some(NEWLINE) => op |= EmptyFlags::BEGIN_LINE,
        Some(_) => {}
    }
    match after {
        None => op |= EmptyFlags::END_TEXT | EmptyFlags::END_LINE,
        Some(NEWLINE) => op |= EmptyFlags::END_LINE,
        Some(_) => {}
    }
    let word_before = before.is_some_and(is_word_char);
    let word_after = after.is_some_and(is_word_char);
    if word_before != word_after {
        op |= EmptyFlags::WORD_BOUNDARY;
    } else {
        op |= EmptyFlags::NO_WORD_BOUNDARY;
    }
    op
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(c: char) -> Option<CodePoint> {
        Some(c as CodePoint)
    }

    #[test]
    fn context_at_text_edges() {
        let flags = empty_op_context(None, None);
        assert!(flags.contains(EmptyFlags::BEGIN_TEXT | EmptyFlags::BEGIN_LINE));
        assert!(flags.contains(EmptyFlags::END_TEXT | EmptyFlags::END_LINE));
        assert!(flags.contains(EmptyFlags::NO_WORD_BOUNDARY));

        let flags = empty_op_context(None, cp('a'));
        assert!(flags.contains(EmptyFlags::BEGIN_TEXT));
        assert!(flags.contains(EmptyFlags::WORD_BOUNDARY));
        assert!(!flags.contains(EmptyFlags::END_LINE));
    }

    #[test]
    fn context_around_newline() {
        let flags = empty_op_context(cp('\n'), cp('a'));
        assert_eq!(flags, EmptyFlags::BEGIN_LINE | EmptyFlags::WORD_BOUNDARY);

        let flags = empty_op_context(cp('c'), cp('\n'));
        assert_eq!(flags, EmptyFlags::END_LINE | EmptyFlags::WORD_BOUNDARY);
    }

    #[test]
    fn word_boundaries() {
        assert!(empty_op_context(cp('a'), cp(' ')).contains(EmptyFlags::WORD_BOUNDARY));
        assert!(empty_op_context(cp('a'), cp('_')).contains(EmptyFlags::NO_WORD_BOUNDARY));
        assert!(empty_op_context(cp('-'), cp(' ')).contains(EmptyFlags::NO_WORD_BOUNDARY));
        // Non-ASCII letters are not word characters for \b.
        assert!(empty_op_context(cp('é'), cp('a')).contains(EmptyFlags::WORD_BOUNDARY));
    }

    #[test]
    fn subset_semantics() {
        let ctx = EmptyFlags::BEGIN_LINE | EmptyFlags::NO_WORD_BOUNDARY;
        assert!(ctx.contains(EmptyFlags::BEGIN_LINE));
        assert!(ctx.contains(EmptyFlags::empty()));
        assert!(!ctx.contains(EmptyFlags::BEGIN_LINE | EmptyFlags::BEGIN_TEXT));
    }
}
