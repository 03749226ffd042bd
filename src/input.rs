// input.rs - Input sources the machine can run over.
//
// The machine only needs to decode one symbol at an offset, ask for the
// zero-width context before an offset, and optionally find the program's
// literal prefix. UTF-8 offsets are byte offsets; UTF-16 offsets are code
// unit offsets.

use memchr::memmem;

use crate::empty::{empty_op_context, CodePoint, EmptyFlags};
use crate::prog::Prog;

/// What the machine requires of any input sequence.
pub trait MachineInput {
    /// Decodes the symbol starting at `pos`, returning it with its width.
    /// `None` at or past the end of input.
    fn step(&self, pos: usize) -> Option<(CodePoint, usize)>;

    /// Zero-width conditions satisfied immediately before `pos`.
    fn context(&self, pos: usize) -> EmptyFlags;

    /// Whether [`index_of_prefix`](Self::index_of_prefix) is supported.
    fn can_check_prefix(&self) -> bool {
        false
    }

    /// Distance from `pos` to the next occurrence of the program's literal
    /// prefix, or `None` if it does not occur again.
    fn index_of_prefix(&self, _prog: &Prog, _pos: usize) -> Option<usize> {
        None
    }

    /// Offset one past the last symbol.
    fn end_pos(&self) -> usize;
}

const REPLACEMENT: CodePoint = 0xFFFD;

// Maps a lead byte to the length of its sequence (RFC 3629, max 4 bytes).
// Continuation bytes and the never-valid leads 0xC0, 0xC1, 0xF5..=0xFF map
// to 1 and decode as a replacement symbol.
static UTF8_LEN: [u8; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

#[inline]
fn utf8_is_tail(b: u8) -> bool {
    (b & 0xc0) == 0x80
}

/// Decodes one UTF-8 sequence at the start of `p`. Invalid, overlong,
/// surrogate or truncated sequences yield U+FFFD with width 1.
pub fn decode_utf8(p: &[u8]) -> Option<(CodePoint, usize)> {
    let b0 = *p.first()?;
    if b0 < 0x80 {
        return Some((b0 as CodePoint, 1));
    }
    let len = UTF8_LEN[b0 as usize] as usize;
    if len == 1 || p.len() < len || !p[1..len].iter().all(|&b| utf8_is_tail(b)) {
        return Some((REPLACEMENT, 1));
    }
    let mut n = (b0 as CodePoint) & ((1 << (7 - len)) - 1);
    for &b in &p[1..len] {
        n = (n << 6) | (b as CodePoint & 0x3f);
    }
    let min = match len {
        2 => 0x80,
        3 => 0x800,
        _ => 0x10000,
    };
    if n < min || n > 0x10FFFF || (0xD800..=0xDFFF).contains(&n) {
        return Some((REPLACEMENT, 1));
    }
    Some((n, len))
}

/// UTF-8 text, as `&str` or raw bytes.
#[derive(Clone, Copy, Debug)]
pub struct Utf8Input<'a> {
    bytes: &'a [u8],
}

impl<'a> Utf8Input<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Utf8Input { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    // The symbol ending at `pos`, found by backing up over tail bytes.
    fn step_back(&self, pos: usize) -> Option<CodePoint> {
        if pos == 0 || pos > self.bytes.len() {
            return None;
        }
        let lo = pos.saturating_sub(4);
        let mut head = pos - 1;
        while head > lo && utf8_is_tail(self.bytes[head]) {
            head -= 1;
        }
        match decode_utf8(&self.bytes[head..pos]) {
            Some((r, w)) if head + w == pos => Some(r),
            _ => Some(REPLACEMENT),
        }
    }
}

impl<'a> From<&'a str> for Utf8Input<'a> {
    fn from(s: &'a str) -> Self {
        Utf8Input::new(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Utf8Input<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Utf8Input::new(bytes)
    }
}

impl MachineInput for Utf8Input<'_> {
    #[inline]
    fn step(&self, pos: usize) -> Option<(CodePoint, usize)> {
        decode_utf8(self.bytes.get(pos..)?)
    }

    fn context(&self, pos: usize) -> EmptyFlags {
        let before = self.step_back(pos);
        let after = self.step(pos).map(|(r, _)| r);
        empty_op_context(before, after)
    }

    fn can_check_prefix(&self) -> bool {
        true
    }

    fn index_of_prefix(&self, prog: &Prog, pos: usize) -> Option<usize> {
        let (prefix, _) = prog.prefix();
        if prefix.contains(char::REPLACEMENT_CHARACTER) {
            // U+FFFD also stands for invalid bytes, which a byte search
            // cannot see. Step instead.
            return Some(0);
        }
        memmem::find(self.bytes.get(pos..)?, prefix.as_bytes())
    }

    fn end_pos(&self) -> usize {
        self.bytes.len()
    }
}

#[inline]
fn is_high_surrogate(u: u16) -> bool {
    (0xD800..0xDC00).contains(&u)
}

#[inline]
fn is_low_surrogate(u: u16) -> bool {
    (0xDC00..0xE000).contains(&u)
}

#[inline]
fn combine_surrogates(hi: u16, lo: u16) -> CodePoint {
    0x10000 + (((hi as CodePoint) - 0xD800) << 10) + ((lo as CodePoint) - 0xDC00)
}

/// UTF-16 text. Surrogate pairs are one symbol of width 2; an unpaired
/// surrogate is its own symbol.
#[derive(Clone, Copy, Debug)]
pub struct Utf16Input<'a> {
    units: &'a [u16],
}

impl<'a> Utf16Input<'a> {
    pub fn new(units: &'a [u16]) -> Self {
        Utf16Input { units }
    }

    fn step_back(&self, pos: usize) -> Option<CodePoint> {
        if pos == 0 || pos > self.units.len() {
            return None;
        }
        let last = self.units[pos - 1];
        if is_low_surrogate(last) && pos >= 2 && is_high_surrogate(self.units[pos - 2]) {
            return Some(combine_surrogates(self.units[pos - 2], last));
        }
        Some(last as CodePoint)
    }
}

impl MachineInput for Utf16Input<'_> {
    #[inline]
    fn step(&self, pos: usize) -> Option<(CodePoint, usize)> {
        let u = *self.units.get(pos)?;
        if is_high_surrogate(u) {
            if let Some(&lo) = self.units.get(pos + 1) {
                if is_low_surrogate(lo) {
                    return Some((combine_surrogates(u, lo), 2));
                }
            }
        }
        Some((u as CodePoint, 1))
    }

    fn context(&self, pos: usize) -> EmptyFlags {
        let before = self.step_back(pos);
        let after = self.step(pos).map(|(r, _)| r);
        empty_op_context(before, after)
    }

    fn can_check_prefix(&self) -> bool {
        true
    }

    fn index_of_prefix(&self, prog: &Prog, pos: usize) -> Option<usize> {
        let (prefix, _) = prog.prefix();
        let needle: Vec<u16> = prefix.encode_utf16().collect();
        let hay = self.units.get(pos..)?;
        if needle.is_empty() {
            return Some(0);
        }
        hay.windows(needle.len()).position(|w| w == needle.as_slice())
    }

    fn end_pos(&self) -> usize {
        self.units.len()
    }
}
