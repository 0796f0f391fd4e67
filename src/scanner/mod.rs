//! The two-stage streaming tokenizer.
//!
//! Stage one scans the window in 64 byte blocks. Each block is classified
//! into bit masks — where are the line feeds, the backslashes, the bytes
//! they escape, the quoted and comment regions — and reduced to one
//! `bits` mask holding a set bit at every token start. The set bits are
//! appended to the tape as window offsets.
//!
//! Stage two, [`SourceFile::next_token`], drains the tape and emits typed
//! tokens, handling parentheses, line counting, and the refill protocol.
//!
//! Most of the masks are plain equality tests, but quoted strings and
//! comments need care: a semicolon inside a quoted string does not open a
//! comment, a quote inside a comment does not open a string, and either
//! region may begin in one block and end in another. No branch-free
//! algorithm is known that resolves both regions at once, so when a block
//! contains a semicolon or continues a comment, [`find_delimiters`] walks
//! the candidate region starts in order, skipping the ones the current
//! region swallows. Everything else stays bit-parallel.

pub(crate) mod tables;
pub(crate) mod tape;

use self::tables::{CharClass, CLASSIFY};
use self::tape::{Tape, HAS_LINES};
use crate::bits::{
    clear_lowest_bit, find_escaped, follows, lowest_bit, prefix_xor,
};
use crate::error::{syntax_error, Raise};
use crate::simd::BlockInput;
use crate::source::{Carry, Eof, SourceFile};
use crate::{BLOCK_INDEXES, BLOCK_SIZE};

//------------ Token ---------------------------------------------------------

/// The type of a token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenCode {
    /// An unquoted sequence of non-blank, non-structural bytes.
    ///
    /// The token spans the raw input, escape sequences included.
    Contiguous,

    /// The bytes between a pair of unescaped double quotes.
    ///
    /// The token spans the interior of the string, the quotes excluded
    /// and escape sequences included.
    Quoted,

    /// A line feed outside a parenthesized group.
    LineFeed,

    /// The end of the outermost file.
    EndOfFile,
}

/// One token of a zone file.
///
/// Tokens borrow nothing; they carry a span into the parser's window
/// which [`Parser::token_bytes`] resolves. The span is only valid until
/// the next token is read.
///
/// [`Parser::token_bytes`]: crate::parser::Parser::token_bytes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token {
    /// The type of the token.
    pub code: TokenCode,

    /// The window offset of the first byte of the token.
    pub start: usize,

    /// The window offset just past the token.
    pub end: usize,
}

impl Token {
    pub(crate) fn end_of_file(at: usize) -> Self {
        Token {
            code: TokenCode::EndOfFile,
            start: at,
            end: at,
        }
    }

    /// Returns whether the token is a contiguous or quoted string.
    pub fn is_string(&self) -> bool {
        matches!(self.code, TokenCode::Contiguous | TokenCode::Quoted)
    }
}

//------------ Block ---------------------------------------------------------

/// The classification masks of one 64 byte block.
///
/// Bit *i* of each mask describes byte *i*, least significant bit first.
/// The materializer only consumes a few of the masks; the rest stay
/// around for the invariant checks in the test suite.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(not(test), allow(dead_code))]
struct Block {
    newline: u64,
    backslash: u64,
    escaped: u64,
    quoted: u64,
    semicolon: u64,
    comment: u64,
    in_quoted: u64,
    in_comment: u64,
    blank: u64,
    special: u64,
    contiguous: u64,
    follows_contiguous: u64,
    bits: u64,
}

/// Spreads the sign bit of a region mask over a full carry word.
#[inline(always)]
fn sign_mask(mask: u64) -> u64 {
    ((mask as i64) >> 63) as u64
}

/// Resolves quoted and comment regions where both candidates occur.
///
/// `quotes` and `semicolons` are the unescaped candidate region toggles,
/// `in_quoted` and `in_comment` the all-ones/all-zeros carries from the
/// previous block. Returns the surviving quote toggles and the comment
/// toggles (a comment toggles on at its semicolon and off at the line
/// feed ending it).
fn find_delimiters(
    quotes: u64,
    semicolons: u64,
    newlines: u64,
    in_quoted: u64,
    in_comment: u64,
) -> (u64, u64) {
    debug_assert_eq!(quotes & semicolons, 0);

    let mut starts = quotes | semicolons;

    // A carry from the previous block closes the open region first.
    let mut end = (newlines & in_comment) | (quotes & in_quoted);
    end = lowest_bit(end);

    let mut delimiters = end;
    starts &= !((in_comment | in_quoted)
        ^ end.wrapping_neg().wrapping_sub(end));

    while starts != 0 {
        let start = lowest_bit(starts);
        let quote = quotes & start;
        let semicolon = semicolons & start;

        // A quote closes at the next quote, a semicolon at the next
        // line feed.
        end = (newlines & semicolon.wrapping_neg())
            | (quotes & quote.wrapping_neg().wrapping_sub(quote));
        end = lowest_bit(end);

        delimiters |= end | start;
        starts &= end.wrapping_neg().wrapping_sub(end);
    }

    (delimiters & quotes, delimiters & !quotes)
}

/// Classifies one block, threading the carry state.
fn scan(input: &BlockInput, carry: &mut Carry) -> Block {
    // Escaped line feeds are classified as contiguous. Escape sequences
    // have no meaning in comments, and line feeds, escaped or not, have
    // no special meaning in quoted strings.
    let newline = input.eq(b'\n');
    let backslash = input.eq(b'\\');
    let mut escaped = find_escaped(backslash, &mut carry.is_escaped);

    let mut quoted = input.eq(b'"') & !escaped;
    let semicolon = input.eq(b';') & !escaped;
    let mut comment = 0;

    let mut in_quoted = carry.in_quoted;
    let mut in_comment = carry.in_comment;
    let comment_carry = in_comment;

    if in_comment != 0 || semicolon != 0 {
        let (q, c) = find_delimiters(
            quoted, semicolon, newline, in_quoted, in_comment,
        );
        quoted = q;
        comment = c;

        in_quoted ^= prefix_xor(quoted);
        carry.in_quoted = sign_mask(in_quoted);
        in_comment ^= prefix_xor(comment);
        carry.in_comment = sign_mask(in_comment);

        // A backslash inside a comment escapes nothing; without this the
        // line feed ending a comment could disappear from the stream.
        escaped &= !((in_comment << 1) | (comment_carry & 1));
    } else {
        in_quoted ^= prefix_xor(quoted);
        carry.in_quoted = sign_mask(in_quoted);
    }

    let blank = input.blanks() & !(escaped | in_quoted | in_comment);
    let special = input.specials() & !(escaped | in_quoted | in_comment);

    let contiguous =
        !(blank | special | quoted) & !(in_quoted | in_comment);
    let follows_contiguous =
        follows(contiguous, &mut carry.follows_contiguous);

    // Quoted and contiguous runs have dynamic lengths; a run gets one
    // index at its first byte. Structural characters get their own.
    let bits = (contiguous & !follows_contiguous)
        | (quoted & in_quoted)
        | special;

    Block {
        newline,
        backslash,
        escaped,
        quoted,
        semicolon,
        comment,
        in_quoted,
        in_comment,
        blank,
        special,
        contiguous,
        follows_contiguous,
        bits,
    }
}

/// Appends the token starts of a block to the tape.
fn tokenize(tape: &mut Tape, lines: &mut u32, block: &Block, base: usize) {
    let mut bits = block.bits;
    let count = bits.count_ones() as usize;
    let tail = tape.tail;

    // The slow path runs while line feeds appear(ed) inside contiguous or
    // quoted runs: those cannot become entries of their own, so they are
    // counted and flushed into the next structural line feed entry.
    if *lines != 0
        || block.newline & (block.contiguous | block.in_quoted) != 0
    {
        let mut newline = block.newline;
        for i in 0..count {
            let bit = lowest_bit(bits);
            bits ^= bit;
            let entry = &mut tape.entries[tail + i];
            if bit & newline != 0 {
                entry.data =
                    (base + bit.trailing_zeros() as usize) | HAS_LINES;
                entry.lines = *lines;
                *lines = 0;
                newline &= !bit & bit.wrapping_neg();
            } else {
                entry.data = base + bit.trailing_zeros() as usize;
                *lines += (newline & bit.wrapping_sub(1)).count_ones();
                newline &= bit.wrapping_neg();
            }
        }
        // Line feeds past the last entry stay pending for the next block.
        *lines += newline.count_ones();
        tape.tail += count;
    } else {
        for i in 0..BLOCK_INDEXES {
            tape.entries[tail + i].data =
                base + bits.trailing_zeros() as usize;
            bits = clear_lowest_bit(bits);
        }

        if count > BLOCK_INDEXES {
            for i in BLOCK_INDEXES..2 * BLOCK_INDEXES {
                tape.entries[tail + i].data =
                    base + bits.trailing_zeros() as usize;
                bits = clear_lowest_bit(bits);
            }

            if count > 2 * BLOCK_INDEXES {
                for i in 2 * BLOCK_INDEXES..count {
                    tape.entries[tail + i].data =
                        base + bits.trailing_zeros() as usize;
                    bits = clear_lowest_bit(bits);
                }
            }
        }

        tape.tail += count;
    }
}

//------------ SourceFile: scanning ------------------------------------------

impl SourceFile {
    /// Compacts and refills the window and scans what it holds.
    ///
    /// Called with the tape drained. Afterwards the tape holds the next
    /// round of entries, closed off by the end-of-data sentinel.
    fn fill(&mut self) -> Result<(), Raise> {
        self.tape.begin_fill();

        if self.end_of_file == Eof::HaveData {
            // Move the tail of the window — from the withdrawn token if
            // there is one, else from the scan position — to the front
            // and read more data behind it.
            let start = self.tape.rebase(self.buffer.index);
            self.buffer.data.copy_within(start..self.buffer.length, 0);
            self.buffer.length -= start;
            self.buffer.data[self.buffer.length] = 0;
            self.buffer.index -= start;
            self.refill()?;
            while self.end_of_file == Eof::HaveData
                && self.buffer.length - self.buffer.index < BLOCK_SIZE
            {
                self.refill()?;
            }
        }

        let mut block = Block::default();
        let mut have_tape = true;

        while self.buffer.length - self.buffer.index >= BLOCK_SIZE {
            if self.tape.space() < BLOCK_SIZE {
                have_tape = false;
                break;
            }
            let chunk: &[u8; BLOCK_SIZE] = self.buffer.data
                [self.buffer.index..self.buffer.index + BLOCK_SIZE]
                .try_into()
                .expect("window holds a full block");
            let input = BlockInput::load(chunk);
            block = scan(&input, &mut self.carry);
            tokenize(
                &mut self.tape,
                &mut self.carry.lines,
                &block,
                self.buffer.index,
            );
            self.buffer.index += BLOCK_SIZE;
        }

        // The remainder is shorter than a block. Once the stream is
        // exhausted, scan it from a zero-padded buffer and drop the bits
        // past the end.
        if have_tape && self.end_of_file != Eof::HaveData {
            let length = self.buffer.length - self.buffer.index;
            if length <= self.tape.space() {
                let mut padded = [0u8; BLOCK_SIZE];
                padded[..length].copy_from_slice(
                    &self.buffer.data
                        [self.buffer.index..self.buffer.length],
                );
                let input = BlockInput::load(&padded);
                block = scan(&input, &mut self.carry);
                let keep = if length == 0 {
                    0
                } else {
                    !0u64 >> (BLOCK_SIZE - length)
                };
                block.bits &= keep;
                block.contiguous &= keep;
                tokenize(
                    &mut self.tape,
                    &mut self.carry.lines,
                    &block,
                    self.buffer.index,
                );
                self.buffer.index += length;
                self.end_of_file = Eof::NoMoreData;
            }
        }

        // Make sure the tape contains no partial tokens: a contiguous or
        // quoted run still open at the end of scanned data withdraws its
        // start so the next fill re-emits it.
        let live = (block.contiguous | block.in_quoted) & 1 << 63 != 0;
        self.tape.finish_fill(live, self.buffer.length);
        Ok(())
    }

    /// Returns the next token of this file.
    ///
    /// Returns `None` at the end of the file; the parser decides whether
    /// that pops an include or ends the stream.
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>, Raise> {
        loop {
            if self.fresh && self.buffer.length > 0 {
                self.fresh = false;
                self.start_of_line = CLASSIFY
                    [self.buffer.data[0] as usize]
                    != CharClass::Blank;
            }

            let entry = self.tape.entries[self.tape.head];
            let offset = entry.offset();

            if offset == self.buffer.length {
                // The end-of-data sentinel.
                if self.end_of_file != Eof::NoMoreData {
                    self.fill()?;
                    continue;
                }
                if self.carry.in_quoted != 0 {
                    self.line += self.carry.lines as usize;
                    self.carry.lines = 0;
                    syntax_error!("Unterminated string");
                }
                if self.grouped {
                    syntax_error!("Missing closing brace");
                }
                return Ok(None);
            }

            match self.buffer.data[offset] {
                b'\n' => {
                    if entry.has_lines() {
                        self.line += entry.lines as usize;
                    }
                    self.line += 1;
                    self.tape.head += 1;
                    if self.grouped {
                        continue;
                    }
                    self.start_of_line = CLASSIFY
                        [self.buffer.data[offset + 1] as usize]
                        != CharClass::Blank;
                    return Ok(Some(Token {
                        code: TokenCode::LineFeed,
                        start: offset,
                        end: offset + 1,
                    }));
                }
                b'"' => {
                    // Between the opening quote entry and the next entry
                    // lies the interior of the string, so the next entry
                    // is the closing quote. Both are consumed here.
                    let close = self.tape.entries[self.tape.head + 1];
                    debug_assert!(!close.has_lines());
                    self.tape.head += 2;
                    return Ok(Some(Token {
                        code: TokenCode::Quoted,
                        start: offset + 1,
                        end: close.offset(),
                    }));
                }
                b'(' => {
                    if self.grouped {
                        syntax_error!("Nested opening brace");
                    }
                    self.grouped = true;
                    self.tape.head += 1;
                }
                b')' => {
                    if !self.grouped {
                        syntax_error!("Missing opening brace");
                    }
                    self.grouped = false;
                    self.tape.head += 1;
                }
                _ => {
                    let end = self.contiguous_end(offset);
                    self.tape.head += 1;
                    return Ok(Some(Token {
                        code: TokenCode::Contiguous,
                        start: offset,
                        end,
                    }));
                }
            }
        }
    }

    /// Finds the end of the contiguous token starting at `start`.
    ///
    /// Walks the classification table; a backslash carries the following
    /// byte regardless of its class.
    fn contiguous_end(&self, start: usize) -> usize {
        let data = &self.buffer.data;
        let length = self.buffer.length;
        let mut end = start;
        while end < length {
            if data[end] == b'\\' {
                end += 2;
            } else if CLASSIFY[data[end] as usize] == CharClass::Contiguous
            {
                end += 1;
            } else {
                break;
            }
        }
        end.min(length)
    }
}

//============ Testing =======================================================
