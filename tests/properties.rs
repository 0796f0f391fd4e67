//! Property-based tests against a byte-at-a-time reference tokenizer.

use proptest::prelude::*;
use std::io::Read;
use zonescan::{Error, Options, Parser, TokenCode};

fn options() -> Options {
    Options {
        origin: "example.com.".into(),
        ..Default::default()
    }
}

//------------ Reference tokenizer -------------------------------------------

/// A token of the reference tokenizer.
#[derive(Clone, Debug, Eq, PartialEq)]
enum RefToken {
    Contiguous(Vec<u8>),
    Quoted(Vec<u8>),
    LineFeed,
}

/// Tokenizes `input` one byte at a time, the grammar spelled out.
///
/// Escapes carry the following byte everywhere except inside comments.
/// Line feeds inside parenthesized groups are suppressed. Errors are
/// unterminated strings, unbalanced parentheses, and a group left open
/// at the end of input.
fn reference(input: &[u8]) -> Result<Vec<RefToken>, ()> {
    let mut output = Vec::new();
    let mut grouped = false;
    let mut pos = 0;
    while pos < input.len() {
        match input[pos] {
            b' ' | b'\t' | b'\r' => pos += 1,
            b'\n' => {
                if !grouped {
                    output.push(RefToken::LineFeed);
                }
                pos += 1;
            }
            b'(' => {
                if grouped {
                    return Err(());
                }
                grouped = true;
                pos += 1;
            }
            b')' => {
                if !grouped {
                    return Err(());
                }
                grouped = false;
                pos += 1;
            }
            b';' => {
                while pos < input.len() && input[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'"' => {
                pos += 1;
                let mut content = Vec::new();
                loop {
                    match input.get(pos) {
                        None => return Err(()),
                        Some(b'"') => {
                            pos += 1;
                            break;
                        }
                        Some(b'\\') => {
                            content.push(b'\\');
                            pos += 1;
                            if let Some(&escaped) = input.get(pos) {
                                content.push(escaped);
                                pos += 1;
                            }
                        }
                        Some(&byte) => {
                            content.push(byte);
                            pos += 1;
                        }
                    }
                }
                output.push(RefToken::Quoted(content));
            }
            _ => {
                let mut content = Vec::new();
                while pos < input.len() {
                    match input[pos] {
                        b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')'
                        | b';' | b'"' => break,
                        b'\\' => {
                            content.push(b'\\');
                            pos += 1;
                            if let Some(&escaped) = input.get(pos) {
                                content.push(escaped);
                                pos += 1;
                            }
                        }
                        byte => {
                            content.push(byte);
                            pos += 1;
                        }
                    }
                }
                output.push(RefToken::Contiguous(content));
            }
        }
    }
    if grouped {
        return Err(());
    }
    Ok(output)
}

/// Drains a parser into reference tokens.
fn lex_all(parser: &mut Parser) -> Result<Vec<RefToken>, Error> {
    let mut output = Vec::new();
    loop {
        let token = parser.lex()?;
        match token.code {
            TokenCode::Contiguous => output.push(RefToken::Contiguous(
                parser.token_bytes(&token).to_vec(),
            )),
            TokenCode::Quoted => output.push(RefToken::Quoted(
                parser.token_bytes(&token).to_vec(),
            )),
            TokenCode::LineFeed => output.push(RefToken::LineFeed),
            TokenCode::EndOfFile => return Ok(output),
        }
    }
}

//------------ Input strategies ----------------------------------------------

fn arb_word() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z0-9._-]{1,12}",
        1 => Just("a\\;b".to_string()),
        1 => Just("a\\\"b".to_string()),
        1 => Just("x\\\\".to_string()),
        1 => Just("\\040y".to_string()),
        1 => Just("esc\\(ape".to_string()),
    ]
}

fn arb_quoted() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            'a', 'b', 'z', '0', ' ', ';', '(', ')', '.', '\n',
        ]),
        0..16,
    )
    .prop_map(|chars| {
        format!("\"{}\"", chars.into_iter().collect::<String>())
    })
}

fn arb_item() -> impl Strategy<Value = String> {
    prop_oneof![3 => arb_word(), 1 => arb_quoted()]
}

fn arb_line() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(arb_item(), 0..5),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(items, group, comment)| {
            let mut line = String::new();
            let wrap = group && items.len() >= 2;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                if wrap && i == 1 {
                    line.push_str("(\n ");
                }
                line.push_str(item);
                if wrap && i == items.len() - 1 {
                    line.push_str(" )");
                }
            }
            if comment {
                line.push_str(" ; a comment (\"with\" noise");
            }
            line.push('\n');
            line
        })
}

fn arb_input() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_line(), 0..8)
        .prop_map(|lines| lines.concat())
}

//------------ ChunkReader ---------------------------------------------------

/// Delivers its data `chunk` bytes per read, forcing refills.
struct ChunkReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self
            .chunk
            .min(self.data.len() - self.pos)
            .min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

//------------ Properties ----------------------------------------------------

proptest! {
    /// Tokenizing matches the byte-at-a-time reference.
    #[test]
    fn token_preservation(input in arb_input()) {
        let want = reference(input.as_bytes());
        let mut parser =
            Parser::open_string(&options(), &input).unwrap();
        let got = lex_all(&mut parser);
        match (want, got) {
            (Ok(want), Ok(got)) => prop_assert_eq!(want, got),
            (Err(()), Err(_)) => {}
            (want, got) => prop_assert!(
                false,
                "reference {:?} versus parser {:?}",
                want,
                got
            ),
        }
    }

    /// Forced refill boundaries do not create or hide tokens.
    #[test]
    fn boundary_independence(
        input in arb_input(),
        chunk in 1usize..17,
    ) {
        let mut whole =
            Parser::open_string(&options(), &input).unwrap();
        let want = lex_all(&mut whole);

        let reader = ChunkReader {
            data: input.clone().into_bytes(),
            pos: 0,
            chunk,
        };
        let mut chunked =
            Parser::open_reader(&options(), "<chunked>", reader)
                .unwrap();
        let got = lex_all(&mut chunked);

        match (want, got) {
            (Ok(want), Ok(got)) => prop_assert_eq!(want, got),
            (Err(want), Err(got)) => {
                prop_assert_eq!(want.code(), got.code())
            }
            (want, got) => prop_assert!(
                false,
                "whole {:?} versus chunked {:?}",
                want,
                got
            ),
        }
    }

    /// A group left open is reported at the right line.
    #[test]
    fn line_accounting(
        lines in prop::collection::vec(
            prop::sample::select(vec![
                "a b c\n",
                "\"l1\nl2\" z\n",
                "w ; comment\n",
                "\"multi\nline\nstring\"\n",
                "( x y )\n",
            ]),
            0..6,
        ),
        tail in 0usize..5,
    ) {
        let mut input = lines.concat();
        input.push_str("x (\n");
        for _ in 0..tail {
            input.push_str("y\n");
        }

        let newlines =
            input.bytes().filter(|&byte| byte == b'\n').count();
        let mut parser =
            Parser::open_string(&options(), &input).unwrap();
        let err = loop {
            match parser.lex() {
                Ok(token) => prop_assert_ne!(
                    token.code,
                    TokenCode::EndOfFile,
                    "expected the open group to fail"
                ),
                Err(err) => break err,
            }
        };
        prop_assert_eq!(err.line(), 1 + newlines);
    }
}

/// Every escaped byte forms a single token.
#[test]
fn escape_invariance() {
    for byte in 0..=255u8 {
        // `\c` is one contiguous token.
        let input = [b'\\', byte];
        let mut parser =
            Parser::open_string(&options(), input).unwrap();
        let token = parser.lex().unwrap();
        assert_eq!(token.code, TokenCode::Contiguous, "byte {byte:#x}");
        assert_eq!(
            parser.token_bytes(&token),
            &input,
            "byte {byte:#x}"
        );
        let next = parser.lex().unwrap();
        assert_eq!(
            next.code,
            TokenCode::EndOfFile,
            "byte {byte:#x} produced an extra token"
        );

        // `"\c"` is one quoted token.
        let input = [b'"', b'\\', byte, b'"'];
        let mut parser =
            Parser::open_string(&options(), input).unwrap();
        let token = parser.lex().unwrap();
        assert_eq!(token.code, TokenCode::Quoted, "byte {byte:#x}");
        assert_eq!(
            parser.token_bytes(&token),
            &[b'\\', byte],
            "byte {byte:#x}"
        );
        assert_eq!(parser.lex().unwrap().code, TokenCode::EndOfFile);
    }
}

/// Line feeds inside balanced groups never reach the stream.
#[test]
fn group_suppression() {
    let input = "a (\nb\nc\n) d\ne (f g\nh) i\n";
    let mut parser = Parser::open_string(&options(), input).unwrap();
    let mut line_feeds = 0;
    loop {
        let token = parser.lex().unwrap();
        match token.code {
            TokenCode::LineFeed => line_feeds += 1,
            TokenCode::EndOfFile => break,
            _ => {}
        }
    }
    // Only the two line feeds outside the groups appear.
    assert_eq!(line_feeds, 2);
    assert_eq!(parser.line(), 7);
}
