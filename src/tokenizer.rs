//! Whitespace/newline-delimited token reader.
//!
//! Mirrors the boundary rules of the original `ReadWord`: space and tab end
//! a token silently, a newline ends it and is then "pushed back" so the very
//! next call sees it again and immediately yields the sentence-boundary
//! token `</s>`, and a carriage return is dropped wherever it appears. A
//! token longer than [`crate::MAX_STRING`] bytes is truncated, not rejected.

use std::io::{BufReader, Read};

use crate::MAX_STRING;

/// Stateful reader over a byte stream, yielding one token per call.
pub struct Tokenizer<R: Read> {
    inner: BufReader<R>,
    /// Set when the previous call consumed a newline on behalf of a
    /// nonempty token; the next call must emit `</s>` without reading.
    pending_newline: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(inner: R) -> Self {
        Tokenizer {
            inner: BufReader::new(inner),
            pending_newline: false,
        }
    }

    /// Read the next token, or `None` at end of input. The sentence
    /// boundary sentinel `</s>` is returned as `b"</s>".to_vec()`.
    pub fn next_token(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.pending_newline {
            self.pending_newline = false;
            return Ok(Some(b"</s>".to_vec()));
        }

        let mut buf: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            let ch = byte[0];
            if ch == b'\r' {
                continue;
            }
            if ch == b' ' || ch == b'\t' || ch == b'\n' {
                if buf.is_empty() {
                    if ch == b'\n' {
                        return Ok(Some(b"</s>".to_vec()));
                    }
                    continue;
                }
                if ch == b'\n' {
                    self.pending_newline = true;
                }
                break;
            }
            if buf.len() < MAX_STRING {
                buf.push(ch);
            }
        }
        Ok(Some(buf))
    }
}
