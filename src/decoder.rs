//! Text decoding for streams opened with an encoding.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Text encoding applied to file content before it is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf8"),
            Encoding::Latin1 => write!(f, "latin1"),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "latin1" | "latin-1" | "binary" => Ok(Encoding::Latin1),
            other => Err(Error::invalid_argument(format!(
                "unknown encoding '{other}'"
            ))),
        }
    }
}

/// Stateful decoder that never splits a character across chunk boundaries.
#[derive(Debug)]
pub(crate) struct TextDecoder {
    encoding: Encoding,
    partial: Vec<u8>,
}

impl TextDecoder {
    pub(crate) fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            partial: Vec::new(),
        }
    }

    /// Decode the next chunk. Bytes of an incomplete trailing UTF-8 sequence
    /// are held back until the following chunk arrives.
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        match self.encoding {
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Utf8 => {
                let mut input = std::mem::take(&mut self.partial);
                input.extend_from_slice(bytes);
                self.decode_utf8(&input)
            }
        }
    }

    /// Flush whatever is left at end of input.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.partial);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    fn decode_utf8(&mut self, input: &[u8]) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.partial = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }
}
