//! Connection string tokenizer.
//!
//! Splits `key=value;key=value` strings into ordered pairs. Keys are
//! lower-cased; `==` inside a key is an escaped literal `=`.
//!
//! ```
//! use esdb_common::parse_connection_string;
//!
//! let pairs = parse_connection_string("ConnectTo=tcp://localhost:1113; HeartbeatTimeout=500").unwrap();
//! assert_eq!(pairs[0], ("connectto".to_string(), "tcp://localhost:1113".to_string()));
//! assert_eq!(pairs[1], ("heartbeattimeout".to_string(), "500".to_string()));
//! ```

use crate::error::{ClientError, Result};

const KEY_TRIM_CHARS: [char; 2] = [' ', ';'];

const FORMAT_ERROR: &str =
    "Format of the initialization string does not conform to specification starting at index 0.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    Key,
    Value,
}

/// Streaming tokenizer over a connection string.
///
/// Yields `Ok((key, value))` for every complete pair, in input order. If the
/// whole input produced no pair at all, the final item is an error.
#[derive(Debug, Clone)]
pub struct ConnectionStringTokenizer {
    chars: Vec<char>,
    position: usize,
    returned: usize,
    finished: bool,
}

impl ConnectionStringTokenizer {
    /// Create a tokenizer; surrounding whitespace is ignored
    pub fn new(connection_string: &str) -> Self {
        Self {
            chars: connection_string.trim().chars().collect(),
            position: 0,
            returned: 0,
            finished: false,
        }
    }

    fn next_pair(&mut self) -> Option<(String, String)> {
        let mut key = String::new();
        let mut value = String::new();
        let mut mode = ReadMode::Key;

        while self.position < self.chars.len() {
            let current = self.chars[self.position];
            let at_last = self.position == self.chars.len() - 1;
            let next = self.chars.get(self.position + 1).copied();
            self.position += 1;

            match mode {
                ReadMode::Key if current == '=' => {
                    if next == Some('=') {
                        key.push('=');
                        self.position += 1;
                    } else {
                        mode = ReadMode::Value;
                    }
                }
                ReadMode::Value if current == ';' || at_last => {
                    if current != ';' {
                        value.push(current);
                    }
                    return Some((
                        key.to_lowercase().trim_matches(&KEY_TRIM_CHARS[..]).to_string(),
                        value.trim().to_string(),
                    ));
                }
                ReadMode::Key => key.push(current),
                ReadMode::Value => value.push(current),
            }
        }

        None
    }
}

impl Iterator for ConnectionStringTokenizer {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_pair() {
            Some(pair) => {
                self.returned += 1;
                Some(Ok(pair))
            }
            None => {
                self.finished = true;
                if self.returned == 0 {
                    Some(Err(ClientError::ConnectionString(FORMAT_ERROR.to_string())))
                } else {
                    None
                }
            }
        }
    }
}

/// Tokenize a whole connection string into ordered key/value pairs
pub fn parse_connection_string(connection_string: &str) -> Result<Vec<(String, String)>> {
    ConnectionStringTokenizer::new(connection_string).collect()
}
