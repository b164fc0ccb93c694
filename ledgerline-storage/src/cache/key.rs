//! Deterministic cache keys built from an operation and its arguments.
//!
//! Every argument is rendered into a self-delimiting fragment: strings carry
//! their byte length, optional values carry a presence tag, and lists carry
//! their element count. Two different argument lists for the same operation
//! therefore never render to the same key.

use chrono::{DateTime, Utc};
use ledgerline_core::Operation;
use std::fmt::{self, Write};

/// Cache key for one call of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: Operation,
    encoded: String,
}

impl CacheKey {
    /// Key with no arguments yet.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            encoded: operation.as_str().to_string(),
        }
    }

    /// Append one argument.
    pub fn push<K: KeyPart + ?Sized>(mut self, part: &K) -> Self {
        self.encoded.push('-');
        part.write_key(&mut self.encoded);
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

// ============================================================================
// KEY PARTS
// ============================================================================

/// A value that can be rendered into a cache key fragment.
pub trait KeyPart {
    fn write_key(&self, out: &mut String);
}

impl KeyPart for str {
    fn write_key(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = write!(out, "s{}:{}", self.len(), self);
    }
}

impl KeyPart for String {
    fn write_key(&self, out: &mut String) {
        self.as_str().write_key(out)
    }
}

macro_rules! impl_key_part_int {
    ($($ty:ty),+) => {
        $(
            impl KeyPart for $ty {
                fn write_key(&self, out: &mut String) {
                    let _ = write!(out, "n{}", self);
                }
            }
        )+
    };
}

impl_key_part_int!(u8, u16, u32, u64, usize, i32, i64);

impl KeyPart for bool {
    fn write_key(&self, out: &mut String) {
        out.push_str(if *self { "T" } else { "F" });
    }
}

impl KeyPart for DateTime<Utc> {
    fn write_key(&self, out: &mut String) {
        let _ = write!(out, "t{}", self.timestamp_micros());
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn write_key(&self, out: &mut String) {
        match self {
            Some(value) => {
                out.push('+');
                value.write_key(out);
            }
            None => out.push('~'),
        }
    }
}

impl<T: KeyPart> KeyPart for [T] {
    fn write_key(&self, out: &mut String) {
        let _ = write!(out, "l{}", self.len());
        for item in self {
            out.push('|');
            item.write_key(out);
        }
    }
}

impl<T: KeyPart> KeyPart for Vec<T> {
    fn write_key(&self, out: &mut String) {
        self.as_slice().write_key(out)
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn write_key(&self, out: &mut String) {
        (**self).write_key(out)
    }
}

// ============================================================================
// TESTS
// ============================================================================
