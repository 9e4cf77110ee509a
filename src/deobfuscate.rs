//! Packed-script deobfuscation.
//!
//! File hosts commonly ship their player config inside Dean Edwards'
//! `eval(function(p,a,c,k,e,d){...}('payload',radix,count,'a|b|c'.split('|'),0,{}))`
//! packer. Unpacking substitutes every base-`radix` word in the payload with
//! the symbol at that index.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

const ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static PACKED_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\}\s*\(\s*'(.*?)'\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*'(.*?)'\.split\(\s*'\|'\s*\)",
    )
    .unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

/// `true` if the text contains a packer invocation.
pub fn is_packed(script: &str) -> bool {
    script.contains("eval(function(p,a,c,k,e,")
}

/// Unpack the first packed block in `script`.
///
/// Returns `None` if no packed block is found or its radix is unsupported.
pub fn unpack(script: &str) -> Option<String> {
    let caps = PACKED_ARGS.captures(script)?;
    let payload = unescape_js_single_quoted(caps.get(1)?.as_str());
    let radix: usize = caps.get(2)?.as_str().parse().ok()?;
    let count: usize = caps.get(3)?.as_str().parse().ok()?;
    let symbols: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

    if !(2..=ALPHABET.len()).contains(&radix) {
        debug!(radix, "unsupported packer radix");
        return None;
    }
    if symbols.len() != count {
        debug!(expected = count, found = symbols.len(), "packer symbol count mismatch");
    }

    let unpacked = WORD.replace_all(&payload, |c: &Captures| {
        let word = &c[0];
        match decode_word(word, radix) {
            Some(index) if index < symbols.len() && !symbols[index].is_empty() => {
                symbols[index].to_string()
            }
            _ => word.to_string(),
        }
    });

    Some(unpacked.into_owned())
}

/// Unpack if the text is packed, otherwise return it unchanged.
pub fn get_and_unpack(text: &str) -> String {
    if is_packed(text) {
        if let Some(unpacked) = unpack(text) {
            return unpacked;
        }
    }
    text.to_string()
}

fn decode_word(word: &str, radix: usize) -> Option<usize> {
    word.chars().try_fold(0usize, |acc, ch| {
        let digit = ALPHABET.find(ch).filter(|d| *d < radix)?;
        acc.checked_mul(radix)?.checked_add(digit)
    })
}

fn unescape_js_single_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next @ ('\'' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
