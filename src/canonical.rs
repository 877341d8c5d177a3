//! Canonical JSON encoding used as the block hashing input.
//!
//! The byte layout matches what existing DocuChain ledgers were hashed with:
//! sorted keys, `", "` and `": "` separators, ASCII-only string escapes and
//! shortest round-trip float formatting with a mandatory fractional part.
//! Any deviation here changes every block hash and invalidates stored chains.

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

/// `serde_json` formatter producing the canonical byte layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_float(value).as_bytes())
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut ascii_start = 0;
        for (pos, ch) in fragment.char_indices() {
            // DEL is escaped along with everything outside printable ASCII.
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(fragment[ascii_start..pos].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                writer.write_all(format!("\\u{:04x}", unit).as_bytes())?;
            }
            ascii_start = pos + ch.len_utf8();
        }
        writer.write_all(fragment[ascii_start..].as_bytes())
    }
}

/// Serializes `value` with [`CanonicalFormatter`].
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Formats a finite float as its shortest round-trip decimal.
///
/// Fixed notation is used for decimal exponents in `[-4, 16)` and always
/// carries a fractional part (`1700000000.0`); anything else is scientific
/// with a signed, at least two digit exponent (`1e+16`, `1.5e-05`).
pub fn format_float(value: f64) -> String {
    // LowerExp yields the shortest round-trip digits, e.g. "1.7000000005e9".
    let sci = format!("{:e}", value);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return sci;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    if !(-4..16).contains(&exponent) {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let body = if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            format!("{}{}.0", digits, "0".repeat(int_len - digits.len()))
        } else {
            format!("{}.{}", &digits[..int_len], &digits[int_len..])
        }
    } else {
        format!("0.{}{}", "0".repeat((-exponent - 1) as usize), digits)
    };
    format!("{}{}", sign, body)
}
