//! NUMERIC codec: arbitrary-precision decimal, plus the NaN/Infinity
//! special values PostgreSQL's binary NUMERIC format can carry.
//!
//! The binary layout is `ndigits:i16, weight:i16, sign:u16, dscale:u16,
//! digits:[u16; ndigits]` where each digit is a base-10000 "chunk" of the
//! decimal representation (§4.2).

use rust_decimal::Decimal;

use crate::error::{Error, Result, SqlState};
use crate::protocol::codec::{read_i16, read_u16};

const NBASE: i64 = 10_000;
const SIGN_POS: u16 = 0x0000;
const SIGN_NEG: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_PINF: u16 = 0xD000;
const SIGN_NINF: u16 = 0xF000;

/// PostgreSQL NUMERIC value, including the special values the type supports
/// beyond ordinary finite decimals.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Finite(Decimal),
    NaN,
    PositiveInfinity,
    NegativeInfinity,
}

fn decode_err(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::InvalidTextRepresentation, msg)
}

pub fn decode_text(bytes: &[u8]) -> Result<Numeric> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| decode_err(format!("numeric: invalid UTF-8: {e}")))?
        .trim();
    match text {
        "NaN" => Ok(Numeric::NaN),
        "Infinity" | "inf" => Ok(Numeric::PositiveInfinity),
        "-Infinity" | "-inf" => Ok(Numeric::NegativeInfinity),
        _ => Decimal::from_str_exact(text)
            .map(Numeric::Finite)
            .map_err(|e| decode_err(format!("invalid numeric literal {text:?}: {e}"))),
    }
}

pub fn encode_text(value: &Numeric) -> Vec<u8> {
    match value {
        Numeric::Finite(d) => d.to_string().into_bytes(),
        Numeric::NaN => b"NaN".to_vec(),
        Numeric::PositiveInfinity => b"Infinity".to_vec(),
        Numeric::NegativeInfinity => b"-Infinity".to_vec(),
    }
}

pub fn decode_binary(bytes: &[u8]) -> Result<Numeric> {
    let (ndigits, rest) = read_i16(bytes).map_err(|_| decode_err("numeric: truncated header"))?;
    let (weight, rest) = read_i16(rest).map_err(|_| decode_err("numeric: truncated header"))?;
    let (sign, rest) = read_u16(rest).map_err(|_| decode_err("numeric: truncated header"))?;
    let (dscale, mut rest) = read_u16(rest).map_err(|_| decode_err("numeric: truncated header"))?;

    match sign {
        SIGN_NAN => return Ok(Numeric::NaN),
        SIGN_PINF => return Ok(Numeric::PositiveInfinity),
        SIGN_NINF => return Ok(Numeric::NegativeInfinity),
        SIGN_POS | SIGN_NEG => {}
        other => return Err(decode_err(format!("numeric: unknown sign 0x{other:04x}"))),
    }

    if ndigits < 0 {
        return Err(decode_err("numeric: negative digit count"));
    }
    let mut digits = Vec::with_capacity(ndigits as usize);
    for _ in 0..ndigits {
        let (digit, remaining) =
            read_u16(rest).map_err(|_| decode_err("numeric: truncated digit array"))?;
        if digit as i64 >= NBASE {
            return Err(decode_err("numeric: digit out of base-10000 range"));
        }
        digits.push(digit);
        rest = remaining;
    }

    let text = digits_to_decimal_string(weight, &digits, dscale, sign == SIGN_NEG);
    let decimal = Decimal::from_str_exact(&text)
        .map_err(|e| decode_err(format!("numeric: binary payload produced invalid decimal: {e}")))?;
    Ok(Numeric::Finite(decimal))
}

pub fn encode_binary(value: &Numeric) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        Numeric::NaN => {
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&SIGN_NAN.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
        }
        Numeric::PositiveInfinity => {
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&SIGN_PINF.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
        }
        Numeric::NegativeInfinity => {
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&0i16.to_be_bytes());
            out.extend_from_slice(&SIGN_NINF.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
        }
        Numeric::Finite(d) => {
            let dscale = d.scale() as u16;
            let negative = d.is_sign_negative() && !d.is_zero();
            let magnitude = d.abs();
            let mantissa = magnitude.mantissa().unsigned_abs();

            if mantissa == 0 {
                out.extend_from_slice(&0i16.to_be_bytes());
                out.extend_from_slice(&0i16.to_be_bytes());
                out.extend_from_slice(&SIGN_POS.to_be_bytes());
                out.extend_from_slice(&dscale.to_be_bytes());
                return out;
            }

            let (weight, digits) = decimal_to_numeric_digits(&mantissa.to_string(), d.scale());

            out.extend_from_slice(&(digits.len() as i16).to_be_bytes());
            out.extend_from_slice(&weight.to_be_bytes());
            out.extend_from_slice(&(if negative { SIGN_NEG } else { SIGN_POS }).to_be_bytes());
            out.extend_from_slice(&dscale.to_be_bytes());
            for digit in digits {
                out.extend_from_slice(&digit.to_be_bytes());
            }
        }
    }
    out
}

/// Reconstruct the decimal-string form of a NUMERIC from its base-10000
/// digit array, weight, and display scale.
fn digits_to_decimal_string(weight: i16, digits: &[u16], dscale: u16, negative: bool) -> String {
    if digits.is_empty() {
        return if dscale == 0 {
            "0".to_string()
        } else {
            format!("0.{}", "0".repeat(dscale as usize))
        };
    }

    // Expand each base-10000 digit to its 4-character decimal group, then
    // slice out the integer and fractional parts around the weight.
    let mut groups: String = digits.iter().map(|d| format!("{d:04}")).collect();
    let int_groups = weight as i32 + 1;

    let (int_part, frac_part) = if int_groups <= 0 {
        let leading_zero_groups = "0".repeat((-int_groups) as usize * 4);
        ("0".to_string(), leading_zero_groups + &groups)
    } else {
        let needed = int_groups as usize * 4;
        while groups.len() < needed {
            groups.push_str("0000");
        }
        let frac = groups[needed..].to_string();
        (groups[..needed].to_string(), frac)
    };

    let mut frac_part = frac_part;
    frac_part.truncate(dscale as usize);
    while frac_part.len() < dscale as usize {
        frac_part.push('0');
    }

    let trimmed_int = int_part.trim_start_matches('0');
    let int_part = if trimmed_int.is_empty() { "0" } else { trimmed_int };

    let mut s = String::new();
    if negative {
        s.push('-');
    }
    s.push_str(int_part);
    if dscale > 0 {
        s.push('.');
        s.push_str(&frac_part);
    }
    s
}

/// Split a non-zero magnitude's decimal digit string (no sign, no point)
/// plus its display `scale` into NUMERIC's `(weight, digits)` pair,
/// stripping insignificant leading/trailing base-10000 groups exactly the
/// way PostgreSQL's `numeric` type does internally.
fn decimal_to_numeric_digits(digit_str: &str, scale: u32) -> (i16, Vec<u16>) {
    let scale = scale as i32;
    let int_len = digit_str.len() as i32 - scale;

    let (int_part, frac_part) = if int_len > 0 {
        (digit_str[..int_len as usize].to_string(), digit_str[int_len as usize..].to_string())
    } else {
        (String::new(), "0".repeat((-int_len) as usize) + digit_str)
    };

    let mut int_padded = int_part;
    while int_padded.len() % 4 != 0 {
        int_padded.insert(0, '0');
    }
    let mut frac_padded = frac_part;
    while frac_padded.len() % 4 != 0 {
        frac_padded.push('0');
    }

    let int_groups = int_padded.len() / 4;
    let all = int_padded + &frac_padded;
    let mut full_digits: Vec<u16> = all
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap().parse::<u16>().unwrap())
        .collect();

    let mut weight = int_groups as i32 - 1;

    while full_digits.first() == Some(&0) {
        full_digits.remove(0);
        weight -= 1;
    }
    while full_digits.last() == Some(&0) {
        full_digits.pop();
    }

    if full_digits.is_empty() {
        return (0, Vec::new());
    }

    (weight as i16, full_digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_text(s: &str) {
        let decoded = decode_text(s.as_bytes()).unwrap();
        let reencoded = encode_text(&decoded);
        assert_eq!(std::str::from_utf8(&reencoded).unwrap(), s);
    }

    #[test]
    fn text_roundtrip_simple() {
        roundtrip_text("123.456");
        roundtrip_text("0");
        roundtrip_text("-42.5");
        roundtrip_text("0.0001");
    }

    #[test]
    fn text_roundtrip_specials() {
        roundtrip_text("NaN");
        roundtrip_text("Infinity");
        roundtrip_text("-Infinity");
    }

    fn roundtrip_binary(s: &str) {
        let value = Numeric::Finite(Decimal::from_str_exact(s).unwrap());
        let bytes = encode_binary(&value);
        let decoded = decode_binary(&bytes).unwrap();
        assert_eq!(decoded, value, "roundtrip failed for {s}");
    }

    #[test]
    fn binary_roundtrip_integers() {
        roundtrip_binary("0");
        roundtrip_binary("1");
        roundtrip_binary("12345");
        roundtrip_binary("-12345");
    }

    #[test]
    fn binary_roundtrip_decimals() {
        roundtrip_binary("123.456");
        roundtrip_binary("0.0001");
        roundtrip_binary("-0.5");
        roundtrip_binary("100.00");
        roundtrip_binary("99999.99999");
    }

    #[test]
    fn binary_roundtrip_specials() {
        assert_eq!(decode_binary(&encode_binary(&Numeric::NaN)).unwrap(), Numeric::NaN);
        assert_eq!(
            decode_binary(&encode_binary(&Numeric::PositiveInfinity)).unwrap(),
            Numeric::PositiveInfinity
        );
        assert_eq!(
            decode_binary(&encode_binary(&Numeric::NegativeInfinity)).unwrap(),
            Numeric::NegativeInfinity
        );
    }

    #[test]
    fn cross_format_equivalence() {
        for s in ["123.456", "0.0001", "-0.5", "100.00", "0"] {
            let via_text = decode_text(encode_text(&decode_text(s.as_bytes()).unwrap()).as_slice()).unwrap();
            let value = Numeric::Finite(Decimal::from_str_exact(s).unwrap());
            let via_binary = decode_binary(&encode_binary(&value)).unwrap();
            assert_eq!(via_text, via_binary, "mismatch for {s}");
        }
    }
}
