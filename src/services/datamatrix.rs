//! Product name derivation from scanned DataMatrix payloads.
//!
//! A payload is a run of letter-prefixed fields with no delimiter, e.g.
//! `P1234567890ABE12C020100007000000A2`. Three of them make up the product
//! name:
//!
//! - `P` field: first 10 characters after `P` (needs at least 10)
//! - `E` field: first 2 characters after `E` (needs at least 2)
//! - `C` field: after `C` + digit, the 3 characters starting 11 from the end
//!
//! Missing fields contribute nothing; the result is `P + E + C`.

use once_cell::sync::Lazy;
use regex::Regex;

const P_FIELD_LEN: usize = 10;
const E_FIELD_LEN: usize = 2;
const C_WINDOW_FROM_END: usize = 11;
const C_WINDOW_LEN: usize = 3;

static P_FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"P([A-Za-z0-9]{10,})").unwrap());

static E_FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"E([A-Za-z0-9]{2,})").unwrap());

// Requiring a digit after `C` skips `C`s that sit inside the P field's run.
static C_FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"C([0-9][A-Za-z0-9]*)").unwrap());

/// Derive a product name from a raw scan. Never fails; no match yields `""`.
pub fn extract_product_name(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return String::new(),
    };

    let mut name = String::with_capacity(P_FIELD_LEN + E_FIELD_LEN + C_WINDOW_LEN);
    name.push_str(p_field(raw));
    name.push_str(e_field(raw));
    name.push_str(c_field(raw));
    name
}

fn capture<'a>(re: &Regex, raw: &'a str) -> Option<&'a str> {
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn p_field(raw: &str) -> &str {
    capture(&P_FIELD_RE, raw).map_or("", |body| &body[..P_FIELD_LEN])
}

fn e_field(raw: &str) -> &str {
    capture(&E_FIELD_RE, raw).map_or("", |body| &body[..E_FIELD_LEN])
}

fn c_field(raw: &str) -> &str {
    match capture(&C_FIELD_RE, raw) {
        Some(body) if body.len() >= C_WINDOW_FROM_END => {
            let start = body.len() - C_WINDOW_FROM_END;
            &body[start..start + C_WINDOW_LEN]
        }
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_missing_input_yield_empty() {
        assert_eq!(extract_product_name(None), "");
        assert_eq!(extract_product_name(Some("")), "");
    }

    #[test]
    fn full_payload_concatenates_fields_in_order() {
        let raw = "P1234567890ABE12C020100007000000A2";
        assert_eq!(extract_product_name(Some(raw)), "123456789012007");
    }

    #[test]
    fn c_field_uses_window_eleven_from_end() {
        let raw = "xxP0123456789 E99 C020100007000000A2";
        assert_eq!(c_field(raw), "007");
        assert_eq!(extract_product_name(Some(raw)), "012345678999007");
    }

    #[test]
    fn short_c_field_contributes_nothing() {
        assert_eq!(c_field("C0123456789"), "");
        assert_eq!(c_field("C01234567890"), "012");
    }

    #[test]
    fn c_without_digit_is_skipped() {
        // `CX` inside the P run does not qualify; the later `C9...` does.
        let raw = "PCXAB123456 C98765432109876";
        assert_eq!(c_field(raw), "654");
    }

    #[test]
    fn p_field_needs_ten_characters() {
        assert_eq!(p_field("P123456789"), "");
        assert_eq!(p_field("P123456789-0"), "");
        assert_eq!(p_field("P1234567890123"), "1234567890");
    }

    #[test]
    fn e_field_takes_first_two() {
        assert_eq!(e_field("E1"), "");
        assert_eq!(e_field("E1234"), "12");
    }

    #[test]
    fn unmatched_input_yields_empty() {
        assert_eq!(extract_product_name(Some("hello world")), "");
        assert_eq!(extract_product_name(Some("p1234567890 e12 c020100007000000A2")), "");
    }

    #[test]
    fn extraction_does_not_reexpand_its_output() {
        let once = extract_product_name(Some("P1234567890ABE12C020100007000000A2"));
        assert_eq!(extract_product_name(Some(&once)), "");
    }
}
