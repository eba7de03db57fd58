/*
 * Responsibility
 * - Deterministic hex encoders used to build canonical messages
 * - Shape predicates for hex strings, addresses, signatures and private keys
 *
 * Every predicate accepts an optional leading `0x`.
 */

const ADDRESS_HEX_LEN: usize = 40;
const SIGNATURE_HEX_LEN: usize = 130;
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Lowercase hex of the UTF-8 bytes of `s`. Empty in, empty out.
pub fn hex_encode_utf8(s: &str) -> String {
    hex::encode(s.as_bytes())
}

/// Base-16 without `0x`, left-padded to an even number of digits.
pub fn int_to_hex(n: u64) -> String {
    let hex = format!("{:x}", n);
    if hex.len() % 2 == 0 {
        hex
    } else {
        format!("0{}", hex)
    }
}

pub fn hex_to_int(s: &str) -> Option<u64> {
    let digits = remove_0x(s);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

pub fn remove_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

pub fn add_0x(s: &str) -> String {
    if s.starts_with("0x") {
        s.to_string()
    } else {
        format!("0x{}", s)
    }
}

pub fn is_hex(s: &str) -> bool {
    let digits = remove_0x(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// True for an empty string or a hex string made only of zeros.
pub fn is_empty_hex(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    is_hex(s) && remove_0x(s).chars().all(|c| c == '0')
}

pub fn address_valid(s: &str) -> bool {
    hex_of_len(s, ADDRESS_HEX_LEN)
}

pub fn signature_valid(s: &str) -> bool {
    hex_of_len(s, SIGNATURE_HEX_LEN)
}

pub fn private_key_valid(s: &str) -> bool {
    hex_of_len(s, PRIVATE_KEY_HEX_LEN)
}

/// Current UTC unix time in seconds.
pub fn current_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// A timestamp is any strictly positive number of seconds.
pub fn timestamp_valid(raw: &str) -> bool {
    raw.trim().parse::<u64>().map(|v| v > 0).unwrap_or(false)
}

fn hex_of_len(s: &str, len: usize) -> bool {
    is_hex(s) && !is_empty_hex(s) && remove_0x(s).len() == len
}
