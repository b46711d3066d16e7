//! Positional field scanner
//!
//! Walks a payload left to right, converting one field per call and counting
//! how many conversions succeeded. The first failed conversion stops the
//! scan: every later call fails and leaves its target untouched, so a
//! decoder can describe a whole record and check the count once at the end.
//! Every field is length-checked against its bound; oversized input fails
//! the conversion instead of being truncated.

use std::net::Ipv4Addr;
use std::str::FromStr;

use super::{ParseError, FIELD_ABSENT, FIELD_DELIM};
use crate::types::MacAddr;

/// Longest textual hardware address (`AA:BB:CC:DD:EE:FF`)
pub const MAC_STR_LEN: usize = 17;

pub struct Scanner<'a> {
    rest: &'a str,
    scanned: usize,
    stopped: bool,
    overflow: bool,
    invalid: Option<ParseError>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            scanned: 0,
            stopped: false,
            overflow: false,
            invalid: None,
        }
    }

    /// Number of fields converted so far
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Unconsumed input
    pub fn remainder(&self) -> &'a str {
        self.rest
    }

    /// Check that at least `required` fields were converted.
    ///
    /// A short scan reports the conversion that stopped it when that was an
    /// invalid address or an oversized field.
    pub fn finish(&mut self, header: &'static str, required: usize) -> Result<usize, ParseError> {
        if self.scanned >= required {
            return Ok(self.scanned);
        }
        if let Some(err) = self.invalid.take() {
            return Err(err);
        }
        if self.overflow {
            return Err(ParseError::FieldTooLong { header });
        }
        Err(ParseError::TooFewFields {
            header,
            scanned: self.scanned,
            required,
        })
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
    }

    fn stop(&mut self) -> bool {
        self.stopped = true;
        false
    }

    fn accept(&mut self, used: usize) -> bool {
        self.rest = &self.rest[used..];
        self.scanned += 1;
        true
    }

    /// Signed or unsigned decimal integer
    pub fn int<T: FromStr>(&mut self, out: &mut T) -> bool {
        if self.stopped {
            return false;
        }
        self.skip_ws();
        let len = numeric_prefix(self.rest, false);
        match self.rest[..len].parse() {
            Ok(v) => {
                *out = v;
                self.accept(len)
            }
            Err(_) => self.stop(),
        }
    }

    /// Integer read as a flag (non-zero is true)
    pub fn flag(&mut self, out: &mut bool) -> bool {
        let mut raw = 0i32;
        if self.int(&mut raw) {
            *out = raw != 0;
            true
        } else {
            false
        }
    }

    /// Decimal floating point number
    pub fn float<T: FromStr>(&mut self, out: &mut T) -> bool {
        if self.stopped {
            return false;
        }
        self.skip_ws();
        let len = numeric_prefix(self.rest, true);
        match self.rest[..len].parse() {
            Ok(v) => {
                *out = v;
                self.accept(len)
            }
            Err(_) => self.stop(),
        }
    }

    /// One or two hex digits
    pub fn hex_octet(&mut self, out: &mut u8) -> bool {
        if self.stopped {
            return false;
        }
        self.skip_ws();
        let len = self
            .rest
            .bytes()
            .take(2)
            .take_while(u8::is_ascii_hexdigit)
            .count();
        if len == 0 {
            return self.stop();
        }
        match u8::from_str_radix(&self.rest[..len], 16) {
            Ok(v) => {
                *out = v;
                self.accept(len)
            }
            Err(_) => self.stop(),
        }
    }

    /// Exact character, no leading whitespace skipped. Not counted.
    pub fn literal(&mut self, ch: char) -> bool {
        self.literal_any(&[ch])
    }

    /// Any one of `set`. Not counted.
    pub fn literal_any(&mut self, set: &[char]) -> bool {
        if self.stopped {
            return false;
        }
        match self.rest.strip_prefix(set) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => self.stop(),
        }
    }

    /// Whitespace-delimited word of at most `max` bytes
    pub fn word(&mut self, max: usize, out: &mut &'a str) -> bool {
        if self.stopped {
            return false;
        }
        self.skip_ws();
        let len = self
            .rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(self.rest.len());
        if len == 0 {
            return self.stop();
        }
        if len > max {
            self.overflow = true;
            return self.stop();
        }
        *out = &self.rest[..len];
        self.accept(len)
    }

    /// Textual hardware address. Counts as one field; a word that is not a
    /// valid address stops the scan.
    pub fn mac(&mut self, out: &mut MacAddr) -> bool {
        let mut text = "";
        if !self.word(MAC_STR_LEN, &mut text) {
            return false;
        }
        match text.parse() {
            Ok(mac) => {
                *out = mac;
                true
            }
            Err(err) => {
                self.scanned -= 1;
                self.invalid = Some(err);
                self.stop()
            }
        }
    }

    /// Hardware address as six hex octets, each counted as a field
    pub fn mac_octets(&mut self, out: &mut MacAddr) -> bool {
        let mut bytes = [0u8; 6];
        let mut ok = self.hex_octet(&mut bytes[0]);
        for byte in bytes[1..].iter_mut() {
            ok = ok && self.literal(':') && self.hex_octet(byte);
        }
        if ok {
            *out = MacAddr::new(bytes);
        }
        ok
    }

    /// Dotted IPv4 address, each octet counted as a field. `out` is only
    /// written when all four octets convert.
    pub fn ipv4(&mut self, out: &mut Ipv4Addr) -> bool {
        let mut octets = [0u8; 4];
        let mut ok = self.int(&mut octets[0]);
        for octet in octets[1..].iter_mut() {
            ok = ok && self.literal('.') && self.int(octet);
        }
        if ok {
            *out = Ipv4Addr::from(octets);
        }
        ok
    }

    /// `\x01`-bracketed free text of at most `max` bytes. An empty field or
    /// one starting with `\x02` yields `None`.
    pub fn delimited(&mut self, max: usize, out: &mut Option<String>) -> bool {
        if self.stopped {
            return false;
        }
        self.skip_ws();
        let Some(body) = self.rest.strip_prefix(FIELD_DELIM) else {
            return self.stop();
        };
        let Some(end) = body.find(FIELD_DELIM) else {
            return self.stop();
        };
        let content = &body[..end];
        if content.len() > max {
            self.overflow = true;
            return self.stop();
        }
        *out = if content.is_empty() || content.starts_with(FIELD_ABSENT) {
            None
        } else {
            Some(content.to_string())
        };
        // opening delimiter + content + closing delimiter
        let used = self.rest.len() - body.len() + end + FIELD_DELIM.len_utf8();
        self.accept(used)
    }

    /// Everything up to the end of the line, at least one and at most `max`
    /// bytes. Leading whitespace is kept.
    pub fn rest_of_line(&mut self, max: usize, out: &mut String) -> bool {
        if self.stopped {
            return false;
        }
        let len = self.rest.find('\n').unwrap_or(self.rest.len());
        if len == 0 {
            return self.stop();
        }
        if len > max {
            self.overflow = true;
            return self.stop();
        }
        *out = self.rest[..len].to_string();
        self.accept(len)
    }
}

/// Length of the numeric literal at the start of `s`
fn numeric_prefix(s: &str, float: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    if float && bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        // nan / inf
        return i + bytes[i..].iter().take_while(|b| b.is_ascii_alphabetic()).count();
    }
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    i += digits(i);
    if float {
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            i += digits(i);
        }
        if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
            let mut j = i + 1;
            if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
                j += 1;
            }
            let exp = digits(j);
            if exp > 0 {
                i = j + exp;
            }
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ints_stop_at_punctuation() {
        let mut s = Scanner::new("3.1.9 1060000000");
        let (mut major, mut minor, mut tiny, mut start) = (0i32, 0i32, 0i32, 0i64);
        s.int(&mut major);
        s.literal('.');
        s.int(&mut minor);
        s.literal('.');
        s.int(&mut tiny);
        s.int(&mut start);
        assert_eq!(s.scanned(), 4);
        assert_eq!((major, minor, tiny, start), (3, 1, 9, 1060000000));
    }

    #[test]
    fn test_first_failure_stops_scan() {
        let mut s = Scanner::new("1 x 3");
        let (mut a, mut b, mut c) = (0i32, 0i32, 0i32);
        assert!(s.int(&mut a));
        assert!(!s.int(&mut b));
        assert!(!s.int(&mut c));
        assert_eq!(s.scanned(), 1);
        assert_eq!(c, 0);
        assert!(matches!(
            s.finish("*TEST", 3),
            Err(ParseError::TooFewFields { scanned: 1, required: 3, .. })
        ));
    }

    #[test]
    fn test_floats() {
        let mut s = Scanner::new("-122.5 45 1.5e2 nan");
        let (mut a, mut b, mut c, mut d) = (0f32, 0f32, 0f64, 0f32);
        s.float(&mut a);
        s.float(&mut b);
        s.float(&mut c);
        s.float(&mut d);
        assert_eq!(s.scanned(), 4);
        assert_eq!(a, -122.5);
        assert_eq!(b, 45.0);
        assert_eq!(c, 150.0);
        assert!(d.is_nan());
    }

    #[test]
    fn test_delimited_fields() {
        let mut s = Scanner::new("\x01My SSID\x01 \x01\x02\x01 7");
        let mut ssid = None;
        let mut beacon = Some("stale".to_string());
        let mut n = 0i32;
        s.delimited(255, &mut ssid);
        s.delimited(255, &mut beacon);
        s.int(&mut n);
        assert_eq!(s.scanned(), 3);
        assert_eq!(ssid.as_deref(), Some("My SSID"));
        assert_eq!(beacon, None);
        assert_eq!(n, 7);
    }

    #[test]
    fn test_delimited_rejects_oversized() {
        let payload = format!("\x01{}\x01", "a".repeat(33));
        let mut s = Scanner::new(&payload);
        let mut ssid = None;
        assert!(!s.delimited(32, &mut ssid));
        assert_eq!(ssid, None);
        assert_eq!(s.finish("*PACKET", 1), Err(ParseError::FieldTooLong { header: "*PACKET" }));
    }

    #[test]
    fn test_unterminated_delimited_field_fails() {
        let mut s = Scanner::new("\x01no end");
        let mut field = None;
        assert!(!s.delimited(255, &mut field));
        assert_eq!(s.scanned(), 0);
    }

    #[test]
    fn test_ipv4_counts_each_octet() {
        let mut s = Scanner::new("10.0.0");
        let mut ip = Ipv4Addr::UNSPECIFIED;
        assert!(!s.ipv4(&mut ip));
        assert_eq!(s.scanned(), 3);
        assert_eq!(ip, Ipv4Addr::UNSPECIFIED);

        let mut s = Scanner::new(" 192.168.1.254");
        assert!(s.ipv4(&mut ip));
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 254));
    }

    #[test]
    fn test_ipv4_rejects_large_octet() {
        let mut s = Scanner::new("10.0.0.300");
        let mut ip = Ipv4Addr::UNSPECIFIED;
        assert!(!s.ipv4(&mut ip));
        assert_eq!(s.scanned(), 3);
    }

    #[test]
    fn test_mac_word_and_octets() {
        let mut s = Scanner::new("AA:BB:CC:DD:EE:FF 0:1:2:3:4:5");
        let mut a = MacAddr::ZERO;
        let mut b = MacAddr::ZERO;
        assert!(s.mac(&mut a));
        assert!(s.mac_octets(&mut b));
        assert_eq!(s.scanned(), 7);
        assert_eq!(a.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(b.as_bytes(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_invalid_mac_reported() {
        let mut s = Scanner::new("ZZ:BB:CC:DD:EE:FF 1");
        let mut mac = MacAddr::ZERO;
        assert!(!s.mac(&mut mac));
        assert_eq!(s.scanned(), 0);
        assert!(matches!(s.finish("*REMOVE", 1), Err(ParseError::InvalidMac(_))));
    }

    #[test]
    fn test_word_too_long() {
        let mut s = Scanner::new("AA:BB:CC:DD:EE:FF:00");
        let mut mac = MacAddr::ZERO;
        assert!(!s.mac(&mut mac));
        assert_eq!(s.finish("*REMOVE", 1), Err(ParseError::FieldTooLong { header: "*REMOVE" }));
    }

    #[test]
    fn test_rest_of_line_keeps_spaces() {
        let mut s = Scanner::new("  two words ");
        let mut text = String::new();
        assert!(s.rest_of_line(1023, &mut text));
        assert_eq!(text, "  two words ");

        let mut s = Scanner::new("");
        assert!(!s.rest_of_line(1023, &mut text));
    }
}
