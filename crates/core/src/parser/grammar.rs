//! Grammar productions, one per PDF construct.
//!
//! A production matches a prefix of the lookahead window and converts the
//! matched bytes into a [`Token`]. Composite contexts list productions by
//! [`ProductionId`]; ids are resolved through a registry built on first
//! use, so a context may name its own production or one declared later.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::model::composite::{Fragment, Token, is_whitespace};
use crate::model::node::{
    Dictionary, IndirectObject, Kind, LiteralString, ObjRef, Stream, Text, Value, WsToken,
    XrefEntry, XrefSpec,
};

/// Symbolic name of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductionId {
    Header,
    Comment,
    Whitespace,
    Name,
    Number,
    Boolean,
    Null,
    HexString,
    Reference,
    LiteralString,
    StringParen,
    StringEscape,
    StringChars,
    List,
    Dictionary,
    Stream,
    StreamData,
    IndirectObject,
    XrefTable,
    XrefSpec,
    XrefEntry,
    XrefOffset,
    Trailer,
    EndOfFile,
}

impl ProductionId {
    pub const ALL: [ProductionId; 24] = [
        ProductionId::Header,
        ProductionId::Comment,
        ProductionId::Whitespace,
        ProductionId::Name,
        ProductionId::Number,
        ProductionId::Boolean,
        ProductionId::Null,
        ProductionId::HexString,
        ProductionId::Reference,
        ProductionId::LiteralString,
        ProductionId::StringParen,
        ProductionId::StringEscape,
        ProductionId::StringChars,
        ProductionId::List,
        ProductionId::Dictionary,
        ProductionId::Stream,
        ProductionId::StreamData,
        ProductionId::IndirectObject,
        ProductionId::XrefTable,
        ProductionId::XrefSpec,
        ProductionId::XrefEntry,
        ProductionId::XrefOffset,
        ProductionId::Trailer,
        ProductionId::EndOfFile,
    ];

    /// Resolve to the concrete production.
    pub fn production(self) -> &'static Production {
        &REGISTRY[self as usize]
    }
}

/// Candidate productions of a composite, in priority order.
pub fn context(kind: Kind) -> &'static [ProductionId] {
    use ProductionId as P;
    match kind {
        Kind::Document => &[
            P::Header,
            P::Comment,
            P::IndirectObject,
            P::Whitespace,
            P::XrefTable,
            P::Trailer,
            P::XrefOffset,
            P::EndOfFile,
        ],
        Kind::IndirectObject => &[
            P::Boolean,
            P::Dictionary,
            P::Stream,
            P::List,
            P::Whitespace,
            P::Reference,
            P::Number,
            P::Null,
            P::HexString,
            P::Name,
            P::LiteralString,
        ],
        Kind::Dictionary => &[
            P::LiteralString,
            P::Boolean,
            P::Whitespace,
            P::Name,
            P::Reference,
            P::Number,
            P::HexString,
            P::List,
            P::Null,
            P::Dictionary,
        ],
        Kind::List => &[
            P::LiteralString,
            P::Boolean,
            P::Whitespace,
            P::Name,
            P::Reference,
            P::Number,
            P::HexString,
            P::Null,
            P::List,
            P::Dictionary,
        ],
        Kind::LiteralString => &[P::StringParen, P::StringEscape, P::StringChars],
        Kind::Stream => &[P::StreamData],
        Kind::XrefTable => &[P::XrefSpec, P::XrefEntry],
        Kind::Trailer => &[P::Dictionary, P::XrefOffset, P::Whitespace],
        _ => &[],
    }
}

/// How a production recognizes its bytes.
#[derive(Debug)]
pub enum Matcher {
    /// Anchored byte regex.
    Regex(Regex),
    /// `%` line that is neither a header nor an end-of-file marker.
    Comment,
    /// Everything up to where a stream terminator could start.
    StreamData,
}

#[derive(Debug)]
pub struct Production {
    pub id: ProductionId,
    pub name: &'static str,
    /// Human-readable pattern, reported when nothing matches.
    pub pattern: &'static str,
    /// Noise tokens that trace sinks usually suppress.
    pub trivial: bool,
    matcher: Matcher,
}

/// Longest stream terminator (`endstream\r\n`) minus one byte: a chunk of
/// stream data never swallows the start of a terminator that has not fully
/// arrived in the window.
const STREAM_GUARD: usize = b"endstream\r\n".len() - 1;

const WS: &str = r"[ \r\n\t\x0c\x00]";

static REGISTRY: Lazy<Vec<Production>> = Lazy::new(|| {
    ProductionId::ALL
        .iter()
        .map(|&id| Production::build(id))
        .collect()
});

impl Production {
    fn build(id: ProductionId) -> Self {
        use ProductionId as P;
        let (name, pattern, trivial) = match id {
            P::Header => ("Header", r"%PDF-[12]\.\d", false),
            P::Comment => ("Comment", "%(?!PDF|%EOF).*EOL", false),
            P::Whitespace => ("Whitespace", r"[ \r\n\t\x0c\x00]+", true),
            P::Name => ("Name", r"/[^ \r\n\t\x0c\x00/\[\]<>(){}%]*", false),
            P::Number => ("Number", r"[+-]?(?:\d+\.?\d*|\.\d+)", false),
            P::Boolean => ("Boolean", "true|false", false),
            P::Null => ("Null", "null", false),
            P::HexString => ("HexString", r"<[0-9a-fA-F \r\n\t\x0c\x00]*>", false),
            P::Reference => (
                "Reference",
                r"\d{1,10}[ \r\n\t\x0c\x00]+\d{1,10}[ \r\n\t\x0c\x00]+R",
                false,
            ),
            P::LiteralString => ("LiteralString", r"\(", false),
            P::StringParen => ("StringParen", "[()]", true),
            P::StringEscape => ("StringEscape", r"\\(?:[nrtbf()\\]|[0-7]{1,3})", true),
            P::StringChars => ("StringChars", r"[^()\\]+", true),
            P::List => ("List", r"\[", false),
            P::Dictionary => ("Dictionary", "<<", false),
            P::Stream => ("Stream", r"stream(?:\r\n|\r|\n)", false),
            P::StreamData => ("StreamData", "(?s).+ (up to a possible endstream)", true),
            P::IndirectObject => (
                "IndirectObject",
                r"\d{1,10}[ \r\n\t\x0c\x00]+\d{1,10}[ \r\n\t\x0c\x00]+obj",
                false,
            ),
            P::XrefTable => ("XrefTable", r"xref(?:\r\n|\r|\n)", false),
            P::XrefSpec => ("XrefSpec", r"\d{1,10} \d{1,10} *(?:\r\n|\r|\n)", true),
            P::XrefEntry => (
                "XrefEntry",
                r"\d{10} \d{5} [nf][ \r\n\t\x0c\x00]*?(?:\r\n|\r|\n)",
                true,
            ),
            P::XrefOffset => (
                "XrefOffset",
                r"startxref(?:\r\n|\r|\n)\d{1,19}[ \r\n\t\x0c\x00]*?(?:\r\n|\r|\n)",
                false,
            ),
            P::Trailer => ("Trailer", r"trailer(?:\r\n|\r|\n)?", false),
            P::EndOfFile => ("EndOfFile", r"%%EOF(?:\r\n|\r|\n)?", false),
        };

        let matcher = match id {
            P::Comment => Matcher::Comment,
            P::StreamData => Matcher::StreamData,
            _ => Matcher::Regex(
                Regex::new(&format!("(?-u)^(?:{pattern})")).expect("grammar pattern"),
            ),
        };

        Self {
            id,
            name,
            pattern,
            trivial,
            matcher,
        }
    }

    /// Length of the match at the head of `window`, if any. Never zero.
    pub fn matches(&self, window: &[u8], at_eof: bool) -> Option<usize> {
        let len = match &self.matcher {
            Matcher::Regex(re) => re.find(window).map(|m| m.end())?,
            Matcher::Comment => match_comment(window, at_eof)?,
            Matcher::StreamData => {
                if at_eof {
                    window.len()
                } else {
                    window.len().saturating_sub(STREAM_GUARD)
                }
            }
        };
        (len > 0).then_some(len)
    }

    /// Convert bytes previously accepted by [`Production::matches`].
    pub fn convert(&self, raw: &[u8]) -> Token {
        use ProductionId as P;
        let value = match self.id {
            P::Header => Value::Header(String::from_utf8_lossy(&raw[5..]).into_owned()),
            P::Comment => Value::Comment(convert_comment(raw)),
            P::Whitespace => Value::Whitespace(
                raw.iter()
                    .filter_map(|&b| WsToken::from_byte(b))
                    .collect(),
            ),
            P::Name => Value::Name(decode_name(&raw[1..])),
            P::Number => Value::Number(String::from_utf8_lossy(raw).into_owned()),
            P::Boolean => Value::Boolean(raw == b"true"),
            P::Null => Value::Null,
            P::HexString => Value::HexString(Text::from_bytes(decode_hex(raw))),
            P::Reference => {
                let f = fields(raw);
                Value::Reference(ObjRef::new(decimal(f[0]), decimal(f[1])))
            }
            P::LiteralString => Value::LiteralString(LiteralString::default()),
            P::StringParen => return Token::Fragment(Fragment::Paren(raw[0])),
            P::StringEscape => return Token::Fragment(Fragment::Escape(decode_escape(&raw[1..]))),
            P::StringChars => return Token::Fragment(Fragment::Chars(raw.to_vec())),
            P::List => Value::List(Vec::new()),
            P::Dictionary => Value::Dictionary(Dictionary::default()),
            P::Stream => Value::Stream(Stream::open()),
            P::StreamData => return Token::Fragment(Fragment::StreamData(raw.to_vec())),
            P::IndirectObject => {
                let f = fields(raw);
                Value::IndirectObject(IndirectObject {
                    reference: ObjRef::new(decimal(f[0]), decimal(f[1])),
                    object: None,
                    stream: None,
                })
            }
            P::XrefTable => Value::XrefTable(Vec::new()),
            P::XrefSpec => {
                let f = fields(raw);
                Value::XrefSpec(XrefSpec {
                    first: decimal(f[0]),
                    count: decimal(f[1]),
                })
            }
            P::XrefEntry => {
                let f = fields(raw);
                Value::XrefEntry(XrefEntry {
                    offset: decimal(f[0]),
                    generation: decimal(f[1]),
                    in_use: f[2] == b"n",
                })
            }
            P::XrefOffset => Value::XrefOffset(decimal(fields(raw)[1])),
            P::Trailer => Value::Trailer(Vec::new()),
            P::EndOfFile => Value::EndOfFile(String::from_utf8_lossy(raw).into_owned()),
        };
        Token::Value(value)
    }
}

fn match_comment(window: &[u8], at_eof: bool) -> Option<usize> {
    if window.first() != Some(&b'%') || window.starts_with(b"%PDF") || window.starts_with(b"%%EOF")
    {
        return None;
    }
    match window.iter().position(|&b| b == b'\r' || b == b'\n') {
        Some(i) if window[i..].starts_with(b"\r\n") => Some(i + 2),
        // A lone CR at the window edge may be the first half of CRLF.
        Some(i) if window[i] == b'\r' && i + 1 == window.len() && !at_eof => None,
        Some(i) => Some(i + 1),
        None => at_eof.then_some(window.len()),
    }
}

fn convert_comment(raw: &[u8]) -> Text {
    match std::str::from_utf8(raw) {
        Ok(text) => Text::Utf8(text.trim_start_matches('%').trim_end().to_string()),
        Err(_) => Text::Raw(raw.to_vec()),
    }
}

/// Split on PDF whitespace, dropping empty pieces.
fn fields(raw: &[u8]) -> Vec<&[u8]> {
    raw.split(|&b| is_whitespace(b))
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Decimal digits to an integer. Patterns bound the digit count, so this
/// only saturates on inputs the grammar never produces.
fn decimal(digits: &[u8]) -> u64 {
    digits
        .iter()
        .filter(|b| b.is_ascii_digit())
        .fold(0u64, |acc, &b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        })
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode `<...>`, skipping whitespace; an odd final digit is padded with 0.
fn decode_hex(raw: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = raw.iter().filter_map(|&c| hex_value(c)).collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

/// Decode a name body, resolving `#xx` escapes.
fn decode_name(body: &[u8]) -> String {
    let mut name = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'#' {
            if let (Some(hi), Some(lo)) = (
                body.get(i + 1).copied().and_then(hex_value),
                body.get(i + 2).copied().and_then(hex_value),
            ) {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        name.push(body[i]);
        i += 1;
    }
    match String::from_utf8(name) {
        Ok(name) => name,
        Err(err) => err.into_bytes().iter().map(|&b| char::from(b)).collect(),
    }
}

/// Decode the part of an escape after the backslash.
fn decode_escape(code: &[u8]) -> u8 {
    match code[0] {
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'b' => 0x08,
        b'f' => 0x0c,
        b'0'..=b'7' => {
            let octal = code
                .iter()
                .fold(0u32, |acc, &d| acc * 8 + u32::from(d - b'0'));
            (octal & 0xff) as u8
        }
        // `(`, `)` and `\` stand for themselves.
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(id: ProductionId, input: &[u8]) -> Option<usize> {
        id.production().matches(input, false)
    }

    fn value(id: ProductionId, raw: &[u8]) -> Value {
        match id.production().convert(raw) {
            Token::Value(value) => value,
            Token::Fragment(f) => panic!("unexpected fragment {f:?}"),
        }
    }

    #[test]
    fn test_registry_is_indexed_by_id() {
        for id in ProductionId::ALL {
            assert_eq!(id.production().id, id);
        }
    }

    #[test]
    fn test_number_keeps_lexical_form() {
        assert_eq!(matched(ProductionId::Number, b"1.25 "), Some(4));
        assert_eq!(matched(ProductionId::Number, b"-.5]"), Some(3));
        assert_eq!(matched(ProductionId::Number, b"+17"), Some(3));
        assert_eq!(matched(ProductionId::Number, b"."), None);
        assert_eq!(
            value(ProductionId::Number, b"0.50"),
            Value::Number("0.50".into())
        );
    }

    #[test]
    fn test_reference_wins_over_number() {
        assert_eq!(matched(ProductionId::Reference, b"12 0 R>>"), Some(6));
        assert_eq!(matched(ProductionId::Reference, b"12 0 612"), None);
        assert_eq!(
            value(ProductionId::Reference, b"012 3 R"),
            Value::Reference(ObjRef::new(12, 3))
        );
    }

    #[test]
    fn test_comment_excludes_header_and_eof() {
        assert_eq!(matched(ProductionId::Comment, b"%PDF-1.4\n"), None);
        assert_eq!(matched(ProductionId::Comment, b"%%EOF\n"), None);
        assert_eq!(matched(ProductionId::Comment, b"% hello\r\nx"), Some(9));
        assert_eq!(
            value(ProductionId::Comment, b"% hello\r\n"),
            Value::Comment(Text::Utf8(" hello".into()))
        );
        assert_eq!(
            value(ProductionId::Comment, b"%\xe2\xe3\xcf\xd3\n"),
            Value::Comment(Text::Raw(b"%\xe2\xe3\xcf\xd3\n".to_vec()))
        );
    }

    #[test]
    fn test_comment_needs_line_end_until_eof() {
        let comment = ProductionId::Comment.production();
        assert_eq!(comment.matches(b"% tail", false), None);
        assert_eq!(comment.matches(b"% tail", true), Some(6));
        assert_eq!(comment.matches(b"% cr\r", false), None);
        assert_eq!(comment.matches(b"% cr\r", true), Some(5));
    }

    #[test]
    fn test_header_version() {
        assert_eq!(matched(ProductionId::Header, b"%PDF-1.7\n"), Some(8));
        assert_eq!(
            value(ProductionId::Header, b"%PDF-1.7"),
            Value::Header("1.7".into())
        );
    }

    #[test]
    fn test_whitespace_tokens() {
        assert_eq!(matched(ProductionId::Whitespace, b" \r\n\t\x0c\x00x"), Some(6));
        assert_eq!(
            value(ProductionId::Whitespace, b" \r\n\t\x0c\x00"),
            Value::Whitespace(vec![
                WsToken::Space,
                WsToken::CarriageReturn,
                WsToken::LineFeed,
                WsToken::Tab,
                WsToken::FormFeed,
                WsToken::Nul,
            ])
        );
    }

    #[test]
    fn test_name_stops_at_delimiters_and_decodes_hex() {
        assert_eq!(matched(ProductionId::Name, b"/Type/Catalog"), Some(5));
        assert_eq!(matched(ProductionId::Name, b"/F1 12 Tf"), Some(3));
        assert_eq!(
            value(ProductionId::Name, b"/A#20B"),
            Value::Name("A B".into())
        );
        assert_eq!(value(ProductionId::Name, b"/A#zz"), Value::Name("A#zz".into()));
    }

    #[test]
    fn test_hex_string_decodes() {
        assert_eq!(
            value(ProductionId::HexString, b"<48 65 6c6C6f>"),
            Value::HexString(Text::Utf8("Hello".into()))
        );
        assert_eq!(
            value(ProductionId::HexString, b"<414>"),
            Value::HexString(Text::Utf8("A@".into()))
        );
        assert_eq!(matched(ProductionId::HexString, b"<<"), None);
    }

    #[test]
    fn test_escape_table() {
        let cases: [(&[u8], u8); 9] = [
            (b"\\n", 0x0a),
            (b"\\r", 0x0d),
            (b"\\t", 0x09),
            (b"\\b", 0x08),
            (b"\\f", 0x0c),
            (b"\\(", b'('),
            (b"\\)", b')'),
            (b"\\\\", b'\\'),
            (b"\\101", b'A'),
        ];
        for (raw, expected) in cases {
            assert_eq!(matched(ProductionId::StringEscape, raw), Some(raw.len()));
            assert_eq!(
                ProductionId::StringEscape.production().convert(raw),
                Token::Fragment(Fragment::Escape(expected))
            );
        }
    }

    #[test]
    fn test_unknown_escape_matches_nothing_in_a_string() {
        for id in context(Kind::LiteralString) {
            assert_eq!(id.production().matches(b"\\q)", false), None, "{id:?}");
        }
    }

    #[test]
    fn test_xref_entry_fixed_width() {
        let raw = b"0000000123 00000 n\n";
        assert_eq!(matched(ProductionId::XrefEntry, raw), Some(raw.len()));
        assert_eq!(matched(ProductionId::XrefSpec, raw), None);
        assert_eq!(
            value(ProductionId::XrefEntry, raw),
            Value::XrefEntry(XrefEntry {
                offset: 123,
                generation: 0,
                in_use: true,
            })
        );
        assert_eq!(
            matched(ProductionId::XrefEntry, b"0000000000 65535 f \r\n0000"),
            Some(21)
        );
    }

    #[test]
    fn test_xref_spec_and_offset() {
        assert_eq!(
            value(ProductionId::XrefSpec, b"0 6\n"),
            Value::XrefSpec(XrefSpec { first: 0, count: 6 })
        );
        let raw = b"startxref\n1234\n%%EOF";
        assert_eq!(matched(ProductionId::XrefOffset, raw), Some(15));
        assert_eq!(
            value(ProductionId::XrefOffset, &raw[..15]),
            Value::XrefOffset(1234)
        );
    }

    #[test]
    fn test_stream_data_leaves_room_for_terminator() {
        let data = ProductionId::StreamData.production();
        assert_eq!(data.matches(&[0u8; 100], false), Some(100 - STREAM_GUARD));
        assert_eq!(data.matches(&[0u8; 5], false), None);
        assert_eq!(data.matches(&[0u8; 5], true), Some(5));
    }

    #[test]
    fn test_indirect_object_header() {
        assert_eq!(
            value(ProductionId::IndirectObject, b"12 0 obj"),
            Value::IndirectObject(IndirectObject {
                reference: ObjRef::new(12, 0),
                object: None,
                stream: None,
            })
        );
    }
}
