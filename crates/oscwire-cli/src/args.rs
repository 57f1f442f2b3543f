//! Command-line argument tokens
//!
//! ```text
//! /synth/1/freq f:440 i:3 s:hello T ; /other N
//! ```
//!
//! Prefixed tokens: `i:` int32, `h:` int64, `f:` float, `d:` double,
//! `s:` string, `c:` char, `t:` time tag, `b:` hex blob, `r:` rrggbbaa color.
//! Bare `T` `F` `N` `I` are true, false, nil and infinitum. Other bare
//! tokens become an int32, a float or a string, whichever parses first.

use anyhow::{anyhow, bail, Context, Result};
use oscwire_core::{Message, OscValue, Rgba};

/// Token separating messages on the command line
pub const MESSAGE_SEPARATOR: &str = ";";

/// Split tokens into messages; each group starts with an address.
pub fn parse_messages(tokens: &[String]) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    for group in tokens.split(|t| t == MESSAGE_SEPARATOR) {
        let Some((path, args)) = group.split_first() else {
            continue;
        };
        let mut message =
            Message::with_path(path).with_context(|| format!("bad address {:?}", path))?;
        for token in args {
            message.add_argument(
                parse_value(token).with_context(|| format!("bad argument {:?}", token))?,
            );
        }
        messages.push(message);
    }

    if messages.is_empty() {
        bail!("no message given; expected an address such as /synth/1/freq");
    }
    Ok(messages)
}

pub fn parse_value(token: &str) -> Result<OscValue> {
    match token {
        "T" => return Ok(OscValue::Bool(true)),
        "F" => return Ok(OscValue::Bool(false)),
        "N" => return Ok(OscValue::Nil),
        "I" => return Ok(OscValue::Infinitum),
        _ => {}
    }

    let Some((prefix, body)) = token.split_once(':').filter(|(p, _)| p.len() == 1) else {
        return Ok(infer(token));
    };

    Ok(match prefix {
        "i" => OscValue::Int32(body.parse()?),
        "h" => OscValue::Int64(body.parse()?),
        "f" => OscValue::Float(body.parse()?),
        "d" => OscValue::Double(body.parse()?),
        "s" => OscValue::String(body.to_string()),
        "t" => OscValue::TimeTag(body.parse()?),
        "c" => match body.as_bytes() {
            [c] if c.is_ascii() => OscValue::Char(*c),
            _ => bail!("char must be a single ASCII character"),
        },
        "b" => OscValue::Blob(parse_hex(body)?),
        "r" => {
            let bytes = parse_hex(body)?;
            match bytes.as_slice() {
                [r, g, b, a] => OscValue::Color(Rgba::new(*r, *g, *b, *a)),
                _ => bail!("color must be 8 hex digits (rrggbbaa)"),
            }
        }
        _ => return Ok(infer(token)),
    })
}

fn infer(token: &str) -> OscValue {
    if let Ok(i) = token.parse::<i32>() {
        OscValue::Int32(i)
    } else if let Ok(f) = token.parse::<f32>() {
        OscValue::Float(f)
    } else {
        OscValue::String(token.to_string())
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        bail!("hex needs an even number of digits");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            let pair = &s[i..i + 2];
            u8::from_str_radix(pair, 16).map_err(|e| anyhow!("{}: {:?}", e, pair))
        })
        .collect()
}

/// Token form of a value, the inverse of [`parse_value`]
pub fn format_value(value: &OscValue) -> String {
    match value {
        OscValue::Blob(b) => {
            let hex: String = b.iter().map(|x| format!("{:02x}", x)).collect();
            format!("b:{}", hex)
        }
        OscValue::Bool(true) => "T".to_string(),
        OscValue::Bool(false) => "F".to_string(),
        OscValue::Char(c) => format!("c:{}", *c as char),
        OscValue::Color(c) => format!("r:{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a),
        OscValue::Double(d) => format!("d:{}", d),
        OscValue::Float(f) => format!("f:{}", f),
        OscValue::Int32(i) => format!("i:{}", i),
        OscValue::Int64(h) => format!("h:{}", h),
        OscValue::String(s) => format!("s:{}", s),
        OscValue::TimeTag(t) => format!("t:{}", t),
        OscValue::Nil => "N".to_string(),
        OscValue::Infinitum => "I".to_string(),
        OscValue::Terminate => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_prefixed_values() {
        assert_eq!(parse_value("i:-3").unwrap(), OscValue::Int32(-3));
        assert_eq!(parse_value("h:9000000000").unwrap(), OscValue::Int64(9_000_000_000));
        assert_eq!(parse_value("f:440").unwrap(), OscValue::Float(440.0));
        assert_eq!(parse_value("d:0.5").unwrap(), OscValue::Double(0.5));
        assert_eq!(parse_value("s:hello world").unwrap(), OscValue::String("hello world".into()));
        assert_eq!(parse_value("c:x").unwrap(), OscValue::Char(b'x'));
        assert_eq!(parse_value("t:1").unwrap(), OscValue::TimeTag(1));
        assert_eq!(parse_value("b:00ff10").unwrap(), OscValue::Blob(vec![0, 255, 16]));
        assert_eq!(
            parse_value("r:ff800001").unwrap(),
            OscValue::Color(Rgba::new(255, 128, 0, 1))
        );
    }

    #[test]
    fn test_bare_values() {
        assert_eq!(parse_value("T").unwrap(), OscValue::Bool(true));
        assert_eq!(parse_value("N").unwrap(), OscValue::Nil);
        assert_eq!(parse_value("12").unwrap(), OscValue::Int32(12));
        assert_eq!(parse_value("1.5").unwrap(), OscValue::Float(1.5));
        assert_eq!(parse_value("word").unwrap(), OscValue::String("word".into()));
        assert_eq!(parse_value("http://x").unwrap(), OscValue::String("http://x".into()));
    }

    #[test]
    fn test_bad_values() {
        assert!(parse_value("i:abc").is_err());
        assert!(parse_value("c:xy").is_err());
        assert!(parse_value("b:abc").is_err());
        assert!(parse_value("r:ff").is_err());
    }

    #[test]
    fn test_multiple_messages() {
        let msgs = parse_messages(&tokens("/a i:1 ; /b s:x T")).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].address().full_path(), "/a");
        assert_eq!(msgs[1].type_tags(), ",sT");
    }

    #[test]
    fn test_messages_need_address() {
        assert!(parse_messages(&tokens("i:1")).is_err());
        assert!(parse_messages(&[]).is_err());
    }

    #[test]
    fn test_format_parses_back() {
        for token in ["i:-3", "f:0.25", "s:hi", "b:0a0b", "r:01020304", "T", "N", "c:q"] {
            let value = parse_value(token).unwrap();
            assert_eq!(format_value(&value), token);
        }
    }
}
