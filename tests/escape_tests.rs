use entry_encoder::object_encoder::append_escaped;
use entry_encoder::Buffer;
use proptest::prelude::*;

fn quoted(input: &[u8]) -> Vec<u8> {
    let mut buf = Buffer::new();
    buf.append_byte(b'"');
    append_escaped(&mut buf, input);
    buf.append_byte(b'"');
    buf.into_vec()
}

#[test]
fn test_known_escapes() {
    assert_eq!(quoted(b"tab\there"), b"\"tab\\there\"");
    assert_eq!(quoted(b"\x1b[31m"), b"\"\\u001b[31m\"");
    assert_eq!(quoted(b"\x08\x0c"), b"\"\\u0008\\u000c\"");
}

// One replacement character for every byte that is not part of valid UTF-8.
fn replace_per_byte(bytes: &[u8]) -> String {
    let mut out = String::new();
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        out.extend(chunk.invalid().iter().map(|_| '\u{fffd}'));
    }
    out
}

#[test]
fn test_invalid_utf8_becomes_replacement() {
    let parsed: String = serde_json::from_slice(&quoted(b"ok\xc3(")).unwrap();
    assert_eq!(parsed, "ok\u{fffd}(");
}

#[test]
fn test_each_invalid_byte_is_replaced() {
    let parsed: String = serde_json::from_slice(&quoted(b"a\xe2\x82(b")).unwrap();
    assert_eq!(parsed, "a\u{fffd}\u{fffd}(b");

    let parsed: String = serde_json::from_slice(&quoted(b"\xff\xfe")).unwrap();
    assert_eq!(parsed, "\u{fffd}\u{fffd}");

    // A sequence cut off at the end counts byte by byte too.
    let parsed: String = serde_json::from_slice(&quoted(b"x\xf0\x9f\x98")).unwrap();
    assert_eq!(parsed, "x\u{fffd}\u{fffd}\u{fffd}");
}

proptest! {
    #[test]
    fn test_valid_strings_roundtrip(s in any::<String>()) {
        let parsed: String = serde_json::from_slice(&quoted(s.as_bytes())).unwrap();
        prop_assert_eq!(parsed, s);
    }

    #[test]
    fn test_any_bytes_parse(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let parsed: String = serde_json::from_slice(&quoted(&bytes)).unwrap();
        prop_assert_eq!(parsed, replace_per_byte(&bytes));
    }
}
