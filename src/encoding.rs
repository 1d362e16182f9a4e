//! Storage-safe key encoding
//!
//! Document ids are arbitrary strings (file names, paths, URLs) but the
//! record store rejects `. - # $ [ ]` and treats `/` as a path separator.
//! Keys are built in two passes: percent-encode the id, then substitute
//! the rejected characters that survive percent-encoding with fixed
//! two-character tokens. Both passes are exactly reversible.

// ============================================================================
// Substitution Tokens
// ============================================================================

/// Substitution tokens for characters the record store rejects in path
/// segments.
///
/// Every token starts with `!`, which the percent-encoding pass always
/// escapes as `%21`. A literal `!` therefore never appears between the two
/// passes, so no token can collide with percent-encoder output (multi-byte
/// UTF-8 escapes like `%E2%80%80` in particular) and decoding never has to
/// guess. Tokens are all two characters with distinct trailing letters,
/// none of them hex digits.
const KEY_TOKENS: [(&str, &str); 7] = [
    (".", "!p"),
    ("-", "!h"),
    ("#", "!s"),
    ("$", "!g"),
    ("[", "!l"),
    ("]", "!r"),
    ("/", "!z"),
];

// ============================================================================
// Encode / Decode
// ============================================================================

/// Encode an arbitrary document id into a storage-safe key
///
/// Total: every input has a valid encoding and `decode_key` restores it
/// exactly.
pub fn encode_key(raw: &str) -> String {
    let mut encoded = urlencoding::encode(raw).into_owned();
    for (raw_char, token) in KEY_TOKENS {
        encoded = encoded.replace(raw_char, token);
    }
    encoded
}

/// Decode a storage-safe key back into the original document id
///
/// Keys not produced by `encode_key` are returned token-substituted but
/// otherwise unchanged rather than failing.
pub fn decode_key(key: &str) -> String {
    let mut restored = key.to_string();
    for (raw_char, token) in KEY_TOKENS {
        restored = restored.replace(token, raw_char);
    }
    match urlencoding::decode(&restored) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => restored,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(id: &str) {
        let key = encode_key(id);
        assert_eq!(decode_key(&key), id, "round trip failed for {:?}", id);
    }

    #[test]
    fn test_plain_ids_unchanged() {
        assert_eq!(encode_key("notes_2024"), "notes_2024");
        assert_eq!(encode_key("chapter~1"), "chapter~1");
    }

    #[test]
    fn test_dot_and_hyphen_substituted() {
        assert_eq!(encode_key("report.docx"), "report!pdocx");
        assert_eq!(encode_key("meeting-notes"), "meeting!hnotes");
        round_trip("report.docx");
        round_trip("meeting-notes");
    }

    #[test]
    fn test_every_rejected_character() {
        for id in [".", "-", "#", "$", "[", "]", "/"] {
            let key = encode_key(id);
            for (raw_char, _) in KEY_TOKENS {
                assert!(
                    !key.contains(raw_char),
                    "key {:?} still contains {:?}",
                    key,
                    raw_char
                );
            }
            round_trip(id);
        }
        round_trip("a.b-c#d$e[f]g/h");
    }

    #[test]
    fn test_keys_contain_no_path_separators() {
        let key = encode_key("folder/sub/report.docx");
        assert!(!key.contains('/'));
        round_trip("folder/sub/report.docx");
    }

    #[test]
    fn test_multibyte_escapes_survive() {
        // U+2000 percent-encodes to %E2%80%80, which a naive token scheme
        // built on %-prefixed tokens would corrupt on decode.
        round_trip("\u{2000}");
        round_trip("informe\u{2000}final.docx");
        round_trip("año-2024/señal.md");
    }

    #[test]
    fn test_literal_bang_and_percent() {
        round_trip("loud!name");
        round_trip("100% done.txt");
        // Pre-encoded input must come back literally, not double-decoded.
        round_trip("a%20b");
        round_trip("%E2%80%80");
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(encode_key(""), "");
        assert_eq!(decode_key(""), "");
    }

    #[test]
    fn test_spaces_and_unicode() {
        round_trip("quarterly report (final).docx");
        round_trip("日本語ファイル.txt");
        round_trip("emoji 🎉 test");
    }
}
