use super::*;

#[test]
fn names_resolve_case_insensitively() {
    assert_eq!(Encoding::from_name("UTF-8"), Some(Encoding::Utf8));
    assert_eq!(Encoding::from_name("latin1"), Some(Encoding::Iso8859_1));
    assert_eq!(Encoding::from_name("klingon"), None);
}

#[test]
fn utf8_round_trip() {
    let text = "héllo wörld ✓";
    let bytes = convert_to(Encoding::Utf8, text);
    assert_eq!(convert_from(Encoding::Utf8, &bytes), text);
}

#[test]
fn malformed_utf8_falls_back_to_byte_values() {
    let decoded = convert_from(Encoding::Utf8, &[b'a', 0xFF, b'b']);
    assert_eq!(decoded, "a\u{FF}b");
}

#[test]
fn internal_encoding_hides_nul() {
    let bytes = convert_to(Encoding::Internal, "a\0b");
    assert_eq!(bytes, vec![b'a', 0xC0, 0x80, b'b']);
    assert_eq!(convert_from(Encoding::Internal, &bytes), "a\0b");
}

#[test]
fn latin1_replaces_wide_chars() {
    assert_eq!(convert_to(Encoding::Iso8859_1, "é✓"), vec![0xE9, b'?']);
    assert_eq!(convert_from(Encoding::Iso8859_1, &[0xE9]), "é");
}

#[test]
fn ascii_replaces_high_bytes() {
    assert_eq!(convert_from(Encoding::Ascii, &[b'o', b'k', 0x80]), "ok?");
}

#[test]
fn decoding_grows_scratch_buffer() {
    // every byte expands to two UTF-8 bytes, well past the initial scratch size
    let bytes = vec![0xE9u8; 500];
    let decoded = convert_from(Encoding::Iso8859_1, &bytes);
    assert_eq!(decoded.chars().count(), 500);
    assert!(decoded.chars().all(|ch| ch == 'é'));
}

#[test]
fn byte_array_view_truncates() {
    assert_eq!(to_byte_array("A\u{141}"), vec![0x41, 0x41]);
    assert_eq!(from_byte_array(&[0x41, 0xFF]), "A\u{FF}");
}
