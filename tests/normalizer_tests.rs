use emt_bus::emt_format::normalize_line_code;

#[test]
fn strips_leading_zeros() {
    assert_eq!(normalize_line_code("03"), "3");
    assert_eq!(normalize_line_code("3"), "3");
    assert_eq!(normalize_line_code("025"), "25");
}

#[test]
fn uppercases_letter_codes() {
    assert_eq!(normalize_line_code("a1"), "A1");
    assert_eq!(normalize_line_code("A1"), "A1");
}

#[test]
fn empty_stays_empty() {
    assert_eq!(normalize_line_code(""), "");
}

#[test]
fn all_zeros_become_zero() {
    assert_eq!(normalize_line_code("000"), "0");
}

#[test]
fn digits_are_extracted_from_mixed_codes() {
    assert_eq!(normalize_line_code("3-b"), "3");
    assert_eq!(normalize_line_code("#07"), "7");
}

#[test]
fn codes_without_digits_fall_back_to_input() {
    assert_eq!(normalize_line_code("--"), "--");
}

#[test]
fn is_idempotent() {
    for code in ["03", "a1", "", "000", "25", "N2", "--", "x"] {
        let once = normalize_line_code(code);
        assert_eq!(normalize_line_code(&once), once, "code {:?}", code);
    }
}
