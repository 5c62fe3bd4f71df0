//! GTIN/EAN normalization

use crate::domain::constants::barcode::VALID_GTIN_LENGTHS;

/// Strip everything but digits and accept only GTIN-shaped lengths.
///
/// Anything else becomes `""`. Codes are never truncated or padded.
pub fn normalize_barcode(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if VALID_GTIN_LENGTHS.contains(&digits.len()) {
        digits
    } else {
        String::new()
    }
}

/// Already-normalized shape check used by validation
pub fn is_valid_barcode(code: &str) -> bool {
    code.chars().all(|c| c.is_ascii_digit()) && VALID_GTIN_LENGTHS.contains(&code.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("3800123456789", "3800123456789")]
    #[case("380-0123-456789", "3800123456789")]
    #[case(" 12345678 ", "12345678")]
    #[case("012345678905", "012345678905")]
    #[case("12345678901234", "12345678901234")]
    #[case("1234567", "")]
    #[case("12345678901", "")]
    #[case("123456789012345", "")]
    #[case("N/A", "")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_barcode(raw), expected);
    }

    #[rstest]
    fn test_every_non_gtin_length_rejects(#[values(3, 4, 5, 6, 7, 9, 10, 11, 15, 16)] len: usize) {
        let raw = "4".repeat(len);
        assert_eq!(normalize_barcode(&raw), "");
    }

    #[rstest]
    fn test_every_gtin_length_round_trips(#[values(8, 12, 13, 14)] len: usize) {
        let raw: String = (0..len).map(|i| char::from(b'0' + (i % 10) as u8)).collect();
        assert_eq!(normalize_barcode(&raw), raw);
        assert!(is_valid_barcode(&raw));
    }

    proptest! {
        #[test]
        fn prop_length_decides_acceptance(len in 1usize..=20, digit in 0u8..10) {
            let raw = char::from(b'0' + digit).to_string().repeat(len);
            let code = normalize_barcode(&raw);
            if [8, 12, 13, 14].contains(&len) {
                prop_assert_eq!(code, raw);
            } else {
                prop_assert!(code.is_empty());
            }
        }

        #[test]
        fn prop_output_is_empty_or_valid(raw in ".{0,40}") {
            let code = normalize_barcode(&raw);
            prop_assert!(code.is_empty() || is_valid_barcode(&code));
        }

        #[test]
        fn prop_valid_codes_survive_separators(code in "[0-9]{13}", sep in "[ -]{0,2}") {
            let decorated = format!("{}{}{}", &code[..3], sep, &code[3..]);
            prop_assert_eq!(normalize_barcode(&decorated), code);
        }

        #[test]
        fn prop_normalization_is_idempotent(raw in "[0-9 -]{0,20}") {
            let once = normalize_barcode(&raw);
            prop_assert_eq!(normalize_barcode(&once), once.clone());
        }
    }
}
