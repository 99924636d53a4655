use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref AADHAAR_RE: Regex = Regex::new(r"^[0-9]{12}$").unwrap();
    static ref PAN_RE: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref OTP_RE: Regex = Regex::new(r"^[0-9]{4}$").unwrap();
    static ref FILE_NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,199}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_aadhaar(number: &str) -> bool {
    AADHAAR_RE.is_match(number)
}

/// PAN is five letters, four digits, one letter; callers upper-case first.
pub fn is_valid_pan(number: &str) -> bool {
    PAN_RE.is_match(number)
}

pub fn is_valid_otp(otp: &str) -> bool {
    OTP_RE.is_match(otp)
}

/// A bare stored-file name: no separators, no leading dot.
pub fn is_safe_file_name(name: &str) -> bool {
    FILE_NAME_RE.is_match(name) && !name.contains("..")
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert_eq!(normalize_email("  Foo@Example.COM "), "foo@example.com");
    }

    #[test]
    fn aadhaar_is_twelve_digits() {
        assert!(is_valid_aadhaar("123456789012"));
        assert!(!is_valid_aadhaar("12345678901"));
        assert!(!is_valid_aadhaar("12345678901a"));
        assert!(!is_valid_aadhaar("१२३४५६७८९०१२"));
        assert!(!is_valid_aadhaar("１２３４５６７８９０１２"));
    }

    #[test]
    fn pan_format() {
        assert!(is_valid_pan("ABCDE1234F"));
        assert!(!is_valid_pan("abcde1234f"));
        assert!(!is_valid_pan("ABCD12345F"));
        assert!(!is_valid_pan("ABCDE१२३४F"));
    }

    #[test]
    fn otp_is_four_digits() {
        assert!(is_valid_otp("4567"));
        assert!(!is_valid_otp("456"));
        assert!(!is_valid_otp("45a7"));
        assert!(!is_valid_otp("४५६७"));
    }

    #[test]
    fn file_names() {
        assert!(is_safe_file_name("3f2a_aadhaar_1700000000.pdf"));
        assert!(!is_safe_file_name("../secret"));
        assert!(!is_safe_file_name("a/b.pdf"));
        assert!(!is_safe_file_name(".env"));
        assert!(!is_safe_file_name("a..b"));
    }
}
