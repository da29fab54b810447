//! Symbol name check
//!
//! 플러그인 코드, 이름, 엔트리포인트, 핸들러 이름은 모두 같은 규칙을 따릅니다:
//! 비어 있지 않고, 256 바이트 미만이며, ASCII 영숫자와 `_`로만 구성.
//!
//! 플러그인 이름은 그대로 디렉토리 이름이 되므로 `/`, `.`, 공백 등이
//! 끼어들 수 없어야 합니다.

/// 허용되는 최대 길이 (미만)
pub const MAX_NAME_LEN: usize = 256;

/// 심볼 이름 규칙 검사
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < MAX_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_word_characters() {
        assert!(is_valid_name("sample01"));
        assert!(is_valid_name("Sample_Plugin"));
        assert!(is_valid_name("_"));
        assert!(is_valid_name("0"));
    }

    #[test]
    fn test_rejects_separators_and_whitespace() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("bad name!"));
        assert!(!is_valid_name("../escape"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a.b"));
        assert!(!is_valid_name("tab\there"));
        assert!(!is_valid_name("플러그인"));
    }

    #[test]
    fn test_length_boundary() {
        assert!(is_valid_name(&"a".repeat(MAX_NAME_LEN - 1)));
        assert!(!is_valid_name(&"a".repeat(MAX_NAME_LEN)));
    }
}
