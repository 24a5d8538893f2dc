//! 文本工具：空白判断与日志预览

use std::fmt::{self, Write};

/// 判断是否为空串（全空白也视为空）
#[inline]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ======================== 输出截断工具函数 ========================
/// 空白字符折叠 + 截断，用于日志中展示命中的请求内容
/// 1. 连续空白折叠为单个空格（不修改原字符串，仅格式化输出）
/// 2. 超出最大长度时追加 `...`
pub fn preview_compact<'a>(s: &'a str, max_len: usize) -> impl fmt::Display + 'a {
    struct CompactView<'a> {
        source: &'a str,
        max_length: usize,
    }

    impl fmt::Display for CompactView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut char_count = 0;
            let mut last_was_whitespace = false;

            for ch in self.source.chars() {
                if char_count >= self.max_length {
                    return f.write_str("...");
                }

                if ch.is_whitespace() {
                    if !last_was_whitespace {
                        f.write_char(' ')?;
                        char_count += 1;
                        last_was_whitespace = true;
                    }
                } else {
                    f.write_char(ch)?;
                    char_count += 1;
                    last_was_whitespace = false;
                }
            }
            Ok(())
        }
    }

    CompactView {
        source: s,
        max_length: max_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_preview_collapses_and_truncates() {
        assert_eq!(preview_compact("a  \n b", 10).to_string(), "a b");
        assert_eq!(preview_compact("<script>alert(1)</script>", 8).to_string(), "<script>...");
        assert_eq!(preview_compact("12345678", 8).to_string(), "12345678");
    }
}
