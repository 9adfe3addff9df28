//! 文本处理工具
//! 空白折叠：标题与元素文本统一按浏览器渲染习惯折叠连续空白并去除首尾空白

use std::fmt::{self, Write};

/// 文本规整工具
pub struct TextNormalizer;

impl TextNormalizer {
    /// 折叠连续空白为单个空格，并去除首尾空白
    pub fn collapse_whitespace(text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        for word in text.split_whitespace() {
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(word);
        }
        result
    }
}

/// 日志预览：空白折叠 + 截断，不分配堆内存
#[inline(always)]
pub fn preview_compact<'a>(s: &'a str, max_len: usize) -> impl fmt::Display + 'a {
    struct CompactView<'a> {
        source: &'a str,
        max_length: usize,
    }

    impl fmt::Display for CompactView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut char_count = 0;
            let mut last_was_whitespace = false;

            for ch in self.source.trim().chars() {
                if char_count >= self.max_length {
                    f.write_str("…")?;
                    break;
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
