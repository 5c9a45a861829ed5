//! 日志与诊断中的载荷预览

use std::borrow::Cow;
use std::fmt::{self, Write};

/// 诊断信息中载荷预览的默认长度
pub const DIAGNOSTIC_PREVIEW_LEN: usize = 120;

/// 空白折叠 + 截断，不分配新字符串
/// 连续空白折叠为单个空格，超过 `max_len` 个字符时以 `…` 结尾
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
                    f.write_char('…')?;
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

/// 响应体预览（非 UTF-8 字节按替换字符处理）
pub fn preview_bytes(bytes: &[u8], max_len: usize) -> String {
    let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
    preview_compact(&text, max_len).to_string()
}
