pub mod routing;
pub mod openai;
pub mod gemini;

/// 聊天适配器注入文件内容片段的最大字符数
pub const CHAT_SNIPPET_LIMIT: usize = 2000;

/// 多模态适配器附加文本文件内容的最大字符数
pub const TEXT_FILE_SNIPPET_LIMIT: usize = 50000;

/// 尽力而为地把文件字节解码为文本片段
///
/// 无法解码的字节以替换符处理，按字符数截断。
pub fn decode_snippet(bytes: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(bytes).chars().take(max_chars).collect()
}
