//! Byte offsets (tree-sitter) versus line/UTF-16 positions (LSP).

use lsp_types::Position;

/// Byte offset of the start of `line`, or `None` past the end of `content`.
fn line_start(content: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    content
        .match_indices('\n')
        .nth(line - 1)
        .map(|(i, _)| i + 1)
}

pub fn utf16_col_to_byte_col(line_content: &str, utf16_col: usize) -> usize {
    let mut curr_utf16 = 0;
    let mut curr_byte = 0;

    for c in line_content.chars() {
        if curr_utf16 >= utf16_col || c == '\n' {
            break;
        }
        curr_utf16 += c.len_utf16();
        curr_byte += c.len_utf8();
    }
    curr_byte
}

/// LSP position of a byte offset. Offsets inside a character are rounded
/// down to its start.
pub fn position_at(content: &str, byte: usize) -> Position {
    let byte = byte.min(content.len());
    let start = content[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = content[..start].matches('\n').count();
    let character: usize = content[start..]
        .char_indices()
        .take_while(|(i, _)| start + i < byte)
        .map(|(_, c)| c.len_utf16())
        .sum();
    Position::new(line as u32, character as u32)
}

/// Byte offset of an LSP position; characters past the line end clamp to it.
pub fn byte_at(content: &str, position: Position) -> Option<usize> {
    let start = line_start(content, position.line as usize)?;
    Some(start + utf16_col_to_byte_col(&content[start..], position.character as usize))
}

/// Identifier (`[A-Za-z0-9_$]`, any alphanumeric) covering `byte`.
pub fn word_at(content: &str, byte: usize) -> Option<&str> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let byte = byte.min(content.len());
    if !content.is_char_boundary(byte) {
        return None;
    }

    let start = content[..byte]
        .rfind(|c| !is_ident(c))
        .map(|i| i + content[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let end = content[byte..]
        .find(|c| !is_ident(c))
        .map(|i| i + byte)
        .unwrap_or(content.len());

    (start < end).then(|| &content[start..end])
}
