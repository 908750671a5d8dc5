// OOXML 容器公用工具：ZIP 条目读取与 XML 名称/属性处理。
use super::error::ExtractError;
use quick_xml::events::BytesStart;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub(crate) type OoxmlArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub(crate) fn open_archive<'a>(bytes: &'a [u8], format: &str) -> Result<OoxmlArchive<'a>, ExtractError> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ExtractError::parse(format, format!("invalid zip container: {err}")))
}

/// 按名称读取条目并严格按 UTF-8 解码。
pub(crate) fn read_entry_string(archive: &mut OoxmlArchive<'_>, name: &str) -> Result<String, String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| format!("cannot open {name}: {err}"))?;
    let mut buffer = Vec::new();
    entry
        .read_to_end(&mut buffer)
        .map_err(|err| format!("cannot read {name}: {err}"))?;
    String::from_utf8(buffer).map_err(|err| format!("{name} is not valid UTF-8: {err}"))
}

pub(crate) fn split_tag_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if let Some(idx) = name.iter().position(|b| *b == b':') {
        (Some(&name[..idx]), &name[idx + 1..])
    } else {
        (None, name)
    }
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    split_tag_name(name).1
}

pub(crate) fn attr_value(element: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in element.attributes().with_checks(false) {
        let Ok(attr) = attr else {
            continue;
        };
        if local_name(attr.key.as_ref()) == key {
            if let Ok(value) = attr.unescape_value() {
                return Some(value.into_owned());
            }
        }
    }
    None
}

/// 解码 XML 预定义实体与数字字符引用，正则兜底路径使用。
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        rest = &rest[start..];
        let Some(end) = rest.find(';').filter(|end| *end <= 10) else {
            output.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_char_ref(entity),
        };
        match decoded {
            Some(ch) => {
                output.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_char_ref(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"t"), b"t");
        assert_eq!(split_tag_name(b"p:txBody").0, Some(&b"p"[..]));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#20320;&#x597D;"), "你好");
        assert_eq!(decode_entities("R&D; & more"), "R&D; & more");
    }

    #[test]
    fn test_open_archive_rejects_garbage() {
        assert!(matches!(
            open_archive(b"not a zip", "pptx"),
            Err(ExtractError::Parse { .. })
        ));
    }
}
