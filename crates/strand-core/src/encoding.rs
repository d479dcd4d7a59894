//! 封闭的编码表：名称解析与文本/字节互转。
//!
//! # 设计概要（How）
//! - 六种编码以枚举表示，别名（`ucs2`、`binary` 等）只在 [`Encoding::from_name`] 中解析一次，
//!   之后流实例只持有解析后的枚举值；
//! - `to_bytes` 把文本按编码转为字节，`to_text` 把字节按编码渲染为文本；
//! - `hex` 与 `base64` 的解码取宽松策略：遇到非法字符时截断或忽略，而不是整体失败。
//!
//! # 已知限制（Trade-offs）
//! - `to_text` 以单个分块为单位解码，多字节字符若被拆到两个分块会被渲染为替换字符。

use core::fmt;
use core::str::FromStr;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;

use crate::error::{Result, StreamError};

/// 宽松的 base64 解码引擎：不要求填充，允许末尾残余位。
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// 流实例绑定的字符编码。
///
/// # 契约说明（What）
/// - 构造时确定，实例生命周期内不可变；
/// - 仅在整体重新渲染（`to_string_with`）时允许临时指定另一种编码，从不按分块切换。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Encoding {
    /// 7 位 ASCII。
    Ascii,
    /// UTF-8，默认编码。
    #[default]
    Utf8,
    /// UTF-16 小端序，别名 `ucs2`。
    Utf16Le,
    /// 标准 base64。
    Base64,
    /// ISO-8859-1，别名 `binary`。
    Latin1,
    /// 小写十六进制。
    Hex,
}

impl Encoding {
    /// 全部编码，按规范名称顺序排列。
    pub const ALL: [Encoding; 6] = [
        Encoding::Ascii,
        Encoding::Utf8,
        Encoding::Utf16Le,
        Encoding::Base64,
        Encoding::Latin1,
        Encoding::Hex,
    ];

    /// 返回规范名称。
    pub const fn name(self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Utf8 => "utf8",
            Encoding::Utf16Le => "utf16le",
            Encoding::Base64 => "base64",
            Encoding::Latin1 => "latin1",
            Encoding::Hex => "hex",
        }
    }

    /// 按名称解析编码，大小写不敏感并展开别名。
    ///
    /// # 错误
    /// - 未登记的名称返回 [`StreamError::Configuration`]。
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let encoding = match normalized.as_str() {
            "ascii" => Encoding::Ascii,
            "utf8" | "utf-8" => Encoding::Utf8,
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Encoding::Utf16Le,
            "base64" => Encoding::Base64,
            "latin1" | "binary" => Encoding::Latin1,
            "hex" => Encoding::Hex,
            _ => {
                return Err(StreamError::configuration(
                    "encoding",
                    format!("unknown encoding `{name}`"),
                ));
            }
        };
        Ok(encoding)
    }

    /// 把文本按当前编码转为字节。
    ///
    /// - `ascii`/`latin1` 保留每个 UTF-16 码元的低 8 位；
    /// - `hex` 在第一个非法字符处截断，奇数个半字节时丢弃最后一个；
    /// - `base64` 同时接受标准与 URL 安全字母表，忽略空白与非法字符，遇到 `=` 即结束。
    pub fn to_bytes(self, text: &str) -> Result<Bytes> {
        let bytes = match self {
            Encoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Encoding::Ascii | Encoding::Latin1 => {
                text.encode_utf16().map(|unit| unit as u8).collect()
            }
            Encoding::Utf16Le => text
                .encode_utf16()
                .flat_map(u16::to_le_bytes)
                .collect(),
            Encoding::Hex => {
                let valid = text.bytes().take_while(u8::is_ascii_hexdigit).count();
                let even = valid - valid % 2;
                hex::decode(&text[..even])
                    .map(Bytes::from)
                    .map_err(|err| self.transcode_error(err))?
            }
            Encoding::Base64 => {
                let mut symbols: Vec<u8> = text
                    .bytes()
                    .take_while(|byte| *byte != b'=')
                    .filter_map(base64_symbol)
                    .collect();
                // 单个残余字符不足以组成一个字节。
                if symbols.len() % 4 == 1 {
                    symbols.pop();
                }
                LENIENT_BASE64
                    .decode(&symbols)
                    .map(Bytes::from)
                    .map_err(|err| self.transcode_error(err))?
            }
        };
        Ok(bytes)
    }

    /// 把字节按当前编码渲染为文本，非法序列以替换字符呈现。
    pub fn to_text(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Ascii => bytes.iter().map(|byte| char::from(byte & 0x7f)).collect(),
            Encoding::Latin1 => bytes.iter().copied().map(char::from).collect(),
            Encoding::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Hex => hex::encode(bytes),
        }
    }

    fn transcode_error(self, err: impl fmt::Display) -> StreamError {
        StreamError::Transcode {
            encoding: self,
            detail: err.to_string(),
        }
    }
}

/// 归一化 base64 符号：URL 安全字母映射到标准字母，其余非法字符丢弃。
fn base64_symbol(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => Some(byte),
        b'-' => Some(b'+'),
        b'_' => Some(b'/'),
        _ => None,
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use proptest::prelude::*;

    #[test]
    fn aliases_resolve_to_the_same_transform() {
        assert_eq!(Encoding::from_name("ucs2").unwrap(), Encoding::Utf16Le);
        assert_eq!(Encoding::from_name("UTF-16LE").unwrap(), Encoding::Utf16Le);
        assert_eq!(Encoding::from_name("binary").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name(" Utf-8 ").unwrap(), Encoding::Utf8);
        for encoding in Encoding::ALL {
            assert_eq!(Encoding::from_name(encoding.name()).unwrap(), encoding);
        }
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let err = "ebcdic".parse::<Encoding>().expect_err("未登记的编码应被拒绝");
        assert_eq!(err.code(), codes::INVALID_CONFIGURATION);
    }

    #[test]
    fn latin1_and_ascii_keep_low_byte() {
        assert_eq!(Encoding::Latin1.to_bytes("é").unwrap().as_ref(), &[0xe9]);
        assert_eq!(Encoding::Latin1.to_text(&[0xe9]), "é");
        assert_eq!(Encoding::Ascii.to_bytes("é").unwrap().as_ref(), &[0xe9]);
        assert_eq!(Encoding::Ascii.to_text(&[0xe9]), "i");
    }

    #[test]
    fn utf16le_drops_trailing_odd_byte() {
        let bytes = Encoding::Utf16Le.to_bytes("hi").unwrap();
        assert_eq!(bytes.as_ref(), b"h\0i\0");
        assert_eq!(Encoding::Utf16Le.to_text(&bytes[..3]), "h");
    }

    #[test]
    fn hex_stops_at_first_invalid_character() {
        assert_eq!(Encoding::Hex.to_bytes("48656c6c6f").unwrap().as_ref(), b"Hello");
        assert_eq!(Encoding::Hex.to_bytes("4865zz6c").unwrap().as_ref(), b"He");
        assert_eq!(Encoding::Hex.to_bytes("486").unwrap().as_ref(), b"H");
        assert_eq!(Encoding::Hex.to_text(b"Hi"), "4869");
    }

    #[test]
    fn base64_decoding_is_lenient() {
        let expected: &[u8] = b"Hello World!";
        assert_eq!(Encoding::Base64.to_bytes("SGVsbG8gV29ybGQh").unwrap().as_ref(), expected);
        assert_eq!(
            Encoding::Base64.to_bytes("SGVs bG8g\nV29y bGQh").unwrap().as_ref(),
            expected
        );
        assert_eq!(Encoding::Base64.to_bytes("SGk=").unwrap().as_ref(), b"Hi");
        assert_eq!(Encoding::Base64.to_bytes("SGk").unwrap().as_ref(), b"Hi");
        assert_eq!(Encoding::Base64.to_bytes("_-8").unwrap().as_ref(), &[0xff, 0xef]);
        assert_eq!(Encoding::Base64.to_text(b"Hi"), "SGk=");
    }

    #[test]
    fn utf8_renders_invalid_sequences_as_replacement() {
        let snowman = "☃".as_bytes();
        assert_eq!(Encoding::Utf8.to_text(&snowman[..1]), "\u{FFFD}");
    }

    proptest! {
        #[test]
        fn byte_oriented_encodings_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..96)) {
            for encoding in [Encoding::Hex, Encoding::Base64, Encoding::Latin1] {
                let text = encoding.to_text(&bytes);
                let decoded = encoding.to_bytes(&text).expect("宽松解码不会失败");
                prop_assert_eq!(&decoded[..], &bytes[..], "{} 往返不一致", encoding);
            }
        }

        #[test]
        fn text_encodings_round_trip(text in "\\PC{0,48}") {
            for encoding in [Encoding::Utf8, Encoding::Utf16Le] {
                let bytes = encoding.to_bytes(&text).expect("文本编码不会失败");
                prop_assert_eq!(encoding.to_text(&bytes), text.clone(), "{} 往返不一致", encoding);
            }
        }
    }
}
