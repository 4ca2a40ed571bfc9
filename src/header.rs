//! 전송 헤더 (파일 이름 + 크기)
//!
//! 연결당 한 번, 본문보다 먼저 전송된다. 수신측은 파싱 직후 헤더를 버린다.

use std::path::{Component, Path};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::{Config, Framing};
use crate::{Error, Result};

/// LengthPrefixed 프레임의 고정 부분: 이름 길이(4) + 크기(8)
const LENGTH_PREFIX_LEN: usize = 4;
const SIZE_FIELD_LEN: usize = 8;

/// 에러 메시지에 인용할 네트워크 입력의 최대 길이 (바이트)
const QUOTE_LIMIT: usize = 32;

/// 전송 헤더
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    /// 파일 이름 (경로 없음)
    pub name: String,

    /// 본문 바이트 수
    pub size: u64,
}

impl TransferHeader {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// 설정된 프레이밍으로 직렬화
    pub fn encode(&self, config: &Config) -> Result<Bytes> {
        let bytes = match config.framing {
            Framing::Separator => self.encode_separated(&config.separator)?,
            Framing::LengthPrefixed => self.encode_length_prefixed(),
        };

        if self.name.is_empty() {
            return Err(self.invalid_name("빈 이름"));
        }
        if bytes.len() > config.header_buffer_size {
            return Err(self.invalid_name(format!(
                "헤더 {} bytes가 버퍼 크기 {} bytes 초과",
                bytes.len(),
                config.header_buffer_size
            )));
        }

        Ok(bytes)
    }

    /// `name SEPARATOR size`
    pub fn encode_separated(&self, separator: &str) -> Result<Bytes> {
        if self.name.contains(separator) {
            return Err(self.invalid_name("이름에 구분자가 포함됨"));
        }

        let size = self.size.to_string();
        let mut buf = BytesMut::with_capacity(self.name.len() + separator.len() + size.len());
        buf.put_slice(self.name.as_bytes());
        buf.put_slice(separator.as_bytes());
        buf.put_slice(size.as_bytes());
        Ok(buf.freeze())
    }

    /// `u32 BE 이름 길이 | 이름 | u64 BE 크기`
    pub fn encode_length_prefixed(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_LEN + self.name.len() + SIZE_FIELD_LEN);
        buf.put_u32(self.name.len() as u32);
        buf.put_slice(self.name.as_bytes());
        buf.put_u64(self.size);
        buf.freeze()
    }

    /// `name SEPARATOR size` 파싱
    ///
    /// 첫 번째 구분자에서 분리한다. 크기 부분은 ASCII 숫자로만 이루어져야 한다.
    pub fn decode_separated(bytes: &[u8], separator: &str) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::malformed(format!("UTF-8 아님: {e}")))?;

        let (name, size) = text
            .split_once(separator)
            .ok_or_else(|| Error::malformed("구분자 없음"))?;

        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::malformed(format!(
                "크기가 숫자가 아님: {:?} ({} bytes)",
                quote(size),
                size.len()
            )));
        }
        let size = size
            .parse::<u64>()
            .map_err(|e| Error::malformed(format!("크기 범위 초과: {e}")))?;

        Ok(Self::new(name, size))
    }

    /// LengthPrefixed 프레임 전체(길이 필드 포함) 파싱
    pub fn decode_length_prefixed(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LENGTH_PREFIX_LEN {
            return Err(Error::malformed("길이 필드 잘림"));
        }
        let name_len = bytes.get_u32() as usize;
        if bytes.len() != name_len + SIZE_FIELD_LEN {
            return Err(Error::malformed(format!(
                "프레임 길이 불일치: name_len={name_len}, remaining={}",
                bytes.len()
            )));
        }

        let name = std::str::from_utf8(&bytes[..name_len])
            .map_err(|e| Error::malformed(format!("UTF-8 아님: {e}")))?
            .to_string();
        bytes.advance(name_len);
        let size = bytes.get_u64();

        Ok(Self::new(name, size))
    }

    /// 스트림에서 헤더 하나를 읽음
    pub async fn read_from<R>(reader: &mut R, config: &Config) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let header = match config.framing {
            Framing::Separator => {
                // 한 번의 read로 헤더 전체를 받는다고 가정
                let mut buf = vec![0u8; config.header_buffer_size];
                let n = reader
                    .read(&mut buf)
                    .await
                    .map_err(Error::connection("read header"))?;
                if n == 0 {
                    return Err(Error::malformed("헤더 전에 연결 종료"));
                }
                Self::decode_separated(&buf[..n], &config.separator)?
            }
            Framing::LengthPrefixed => {
                let mut prefix = [0u8; LENGTH_PREFIX_LEN];
                read_exact_header(reader, &mut prefix).await?;

                let name_len = u32::from_be_bytes(prefix) as usize;
                if name_len > config.header_buffer_size {
                    return Err(Error::malformed(format!(
                        "이름 길이 {name_len}가 상한 {} 초과",
                        config.header_buffer_size
                    )));
                }

                let mut frame = vec![0u8; LENGTH_PREFIX_LEN + name_len + SIZE_FIELD_LEN];
                frame[..LENGTH_PREFIX_LEN].copy_from_slice(&prefix);
                read_exact_header(reader, &mut frame[LENGTH_PREFIX_LEN..]).await?;
                Self::decode_length_prefixed(&frame)?
            }
        };

        debug!("헤더 수신: name={:?}, size={}", header.name, header.size);
        Ok(header)
    }

    fn invalid_name(&self, reason: impl Into<String>) -> Error {
        Error::InvalidName {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

async fn read_exact_header<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::malformed("헤더 잘림"))
        }
        Err(e) => Err(Error::connection("read header")(e)),
    }
}

/// 네트워크에서 받은 이름을 디렉터리 성분 없는 파일 이름으로 정리
///
/// `/`와 `\` 뒤의 마지막 성분만 남긴다. 결과가 비었거나 `.`/`..`이거나
/// `:`를 포함하면 거부한다.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::malformed(format!(
            "사용할 수 없는 파일 이름: {:?}",
            quote(raw)
        )));
    }
    if base.contains('\0') {
        return Err(Error::malformed("파일 이름에 NUL 포함"));
    }
    // Windows에서 `C:name`은 join 시 출력 디렉터리를 대체한다
    if base.contains(':') {
        return Err(Error::malformed(format!(
            "파일 이름에 드라이브/스트림 구분자 포함: {:?}",
            quote(base)
        )));
    }

    let mut components = Path::new(base).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(base.to_string()),
        _ => Err(Error::malformed(format!(
            "단일 파일 이름이 아님: {:?}",
            quote(base)
        ))),
    }
}

/// 문자 경계를 지키며 앞부분만 잘라냄
fn quote(s: &str) -> &str {
    if s.len() <= QUOTE_LIMIT {
        return s;
    }
    let mut end = QUOTE_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
