//! Entry identifier.
//!
//! 新規エントリの ID は ULID（時刻でソート可能、調整なしで生成可能）。
//! ただし旧世代のキューファイルは UUID 文字列を使っているため、
//! 読み込み時は任意の文字列を受け入れる（不透明な ID として扱う）。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque identifier of a queued memory entry.
///
/// Serialized as a bare string so files written by older producers
/// (UUID ids) stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// 既存の文字列から EntryId を作成（旧ファイルの読み込み・テスト用）
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ログ用の短縮表記（先頭 8 文字）
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl From<Ulid> for EntryId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
