//! String constants in compiled class files.
//!
//! Only the constant pool is touched. A `CONSTANT_String` whose text
//! contains the search string is pointed at a new `CONSTANT_Utf8` appended
//! to the end of the pool. Existing indices never move, and names or
//! descriptors sharing the old Utf8 entry keep their value.

use std::ops::Range;

use rustc_hash::FxHashMap;
use thiserror::Error;

const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Offset of `constant_pool_count` in the class file header.
const POOL_COUNT_OFFSET: usize = 8;

const TAG_UTF8: u8 = 1;
const TAG_STRING: u8 = 8;

/// Reasons a class file cannot be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("not a class file")]
    BadMagic,

    #[error("class file ends inside the constant pool")]
    Truncated,

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool has no room for {0} more entries")]
    PoolFull(usize),

    #[error("rewritten string is {0} bytes, more than a constant can hold")]
    TooLong(usize),
}

/// A rewritten class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRewrite {
    pub bytes: Vec<u8>,
    /// Number of `CONSTANT_String` entries that now point at new text.
    pub replaced: usize,
}

/// The parts of a constant pool needed to retarget string constants.
#[derive(Debug)]
struct ConstantPool {
    count: u16,
    /// Byte range of each Utf8 entry's contents, by pool index.
    utf8: FxHashMap<u16, Range<usize>>,
    /// Offset of each `CONSTANT_String`'s `string_index` field, with its value.
    strings: Vec<(usize, u16)>,
    /// First byte after the pool.
    end: usize,
}

impl ConstantPool {
    fn parse(class: &[u8]) -> Result<Self, ClassFileError> {
        if class.get(..4) != Some(&MAGIC[..]) {
            return Err(ClassFileError::BadMagic);
        }
        let count = read_u16(class, POOL_COUNT_OFFSET)?;

        let mut pool = Self {
            count,
            utf8: FxHashMap::default(),
            strings: Vec::new(),
            end: POOL_COUNT_OFFSET + 2,
        };
        let mut pos = pool.end;
        let mut index: u16 = 1;

        while index < count {
            let tag = *class.get(pos).ok_or(ClassFileError::Truncated)?;
            let (size, slots) = match tag {
                TAG_UTF8 => {
                    let len = read_u16(class, pos + 1)? as usize;
                    pool.utf8.insert(index, pos + 3..pos + 3 + len);
                    (3 + len, 1)
                }
                TAG_STRING => {
                    pool.strings.push((pos + 1, read_u16(class, pos + 1)?));
                    (3, 1)
                }
                // Class, MethodType, Module, Package
                7 | 16 | 19 | 20 => (3, 1),
                // MethodHandle
                15 => (4, 1),
                // Integer, Float, Fieldref, Methodref, InterfaceMethodref,
                // NameAndType, Dynamic, InvokeDynamic
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => (5, 1),
                // Long and Double take two slots
                5 | 6 => (9, 2),
                _ => return Err(ClassFileError::UnknownTag { tag, index }),
            };
            pos += size;
            if pos > class.len() {
                return Err(ClassFileError::Truncated);
            }
            index = index.saturating_add(slots);
        }

        pool.end = pos;
        Ok(pool)
    }

    fn text(&self, class: &[u8], index: u16) -> Option<String> {
        let range = self.utf8.get(&index)?;
        decode_modified_utf8(&class[range.clone()])
    }
}

/// Replace `from` with `to` inside every string constant of `class`.
///
/// A constant equal to `from` becomes `to`; a constant containing it has
/// every occurrence replaced. Returns `Ok(None)` when nothing matched.
pub fn replace_string_constants(
    class: &[u8],
    from: &str,
    to: &str,
) -> Result<Option<StringRewrite>, ClassFileError> {
    let pool = ConstantPool::parse(class)?;

    let mut appended: Vec<Vec<u8>> = Vec::new();
    let mut new_indices: FxHashMap<String, u16> = FxHashMap::default();
    let mut retargets: Vec<(usize, u16)> = Vec::new();

    for &(field, utf8_index) in &pool.strings {
        let Some(text) = pool.text(class, utf8_index) else {
            continue;
        };
        if !text.contains(from) {
            continue;
        }

        let rewritten = text.replace(from, to);
        let index = match new_indices.get(&rewritten) {
            Some(&index) => index,
            None => {
                let encoded = encode_modified_utf8(&rewritten);
                if encoded.len() > u16::MAX as usize {
                    return Err(ClassFileError::TooLong(encoded.len()));
                }
                // Index 65535 would need a count past `u16::MAX`.
                let next = pool.count as usize + appended.len();
                if next >= u16::MAX as usize {
                    return Err(ClassFileError::PoolFull(appended.len() + 1));
                }
                let index = next as u16;
                appended.push(encoded);
                new_indices.insert(rewritten, index);
                index
            }
        };
        retargets.push((field, index));
    }

    if retargets.is_empty() {
        return Ok(None);
    }

    let new_count = u16::try_from(pool.count as usize + appended.len())
        .map_err(|_| ClassFileError::PoolFull(appended.len()))?;

    let appended_len: usize = appended.iter().map(|bytes| bytes.len() + 3).sum();
    let mut bytes = Vec::with_capacity(class.len() + appended_len);
    bytes.extend_from_slice(&class[..pool.end]);
    bytes[POOL_COUNT_OFFSET..POOL_COUNT_OFFSET + 2].copy_from_slice(&new_count.to_be_bytes());
    for &(field, index) in &retargets {
        bytes[field..field + 2].copy_from_slice(&index.to_be_bytes());
    }
    for encoded in &appended {
        bytes.push(TAG_UTF8);
        // Length checked above.
        bytes.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        bytes.extend_from_slice(encoded);
    }
    bytes.extend_from_slice(&class[pool.end..]);

    Ok(Some(StringRewrite {
        bytes,
        replaced: retargets.len(),
    }))
}

fn read_u16(bytes: &[u8], pos: usize) -> Result<u16, ClassFileError> {
    match bytes.get(pos..pos + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(ClassFileError::Truncated),
    }
}

/// Decode the JVM's modified UTF-8; `None` for malformed input or lone surrogates.
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let continuation = |i: usize| -> Option<u16> {
        let byte = *bytes.get(i)?;
        (byte & 0xC0 == 0x80).then_some(u16::from(byte & 0x3F))
    };

    while i < bytes.len() {
        let lead = u16::from(bytes[i]);
        match bytes[i] {
            0x01..=0x7F => {
                units.push(lead);
                i += 1;
            }
            0xC0..=0xDF => {
                units.push(((lead & 0x1F) << 6) | continuation(i + 1)?);
                i += 2;
            }
            0xE0..=0xEF => {
                units.push(((lead & 0x0F) << 12) | (continuation(i + 1)? << 6) | continuation(i + 2)?);
                i += 3;
            }
            _ => return None,
        }
    }

    String::from_utf16(&units).ok()
}

/// Encode text as modified UTF-8: NUL is two bytes and supplementary
/// characters are written as surrogate pairs.
fn encode_modified_utf8(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                bytes.push(0xC0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                bytes.push(0xE0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    bytes
}

/// Builds minimal class files for tests.
#[cfg(test)]
pub(crate) struct ClassBuilder {
    pool: Vec<u8>,
    next: u16,
}

#[cfg(test)]
impl ClassBuilder {
    pub(crate) fn new() -> Self {
        Self {
            pool: Vec::new(),
            next: 1,
        }
    }

    fn push(&mut self, entry: &[u8], slots: u16) -> u16 {
        let index = self.next;
        self.pool.extend_from_slice(entry);
        self.next += slots;
        index
    }

    pub(crate) fn utf8(&mut self, text: &str) -> u16 {
        let encoded = encode_modified_utf8(text);
        let mut entry = vec![TAG_UTF8];
        entry.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        entry.extend_from_slice(&encoded);
        self.push(&entry, 1)
    }

    pub(crate) fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut entry = vec![7];
        entry.extend_from_slice(&name.to_be_bytes());
        self.push(&entry, 1)
    }

    pub(crate) fn string_of(&mut self, utf8_index: u16) -> u16 {
        let mut entry = vec![TAG_STRING];
        entry.extend_from_slice(&utf8_index.to_be_bytes());
        self.push(&entry, 1)
    }

    pub(crate) fn string(&mut self, text: &str) -> u16 {
        let utf8 = self.utf8(text);
        self.string_of(utf8)
    }

    pub(crate) fn long(&mut self, value: i64) -> u16 {
        let mut entry = vec![5];
        entry.extend_from_slice(&value.to_be_bytes());
        self.push(&entry, 2)
    }

    /// Header, pool, then an empty body for `this_class extends super_class`.
    pub(crate) fn finish(self, this_class: u16, super_class: u16) -> Vec<u8> {
        let mut class = MAGIC.to_vec();
        class.extend_from_slice(&[0, 0, 0, 52]);
        class.extend_from_slice(&self.next.to_be_bytes());
        class.extend_from_slice(&self.pool);
        class.extend_from_slice(&0x0021u16.to_be_bytes());
        class.extend_from_slice(&this_class.to_be_bytes());
        class.extend_from_slice(&super_class.to_be_bytes());
        // interfaces, fields, methods, attributes
        class.extend_from_slice(&[0; 8]);
        class
    }
}

/// Text of every `CONSTANT_String` in pool order.
#[cfg(test)]
pub(crate) fn string_constants(class: &[u8]) -> Vec<String> {
    let pool = ConstantPool::parse(class).expect("Failed to parse constant pool");
    pool.strings
        .iter()
        .filter_map(|&(_, index)| pool.text(class, index))
        .collect()
}
