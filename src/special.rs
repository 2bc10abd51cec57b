//! C7 (special-value encodings, §4.7): whole-chunk bodies that need not
//! store any compressed bytes because their content is implied by a tag in
//! the extended header.

use crate::constants::*;
use crate::error::{BloscError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialType {
    /// Normal chunk: body holds bstarts + compressed block bodies.
    None,
    /// Body is empty; decompresses to `nbytes` zero bytes.
    Zero,
    /// Body is empty; decompresses to `nbytes/typesize` IEEE NaNs.
    Nan,
    /// Body holds one `typesize`-wide value broadcast `nbytes/typesize` times.
    Value,
    /// Body is empty; destination is left untouched on decompress.
    Uninit,
}

impl SpecialType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            SPECIAL_ZERO => SpecialType::Zero,
            SPECIAL_NAN => SpecialType::Nan,
            SPECIAL_VALUE => SpecialType::Value,
            SPECIAL_UNINIT => SpecialType::Uninit,
            _ => SpecialType::None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            SpecialType::None => SPECIAL_NONE,
            SpecialType::Zero => SPECIAL_ZERO,
            SpecialType::Nan => SPECIAL_NAN,
            SpecialType::Value => SPECIAL_VALUE,
            SpecialType::Uninit => SPECIAL_UNINIT,
        }
    }

    pub fn is_special(self) -> bool {
        !matches!(self, SpecialType::None)
    }
}

/// Fill `dest` (`nbytes` long) according to a whole-chunk special encoding.
/// `body` is whatever trails the header (empty, except for `Value`).
pub fn decode_special(
    special: SpecialType,
    typesize: usize,
    nbytes: usize,
    body: &[u8],
    dest: &mut [u8],
) -> Result<()> {
    match special {
        SpecialType::None => Err(BloscError::InvalidParam("not a special chunk".into())),
        SpecialType::Zero => {
            dest[..nbytes].fill(0);
            Ok(())
        }
        SpecialType::Uninit => Ok(()),
        SpecialType::Nan => {
            if typesize == 4 {
                for chunk in dest[..nbytes].chunks_exact_mut(4) {
                    chunk.copy_from_slice(&f32::NAN.to_le_bytes());
                }
                Ok(())
            } else if typesize == 8 {
                for chunk in dest[..nbytes].chunks_exact_mut(8) {
                    chunk.copy_from_slice(&f64::NAN.to_le_bytes());
                }
                Ok(())
            } else {
                Err(BloscError::InvalidParam(
                    "NaN special value requires typesize 4 or 8".into(),
                ))
            }
        }
        SpecialType::Value => {
            if body.len() < typesize {
                return Err(BloscError::ReadBufferShort);
            }
            let value = &body[..typesize];
            for chunk in dest[..nbytes].chunks_exact_mut(typesize) {
                chunk.copy_from_slice(value);
            }
            Ok(())
        }
    }
}

/// Detect whether a fully-filtered, pre-codec source buffer is entirely
/// zero bytes -- used by the chunk engine to retroactively fold a normal
/// compression pass into a `Zero` special chunk (§4.6 step 6).
pub fn is_all_zero(src: &[u8]) -> bool {
    src.iter().all(|&b| b == 0)
}

/// Detect whether `src` is `nbytes/typesize` repeats of the same
/// `typesize`-wide value, returning that value's bytes if so.
pub fn detect_repeated_value(src: &[u8], typesize: usize) -> Option<Vec<u8>> {
    if typesize == 0 || src.len() % typesize != 0 || src.is_empty() {
        return None;
    }
    let first = &src[..typesize];
    if src.chunks_exact(typesize).all(|c| c == first) {
        Some(first.to_vec())
    } else {
        None
    }
}
