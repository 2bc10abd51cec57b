//! C9: dictionary training (§4.6 "use_dict", §9). Collects filtered block
//! outputs as samples, invokes the zstd trainer, and hands back a
//! dictionary blob the chunk engine embeds in the extended header's
//! `ext_flags` (`EXT_FLAG_DICT`) and `codecs::compress_with_dict` uses.

use crate::error::{BloscError, Result};

/// Train a dictionary from `samples` (each one block's filtered output),
/// capped at `max_size` bytes. Only the regular cover-less trainer is
/// exposed here: fastcover tuning knobs are not wired up (§9 open question).
pub fn train_dictionary(samples: &[Vec<u8>], max_size: usize) -> Result<Vec<u8>> {
    if samples.is_empty() {
        return Err(BloscError::CodecDict("no samples supplied for dictionary training".into()));
    }
    zstd::dict::from_samples(samples, max_size).map_err(|e| BloscError::CodecDict(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trains_from_repeated_samples() {
        let sample: Vec<u8> = (0..256u32).flat_map(|v| (v % 7).to_le_bytes()).collect();
        let samples: Vec<Vec<u8>> = (0..16).map(|_| sample.clone()).collect();
        let dict = train_dictionary(&samples, 4096).unwrap();
        assert!(!dict.is_empty());
    }

    #[test]
    fn rejects_empty_sample_set() {
        assert!(train_dictionary(&[], 4096).is_err());
    }
}
