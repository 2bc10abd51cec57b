//! C3: filter pipeline (§4.3). Applies the declared ordered pipeline
//! end-to-start on compression and start-to-end on decompression, rotating
//! scratch buffers between steps.

use crate::constants::*;
use crate::error::Result;
use crate::filters;

/// Optional caller callback run once before the pipeline on compression, or
/// once after it on decompression (§4.3, §9 "Caller-installed pre-/post-filter").
pub trait BlockCallback: Send + Sync {
    fn run(&self, block_input: &[u8], block_output: &mut [u8], block_index: usize, tid: usize) -> Result<()>;
}

#[derive(Clone, Copy)]
pub struct FilterPipeline {
    pub filters: [u8; MAX_FILTERS],
    pub filters_meta: [u8; MAX_FILTERS],
    pub typesize: usize,
}

impl FilterPipeline {
    pub fn identity(typesize: usize) -> Self {
        FilterPipeline {
            filters: [FILTER_IDENTITY; MAX_FILTERS],
            filters_meta: [0; MAX_FILTERS],
            typesize,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.filters.iter().all(|&f| f == FILTER_IDENTITY)
    }

    pub fn uses_delta(&self) -> bool {
        self.filters.contains(&FILTER_DELTA)
    }

    /// Forward pass (compression direction): identity-skip, slots applied
    /// from the highest index down to zero. `reference` supplies the first
    /// block's original bytes for the delta filter's reference window; it
    /// is `None` when the block being processed *is* the first block.
    pub fn apply_forward(&self, block: &[u8], reference: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut current = block.to_vec();
        for idx in (0..MAX_FILTERS).rev() {
            let id = self.filters[idx];
            if id == FILTER_IDENTITY {
                continue;
            }
            current = self.apply_one_forward(id, self.filters_meta[idx], &current, reference)?;
        }
        Ok(current)
    }

    /// Reverse pass (decompression direction): slots applied from zero up
    /// to the highest index, undoing [`apply_forward`]'s order.
    pub fn apply_reverse(&self, block: &[u8], reference: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut current = block.to_vec();
        for idx in 0..MAX_FILTERS {
            let id = self.filters[idx];
            if id == FILTER_IDENTITY {
                continue;
            }
            current = self.apply_one_reverse(id, self.filters_meta[idx], &current, reference)?;
        }
        Ok(current)
    }

    fn apply_one_forward(
        &self,
        id: u8,
        meta: u8,
        block: &[u8],
        reference: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut out = vec![0u8; block.len()];
        match id {
            FILTER_BYTE_SHUFFLE => {
                filters::shuffle(self.typesize, block.len(), block, &mut out);
            }
            FILTER_BIT_SHUFFLE => {
                filters::bitshuffle(self.typesize, block.len(), block, &mut out)?;
            }
            FILTER_DELTA => match reference {
                None => filters::delta::delta_encode(self.typesize, block, &mut out),
                Some(dref) => filters::delta::delta_encode_with_reference(self.typesize, block, dref, &mut out),
            },
            FILTER_TRUNC_PREC => {
                filters::trunc_prec::truncate_precision(meta as i8, self.typesize, block, &mut out)?;
            }
            _ => out.copy_from_slice(block),
        }
        Ok(out)
    }

    fn apply_one_reverse(
        &self,
        id: u8,
        _meta: u8,
        block: &[u8],
        reference: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut out = block.to_vec();
        match id {
            FILTER_BYTE_SHUFFLE => {
                let mut unshuffled = vec![0u8; block.len()];
                filters::unshuffle(self.typesize, block.len(), block, &mut unshuffled);
                out = unshuffled;
            }
            FILTER_BIT_SHUFFLE => {
                let mut unshuffled = vec![0u8; block.len()];
                filters::bitunshuffle(self.typesize, block.len(), block, &mut unshuffled)?;
                out = unshuffled;
            }
            FILTER_DELTA => match reference {
                None => filters::delta::delta_decode(self.typesize, &mut out),
                Some(dref) => filters::delta::delta_decode_with_reference(self.typesize, &mut out, dref),
            },
            FILTER_TRUNC_PREC => {
                // Lossy filter; identity on decode (§4.2).
            }
            _ => {}
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_shuffle_roundtrips() {
        let pipeline = FilterPipeline {
            filters: [0, 0, 0, 0, 0, FILTER_BYTE_SHUFFLE],
            filters_meta: [0; MAX_FILTERS],
            typesize: 4,
        };
        let block: Vec<u8> = (0..64u8).collect();
        let forward = pipeline.apply_forward(&block, None).unwrap();
        let back = pipeline.apply_reverse(&forward, None).unwrap();
        assert_eq!(block, back);
    }

    #[test]
    fn delta_reference_roundtrips() {
        let pipeline = FilterPipeline {
            filters: [0, 0, 0, 0, 0, FILTER_DELTA],
            filters_meta: [0; MAX_FILTERS],
            typesize: 1,
        };
        let reference: Vec<u8> = (0..32u8).collect();
        let block: Vec<u8> = (32..64u8).collect();

        let forward = pipeline.apply_forward(&block, Some(&reference)).unwrap();
        let back = pipeline.apply_reverse(&forward, Some(&reference)).unwrap();
        assert_eq!(block, back);
    }

    #[test]
    fn combined_shuffle_and_delta_roundtrips() {
        let pipeline = FilterPipeline {
            filters: [0, 0, 0, 0, FILTER_DELTA, FILTER_BYTE_SHUFFLE],
            filters_meta: [0; MAX_FILTERS],
            typesize: 4,
        };
        let block: Vec<u8> = (0..128u8).map(|b| b.wrapping_mul(3)).collect();
        let forward = pipeline.apply_forward(&block, None).unwrap();
        let back = pipeline.apply_reverse(&forward, None).unwrap();
        assert_eq!(block, back);
    }
}
