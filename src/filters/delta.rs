//! Delta filter (§4.2): element-wise subtraction from element 0 on encode,
//! prefix-sum reconstruction on decode. Dispatches on `typesize` the way
//! `blosc/delta.rs` does, but works through safe `chunks_exact` windows
//! instead of raw pointer reinterpretation.

macro_rules! delta_impl {
    ($name_enc:ident, $name_dec:ident, $ty:ty) => {
        fn $name_enc(src: &[u8], dest: &mut [u8]) {
            const SZ: usize = std::mem::size_of::<$ty>();
            let n = src.len() / SZ;
            let rem = src.len() % SZ;
            if rem > 0 {
                let start = src.len() - rem;
                dest[start..src.len()].copy_from_slice(&src[start..src.len()]);
            }
            if n == 0 {
                return;
            }
            let mut prev = <$ty>::from_le_bytes(src[0..SZ].try_into().unwrap());
            dest[0..SZ].copy_from_slice(&prev.to_le_bytes());
            for i in 1..n {
                let cur = <$ty>::from_le_bytes(src[i * SZ..i * SZ + SZ].try_into().unwrap());
                dest[i * SZ..i * SZ + SZ].copy_from_slice(&cur.wrapping_sub(prev).to_le_bytes());
                prev = cur;
            }
        }

        fn $name_dec(dest: &mut [u8]) {
            const SZ: usize = std::mem::size_of::<$ty>();
            let n = dest.len() / SZ;
            if n == 0 {
                return;
            }
            let mut prev = <$ty>::from_le_bytes(dest[0..SZ].try_into().unwrap());
            for i in 1..n {
                let d = <$ty>::from_le_bytes(dest[i * SZ..i * SZ + SZ].try_into().unwrap());
                let cur = d.wrapping_add(prev);
                dest[i * SZ..i * SZ + SZ].copy_from_slice(&cur.to_le_bytes());
                prev = cur;
            }
        }
    };
}

delta_impl!(encode_u8, decode_u8, u8);
delta_impl!(encode_u16, decode_u16, u16);
delta_impl!(encode_u32, decode_u32, u32);
delta_impl!(encode_u64, decode_u64, u64);

macro_rules! delta_ref_impl {
    ($name_enc:ident, $name_dec:ident, $ty:ty) => {
        fn $name_enc(block: &[u8], dref: &[u8], out: &mut [u8]) {
            const SZ: usize = std::mem::size_of::<$ty>();
            let n = block.len().min(dref.len());
            let nelem = n / SZ;
            for i in 0..nelem {
                let b = <$ty>::from_le_bytes(block[i * SZ..i * SZ + SZ].try_into().unwrap());
                let r = <$ty>::from_le_bytes(dref[i * SZ..i * SZ + SZ].try_into().unwrap());
                out[i * SZ..i * SZ + SZ].copy_from_slice(&b.wrapping_sub(r).to_le_bytes());
            }
            let tail = nelem * SZ;
            out[tail..].copy_from_slice(&block[tail..]);
        }

        fn $name_dec(out: &mut [u8], dref: &[u8]) {
            const SZ: usize = std::mem::size_of::<$ty>();
            let n = out.len().min(dref.len());
            let nelem = n / SZ;
            for i in 0..nelem {
                let d = <$ty>::from_le_bytes(out[i * SZ..i * SZ + SZ].try_into().unwrap());
                let r = <$ty>::from_le_bytes(dref[i * SZ..i * SZ + SZ].try_into().unwrap());
                out[i * SZ..i * SZ + SZ].copy_from_slice(&d.wrapping_add(r).to_le_bytes());
            }
        }
    };
}

delta_ref_impl!(encode_ref_u8, decode_ref_u8, u8);
delta_ref_impl!(encode_ref_u16, decode_ref_u16, u16);
delta_ref_impl!(encode_ref_u32, decode_ref_u32, u32);
delta_ref_impl!(encode_ref_u64, decode_ref_u64, u64);

/// Apply delta coding to `src`, writing element-wise differences (wrapping)
/// into `dest`; element 0 is carried verbatim.
pub fn delta_encode(typesize: usize, src: &[u8], dest: &mut [u8]) {
    match typesize {
        1 => encode_u8(src, dest),
        2 => encode_u16(src, dest),
        4 => encode_u32(src, dest),
        8 => encode_u64(src, dest),
        _ => {
            // Any other width: treat as a stream of bytes, matching the
            // teacher's fallback of recursing with typesize 1.
            encode_u8(src, dest)
        }
    }
}

/// Undo delta coding in place, reconstructing the prefix sum.
pub fn delta_decode(typesize: usize, dest: &mut [u8]) {
    match typesize {
        1 => decode_u8(dest),
        2 => decode_u16(dest),
        4 => decode_u32(dest),
        8 => decode_u64(dest),
        _ => decode_u8(dest),
    }
}

/// Cross-block delta: element-wise subtraction against a fixed reference
/// window (the chunk's block-0 bytes) instead of the previous element,
/// dispatching by `typesize` the same as [`delta_encode`]. Any bytes beyond
/// the last full element, or beyond the reference's length, pass through
/// unchanged.
pub fn delta_encode_with_reference(typesize: usize, block: &[u8], dref: &[u8], out: &mut [u8]) {
    match typesize {
        1 => encode_ref_u8(block, dref, out),
        2 => encode_ref_u16(block, dref, out),
        4 => encode_ref_u32(block, dref, out),
        8 => encode_ref_u64(block, dref, out),
        _ => encode_ref_u8(block, dref, out),
    }
}

/// Inverse of [`delta_encode_with_reference`], in place.
pub fn delta_decode_with_reference(typesize: usize, out: &mut [u8], dref: &[u8]) {
    match typesize {
        1 => decode_ref_u8(out, dref),
        2 => decode_ref_u16(out, dref),
        4 => decode_ref_u32(out, dref),
        8 => decode_ref_u64(out, dref),
        _ => decode_ref_u8(out, dref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_u32() {
        let src: Vec<u8> = (0..64u32)
            .flat_map(|v| (v * 7 + 3).to_le_bytes())
            .collect();
        let mut encoded = vec![0u8; src.len()];
        delta_encode(4, &src, &mut encoded);

        let mut decoded = encoded.clone();
        delta_decode(4, &mut decoded);
        assert_eq!(src, decoded);
    }

    #[test]
    fn roundtrip_u8() {
        let src: Vec<u8> = (0..200u32).map(|v| (v * 3) as u8).collect();
        let mut encoded = vec![0u8; src.len()];
        delta_encode(1, &src, &mut encoded);

        let mut decoded = encoded.clone();
        delta_decode(1, &mut decoded);
        assert_eq!(src, decoded);
    }

    #[test]
    fn trailing_bytes_survive_roundtrip_when_not_a_multiple_of_typesize() {
        let src: Vec<u8> = (0..23u32).map(|v| (v * 5) as u8).collect();
        let mut encoded = vec![0u8; src.len()];
        delta_encode(4, &src, &mut encoded);

        let mut decoded = encoded.clone();
        delta_decode(4, &mut decoded);
        assert_eq!(src, decoded);
    }

    #[test]
    fn roundtrip_with_reference_u32() {
        let dref: Vec<u8> = (0..64u32).flat_map(|v| (v * 2).to_le_bytes()).collect();
        let block: Vec<u8> = (0..64u32).flat_map(|v| (v * 7 + 11).to_le_bytes()).collect();
        let mut encoded = vec![0u8; block.len()];
        delta_encode_with_reference(4, &block, &dref, &mut encoded);

        let mut decoded = encoded.clone();
        delta_decode_with_reference(4, &mut decoded, &dref);
        assert_eq!(block, decoded);
    }

    #[test]
    fn reference_trailing_bytes_pass_through() {
        let dref: Vec<u8> = (0..40u8).collect();
        let block: Vec<u8> = (0..23u8).map(|b| b.wrapping_mul(3)).collect();
        let mut encoded = vec![0u8; block.len()];
        delta_encode_with_reference(4, &block, &dref, &mut encoded);

        let mut decoded = encoded.clone();
        delta_decode_with_reference(4, &mut decoded, &dref);
        assert_eq!(block, decoded);
    }
}
