//! Precision-truncation filter (§4.2): zero the low N mantissa bits of
//! IEEE-754 elements. Lossy by design; its inverse is the identity.

use crate::error::{BloscError, Result};

const BITS_MANTISSA_FLOAT: i8 = 23;
const BITS_MANTISSA_DOUBLE: i8 = 52;

fn zeroed_bits(prec_bits: i8, mantissa_bits: i8) -> Result<i8> {
    if prec_bits.unsigned_abs() as i32 > mantissa_bits as i32 {
        return Err(BloscError::FilterPipeline(format!(
            "precision cannot exceed {mantissa_bits} bits (asked for {prec_bits})"
        )));
    }
    let zeroed = if prec_bits >= 0 { mantissa_bits - prec_bits } else { -prec_bits };
    if zeroed >= mantissa_bits {
        return Err(BloscError::FilterPipeline(format!(
            "reduction cannot reach or exceed {mantissa_bits} bits (asked for {zeroed})"
        )));
    }
    Ok(zeroed)
}

/// Truncate precision of `src` (`typesize` 4 or 8), writing into `dest`.
/// Positive `prec_bits` keeps that many mantissa bits; negative removes
/// `-prec_bits` of them, Python-slice style.
pub fn truncate_precision(prec_bits: i8, typesize: usize, src: &[u8], dest: &mut [u8]) -> Result<()> {
    match typesize {
        4 => {
            let zeroed = zeroed_bits(prec_bits, BITS_MANTISSA_FLOAT)?;
            let mask: u32 = !((1u32 << zeroed) - 1);
            for (s, d) in src.chunks_exact(4).zip(dest.chunks_exact_mut(4)) {
                let v = u32::from_le_bytes(s.try_into().unwrap()) & mask;
                d.copy_from_slice(&v.to_le_bytes());
            }
            Ok(())
        }
        8 => {
            let zeroed = zeroed_bits(prec_bits, BITS_MANTISSA_DOUBLE)?;
            let mask: u64 = !((1u64 << zeroed) - 1);
            for (s, d) in src.chunks_exact(8).zip(dest.chunks_exact_mut(8)) {
                let v = u64::from_le_bytes(s.try_into().unwrap()) & mask;
                d.copy_from_slice(&v.to_le_bytes());
            }
            Ok(())
        }
        _ => Err(BloscError::FilterPipeline(format!(
            "trunc-prec filter only supports typesize 4 or 8, got {typesize}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_float_mantissa() {
        let values: Vec<f32> = vec![1.234_567_8, -9.999, 0.0, 3.141_592_7];
        let src: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut dest = vec![0u8; src.len()];
        truncate_precision(10, 4, &src, &mut dest).unwrap();

        for (s, d) in src.chunks_exact(4).zip(dest.chunks_exact(4)) {
            let sv = u32::from_le_bytes(s.try_into().unwrap());
            let dv = u32::from_le_bytes(d.try_into().unwrap());
            assert_eq!(dv & 0x1FFF, 0);
            assert_eq!(sv & !0x1FFFu32, dv);
        }
    }

    #[test]
    fn rejects_out_of_range_precision() {
        let src = vec![0u8; 4];
        let mut dest = vec![0u8; 4];
        assert!(truncate_precision(30, 4, &src, &mut dest).is_err());
    }

    #[test]
    fn rejects_unsupported_typesize() {
        let src = vec![0u8; 2];
        let mut dest = vec![0u8; 2];
        assert!(truncate_precision(4, 2, &src, &mut dest).is_err());
    }
}
