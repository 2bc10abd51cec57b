use blockzip::context::{Cparams, Context};
use blockzip::{Codec, SpecialType};

fn compress_roundtrip(src: &[u8], typesize: usize) -> (Vec<u8>, usize) {
    let cparams = Cparams::builder().typesize(typesize).clevel(5).codec(Codec::BloscLz).build();
    let ctx = Context::for_compression(cparams);
    let mut dest = vec![0u8; src.len() * 2 + blockzip::constants::MAX_OVERHEAD];
    let cbytes = ctx.compress(src, &mut dest).unwrap();
    (dest, cbytes)
}

#[test]
fn all_zero_chunk_folds_into_special_and_decodes() {
    let src = vec![0u8; 8192];
    let (dest, cbytes) = compress_roundtrip(&src, 4);
    assert_eq!(cbytes, blockzip::constants::EXTENDED_HEADER_LEN);

    let header = blockzip::header::read_header(&dest[..cbytes], true).unwrap();
    assert_eq!(header.special_type(), SpecialType::Zero);

    let mut out = vec![0u8; src.len()];
    blockzip::api::decompress(&dest[..cbytes], &mut out).unwrap();
    assert_eq!(out, src);
}

#[test]
fn repeated_value_is_stored_as_one_element() {
    let value: u32 = 0xDEADBEEF;
    let src: Vec<u8> = (0..4096).flat_map(|_| value.to_le_bytes()).collect();

    // The chunk engine only auto-folds the all-zero case; broadcasting a
    // non-zero repeated value goes through the explicit VALUE constructor.
    let mut dest = vec![0u8; blockzip::constants::EXTENDED_HEADER_LEN + 4];
    let cbytes = blockzip::api::compress_value(4, &src, &mut dest).unwrap();

    let header = blockzip::header::read_header(&dest[..cbytes], true).unwrap();
    assert_eq!(header.special_type(), SpecialType::Value);
    let header_len = header.header_len();
    assert_eq!(&dest[header_len..header_len + 4], &[0xEF, 0xBE, 0xAD, 0xDE]);

    let mut out = vec![0u8; src.len()];
    let nbytes = blockzip::chunk::decompress_chunk(&dest[..cbytes], &mut out).unwrap();
    assert_eq!(nbytes, src.len());
    assert_eq!(out, src);
}

#[test]
fn nan_and_uninit_chunks_via_explicit_api() {
    let mut nan_dest = vec![0u8; blockzip::constants::EXTENDED_HEADER_LEN];
    let cbytes = blockzip::api::compress_nan(4, 64, &mut nan_dest).unwrap();
    let mut out = vec![0u8; 64];
    blockzip::api::decompress(&nan_dest[..cbytes], &mut out).unwrap();
    for chunk in out.chunks_exact(4) {
        assert!(f32::from_le_bytes(chunk.try_into().unwrap()).is_nan());
    }

    let mut uninit_dest = vec![0u8; blockzip::constants::EXTENDED_HEADER_LEN];
    let cbytes = blockzip::api::compress_uninit(4, 64, &mut uninit_dest).unwrap();
    let mut out = vec![0x42u8; 64];
    blockzip::api::decompress(&uninit_dest[..cbytes], &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0x42));
}
