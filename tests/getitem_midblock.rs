use blockzip::context::{Cparams, Context};
use blockzip::Codec;

#[test]
fn getitem_extracts_values_spanning_a_block_boundary() {
    let typesize = 4;
    let values: Vec<u32> = (0..16384u32).collect();
    let src: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

    let cparams = Cparams::builder()
        .typesize(typesize)
        .clevel(5)
        .codec(Codec::BloscLz)
        .blocksize(4096)
        .build();
    let ctx = Context::for_compression(cparams);
    let mut dest = vec![0u8; src.len() * 2 + blockzip::constants::MAX_OVERHEAD];
    let cbytes = ctx.compress(&src, &mut dest).unwrap();

    let mut out = vec![0u8; 3 * typesize];
    let n = blockzip::api::getitem(&dest[..cbytes], 5000, 3, &mut out).unwrap();
    assert_eq!(n, 3 * typesize);

    let got: Vec<u32> = out.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect();
    assert_eq!(got, vec![5000, 5001, 5002]);
}
