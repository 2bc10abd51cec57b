//! Environment-variable overrides for the non-contextual API (§3, ambient
//! config layer). Mirrors the teacher's historical `BLOSC_*` variables;
//! parse failures are logged and the variable is ignored rather than
//! treated as fatal, matching the forgiving style of env-driven knobs.

use crate::chunk::SplitMode;
use crate::codecs::Codec;
use log::warn;
use std::env;

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("ignoring malformed {name}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}

pub fn clevel() -> Option<u8> {
    parse_var::<u8>("BLOSC_CLEVEL").map(|v| v.min(9))
}

pub fn shuffle() -> Option<u8> {
    parse_var("BLOSC_SHUFFLE")
}

pub fn delta() -> Option<bool> {
    parse_var::<u8>("BLOSC_DELTA").map(|v| v != 0)
}

pub fn typesize() -> Option<usize> {
    parse_var("BLOSC_TYPESIZE")
}

pub fn compressor() -> Option<Codec> {
    match env::var("BLOSC_COMPRESSOR") {
        Ok(name) => match name.to_ascii_lowercase().as_str() {
            "blosclz" => Some(Codec::BloscLz),
            "lz4" => Some(Codec::Lz4),
            "lz4hc" => Some(Codec::Lz4Hc),
            "zlib" => Some(Codec::Zlib),
            "zstd" => Some(Codec::Zstd),
            other => {
                warn!("ignoring unknown BLOSC_COMPRESSOR={other}");
                None
            }
        },
        Err(_) => None,
    }
}

pub fn blocksize() -> Option<usize> {
    parse_var("BLOSC_BLOCKSIZE")
}

pub fn nthreads() -> Option<usize> {
    parse_var::<usize>("BLOSC_NTHREADS").map(|v| v.max(1))
}

pub fn splitmode() -> Option<SplitMode> {
    match env::var("BLOSC_SPLITMODE") {
        Ok(name) => match name.to_ascii_uppercase().as_str() {
            "ALWAYS" => Some(SplitMode::Always),
            "NEVER" => Some(SplitMode::Never),
            "AUTO" => Some(SplitMode::Auto),
            "FORWARD_COMPAT" => Some(SplitMode::ForwardCompat),
            other => {
                warn!("ignoring unknown BLOSC_SPLITMODE={other}");
                None
            }
        },
        Err(_) => None,
    }
}

pub fn nolock() -> bool {
    env::var("BLOSC_NOLOCK").map(|v| v != "0").unwrap_or(false)
}

pub fn blosc1_compat() -> bool {
    env::var("BLOSC_BLOSC1_COMPAT").map(|v| v != "0").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_compressor_name_is_ignored() {
        std::env::set_var("BLOSC_COMPRESSOR", "not-a-codec");
        assert_eq!(compressor(), None);
        std::env::remove_var("BLOSC_COMPRESSOR");
    }

    #[test]
    fn recognises_known_compressor_name() {
        std::env::set_var("BLOSC_COMPRESSOR", "zstd");
        assert_eq!(compressor(), Some(Codec::Zstd));
        std::env::remove_var("BLOSC_COMPRESSOR");
    }

    #[test]
    fn recognises_splitmode_names() {
        std::env::set_var("BLOSC_SPLITMODE", "NEVER");
        assert_eq!(splitmode(), Some(SplitMode::Never));
        std::env::remove_var("BLOSC_SPLITMODE");
    }
}
