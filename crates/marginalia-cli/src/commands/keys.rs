//! Key generation.

use marginalia_crypto::nip19::{encode_npub, encode_nsec};
use marginalia_crypto::signing::Keys;

use crate::output;
use crate::GlobalOpts;

pub fn keygen(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let keys = Keys::generate();
    let nsec = encode_nsec(&keys).map_err(|e| e.to_string())?;
    let pubkey = keys.public_key();
    let npub = encode_npub(&pubkey).map_err(|e| e.to_string())?;

    output::print_record(
        &[
            ("nsec", nsec.into()),
            ("npub", npub.into()),
            ("pubkey", pubkey.to_hex().into()),
        ],
        opts.json,
    );
    Ok(())
}
