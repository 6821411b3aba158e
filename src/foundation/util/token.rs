/// Generates a fresh claim token: 16 random bytes, hex-encoded.
///
/// Uniqueness only needs to hold among live refreshers of one natural key, so
/// collision resistance at this width is more than sufficient.
pub fn new_claim_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
