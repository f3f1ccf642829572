use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Length of the confirm/reject tokens attached to bank-transfer orders.
pub const TRANSFER_TOKEN_LEN: usize = 13;

/// An opaque random alphanumeric token. Used for the one-shot confirm/reject links mailed to the
/// seller; equality against the stored value is the only check ever performed on it.
pub fn random_token(len: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}
