use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const WEBHOOK_SECRET_PREFIX: &str = "whsec_";

pub fn generate_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_webhook_secret() -> String {
    format!("{}{}", WEBHOOK_SECRET_PREFIX, generate_token(32))
}
