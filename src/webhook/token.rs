use sha2::{Digest, Sha256};

/// Shared token the build service must present on its notifications:
/// `hex(SHA-256(repository + secret))`.
pub fn webhook_authorization_token(repo: &str, secret: &str) -> String {
    let digest = Sha256::digest(format!("{repo}{secret}").as_bytes());
    hex::encode(digest)
}

pub fn authorized(repo: &str, secret: &str, presented: &str) -> bool {
    webhook_authorization_token(repo, secret) == presented
}
