use ai_bus_common::error::{CollaboratorError, CollaboratorResult};

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

pub fn hash_password(plain: &str) -> CollaboratorResult<String> {
    bcrypt::hash(plain, BCRYPT_COST)
        .map_err(|e| CollaboratorError::Other(anyhow::anyhow!(e)))
}

pub fn verify_password(plain: &str, hashed: &str) -> CollaboratorResult<bool> {
    bcrypt::verify(plain, hashed).map_err(|e| CollaboratorError::Other(anyhow::anyhow!(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hashed = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hashed).unwrap());
        assert!(!verify_password("wrong password", &hashed).unwrap());
    }
}
