use sha2::{Digest, Sha256};

/// The shared secret every build request must present.
///
/// Only a digest is kept. Comparison runs over fixed-length digests and
/// touches every byte, so timing does not reveal a matching prefix.
#[derive(Clone)]
pub struct SharedSecret {
    digest: Option<[u8; 32]>,
}

impl SharedSecret {
    /// An empty secret accepts nothing.
    pub fn new(secret: &str) -> Self {
        let digest = (!secret.is_empty()).then(|| digest(secret));
        Self { digest }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    pub fn verify(&self, presented: &str) -> bool {
        let Some(expected) = self.digest else {
            return false;
        };
        let actual = digest(presented);
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn digest(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}
