use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a collision-resistant short identifier (≥72 bits of entropy,
/// component ID in §2): a type prefix plus 16 base-36 characters, which
/// at log2(36)≈5.17 bits/char gives ~82 bits.
pub fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..16)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{prefix}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_prefixed_ids() {
        let a = generate("task");
        let b = generate("task");
        assert_ne!(a, b);
        assert!(a.starts_with("task_"));
        assert_eq!(a.len(), "task_".len() + 16);
    }
}
