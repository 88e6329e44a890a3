/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    let (a, b) = (a as u128, b as u128);
    let res = if a < b { b * b + a } else { a * a + a + b };
    // Fold back into 64 bits; the value is only used as a hash key.
    (res ^ (res >> 64)) as u64
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub trait MyHash {
    /// Perfect (for small inputs) hash function used by the node and computed tables.
    fn hash(&self) -> u64;
}
