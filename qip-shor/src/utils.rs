use std::f64::consts::PI;

/// Computes `base^exp mod modulus` by repeated squaring.
///
/// # Example
/// ```
/// use qip_shor::utils::modpow;
///
/// assert_eq!(modpow(7, 4, 15), 1);
/// assert_eq!(modpow(7, 2, 15), 4);
/// assert_eq!(modpow(3, 0, 7), 1);
/// ```
pub fn modpow(base: u64, exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let modulus = u128::from(modulus);
    let mut result = 1u128;
    let mut base = u128::from(base) % modulus;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }
    result as u64
}

/// Greatest common divisor, `gcd(a, 0) = a`.
///
/// # Example
/// ```
/// use qip_shor::utils::gcd;
///
/// assert_eq!(gcd(12, 18), 6);
/// assert_eq!(gcd(7, 0), 7);
/// ```
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `cos(pi * fac / div)`.
#[inline]
pub fn cosine(fac: f64, div: f64) -> f64 {
    (PI * fac / div).cos()
}

/// `sin(pi * fac / div)`.
#[inline]
pub fn sine(fac: f64, div: f64) -> f64 {
    (PI * fac / div).sin()
}

/// Number of bits needed to write `n`, zero for zero.
///
/// # Example
/// ```
/// use qip_shor::utils::bit_length;
///
/// assert_eq!(bit_length(15), 4);
/// assert_eq!(bit_length(16), 5);
/// ```
#[inline]
pub fn bit_length(n: u64) -> usize {
    (u64::BITS - n.leading_zeros()) as usize
}

/// Reverse a bitstring, switching between highest-qubit-first and lowest-qubit-first order.
pub fn reverse_bits(bits: &str) -> String {
    bits.chars().rev().collect()
}
