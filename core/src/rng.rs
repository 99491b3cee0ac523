//! Card number generation.
//!
//! RULE: a generated card number is a request-scoped value. It is drawn
//! once per create-card request and passed into that request; nothing
//! caches it between requests.

use crate::types::CardNetwork;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Seedable RNG that draws card numbers.
pub struct CardRng {
    inner: Pcg64Mcg,
}

impl CardRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    fn next_digit(&mut self) -> u8 {
        self.next_u64_below(10) as u8
    }

    /// Draw a Luhn-valid card number with the network's issuer prefix and
    /// length (15 digits for American Express, 16 otherwise).
    pub fn card_number(&mut self, network: CardNetwork) -> String {
        let (mut digits, len): (Vec<u8>, usize) = match network {
            CardNetwork::Visa => (vec![4], 16),
            CardNetwork::MasterCard => (vec![5, 1 + self.next_u64_below(5) as u8], 16),
            CardNetwork::AmericanExpress => {
                let second = if self.next_u64_below(2) == 0 { 4 } else { 7 };
                (vec![3, second], 15)
            }
            CardNetwork::Discover => (vec![6, 0, 1, 1], 16),
        };
        while digits.len() < len - 1 {
            digits.push(self.next_digit());
        }
        digits.push(luhn_check_digit(&digits));
        digits.iter().map(|d| char::from(b'0' + d)).collect()
    }
}

/// Check digit that makes `payload ++ [digit]` pass the Luhn test.
pub fn luhn_check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = d as u32;
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    ((10 - (sum % 10)) % 10) as u8
}

/// Full Luhn validation of a digit string.
pub fn luhn_valid(number: &str) -> bool {
    let digits: Option<Vec<u8>> = number
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect();
    match digits {
        Some(d) if d.len() >= 2 => {
            let (payload, check) = d.split_at(d.len() - 1);
            luhn_check_digit(payload) == check[0]
        }
        _ => false,
    }
}
