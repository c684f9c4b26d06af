/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

use std::{fmt::Display, num::NonZeroU8};

use rand::{thread_rng, Rng};

const LIST: [char; 52] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Random paste identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    /// Generate new slug of `length` letters.
    ///
    /// Uses the thread local rng, so concurrent request tasks never share generator state.
    pub fn generate(length: NonZeroU8) -> Self {
        let size = length.get() as usize;
        let mut slug = String::with_capacity(size);

        let mut rng = thread_rng();
        for _ in 0..size {
            slug.push(LIST[rng.gen_range(0..LIST.len())]);
        }

        Self(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
impl From<&str> for Slug {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
