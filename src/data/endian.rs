//! Type-directed byte-order normalization.
//!
//! Every on-disk record implements [`Normalize`], which visits each multi-byte
//! field and reverses it when the file's byte order differs from the host's.
//! Records whose layout depends on a discriminant implement [`NormalizeTagged`]
//! instead: the discriminant is brought into host order first and then selects
//! which branch of the payload gets normalized.
//!
//! Nothing here interprets offsets. A stored `u32` offset is swapped like any
//! other `u32`; widening and resolving it is the loader's job.

use std::collections::HashSet;

/// Byte order of a file or of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// The order written by the content pipeline.
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn winnow(self) -> winnow::binary::Endianness {
        match self {
            ByteOrder::Big => winnow::binary::Endianness::Big,
            ByteOrder::Little => winnow::binary::Endianness::Little,
        }
    }
}

/// Normalization state for one working image.
///
/// The visited set records absolute byte offsets that have already been
/// normalized during the current session so aliased payloads are only swapped
/// once. A session spans one top-level call; see [`Normalizer::end_session`].
#[derive(Debug)]
pub struct Normalizer {
    swap: bool,
    visited: HashSet<usize>,
}

impl Normalizer {
    pub fn new(file_order: ByteOrder) -> Self {
        Self {
            swap: file_order != ByteOrder::host(),
            visited: HashSet::new(),
        }
    }

    /// Whether multi-byte fields need reversing at all.
    pub fn swaps(&self) -> bool {
        self.swap
    }

    /// Returns `true` the first time `offset` is seen in the current session.
    pub fn first_visit(&mut self, offset: usize) -> bool {
        self.visited.insert(offset)
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn end_session(&mut self) {
        self.visited.clear();
    }
}

/// In-place byte-order normalization of a value with a fixed layout.
pub trait Normalize {
    fn normalize(&mut self, n: &Normalizer);
}

/// Normalization of a record whose payload is a union selected by a
/// discriminant stored inside the record itself.
pub trait NormalizeTagged {
    type Tag: Copy;

    /// Normalize only the discriminant fields and return them in host order.
    fn normalize_tag(&mut self, n: &Normalizer) -> Self::Tag;

    /// Normalize every remaining field. `tag` must already be in host order.
    fn normalize_tagged(&mut self, tag: Self::Tag, n: &Normalizer);
}

macro_rules! normalize_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Normalize for $ty {
                #[inline]
                fn normalize(&mut self, n: &Normalizer) {
                    if n.swap {
                        *self = self.swap_bytes();
                    }
                }
            }
        )*
    };
}

normalize_scalar!(u16, i16, u32, i32);

impl Normalize for u8 {
    #[inline]
    fn normalize(&mut self, _n: &Normalizer) {}
}

impl Normalize for i8 {
    #[inline]
    fn normalize(&mut self, _n: &Normalizer) {}
}

impl Normalize for f32 {
    #[inline]
    fn normalize(&mut self, n: &Normalizer) {
        if n.swap {
            *self = f32::from_bits(self.to_bits().swap_bytes());
        }
    }
}

impl<T: Normalize, const N: usize> Normalize for [T; N] {
    fn normalize(&mut self, n: &Normalizer) {
        for item in self.iter_mut() {
            item.normalize(n);
        }
    }
}

/// Reverse each `width`-byte group of a raw union payload.
pub fn swap_chunks(bytes: &mut [u8], width: usize, n: &Normalizer) {
    if !n.swap || width < 2 {
        return;
    }
    for chunk in bytes.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// Implement [`Normalize`] for a composite record by visiting the listed fields
/// in order.
macro_rules! normalize_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::data::endian::Normalize for $ty {
            fn normalize(&mut self, n: &$crate::data::endian::Normalizer) {
                $( $crate::data::endian::Normalize::normalize(&mut self.$field, n); )*
            }
        }
    };
}

pub(crate) use normalize_fields;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Sample {
        id: u32,
        flags: u8,
        offset: i16,
        scale: f32,
        rows: [[i16; 2]; 2],
    }

    normalize_fields!(Sample {
        id,
        flags,
        offset,
        scale,
        rows
    });

    fn foreign() -> Normalizer {
        let order = match ByteOrder::host() {
            ByteOrder::Big => ByteOrder::Little,
            ByteOrder::Little => ByteOrder::Big,
        };
        Normalizer::new(order)
    }

    fn sample() -> Sample {
        Sample {
            id: 0x1122_3344,
            flags: 0xAB,
            offset: -2,
            scale: 1.5,
            rows: [[1, 2], [0x0102, -0x0102]],
        }
    }

    #[test]
    fn swaps_every_multibyte_field() {
        let n = foreign();
        let mut s = sample();
        s.normalize(&n);
        assert_eq!(s.id, 0x4433_2211);
        assert_eq!(s.flags, 0xAB);
        assert_eq!(s.offset, (-2i16).swap_bytes());
        assert_eq!(s.scale.to_bits(), 1.5f32.to_bits().swap_bytes());
        assert_eq!(s.rows[1][0], 0x0201);
    }

    #[test]
    fn normalizing_twice_is_identity() {
        let n = foreign();
        let mut s = sample();
        s.normalize(&n);
        s.normalize(&n);
        assert_eq!(s, sample());
    }

    #[test]
    fn host_order_is_untouched() {
        let n = Normalizer::new(ByteOrder::host());
        assert!(!n.swaps());
        let mut s = sample();
        s.normalize(&n);
        assert_eq!(s, sample());
    }

    #[test]
    fn visited_set_is_scoped_to_a_session() {
        let mut n = foreign();
        assert!(n.first_visit(0x40));
        assert!(!n.first_visit(0x40));
        assert_eq!(n.visited_len(), 1);
        n.end_session();
        assert_eq!(n.visited_len(), 0);
        assert!(n.first_visit(0x40));
    }

    #[test]
    fn swap_chunks_respects_width() {
        let n = foreign();
        let mut raw = [1, 2, 3, 4];
        swap_chunks(&mut raw, 2, &n);
        assert_eq!(raw, [2, 1, 4, 3]);
        swap_chunks(&mut raw, 4, &n);
        assert_eq!(raw, [3, 4, 1, 2]);
    }
}
