use std::borrow::Cow;
use std::mem::size_of;

use bytemuck::Pod;
use rootcause::Report;

use crate::data::endian::{ByteOrder, Normalize, NormalizeTagged, Normalizer};
use crate::data::parser_utils::try_vec;
use crate::error::LoadError;
use crate::hsf::format::Section;

/// A file buffer whose records are normalized to host byte order on first read.
///
/// When the file is already in host order the image borrows the caller's bytes
/// and every read is a plain copy. Otherwise the image owns a private copy that
/// is rewritten in place as records are visited, so a region reached twice in
/// the same session is only swapped once.
pub struct WorkingImage<'a> {
    bytes: Cow<'a, [u8]>,
    normalizer: Normalizer,
}

impl<'a> WorkingImage<'a> {
    pub fn new(data: &'a [u8], file_order: ByteOrder) -> Self {
        let normalizer = Normalizer::new(file_order);
        let bytes = if normalizer.swaps() {
            Cow::Owned(data.to_vec())
        } else {
            Cow::Borrowed(data)
        };
        Self { bytes, normalizer }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.bytes, Cow::Borrowed(_))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Bounds-checked view of `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], Report<LoadError>> {
        let have = self.bytes.len();
        match offset.checked_add(len) {
            Some(end) if end <= have => Ok(&self.bytes[offset..end]),
            _ => Err(Report::new(LoadError::OutOfBounds {
                offset,
                need: len,
                have: have.saturating_sub(offset),
            })),
        }
    }

    /// Run `f` as one top-level normalization call. The visited set is cleared
    /// afterwards whether or not `f` succeeded.
    pub fn session<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let result = f(self);
        self.normalizer.end_session();
        result
    }

    /// Read a record at `offset`, normalizing it in place on first visit.
    pub fn read<T: Pod + Normalize>(&mut self, offset: usize) -> Result<T, Report<LoadError>> {
        let mut value: T = bytemuck::pod_read_unaligned(self.slice(offset, size_of::<T>())?);
        if self.normalizer.swaps() && self.normalizer.first_visit(offset) {
            value.normalize(&self.normalizer);
            self.write_back(offset, &value);
        }
        Ok(value)
    }

    /// Read a record whose payload depends on a discriminant stored in the
    /// record. The discriminant is normalized before the payload.
    pub fn read_tagged<T: Pod + NormalizeTagged>(
        &mut self,
        offset: usize,
    ) -> Result<T, Report<LoadError>> {
        let mut value: T = bytemuck::pod_read_unaligned(self.slice(offset, size_of::<T>())?);
        if self.normalizer.swaps() && self.normalizer.first_visit(offset) {
            let tag = value.normalize_tag(&self.normalizer);
            value.normalize_tagged(tag, &self.normalizer);
            self.write_back(offset, &value);
        }
        Ok(value)
    }

    /// Read `count` consecutive records starting at `offset`.
    pub fn read_array<T: Pod + Normalize>(
        &mut self,
        offset: usize,
        count: usize,
        section: Section,
    ) -> Result<Vec<T>, Report<LoadError>> {
        let mut out = self.reserve::<T>(offset, count, section)?;
        for i in 0..count {
            out.push(self.read(offset + i * size_of::<T>())?);
        }
        Ok(out)
    }

    /// Like [`WorkingImage::read_array`] for tagged records.
    pub fn read_tagged_array<T: Pod + NormalizeTagged>(
        &mut self,
        offset: usize,
        count: usize,
        section: Section,
    ) -> Result<Vec<T>, Report<LoadError>> {
        let mut out = self.reserve::<T>(offset, count, section)?;
        for i in 0..count {
            out.push(self.read_tagged(offset + i * size_of::<T>())?);
        }
        Ok(out)
    }

    /// Checks that `count` records fit in the buffer before reserving room for
    /// them, so a corrupt count fails as out-of-bounds instead of exhausting
    /// memory.
    fn reserve<T>(
        &self,
        offset: usize,
        count: usize,
        section: Section,
    ) -> Result<Vec<T>, Report<LoadError>> {
        let need = count.checked_mul(size_of::<T>()).ok_or_else(|| {
            Report::new(LoadError::OutOfBounds {
                offset,
                need: usize::MAX,
                have: self.bytes.len().saturating_sub(offset),
            })
        })?;
        self.slice(offset, need)?;
        try_vec(count, section)
    }

    fn write_back<T: Pod>(&mut self, offset: usize, value: &T) {
        let len = size_of::<T>();
        self.bytes.to_mut()[offset..offset + len].copy_from_slice(bytemuck::bytes_of(value));
    }
}
