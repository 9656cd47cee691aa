//! Shared winnow-based parsing and offset resolution helpers.

use rootcause::Report;
use winnow::Parser;
use winnow::error::ContextError;
use winnow::token::take_till;

use crate::error::LoadError;
use crate::hsf::format::Section;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// All-bits-set marks an absent reference in every offset and index field.
pub const ABSENT: u32 = u32::MAX;

/// Resolve a stored offset against the base of the region it is relative to.
/// Returns `None` for the absent sentinel.
pub fn resolve_offset(base: usize, stored: u32) -> Option<usize> {
    if stored == ABSENT {
        None
    } else {
        base.checked_add(stored as usize)
    }
}

/// Offset of the first byte after `count` records of `record_size` bytes
/// starting at `base`: the base of the region's trailing payload.
pub fn region_end(base: usize, count: usize, record_size: usize) -> Result<usize, Report<LoadError>> {
    count
        .checked_mul(record_size)
        .and_then(|len| base.checked_add(len))
        .ok_or_else(|| {
            Report::new(LoadError::OutOfBounds {
                offset: base,
                need: usize::MAX,
                have: 0,
            })
        })
}

/// Allocate room for `count` resolved `section` entries, reporting failure
/// instead of aborting.
pub fn try_vec<T>(count: usize, section: Section) -> Result<Vec<T>, Report<LoadError>> {
    let mut out = Vec::new();
    out.try_reserve_exact(count)
        .map_err(|_| Report::new(LoadError::AllocationFailure { section, count }))?;
    Ok(out)
}

fn parse_cstr<'a>(input: &mut &'a [u8]) -> WResult<&'a [u8]> {
    take_till(0.., |b: u8| b == 0).parse_next(input)
}

/// Read a null-terminated byte string from `data` starting at `offset`. A name
/// running to the end of the buffer without a terminator is accepted.
pub fn read_null_terminated(data: &[u8], offset: usize) -> Result<&[u8], Report<LoadError>> {
    let Some(remaining) = data.get(offset..) else {
        return Err(Report::new(LoadError::OutOfBounds {
            offset,
            need: 1,
            have: 0,
        }));
    };
    let input = &mut &remaining[..];
    parse_cstr(input).map_err(|e| Report::new(LoadError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_sentinel_resolves_to_none() {
        assert_eq!(resolve_offset(0x100, ABSENT), None);
        assert_eq!(resolve_offset(0x100, 0x20), Some(0x120));
        assert_eq!(resolve_offset(0, 0), Some(0));
    }

    #[test]
    fn region_end_follows_record_array() {
        assert_eq!(region_end(0x40, 3, 0x0C).unwrap(), 0x64);
        assert_eq!(region_end(0x40, 0, 0x0C).unwrap(), 0x40);
        assert!(region_end(usize::MAX, 2, 4).is_err());
    }

    #[test]
    fn reads_names() {
        let data = b"root\0mesh_01\0tail";
        assert_eq!(read_null_terminated(data, 0).unwrap(), b"root");
        assert_eq!(read_null_terminated(data, 5).unwrap(), b"mesh_01");
        assert_eq!(read_null_terminated(data, 12).unwrap(), b"tail");
        assert_eq!(read_null_terminated(data, 4).unwrap(), b"");
        assert!(read_null_terminated(data, 64).is_err());
    }

    #[test]
    fn keeps_non_utf8_bytes() {
        let data = [0x83, 0x7D, 0x83, 0x8A, 0, 0xFF];
        assert_eq!(read_null_terminated(&data, 0).unwrap(), &data[..4]);
        assert_eq!(read_null_terminated(&data, 5).unwrap(), b"\xFF");
    }
}
