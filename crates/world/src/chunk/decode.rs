//! Wire decoding for bulk chunk payloads.
//!
//! Covers the 1.18-era network layout: big-endian scalars, VarInts, and
//! paletted containers whose entries are packed LSB-first into 64-bit
//! words (no entry spans a word boundary). The payload reaching this
//! module has already been extracted from its protocol packet.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkDecodeError {
    #[error("unexpected end of payload at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("VarInt longer than 5 bytes at byte {offset}")]
    VarIntTooLong { offset: usize },
    #[error("invalid bits-per-entry {bits} for {container} container")]
    InvalidBitsPerEntry { bits: u8, container: &'static str },
    #[error("palette index {index} out of range for palette of {len}")]
    PaletteIndexOutOfRange { index: usize, len: usize },
    #[error("packed array holds {got} words, need {needed}")]
    PackedArrayTooShort { got: usize, needed: usize },
}

/// Byte cursor over a borrowed payload.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ChunkDecodeError> {
        if self.offset + n > self.data.len() {
            return Err(ChunkDecodeError::UnexpectedEof {
                offset: self.offset,
            });
        }
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ChunkDecodeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, ChunkDecodeError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, ChunkDecodeError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub(crate) fn read_varint(&mut self) -> Result<i32, ChunkDecodeError> {
        let start = self.offset;
        let mut value: u32 = 0;
        for shift in 0..5u32 {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << (7 * shift);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(ChunkDecodeError::VarIntTooLong { offset: start })
    }
}

/// Shape of one paletted container: how many entries it holds and which
/// bits-per-entry ranges select the single-value / indirect / direct forms.
pub(crate) struct ContainerLayout {
    pub(crate) container: &'static str,
    pub(crate) volume: usize,
    pub(crate) min_indirect_bits: u8,
    pub(crate) max_indirect_bits: u8,
}

/// Block states: 4096 entries, indirect palettes use 4..=8 bits.
pub(crate) const BLOCK_LAYOUT: ContainerLayout = ContainerLayout {
    container: "block",
    volume: 4096,
    min_indirect_bits: 4,
    max_indirect_bits: 8,
};

/// Biomes: 64 entries at 4x4x4 resolution, indirect palettes use 1..=3 bits.
pub(crate) const BIOME_LAYOUT: ContainerLayout = ContainerLayout {
    container: "biome",
    volume: 64,
    min_indirect_bits: 1,
    max_indirect_bits: 3,
};

/// Decode one paletted container into a flat id list of `layout.volume`
/// entries.
pub(crate) fn read_paletted_container(
    r: &mut Reader<'_>,
    layout: &ContainerLayout,
) -> Result<Vec<u32>, ChunkDecodeError> {
    let bits = r.read_u8()?;

    if bits == 0 {
        // Single-value form: one id for the whole container, empty data
        // array (still length-prefixed on the wire).
        let value = r.read_varint()? as u32;
        let data_len = r.read_varint()?.max(0) as usize;
        for _ in 0..data_len {
            r.read_u64()?;
        }
        return Ok(vec![value; layout.volume]);
    }

    if bits > 32 {
        return Err(ChunkDecodeError::InvalidBitsPerEntry {
            bits,
            container: layout.container,
        });
    }

    if bits <= layout.max_indirect_bits {
        // Indirect form: packed palette indices. Writers below the format
        // minimum are rounded up to it.
        let bits = bits.max(layout.min_indirect_bits);
        let palette_len = r.read_varint()?.max(0) as usize;
        let mut palette = Vec::with_capacity(palette_len);
        for _ in 0..palette_len {
            palette.push(r.read_varint()? as u32);
        }
        let indices = read_packed_array(r, bits, layout.volume)?;
        indices
            .into_iter()
            .map(|index| {
                let index = index as usize;
                palette
                    .get(index)
                    .copied()
                    .ok_or(ChunkDecodeError::PaletteIndexOutOfRange {
                        index,
                        len: palette.len(),
                    })
            })
            .collect()
    } else {
        // Direct form: raw registry ids at the sent width.
        read_packed_array(r, bits, layout.volume)
    }
}

/// Read a length-prefixed packed word array and unpack `count` entries of
/// `bits` bits each.
fn read_packed_array(
    r: &mut Reader<'_>,
    bits: u8,
    count: usize,
) -> Result<Vec<u32>, ChunkDecodeError> {
    let entries_per_word = (64 / bits) as usize;
    let needed = count.div_ceil(entries_per_word);
    let got = r.read_varint()?.max(0) as usize;
    if got < needed {
        return Err(ChunkDecodeError::PackedArrayTooShort { got, needed });
    }

    let mut words = Vec::with_capacity(got);
    for _ in 0..got {
        words.push(r.read_u64()?);
    }

    let mask = if bits == 32 {
        u64::from(u32::MAX)
    } else {
        (1u64 << bits) - 1
    };
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let word = words[i / entries_per_word];
        let shift = (i % entries_per_word) as u32 * u32::from(bits);
        out.push(((word >> shift) & mask) as u32);
    }
    Ok(out)
}
