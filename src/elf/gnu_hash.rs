//! The GNU hash table: a header, a bloom filter, hash buckets, and a chain
//! of hash values terminated per bucket by a set low bit.
//!
//! Bloom words are 32-bit for CLASS32 and 64-bit for CLASS64; everything
//! else is 32-bit regardless of class.

use scroll::ctx;
use scroll::{Pread, Pwrite};

use crate::container::Ctx;
use crate::error::{Error, Result};

/// Size of the four-word table header.
pub const SIZEOF_GNU_HASH_HEADER: usize = 16;

/// GNU hash function, as the dynamic linker computes it.
pub fn hash(name: &str) -> u32 {
    let mut h: u32 = 5381;
    for b in name.bytes() {
        h = h.wrapping_mul(33).wrapping_add(b as u32);
    }
    h
}

/// The fixed header preceding bloom filter, buckets, and chain.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GnuHashHeader {
    /// Number of hash buckets
    pub nbuckets: u32,
    /// Index of the first hashed symbol in `.dynsym`
    pub symndx: u32,
    /// Number of bloom filter words
    pub maskbits: u32,
    /// Second bloom hash shift
    pub shift: u32,
}

impl ctx::TryFromCtx<'_, scroll::Endian> for GnuHashHeader {
    type Error = Error;
    fn try_from_ctx(src: &[u8], le: scroll::Endian) -> core::result::Result<(Self, usize), Error> {
        let offset = &mut 0;
        let header = GnuHashHeader {
            nbuckets: src.gread_with(offset, le)?,
            symndx: src.gread_with(offset, le)?,
            maskbits: src.gread_with(offset, le)?,
            shift: src.gread_with(offset, le)?,
        };
        Ok((header, *offset))
    }
}

impl ctx::TryIntoCtx<scroll::Endian> for GnuHashHeader {
    type Error = Error;
    fn try_into_ctx(self, dst: &mut [u8], le: scroll::Endian) -> core::result::Result<usize, Error> {
        let offset = &mut 0;
        dst.gwrite_with(self.nbuckets, offset, le)?;
        dst.gwrite_with(self.symndx, offset, le)?;
        dst.gwrite_with(self.maskbits, offset, le)?;
        dst.gwrite_with(self.shift, offset, le)?;
        Ok(*offset)
    }
}

/// Total byte size of a table with this header over `dynsym_count` symbols.
pub fn table_size(header: &GnuHashHeader, dynsym_count: usize, ctx: Ctx) -> usize {
    SIZEOF_GNU_HASH_HEADER
        + header.maskbits as usize * ctx.class.word_size()
        + header.nbuckets as usize * 4
        + dynsym_count.saturating_sub(header.symndx as usize) * 4
}

/// Build a fresh table over `names` (the full `.dynsym` name sequence, index
/// aligned), keeping the old header's shape. Symbols from `symndx` on must
/// already be sorted by bucket; a descending bucket is an `OutOfBounds`.
pub fn build(header: &GnuHashHeader, names: &[String], ctx: Ctx) -> Result<Vec<u8>> {
    let nbuckets = header.nbuckets as usize;
    let maskbits = header.maskbits as usize;
    let symndx = header.symndx as usize;
    if nbuckets == 0 || maskbits == 0 || !maskbits.is_power_of_two() {
        return Err(Error::Malformed(format!(
            "degenerate gnu hash shape: {nbuckets} buckets, {maskbits} mask words"
        )));
    }
    if symndx > names.len() {
        return Err(Error::Malformed(format!(
            "gnu hash symndx {symndx} past dynsym count {}",
            names.len()
        )));
    }
    let bits = (ctx.class.word_size() * 8) as u32;

    let mut bloom = vec![0u64; maskbits];
    for name in &names[symndx..] {
        let h = hash(name);
        let pos = (h / bits) as usize & (maskbits - 1);
        bloom[pos] |= (1u64 << (h % bits)) | (1u64 << ((h >> header.shift) % bits));
    }

    let mut buckets = vec![0u32; nbuckets];
    let mut chain = vec![0u32; names.len() - symndx];
    let mut previous: Option<usize> = None;
    for (chain_idx, name) in names[symndx..].iter().enumerate() {
        let h = hash(name);
        let bucket = (h as usize) % nbuckets;
        if let Some(prev) = previous {
            if bucket < prev {
                return Err(Error::OutOfBounds(bucket as u64));
            }
        }
        if previous != Some(bucket) {
            buckets[bucket] = (symndx + chain_idx) as u32;
            if chain_idx > 0 {
                chain[chain_idx - 1] |= 1;
            }
            previous = Some(bucket);
        }
        chain[chain_idx] = h & !1;
    }
    if let Some(last) = chain.last_mut() {
        *last |= 1;
    }

    let mut table = vec![0u8; table_size(header, names.len(), ctx)];
    let offset = &mut 0;
    table.gwrite_with(*header, offset, ctx.le)?;
    for word in bloom {
        if ctx.is_64() {
            table.gwrite_with(word, offset, ctx.le)?;
        } else {
            table.gwrite_with(word as u32, offset, ctx.le)?;
        }
    }
    for bucket in buckets {
        table.gwrite_with(bucket, offset, ctx.le)?;
    }
    for value in chain {
        table.gwrite_with(value, offset, ctx.le)?;
    }
    Ok(table)
}

/// Standard `dl_new_hash` lookup over a serialized table. `name_of` resolves
/// a `.dynsym` index to its name. Returns the matching dynsym index.
pub fn lookup<F>(
    table: &[u8],
    ctx: Ctx,
    dynsym_count: usize,
    name: &str,
    name_of: F,
) -> Result<Option<usize>>
where
    F: Fn(usize) -> Result<String>,
{
    let header: GnuHashHeader = table.pread_with(0, ctx.le)?;
    let nbuckets = header.nbuckets as usize;
    let maskbits = header.maskbits as usize;
    let symndx = header.symndx as usize;
    if nbuckets == 0 || maskbits == 0 {
        return Ok(None);
    }
    let word = ctx.class.word_size();
    let bits = (word * 8) as u32;
    let h = hash(name);

    let pos = (h / bits) as usize & (maskbits - 1);
    let bloom_off = SIZEOF_GNU_HASH_HEADER + pos * word;
    let bloom_word: u64 = if ctx.is_64() {
        table.pread_with::<u64>(bloom_off, ctx.le)?
    } else {
        table.pread_with::<u32>(bloom_off, ctx.le)? as u64
    };
    let mask = (1u64 << (h % bits)) | (1u64 << ((h >> header.shift) % bits));
    if bloom_word & mask != mask {
        return Ok(None);
    }

    let buckets_off = SIZEOF_GNU_HASH_HEADER + maskbits * word;
    let chain_off = buckets_off + nbuckets * 4;
    let bucket_slot = buckets_off + ((h as usize) % nbuckets) * 4;
    let mut idx = table.pread_with::<u32>(bucket_slot, ctx.le)? as usize;
    if idx < symndx {
        return Ok(None);
    }
    loop {
        if idx >= dynsym_count {
            return Ok(None);
        }
        let value: u32 = table.pread_with(chain_off + (idx - symndx) * 4, ctx.le)?;
        if value | 1 == h | 1 && name_of(idx)? == name {
            return Ok(Some(idx));
        }
        if value & 1 == 1 {
            return Ok(None);
        }
        idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Class;
    use scroll::Endian;

    #[test]
    fn hash_is_djb2() {
        assert_eq!(hash(""), 5381);
        assert_eq!(hash("a"), 5381 * 33 + 97);
    }

    fn names() -> Vec<String> {
        ["", "printf", "strcmp", "hello"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn build_then_lookup_finds_every_symbol() {
        let header = GnuHashHeader {
            nbuckets: 1,
            symndx: 1,
            maskbits: 2,
            shift: 6,
        };
        for ctx in [
            Ctx::new(Class::Class64, Endian::Little),
            Ctx::new(Class::Class32, Endian::Big),
        ] {
            let names = names();
            let table = build(&header, &names, ctx).unwrap();
            assert_eq!(table.len(), table_size(&header, names.len(), ctx));
            for (i, name) in names.iter().enumerate().skip(1) {
                let found = lookup(&table, ctx, names.len(), name, |idx| {
                    Ok(names[idx].clone())
                })
                .unwrap();
                assert_eq!(found, Some(i), "lookup of {name}");
            }
            let absent = lookup(&table, ctx, names.len(), "no_such_symbol", |idx| {
                Ok(names[idx].clone())
            })
            .unwrap();
            assert_eq!(absent, None);
        }
    }

    #[test]
    fn build_rejects_descending_buckets() {
        // with more than one bucket, craft names whose buckets descend
        let header = GnuHashHeader {
            nbuckets: 64,
            symndx: 0,
            maskbits: 1,
            shift: 6,
        };
        let mut names: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        names.sort_by_key(|n| core::cmp::Reverse(hash(n) % 64));
        // at least one strict descent must exist unless all collide
        let ctx = Ctx::new(Class::Class64, Endian::Little);
        let buckets: Vec<u32> = names.iter().map(|n| hash(n) % 64).collect();
        if buckets.windows(2).any(|w| w[1] < w[0]) {
            assert!(matches!(
                build(&header, &names, ctx),
                Err(Error::OutOfBounds(_))
            ));
        }
    }
}
