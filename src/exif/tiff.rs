//! TIFF structure handling for EXIF blocks.
//!
//! Decoding walks IFD0, the Exif sub-IFD and the GPS sub-IFD and turns their
//! entries into container groups. Patching never rewrites the original bytes:
//! each IFD whose group changed is rebuilt and appended at the end of the
//! block, and the pointers that lead to it are updated. Untouched entries are
//! copied as raw 12-byte records, so their out-of-line data (and everything
//! else in the block: thumbnails, maker notes, strips) stays where it was.
//!
//! IFDs left at the end of the block by an earlier patch are dropped before
//! their replacements are appended, so repeated edits do not grow the block.

use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::container::{MetadataContainer, TagGroup, TagValue};
use super::tags::{self, Format, IfdKind, TAG_EXIF_IFD, TAG_GPS_IFD, TAG_USER_COMMENT};

// XP* tags are UTF-16LE strings stored as BYTE arrays
const XP_TAGS: std::ops::RangeInclusive<u16> = 0x9C9B..=0x9C9F;

const USER_COMMENT_ASCII: &[u8] = b"ASCII\0\0\0";

const IFD_ENTRY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteOrder {
    big_endian: bool,
}

impl ByteOrder {
    fn u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let b: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    fn u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let b: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    fn u64(self, data: &[u8], offset: usize) -> Option<u64> {
        let b: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
        Some(if self.big_endian {
            u64::from_be_bytes(b)
        } else {
            u64::from_le_bytes(b)
        })
    }

    fn put_u16(self, v: u16) -> [u8; 2] {
        if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    }

    fn put_u32(self, v: u32) -> [u8; 4] {
        if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    }

    fn put_u64(self, v: u64) -> [u8; 8] {
        if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    }
}

/// One 12-byte IFD record, located by its position in the block.
#[derive(Debug, Clone, Copy)]
struct RawEntry {
    pos: usize,
    tag: u16,
    format: u16,
    count: u32,
}

#[derive(Debug)]
struct Ifd {
    offset: usize,
    entries: Vec<RawEntry>,
    next: u32,
}

impl Ifd {
    /// End of the entry table, including the next-IFD pointer.
    fn end(&self, data_len: usize) -> usize {
        (self.offset + 2 + self.entries.len() * IFD_ENTRY_LEN + 4).min(data_len)
    }

    fn pointer(&self, tag: u16, data: &[u8], order: ByteOrder) -> Option<usize> {
        let entry = self.entries.iter().find(|e| e.tag == tag)?;
        order.u32(data, entry.pos + 8).map(|v| v as usize)
    }
}

/// A parsed EXIF (TIFF) block.
pub struct Tiff<'a> {
    data: &'a [u8],
    order: ByteOrder,
    ifd0: Ifd,
    exif: Option<Ifd>,
    gps: Option<Ifd>,
}

impl<'a> Tiff<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < 8 {
            bail!("TIFF data too short");
        }
        let order = match &data[0..2] {
            b"MM" => ByteOrder { big_endian: true },
            b"II" => ByteOrder { big_endian: false },
            _ => bail!("Invalid TIFF byte order"),
        };
        if order.u16(data, 2) != Some(42) {
            bail!("Missing TIFF magic number");
        }

        let ifd0_offset = order.u32(data, 4).context("Missing IFD0 offset")? as usize;
        let ifd0 = read_ifd(data, order, ifd0_offset).context("Failed to read IFD0")?;

        let sub_ifd = |tag: u16, what: &str| -> Option<Ifd> {
            let offset = ifd0.pointer(tag, data, order)?;
            match read_ifd(data, order, offset) {
                Ok(ifd) => Some(ifd),
                Err(e) => {
                    log::debug!("Ignoring unreadable {what} IFD: {e}");
                    None
                }
            }
        };
        let exif = sub_ifd(TAG_EXIF_IFD, "Exif");
        let gps = sub_ifd(TAG_GPS_IFD, "GPS");

        Ok(Self {
            data,
            order,
            ifd0,
            exif,
            gps,
        })
    }

    fn ifd(&self, kind: IfdKind) -> Option<&Ifd> {
        match kind {
            IfdKind::Primary => Some(&self.ifd0),
            IfdKind::Exif => self.exif.as_ref(),
            IfdKind::Gps => self.gps.as_ref(),
        }
    }

    /// Decode every representable entry into `{TIFF}` / `{Exif}` / `{GPS}` groups.
    pub fn to_container(&self) -> MetadataContainer {
        let mut container = MetadataContainer::new();
        for kind in IfdKind::ALL {
            let Some(ifd) = self.ifd(kind) else { continue };
            let mut group = TagGroup::new();
            for entry in &ifd.entries {
                if tags::is_structural(entry.tag) {
                    continue;
                }
                match self.decode_entry(kind, entry) {
                    Some(value) => {
                        group.insert(tags::tag_name(kind, entry.tag), value);
                    }
                    None => log::debug!(
                        "Skipping undecodable tag 0x{:04X} in {}",
                        entry.tag,
                        kind.group_name()
                    ),
                }
            }
            if !group.is_empty() {
                container.insert_group(kind.group_name(), group);
            }
        }
        container
    }

    fn value_range(&self, entry: &RawEntry) -> Option<(Format, Range<usize>)> {
        let format = Format::from_u16(entry.format)?;
        let len = format.size().checked_mul(entry.count as usize)?;
        let start = if len <= 4 {
            entry.pos + 8
        } else {
            self.order.u32(self.data, entry.pos + 8)? as usize
        };
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some((format, start..end))
    }

    fn value_bytes(&self, entry: &RawEntry) -> Option<(Format, &'a [u8])> {
        let (format, range) = self.value_range(entry)?;
        Some((format, &self.data[range]))
    }

    /// Slot that keeps `entry` as it is. Values stored at or after `cut` are
    /// about to be truncated away, so those are carried over by copy.
    fn kept(&self, entry: &RawEntry, cut: usize) -> Slot {
        match self.value_range(entry) {
            Some((format, range)) if range.len() > 4 && range.start >= cut => Slot::New {
                format,
                count: entry.count,
                data: self.data[range].to_vec(),
            },
            _ => Slot::Raw(entry.pos),
        }
    }

    /// Offset from which the block holds nothing but the tables and
    /// out-of-line values of the `replaced` IFDs. Returns the block length
    /// when no such tail exists.
    fn reclaimable_tail(&self, replaced: &[IfdKind]) -> usize {
        let len = self.data.len();

        let mut spans: Vec<Range<usize>> = Vec::new();
        for kind in replaced {
            let Some(ifd) = self.ifd(*kind) else { continue };
            spans.push(ifd.offset..ifd.end(len));
            for entry in &ifd.entries {
                match self.value_range(entry) {
                    Some((_, range)) if range.len() > 4 => spans.push(range),
                    Some(_) => {}
                    // size unknown, so nothing after it can be proven unused
                    None => return len,
                }
            }
        }
        spans.sort_by_key(|r| r.start);

        // one byte of slack between spans for word alignment
        let mut merged: Vec<Range<usize>> = Vec::new();
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.start <= last.end + 1 => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        let cut = match merged.last() {
            Some(last) if last.end + 1 >= len => last.start.max(8),
            _ => return len,
        };

        for kind in IfdKind::ALL {
            let Some(ifd) = self.ifd(kind) else { continue };
            if replaced.contains(&kind) {
                if ifd.next != 0 && ifd.next as usize >= cut {
                    return len;
                }
                continue;
            }
            if ifd.end(len) > cut {
                return len;
            }
            let shares_tail = ifd
                .entries
                .iter()
                .filter_map(|e| self.value_range(e))
                .any(|(_, range)| range.len() > 4 && range.end > cut);
            if shares_tail {
                return len;
            }
        }
        cut
    }

    fn decode_entry(&self, kind: IfdKind, entry: &RawEntry) -> Option<TagValue> {
        if entry.count == 0 {
            return None;
        }
        let (format, bytes) = self.value_bytes(entry)?;
        let order = self.order;

        match format {
            Format::Ascii => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                return Some(TagValue::Text(String::from_utf8_lossy(&bytes[..end]).into_owned()));
            }
            Format::Byte if kind == IfdKind::Primary && XP_TAGS.contains(&entry.tag) => {
                return Some(TagValue::Text(decode_utf16le(bytes)));
            }
            Format::Undefined
                if kind == IfdKind::Exif
                    && entry.tag == TAG_USER_COMMENT
                    && bytes.starts_with(USER_COMMENT_ASCII) =>
            {
                let text = &bytes[USER_COMMENT_ASCII.len()..];
                let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
                return Some(TagValue::Text(String::from_utf8_lossy(&text[..end]).into_owned()));
            }
            _ => {}
        }

        let size = format.size();
        let mut numbers = Vec::with_capacity(entry.count as usize);
        for chunk in bytes.chunks_exact(size) {
            let n = match format {
                Format::Byte | Format::Undefined => chunk[0] as f64,
                Format::SByte => chunk[0] as i8 as f64,
                Format::Short => order.u16(chunk, 0)? as f64,
                Format::SShort => order.u16(chunk, 0)? as i16 as f64,
                Format::Long => order.u32(chunk, 0)? as f64,
                Format::SLong => order.u32(chunk, 0)? as i32 as f64,
                Format::Float => f32::from_bits(order.u32(chunk, 0)?) as f64,
                Format::Double => f64::from_bits(order.u64(chunk, 0)?),
                Format::Rational => {
                    let (num, den) = (order.u32(chunk, 0)?, order.u32(chunk, 4)?);
                    if den == 0 {
                        return None;
                    }
                    num as f64 / den as f64
                }
                Format::SRational => {
                    let (num, den) = (order.u32(chunk, 0)? as i32, order.u32(chunk, 4)? as i32);
                    if den == 0 {
                        return None;
                    }
                    num as f64 / den as f64
                }
                Format::Ascii => unreachable!("handled above"),
            };
            numbers.push(n);
        }

        if tags::is_gps_coordinate(kind, entry.tag) && numbers.len() == 3 {
            return Some(TagValue::Number(dms_to_decimal([numbers[0], numbers[1], numbers[2]])));
        }

        if numbers.len() == 1 {
            Some(TagValue::Number(numbers[0]))
        } else {
            Some(TagValue::List(numbers.into_iter().map(TagValue::Number).collect()))
        }
    }
}

fn read_ifd(data: &[u8], order: ByteOrder, offset: usize) -> Result<Ifd> {
    let count = order
        .u16(data, offset)
        .context("IFD offset out of bounds")? as usize;
    let start = offset + 2;
    let end = start + count * IFD_ENTRY_LEN;
    if end > data.len() {
        bail!("IFD entries extend beyond TIFF data");
    }
    let entries = (0..count)
        .filter_map(|i| {
            let pos = start + i * IFD_ENTRY_LEN;
            Some(RawEntry {
                pos,
                tag: order.u16(data, pos)?,
                format: order.u16(data, pos + 2)?,
                count: order.u32(data, pos + 4)?,
            })
        })
        .collect();
    // Some writers drop the trailing next-IFD pointer
    let next = order.u32(data, end).unwrap_or(0);
    Ok(Ifd { offset, entries, next })
}

/// Decode an EXIF block into a container.
pub fn decode(data: &[u8]) -> Result<MetadataContainer> {
    Ok(Tiff::parse(data)?.to_container())
}

/// A minimal little-endian TIFF header with an empty IFD0.
pub fn empty_block() -> Vec<u8> {
    let mut block = b"II*\0".to_vec();
    block.extend_from_slice(&8u32.to_le_bytes());
    block.extend_from_slice(&0u16.to_le_bytes());
    block.extend_from_slice(&0u32.to_le_bytes());
    block
}

/// Apply the difference between `before` and `after` to an EXIF block.
///
/// `before` must be the container decoded from `original`. Groups that are
/// equal in both containers are not touched at all.
pub fn patch(original: &[u8], before: &MetadataContainer, after: &MetadataContainer) -> Result<Vec<u8>> {
    let tiff = Tiff::parse(original)?;

    let mut sub_ifds = Vec::new();
    for (kind, pointer) in [(IfdKind::Exif, TAG_EXIF_IFD), (IfdKind::Gps, TAG_GPS_IFD)] {
        let name = kind.group_name();
        let new = after.group(name);
        if before.group(name) == new {
            continue;
        }
        if tiff.ifd(kind).is_none() && new.is_none_or(|g| g.is_empty()) {
            continue;
        }
        sub_ifds.push((kind, pointer));
    }

    let primary = IfdKind::Primary.group_name();
    if before.group(primary) == after.group(primary) && sub_ifds.is_empty() {
        return Ok(original.to_vec());
    }

    let mut replaced: Vec<IfdKind> = sub_ifds.iter().map(|(kind, _)| *kind).collect();
    replaced.push(IfdKind::Primary);
    let cut = tiff.reclaimable_tail(&replaced);
    if cut < original.len() {
        log::debug!("Dropping {} bytes of superseded IFDs", original.len() - cut);
    }
    let mut out = original[..cut].to_vec();

    let mut moved: Vec<(u16, u32)> = Vec::new();
    for (kind, pointer) in sub_ifds {
        let name = kind.group_name();
        let offset = rebuild_ifd(&mut out, &tiff, kind, before.group(name), after.group(name), &[], cut)
            .with_context(|| format!("Failed to rebuild {name} IFD"))?;
        moved.push((pointer, offset));
    }

    let offset = rebuild_ifd(
        &mut out,
        &tiff,
        IfdKind::Primary,
        before.group(primary),
        after.group(primary),
        &moved,
        cut,
    )
    .context("Failed to rebuild IFD0")?;
    let header = tiff.order.put_u32(offset);
    out[4..8].copy_from_slice(&header);

    Ok(out)
}

enum Slot {
    /// Copy the original record at this position verbatim.
    Raw(usize),
    /// A sub-IFD pointer that moved.
    Pointer(u32),
    New { format: Format, count: u32, data: Vec<u8> },
}

fn rebuild_ifd(
    out: &mut Vec<u8>,
    tiff: &Tiff<'_>,
    kind: IfdKind,
    before: Option<&TagGroup>,
    after: Option<&TagGroup>,
    pointers: &[(u16, u32)],
    cut: usize,
) -> Result<u32> {
    let order = tiff.order;
    let ifd = tiff.ifd(kind);
    let empty = TagGroup::new();
    let before = before.unwrap_or(&empty);
    let after = after.unwrap_or(&empty);

    let mut slots: BTreeMap<u16, Slot> = BTreeMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    if let Some(ifd) = ifd {
        for entry in &ifd.entries {
            if let Some(&(_, offset)) = pointers.iter().find(|(t, _)| *t == entry.tag) {
                slots.insert(entry.tag, Slot::Pointer(offset));
                continue;
            }
            if tags::is_structural(entry.tag) {
                slots.insert(entry.tag, tiff.kept(entry, cut));
                continue;
            }

            let name = tags::tag_name(kind, entry.tag);
            let slot = match (before.get(&name), after.get(&name)) {
                // never decoded, so the caller could not have meant to drop it
                (None, None) => Some(tiff.kept(entry, cut)),
                (Some(old), Some(new)) if old == new => Some(tiff.kept(entry, cut)),
                (_, Some(new)) => Some(
                    encode_slot(kind, entry.tag, tags::lookup(kind, &name).and_then(|l| l.1), new, order)
                        .with_context(|| format!("Failed to encode {name}"))?,
                ),
                (Some(_), None) => None,
            };
            seen.insert(name);
            if let Some(slot) = slot {
                slots.insert(entry.tag, slot);
            }
        }
    }

    for (name, value) in after {
        if seen.contains(name) {
            continue;
        }
        let Some((tag, format)) = tags::lookup(kind, name) else {
            bail!("Unknown tag {name} in {}", kind.group_name());
        };
        if tags::is_structural(tag) {
            bail!("Tag {name} locates image data and cannot be written");
        }
        let slot = encode_slot(kind, tag, format, value, order)
            .with_context(|| format!("Failed to encode {name}"))?;
        slots.insert(tag, slot);
    }

    for &(tag, offset) in pointers {
        slots.entry(tag).or_insert(Slot::Pointer(offset));
    }

    // Lay out: count, entries, next pointer, then any out-of-line data
    pad_to_even(out);
    let start = out.len();
    out.extend_from_slice(&order.put_u16(slots.len() as u16));
    let entries_at = out.len();
    out.resize(entries_at + slots.len() * IFD_ENTRY_LEN, 0);
    out.extend_from_slice(&order.put_u32(ifd.map(|i| i.next).unwrap_or(0)));

    for (i, (tag, slot)) in slots.iter().enumerate() {
        let mut record = [0u8; IFD_ENTRY_LEN];
        match slot {
            Slot::Raw(pos) => record.copy_from_slice(&tiff.data[*pos..*pos + IFD_ENTRY_LEN]),
            Slot::Pointer(offset) => {
                record[0..2].copy_from_slice(&order.put_u16(*tag));
                record[2..4].copy_from_slice(&order.put_u16(Format::Long as u16));
                record[4..8].copy_from_slice(&order.put_u32(1));
                record[8..12].copy_from_slice(&order.put_u32(*offset));
            }
            Slot::New { format, count, data } => {
                record[0..2].copy_from_slice(&order.put_u16(*tag));
                record[2..4].copy_from_slice(&order.put_u16(*format as u16));
                record[4..8].copy_from_slice(&order.put_u32(*count));
                if data.len() <= 4 {
                    record[8..8 + data.len()].copy_from_slice(data);
                } else {
                    pad_to_even(out);
                    let data_offset = block_offset(out.len())?;
                    out.extend_from_slice(data);
                    record[8..12].copy_from_slice(&order.put_u32(data_offset));
                }
            }
        }
        let at = entries_at + i * IFD_ENTRY_LEN;
        out[at..at + IFD_ENTRY_LEN].copy_from_slice(&record);
    }

    block_offset(start)
}

/// Offset of an IFD inside `data`, for checking layouts in tests.
#[cfg(test)]
pub(crate) fn ifd_offset(data: &[u8], kind: IfdKind) -> Option<usize> {
    Tiff::parse(data).ok()?.ifd(kind).map(|ifd| ifd.offset)
}

fn pad_to_even(out: &mut Vec<u8>) {
    if out.len() % 2 != 0 {
        out.push(0);
    }
}

fn block_offset(len: usize) -> Result<u32> {
    u32::try_from(len).context("EXIF block exceeds 4 GiB")
}

fn encode_slot(kind: IfdKind, tag: u16, declared: Option<Format>, value: &TagValue, order: ByteOrder) -> Result<Slot> {
    let (format, count, data) = encode_value(kind, tag, declared, value, order)?;
    Ok(Slot::New { format, count, data })
}

/// Turn a container value into `(format, count, bytes)` for an IFD record.
fn encode_value(
    kind: IfdKind,
    tag: u16,
    declared: Option<Format>,
    value: &TagValue,
    order: ByteOrder,
) -> Result<(Format, u32, Vec<u8>)> {
    if let TagValue::Group(_) = value {
        bail!("nested groups cannot be stored in a tag");
    }
    let format = match declared {
        Some(f) => f,
        None => infer_format(value)?,
    };

    // Text payloads for byte-like tags
    if let TagValue::Text(text) = value {
        let data = match format {
            Format::Ascii => {
                let mut data = text.as_bytes().to_vec();
                data.push(0);
                data
            }
            Format::Byte if kind == IfdKind::Primary && XP_TAGS.contains(&tag) => encode_utf16le(text),
            Format::Undefined if kind == IfdKind::Exif && tag == TAG_USER_COMMENT => {
                let mut data = USER_COMMENT_ASCII.to_vec();
                data.extend_from_slice(text.as_bytes());
                data
            }
            Format::Byte | Format::Undefined => text.as_bytes().to_vec(),
            other => bail!("expected a number for {other:?} tag, got text"),
        };
        return Ok((format, data.len() as u32, data));
    }

    if format == Format::Ascii {
        let TagValue::Number(n) = value else {
            bail!("lists cannot be stored as ASCII");
        };
        let mut data = format_number(*n).into_bytes();
        data.push(0);
        return Ok((format, data.len() as u32, data));
    }

    let numbers: Vec<f64> = match value {
        TagValue::Number(n) if tags::is_gps_coordinate(kind, tag) => {
            if *n < 0.0 || !n.is_finite() {
                bail!("GPS coordinate magnitudes must be finite and non-negative, got {n}");
            }
            let mut data = Vec::with_capacity(24);
            for (num, den) in decimal_to_dms(*n) {
                data.extend_from_slice(&order.put_u32(num));
                data.extend_from_slice(&order.put_u32(den));
            }
            return Ok((Format::Rational, 3, data));
        }
        TagValue::Number(n) => vec![*n],
        TagValue::List(items) => items
            .iter()
            .map(|v| v.as_f64().context("lists must contain only numbers"))
            .collect::<Result<_>>()?,
        TagValue::Text(_) | TagValue::Group(_) => unreachable!("handled above"),
    };

    let mut data = Vec::with_capacity(numbers.len() * format.size());
    for n in &numbers {
        let n = *n;
        match format {
            Format::Byte | Format::Undefined => data.push(int_in_range(n, 0.0, u8::MAX as f64)? as u8),
            Format::SByte => data.push(int_in_range(n, i8::MIN as f64, i8::MAX as f64)? as i8 as u8),
            Format::Short => data.extend_from_slice(&order.put_u16(int_in_range(n, 0.0, u16::MAX as f64)? as u16)),
            Format::SShort => data.extend_from_slice(
                &order.put_u16(int_in_range(n, i16::MIN as f64, i16::MAX as f64)? as i16 as u16),
            ),
            Format::Long => data.extend_from_slice(&order.put_u32(int_in_range(n, 0.0, u32::MAX as f64)? as u32)),
            Format::SLong => data.extend_from_slice(
                &order.put_u32(int_in_range(n, i32::MIN as f64, i32::MAX as f64)? as i32 as u32),
            ),
            Format::Float => data.extend_from_slice(&order.put_u32((n as f32).to_bits())),
            Format::Double => data.extend_from_slice(&order.put_u64(n.to_bits())),
            Format::Rational => {
                let (num, den) = unsigned_rational(n)?;
                data.extend_from_slice(&order.put_u32(num));
                data.extend_from_slice(&order.put_u32(den));
            }
            Format::SRational => {
                let (num, den) = signed_rational(n)?;
                data.extend_from_slice(&order.put_u32(num as u32));
                data.extend_from_slice(&order.put_u32(den as u32));
            }
            Format::Ascii => unreachable!("handled above"),
        }
    }
    Ok((format, numbers.len() as u32, data))
}

fn infer_format(value: &TagValue) -> Result<Format> {
    Ok(match value {
        TagValue::Text(_) => Format::Ascii,
        TagValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => Format::Long,
        TagValue::Number(n) if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n < 0.0 => Format::SLong,
        TagValue::Number(n) if *n >= 0.0 => Format::Rational,
        TagValue::Number(_) => Format::SRational,
        TagValue::List(items) => match items.first() {
            Some(first) => infer_format(first)?,
            None => bail!("cannot infer the type of an empty list"),
        },
        TagValue::Group(_) => bail!("nested groups cannot be stored in a tag"),
    })
}

fn int_in_range(n: f64, min: f64, max: f64) -> Result<f64> {
    let r = n.round();
    if !r.is_finite() || r < min || r > max {
        bail!("value {n} out of range {min}..={max}");
    }
    Ok(r)
}

fn unsigned_rational(n: f64) -> Result<(u32, u32)> {
    if !n.is_finite() || n < 0.0 {
        bail!("value {n} cannot be stored as an unsigned rational");
    }
    if n.fract() == 0.0 && n <= u32::MAX as f64 {
        return Ok((n as u32, 1));
    }
    let scaled = (n * 10000.0).round();
    if scaled > u32::MAX as f64 {
        bail!("value {n} too large for a rational");
    }
    Ok((scaled as u32, 10000))
}

fn signed_rational(n: f64) -> Result<(i32, i32)> {
    if !n.is_finite() {
        bail!("value {n} cannot be stored as a rational");
    }
    if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 {
        return Ok((n as i32, 1));
    }
    let scaled = (n * 10000.0).round();
    if scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        bail!("value {n} too large for a rational");
    }
    Ok((scaled as i32, 10000))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn dms_to_decimal([degrees, minutes, seconds]: [f64; 3]) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Decimal degrees → (deg/1, min/1, sec/10000).
fn decimal_to_dms(value: f64) -> [(u32, u32); 3] {
    let abs = value.abs();
    let mut deg = abs.floor() as u32;
    let minutes = (abs - deg as f64) * 60.0;
    let mut min = minutes.floor() as u32;
    let mut sec = ((minutes - min as f64) * 60.0 * 10000.0).round() as u32;
    if sec >= 60 * 10000 {
        sec -= 60 * 10000;
        min += 1;
    }
    if min >= 60 {
        min -= 60;
        deg += 1;
    }
    [(deg, 1), (min, 1), (sec, 10000)]
}

/// Encode a string as UTF-16LE bytes with a null terminator (XP* tags).
fn encode_utf16le(s: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    bytes.push(0);
    bytes.push(0);
    bytes
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
