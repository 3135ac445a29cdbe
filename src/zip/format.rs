//! ZIP container format constants and field encodings.

/// Local file header signature (`PK\x03\x04`, little-endian).
pub const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`, little-endian).
pub const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;

/// End-of-central-directory record signature (`PK\x05\x06`, little-endian).
pub const END_RECORD_SIG: u32 = 0x0605_4b50;

/// Fixed size of a local file header, before the name bytes.
pub const LOCAL_HEADER_LEN: u64 = 30;

/// Fixed size of a central directory record, before the name bytes.
pub const CENTRAL_HEADER_LEN: u64 = 46;

/// Fixed size of the end-of-central-directory record, before the comment.
pub const END_RECORD_LEN: u64 = 22;

/// Compression method: stored, no transformation.
pub const METHOD_STORE: u16 = 0;

/// Compression method: raw DEFLATE.
pub const METHOD_DEFLATE: u16 = 8;

/// Version needed to extract a STORE entry (1.0).
pub const VERSION_STORE: u16 = 10;

/// Version needed to extract a DEFLATE entry (2.0).
pub const VERSION_DEFLATE: u16 = 20;

/// "Version made by" stamp written in central directory records.
pub const VERSION_MADE_BY: u16 = 20;

/// Largest value a 32-bit size/offset field can carry without zip64.
pub const MAX_FIELD_U32: u64 = u32::MAX as u64;

/// Largest entry count / name length / comment length a 16-bit field carries.
pub const MAX_FIELD_U16: u64 = u16::MAX as u64;

/// Check whether a size or offset fits a 32-bit header field.
#[inline]
pub const fn fits_u32(value: u64) -> bool {
    value <= MAX_FIELD_U32
}

/// Check whether a count or length fits a 16-bit header field.
#[inline]
pub const fn fits_u16(value: u64) -> bool {
    value <= MAX_FIELD_U16
}

/// An MS-DOS date/time pair as stored in ZIP headers.
///
/// Layout (each field little-endian on disk):
///
/// ```text
/// time: | hour (5 bits) | minute (6 bits) | second/2 (5 bits) |
/// date: | year-1980 (7 bits) | month (4 bits) | day (5 bits)  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

/// The DOS epoch, 1980-01-01 00:00:00. Default stamp for reproducible output.
pub const DOS_EPOCH: DosDateTime = DosDateTime::new(1980, 1, 1, 0, 0, 0);

impl DosDateTime {
    /// Encode a calendar date/time. Fields are clamped to the representable
    /// range (years 1980..=2107, two-second resolution).
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let year = if year < 1980 {
            0
        } else if year > 2107 {
            127
        } else {
            year - 1980
        };
        let month = if month == 0 { 1 } else if month > 12 { 12 } else { month };
        let day = if day == 0 { 1 } else if day > 31 { 31 } else { day };
        let hour = if hour > 23 { 23 } else { hour };
        let minute = if minute > 59 { 59 } else { minute };
        let second = if second > 59 { 59 } else { second };

        Self {
            date: (year << 9) | ((month as u16) << 5) | day as u16,
            time: ((hour as u16) << 11) | ((minute as u16) << 5) | (second as u16 / 2),
        }
    }

    /// Decode to (year, month, day).
    pub const fn ymd(self) -> (u16, u8, u8) {
        (
            (self.date >> 9) + 1980,
            ((self.date >> 5) & 0x0F) as u8,
            (self.date & 0x1F) as u8,
        )
    }

    /// Decode to (hour, minute, second).
    pub const fn hms(self) -> (u8, u8, u8) {
        (
            (self.time >> 11) as u8,
            ((self.time >> 5) & 0x3F) as u8,
            ((self.time & 0x1F) * 2) as u8,
        )
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        DOS_EPOCH
    }
}
