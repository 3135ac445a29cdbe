//! Integration tests: build archives end to end and verify them with a
//! minimal test-local ZIP parser.

use std::io::{Cursor, Read, Write};
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::DeflateDecoder;

use opcpack::{pack, Compression, Error, PackOptions, Part};

/// Route engine tracing through the test harness; `RUST_LOG=opcpack=trace`
/// shows per-part scheduling and assembly offsets when a test misbehaves.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One entry recovered from a produced archive.
struct ParsedEntry {
    name: String,
    method: u16,
    crc32: u32,
    uncompressed_size: u32,
    compressed_size: u32,
    content: Vec<u8>,
}

struct ParsedArchive {
    entries: Vec<ParsedEntry>,
    entry_count: u16,
    comment: Vec<u8>,
}

/// Parse an archive the way a reader would: end record first, then the
/// central directory, then each local header and payload.
fn parse_archive(bytes: &[u8]) -> ParsedArchive {
    let eocd = bytes
        .windows(4)
        .rposition(|w| w == b"PK\x05\x06")
        .expect("end record not found");

    let mut cursor = Cursor::new(&bytes[eocd + 4..]);
    let _this_disk = cursor.read_u16::<LittleEndian>().unwrap();
    let _cd_disk = cursor.read_u16::<LittleEndian>().unwrap();
    let disk_entries = cursor.read_u16::<LittleEndian>().unwrap();
    let total_entries = cursor.read_u16::<LittleEndian>().unwrap();
    let _cd_size = cursor.read_u32::<LittleEndian>().unwrap();
    let cd_offset = cursor.read_u32::<LittleEndian>().unwrap();
    let comment_len = cursor.read_u16::<LittleEndian>().unwrap();
    assert_eq!(disk_entries, total_entries);

    let comment_start = eocd + 22;
    let comment = bytes[comment_start..comment_start + comment_len as usize].to_vec();

    let mut entries = Vec::new();
    let mut pos = cd_offset as usize;
    for _ in 0..total_entries {
        assert_eq!(&bytes[pos..pos + 4], b"PK\x01\x02", "central record signature");
        let mut rec = Cursor::new(&bytes[pos + 4..]);
        let _version_made_by = rec.read_u16::<LittleEndian>().unwrap();
        let _version_needed = rec.read_u16::<LittleEndian>().unwrap();
        let flags = rec.read_u16::<LittleEndian>().unwrap();
        let method = rec.read_u16::<LittleEndian>().unwrap();
        let _time = rec.read_u16::<LittleEndian>().unwrap();
        let _date = rec.read_u16::<LittleEndian>().unwrap();
        let crc32 = rec.read_u32::<LittleEndian>().unwrap();
        let compressed_size = rec.read_u32::<LittleEndian>().unwrap();
        let uncompressed_size = rec.read_u32::<LittleEndian>().unwrap();
        let name_len = rec.read_u16::<LittleEndian>().unwrap() as usize;
        let extra_len = rec.read_u16::<LittleEndian>().unwrap() as usize;
        let rec_comment_len = rec.read_u16::<LittleEndian>().unwrap() as usize;
        let _disk_start = rec.read_u16::<LittleEndian>().unwrap();
        let _internal = rec.read_u16::<LittleEndian>().unwrap();
        let _external = rec.read_u32::<LittleEndian>().unwrap();
        let header_offset = rec.read_u32::<LittleEndian>().unwrap() as usize;
        assert_eq!(flags, 0);

        let name = String::from_utf8(bytes[pos + 46..pos + 46 + name_len].to_vec()).unwrap();
        pos += 46 + name_len + extra_len + rec_comment_len;

        // Cross-check the local header this record points at.
        assert_eq!(
            &bytes[header_offset..header_offset + 4],
            b"PK\x03\x04",
            "central record offset must land on a local header"
        );
        let mut local = Cursor::new(&bytes[header_offset + 4..]);
        let _version_needed = local.read_u16::<LittleEndian>().unwrap();
        let _flags = local.read_u16::<LittleEndian>().unwrap();
        let local_method = local.read_u16::<LittleEndian>().unwrap();
        let _time = local.read_u16::<LittleEndian>().unwrap();
        let _date = local.read_u16::<LittleEndian>().unwrap();
        let local_crc = local.read_u32::<LittleEndian>().unwrap();
        let local_compressed = local.read_u32::<LittleEndian>().unwrap();
        let local_uncompressed = local.read_u32::<LittleEndian>().unwrap();
        let local_name_len = local.read_u16::<LittleEndian>().unwrap() as usize;
        let local_extra_len = local.read_u16::<LittleEndian>().unwrap() as usize;
        assert_eq!(local_method, method);
        assert_eq!(local_crc, crc32);
        assert_eq!(local_compressed, compressed_size);
        assert_eq!(local_uncompressed, uncompressed_size);
        assert_eq!(local_name_len, name_len);

        let payload_start = header_offset + 30 + local_name_len + local_extra_len;
        let payload = &bytes[payload_start..payload_start + compressed_size as usize];

        let content = match method {
            0 => payload.to_vec(),
            8 => {
                let mut out = Vec::new();
                DeflateDecoder::new(payload).read_to_end(&mut out).unwrap();
                out
            }
            other => panic!("unexpected compression method {other}"),
        };
        assert_eq!(content.len() as u32, uncompressed_size);

        entries.push(ParsedEntry {
            name,
            method,
            crc32,
            uncompressed_size,
            compressed_size,
            content,
        });
    }

    ParsedArchive {
        entries,
        entry_count: total_entries,
        comment,
    }
}

fn crc32_of(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

fn options_in(dir: &std::path::Path) -> PackOptions {
    PackOptions::new().temp_dir(dir)
}

#[test]
fn two_parts_in_submission_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![
        Part::from_bytes("a.xml", "hello"),
        Part::from_bytes("b.xml", "world"),
    ];

    let bytes = pack(parts, Vec::new(), &options_in(dir.path()).workers(2)).unwrap();
    let archive = parse_archive(&bytes);

    assert_eq!(archive.entry_count, 2);
    assert_eq!(archive.entries[0].name, "a.xml");
    assert_eq!(archive.entries[0].content, b"hello");
    assert_eq!(archive.entries[1].name, "b.xml");
    assert_eq!(archive.entries[1].content, b"world");
}

#[test]
fn crc_matches_recomputed_checksum() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![
        Part::from_bytes("xl/workbook.xml", "<workbook/>"),
        Part::from_bytes("xl/styles.xml", "<styleSheet/>".repeat(200)),
    ];

    let bytes = pack(parts, Vec::new(), &options_in(dir.path())).unwrap();
    for entry in parse_archive(&bytes).entries {
        assert_eq!(entry.crc32, crc32_of(&entry.content), "{}", entry.name);
    }
}

#[test]
fn entries_ordered_despite_inverted_completion_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // Earlier submissions finish last.
    let parts: Vec<Part> = (0..20u64)
        .map(|i| {
            Part::new(format!("part{i:02}.xml"), move |sink| {
                std::thread::sleep(Duration::from_millis(2 * (20 - i)));
                write!(sink, "payload {i}")
            })
        })
        .collect();

    let bytes = pack(parts, Vec::new(), &options_in(dir.path()).workers(8)).unwrap();
    let names: Vec<String> = parse_archive(&bytes)
        .entries
        .into_iter()
        .map(|e| e.name)
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("part{i:02}.xml")).collect();
    assert_eq!(names, expected);
}

#[test]
fn roundtrip_empty_single_byte_and_large() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let large: Vec<u8> = (0..2 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let parts = vec![
        Part::from_bytes("empty.bin", Vec::new()),
        Part::from_bytes("one.bin", vec![0x42]),
        Part::from_bytes("large.bin", large.clone()),
    ];

    let bytes = pack(parts, Vec::new(), &options_in(dir.path())).unwrap();
    let archive = parse_archive(&bytes);

    assert_eq!(archive.entries[0].content, b"");
    assert_eq!(archive.entries[1].content, [0x42]);
    assert_eq!(archive.entries[2].content, large);
}

#[test]
fn empty_part_accounting() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![Part::from_bytes("empty.xml", Vec::new())];

    let bytes = pack(parts, Vec::new(), &options_in(dir.path())).unwrap();
    let archive = parse_archive(&bytes);

    assert_eq!(archive.entry_count, 1);
    let entry = &archive.entries[0];
    assert_eq!(entry.uncompressed_size, 0);
    assert_eq!(entry.crc32, 0);
    // DEFLATE's empty-stream encoding is still a couple of bytes.
    assert!(entry.compressed_size > 0);
}

#[test]
fn producer_failure_aborts_run_and_leaves_no_temp_stores() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts: Vec<Part> = (0..50)
        .map(|i| {
            Part::new(format!("part{i}.xml"), move |sink| {
                sink.write_all(b"partial bytes")?;
                if i == 7 {
                    return Err(std::io::Error::other("producer blew up"));
                }
                Ok(())
            })
        })
        .collect();

    let err = pack(parts, Vec::new(), &options_in(dir.path()).workers(4)).unwrap_err();
    assert!(matches!(err, Error::Producer { ref name, .. } if name == "part7.xml"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn duplicate_names_fail_fast() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![
        Part::from_bytes("a.xml", "first"),
        Part::from_bytes("a.xml", "second"),
    ];

    let err = pack(parts, Vec::new(), &options_in(dir.path())).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn store_method_passthrough() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![Part::from_bytes("raw.bin", "uncompressed payload")];
    let options = options_in(dir.path()).compression(Compression::Store);

    let bytes = pack(parts, Vec::new(), &options).unwrap();
    let archive = parse_archive(&bytes);

    let entry = &archive.entries[0];
    assert_eq!(entry.method, 0);
    assert_eq!(entry.compressed_size, entry.uncompressed_size);
    assert_eq!(entry.content, b"uncompressed payload");
}

#[test]
fn archive_comment_lands_in_end_record() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts = vec![Part::from_bytes("a.xml", "hello")];
    let options = options_in(dir.path()).comment("spreadsheet container");

    let bytes = pack(parts, Vec::new(), &options).unwrap();
    let archive = parse_archive(&bytes);
    assert_eq!(archive.comment, b"spreadsheet container");
}

#[test]
fn no_temp_stores_after_success() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let parts: Vec<Part> = (0..10)
        .map(|i| Part::from_bytes(format!("p{i}.xml"), format!("<part n=\"{i}\"/>")))
        .collect();

    pack(parts, Vec::new(), &options_in(dir.path())).unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn identical_inputs_produce_identical_bytes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let build = || {
        let parts = vec![
            Part::from_bytes("a.xml", "hello"),
            Part::from_bytes("b.xml", "world".repeat(100)),
        ];
        pack(parts, Vec::new(), &options_in(dir.path()).workers(4)).unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn empty_archive_has_valid_end_record() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let bytes = pack(Vec::new(), Vec::new(), &options_in(dir.path())).unwrap();
    let archive = parse_archive(&bytes);
    assert_eq!(archive.entry_count, 0);
    assert!(archive.entries.is_empty());
    assert_eq!(bytes.len(), 22);
}
