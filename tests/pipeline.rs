use std::io::{self, Read, Write};

use sha2::{Digest, Sha256, Sha512};
use similar_asserts::assert_eq;

use sumpipe::{
    digest::HashAlgorithm,
    input::Compression,
    output::{open_output, OutputMode},
    pipeline::{Delimiter, Pipeline, PipelineConfig, PipelineCounters},
    stream::ParseOptions,
    tee::TeeReader,
};

fn create_tar_with<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut tar::Builder<&mut Vec<u8>>),
{
    let mut data = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut data);
        f(&mut builder);
        builder.finish().unwrap();
    }
    data
}

fn append_file(builder: &mut tar::Builder<&mut Vec<u8>>, path: &str, content: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_entry_type(tar::EntryType::Regular);
    builder.append_data(&mut header, path, content).unwrap();
}

fn append_dir(builder: &mut tar::Builder<&mut Vec<u8>>, path: &str) {
    let mut header = tar::Header::new_gnu();
    header.set_mode(0o755);
    header.set_size(0);
    header.set_entry_type(tar::EntryType::Directory);
    builder.append_data(&mut header, path, io::empty()).unwrap();
}

fn append_symlink(builder: &mut tar::Builder<&mut Vec<u8>>, path: &str, target: &str) {
    let mut header = tar::Header::new_gnu();
    header.set_mode(0o777);
    header.set_size(0);
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_link_name(target).unwrap();
    builder.append_data(&mut header, path, io::empty()).unwrap();
}

fn sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn run(pipeline: &Pipeline, archive: &[u8]) -> (String, PipelineCounters) {
    let mut out = Vec::new();
    let counters = pipeline.run(archive, &mut out).unwrap();
    (String::from_utf8(out).unwrap(), counters)
}

fn default_run(archive: &[u8]) -> (String, PipelineCounters) {
    run(&Pipeline::default(), archive)
}

#[test]
fn test_single_small_file() {
    let archive = create_tar_with(|b| append_file(b, "a.txt", b"hello"));
    let (out, counters) = default_run(&archive);

    let hello = sha256(b"hello");
    assert_eq!(out, format!("5\t{hello}\t{hello}\ta.txt\n"));
    assert_eq!(
        counters,
        PipelineCounters {
            files_seen: 1,
            bytes_seen: 5,
            ..Default::default()
        }
    );
}

#[test]
fn test_empty_file() {
    let archive = create_tar_with(|b| append_file(b, "empty", b""));
    let (out, counters) = default_run(&archive);

    let empty = sha256(b"");
    assert_eq!(
        empty,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(out, format!("0\t{empty}\t{empty}\tempty\n"));
    assert_eq!(counters.files_seen, 1);
    assert_eq!(counters.bytes_seen, 0);
}

#[test]
fn test_directory_only() {
    let archive = create_tar_with(|b| append_dir(b, "dir/"));
    let (out, counters) = default_run(&archive);

    assert_eq!(out, "");
    assert_eq!(counters.files_seen, 0);
    assert_eq!(counters.files_skipped, 1);
}

#[test]
fn test_first_chunk_digest() {
    let content: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 256) as u8).collect();
    let archive = create_tar_with(|b| append_file(b, "big.bin", &content));

    // odd chunk sizes so reads never line up with blocks
    for chunk_size in [1, 513, 1000, 65536] {
        let pipeline = Pipeline::new(PipelineConfig {
            chunk_size,
            ..Default::default()
        });
        let (out, counters) = run(&pipeline, &archive);

        assert_eq!(
            out,
            format!(
                "3000\t{}\t{}\tbig.bin\n",
                sha256(&content[..512]),
                sha256(&content)
            )
        );
        assert_eq!(counters.bytes_seen, 3000);
    }
}

#[test]
fn test_exactly_one_block() {
    let content = [0x5a; 512];
    let archive = create_tar_with(|b| append_file(b, "block", &content));
    let (out, _) = default_run(&archive);

    let digest = sha256(&content);
    assert_eq!(out, format!("512\t{digest}\t{digest}\tblock\n"));
}

#[test]
fn test_mixed_members_null_delimited() {
    let archive = create_tar_with(|b| {
        append_dir(b, "d/");
        append_file(b, "d/one", b"1");
        append_symlink(b, "d/link", "one");
        append_file(b, "d/two", b"22");
    });

    let pipeline = Pipeline::new(PipelineConfig {
        delimiter: Delimiter::Null,
        ..Default::default()
    });
    let (out, counters) = run(&pipeline, &archive);

    let (one, two) = (sha256(b"1"), sha256(b"22"));
    assert_eq!(
        out,
        format!("1\t{one}\t{one}\td/one\x002\t{two}\t{two}\td/two\0")
    );
    assert_eq!(
        counters,
        PipelineCounters {
            files_seen: 2,
            bytes_seen: 3,
            files_skipped: 2,
            malformed: 0,
        }
    );
    assert_eq!(counters.to_string(), "Processed 2 files 3 B.");
}

#[test]
fn test_name_with_newline_is_passed_through() {
    let mut archive = create_tar_with(|b| append_file(b, "placeholder", b"x"));
    // the tar crate refuses such names, so patch the header and fix up the checksum
    archive[..11].copy_from_slice(b"new\nline\tx\0");
    archive[148..156].copy_from_slice(b"        ");
    let sum: u32 = archive[..512].iter().map(|&b| u32::from(b)).sum();
    archive[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());

    let pipeline = Pipeline::new(PipelineConfig {
        delimiter: Delimiter::Null,
        ..Default::default()
    });
    let (out, _) = run(&pipeline, &archive);

    let x = sha256(b"x");
    assert_eq!(out, format!("1\t{x}\t{x}\tnew\nline\tx\0"));
}

#[test]
fn test_other_algorithm() {
    let archive = create_tar_with(|b| append_file(b, "a.txt", b"hello"));
    let pipeline = Pipeline::new(PipelineConfig {
        algorithm: HashAlgorithm::Sha512,
        ..Default::default()
    });
    let (out, _) = run(&pipeline, &archive);

    let digest = hex::encode(Sha512::digest(b"hello"));
    assert_eq!(out, format!("5\t{digest}\t{digest}\ta.txt\n"));
}

#[test]
fn test_truncated_archive_keeps_complete_records() {
    let big = vec![1u8; 1000];
    let archive = create_tar_with(|b| {
        append_file(b, "a", b"hello");
        append_file(b, "b", &big);
    });
    // headers at 0 and 1024; cut b's data short
    let truncated = &archive[..1536 + 600];

    let mut out = Vec::new();
    let err = Pipeline::default().run(truncated, &mut out).unwrap_err();
    assert!(format!("{err:#}").contains("Reading b"), "{err:#}");

    let hello = sha256(b"hello");
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("5\t{hello}\t{hello}\ta\n")
    );
}

#[test]
fn test_bad_header_is_skipped() {
    let mut archive = create_tar_with(|b| {
        append_file(b, "bad", b"lost");
        append_file(b, "good", b"kept");
    });
    archive[148..156].copy_from_slice(b"0000000\0");

    let (out, counters) = default_run(&archive);

    let kept = sha256(b"kept");
    assert_eq!(out, format!("4\t{kept}\t{kept}\tgood\n"));
    assert_eq!(counters.files_seen, 1);
    assert_eq!(counters.malformed, 1);
    assert_eq!(counters.files_skipped, 0);
}

#[test]
fn test_single_zero_block_ends_archive() {
    let mut archive = create_tar_with(|b| append_file(b, "a", b"hello"));
    // one terminator block, then something that isn't a header
    archive.truncate(1024 + 512);
    archive.extend_from_slice(&[0xff; 512]);

    let (out, counters) = default_run(&archive);
    assert_eq!(counters.files_seen, 1);
    assert_eq!(out.lines().count(), 1);
}

#[test]
fn test_concatenated_archives() {
    let first = create_tar_with(|b| append_file(b, "a", b"one"));
    let second = create_tar_with(|b| append_file(b, "b", b"two"));
    let archive = [first, second].concat();

    let (_, counters) = default_run(&archive);
    assert_eq!(counters.files_seen, 1);

    let pipeline = Pipeline::new(PipelineConfig {
        parse: ParseOptions {
            ignore_zeros: true,
            ..Default::default()
        },
        ..Default::default()
    });
    let (out, counters) = run(&pipeline, &archive);
    assert_eq!(counters.files_seen, 2);
    assert!(out.ends_with("\tb\n"));
}

#[test]
fn test_runs_are_independent() {
    let archive = create_tar_with(|b| append_file(b, "a.txt", b"hello"));
    let pipeline = Pipeline::default();

    let (first_out, first) = run(&pipeline, &archive);
    let (second_out, second) = run(&pipeline, &archive);
    assert_eq!(first, second);
    assert_eq!(first_out, second_out);
}

#[test]
fn test_drain() {
    let archive = create_tar_with(|b| {
        append_dir(b, "d/");
        append_file(b, "d/f", &[9u8; 700]);
    });

    let counters = Pipeline::default().drain(&archive[..]).unwrap();
    assert_eq!(
        counters,
        PipelineCounters {
            files_seen: 1,
            bytes_seen: 700,
            files_skipped: 1,
            malformed: 0,
        }
    );
}

#[test]
fn test_gzip_with_tee_passes_compressed_bytes() {
    let archive = create_tar_with(|b| {
        append_file(b, "a.txt", b"hello");
        append_file(b, "b.txt", &[3u8; 10_000]);
    });

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::best());
    encoder.write_all(&archive).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut tee = TeeReader::new(&compressed[..], Vec::new());
    let mut out = Vec::new();
    let counters = {
        let reader = Compression::Gzip.wrap(&mut tee).unwrap();
        Pipeline::default().run(reader, &mut out).unwrap()
    };
    io::copy(&mut tee, &mut io::sink()).unwrap();

    assert_eq!(counters.files_seen, 2);
    assert_eq!(counters.bytes_seen, 10_005);
    assert_eq!(tee.into_inner().1, compressed);
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
}

#[test]
fn test_tee_over_plain_input_copies_everything() {
    let archive = create_tar_with(|b| append_file(b, "a.txt", b"hello"));

    let mut tee = TeeReader::new(&archive[..], Vec::new());
    let mut out = Vec::new();
    Pipeline::default().run(&mut tee, &mut out).unwrap();

    // the parser stops at the first zero block; the rest still has to be passed on
    let mut rest = Vec::new();
    tee.read_to_end(&mut rest).unwrap();
    assert_eq!(tee.into_inner().1, archive);
}

#[test]
fn test_append_and_overwrite_runs() {
    let archive = create_tar_with(|b| {
        append_file(b, "a.txt", b"hello");
        append_file(b, "b.txt", b"world");
    });
    let (single, _) = default_run(&archive);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sums");
    let run_into = |mode| {
        let sink = open_output(&path, mode).unwrap();
        Pipeline::default().run(&archive[..], sink).unwrap();
        String::from_utf8(std::fs::read(&path).unwrap()).unwrap()
    };

    assert_eq!(run_into(OutputMode::CreateNew), single);
    assert_eq!(run_into(OutputMode::Append), format!("{single}{single}"));
    assert_eq!(run_into(OutputMode::Overwrite), single);
    assert!(open_output(&path, OutputMode::CreateNew).is_err());
}
