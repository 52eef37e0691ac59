use lcw::{CopyOffsets, DecompressError, Decompressor, EncodeError, Format, Operation, Operations};

/// "abc", short copy, fill, medium copy and long copy, absolute offsets
const MIXED_STREAM: &[u8] = &[
    0x83, b'a', b'b', b'c', // literal
    0x00, 0x03, // short copy: 3 bytes from 3 back
    0xfe, 0x05, 0x00, b'z', // fill: 5 x 'z'
    0xc1, 0x00, 0x00, // medium copy: 4 bytes from 0
    0xff, 0x06, 0x00, 0x02, 0x00, // long copy: 6 bytes from 2
    0x80,
];
const MIXED_EXPECTED: &[u8] = b"abcabczzzzzabcacabczz";

#[test]
fn test_decompress_mixed_stream() -> anyhow::Result<()> {
    let data = lcw::decompress(MIXED_STREAM, MIXED_EXPECTED.len())?;
    assert_eq!(data, MIXED_EXPECTED);

    Ok(())
}

#[test]
fn test_decompress_relative_far_copies() -> anyhow::Result<()> {
    // same output as MIXED_STREAM, medium and long copies as distances
    let stream = [
        0x83, b'a', b'b', b'c', //
        0x00, 0x03, //
        0xfe, 0x05, 0x00, b'z', //
        0xc1, 0x0b, 0x00, // 11 - 11 = 0
        0xff, 0x06, 0x00, 0x0d, 0x00, // 15 - 13 = 2
        0x80,
    ];

    let data = lcw::decompress_with(&stream, MIXED_EXPECTED.len(), Format::relative())?;
    assert_eq!(data, MIXED_EXPECTED);

    Ok(())
}

#[test]
fn test_decompress_overlapping_copy() -> anyhow::Result<()> {
    // one literal followed by a 10 byte copy from 1 back
    let stream = [0x81, b'x', 0x70, 0x01, 0x80];
    assert_eq!(lcw::decompress(&stream, 11)?, vec![b'x'; 11]);

    // two byte pattern stretched by a long copy
    let stream = [0x82, b'a', b'b', 0xff, 0x08, 0x00, 0x00, 0x00, 0x80];
    assert_eq!(lcw::decompress(&stream, 10)?, b"ababababab");

    Ok(())
}

#[test]
fn test_decompress_empty_stream() -> anyhow::Result<()> {
    assert_eq!(lcw::decompress(&[0x80], 0)?, Vec::<u8>::new());
    Ok(())
}

#[test]
fn test_zero_length_runs_are_noops() -> anyhow::Result<()> {
    let stream = [
        0x81, b'q', //
        0xfe, 0x00, 0x00, b'z', //
        0xff, 0x00, 0x00, 0x40, 0x00, //
        0x80,
    ];
    assert_eq!(lcw::decompress(&stream, 1)?, b"q");

    Ok(())
}

#[test]
fn test_end_marker_stops_decoding() -> anyhow::Result<()> {
    let stream = [0x81, b'a', 0x80, 0x81, b'b', 0x80];
    let result = Decompressor::new(&stream, 0).decompress()?;

    assert_eq!(result.data, b"a");
    assert_eq!(result.bytes_read, 3);

    Ok(())
}

#[test]
fn test_decompress_at_offset() -> anyhow::Result<()> {
    let mut src = vec![0xaa, 0xbb, 0xcc];
    src.extend_from_slice(MIXED_STREAM);
    src.extend_from_slice(&[0x12, 0x34]);

    let result = Decompressor::new(&src, 3).decompress()?;
    assert_eq!(result.data, MIXED_EXPECTED);
    assert_eq!(result.bytes_read, MIXED_STREAM.len());

    Ok(())
}

#[test]
fn test_decompress_into_caller_buffer() -> anyhow::Result<()> {
    let mut dst = [0x55; 32];
    let written = lcw::decompress_into(MIXED_STREAM, &mut dst)?;

    assert_eq!(written, MIXED_EXPECTED.len());
    assert_eq!(&dst[..written], MIXED_EXPECTED);
    assert!(dst[written..].iter().all(|&b| b == 0x55));

    Ok(())
}

#[test]
fn test_decompress_into_relative_far_copies() -> anyhow::Result<()> {
    let stream = [0x82, b'a', b'b', 0xc3, 0x02, 0x00, 0x80];

    let mut dst = [0u8; 8];
    let written = lcw::decompress_into_with(&stream, &mut dst, Format::relative())?;
    assert_eq!(&dst[..written], b"abababab");

    // the same bytes as absolute offsets point past the written data
    assert_eq!(
        lcw::decompress_into(&stream, &mut dst),
        Err(DecompressError::BufferOverrun { at: 3 })
    );

    Ok(())
}

#[test]
fn test_decompress_into_leaves_buffer_on_error() {
    let mut dst = [0x55; 8];
    let result = lcw::decompress_into(MIXED_STREAM, &mut dst);

    assert!(matches!(result, Err(DecompressError::BufferOverrun { .. })));
    assert_eq!(dst, [0x55; 8]);
}

#[test]
fn test_truncated_streams() {
    let cases: &[(&[u8], usize)] = &[
        (&[], 0),
        // no end marker
        (&[0x81, b'a'], 2),
        // literal shorter than announced
        (&[0x83, b'a'], 2),
        // short copy without its offset byte
        (&[0x81, b'a', 0x00], 3),
        // fill without value
        (&[0xfe, 0x04, 0x00], 3),
        // long copy cut inside the count
        (&[0xff, 0x01], 2),
        // medium copy cut inside the offset
        (&[0x81, b'a', 0xc0, 0x00], 4),
    ];

    for (stream, at) in cases {
        let result = lcw::decompress(stream, 64);
        assert_eq!(
            result,
            Err(DecompressError::TruncatedStream { at: *at }),
            "stream {:02x?}",
            stream
        );
    }
}

#[test]
fn test_copy_before_start() {
    // nothing has been written yet
    assert_eq!(
        lcw::decompress(&[0x00, 0x01, 0x80], 64),
        Err(DecompressError::BufferOverrun { at: 0 })
    );

    // a short copy with offset 0 would read the byte being written
    assert_eq!(
        lcw::decompress(&[0x81, b'a', 0x00, 0x00, 0x80], 64),
        Err(DecompressError::BufferOverrun { at: 2 })
    );

    // absolute offset past the written data
    assert_eq!(
        lcw::decompress(&[0x81, b'a', 0xc0, 0x05, 0x00, 0x80], 64),
        Err(DecompressError::BufferOverrun { at: 2 })
    );

    // relative distance reaching before the buffer
    assert_eq!(
        lcw::decompress_with(
            &[0x81, b'a', 0xc0, 0x02, 0x00, 0x80],
            64,
            Format::relative()
        ),
        Err(DecompressError::BufferOverrun { at: 2 })
    );
}

#[test]
fn test_capacity_is_enforced() -> anyhow::Result<()> {
    let stream = [0xfe, 0x0a, 0x00, b'z', 0x80];

    assert_eq!(
        lcw::decompress(&stream, 9),
        Err(DecompressError::BufferOverrun { at: 0 })
    );
    assert_eq!(lcw::decompress(&stream, 10)?, vec![b'z'; 10]);

    // the copy itself overruns, not the literal before it
    assert_eq!(
        lcw::decompress(&[0x81, b'x', 0x70, 0x01, 0x80], 5),
        Err(DecompressError::BufferOverrun { at: 2 })
    );

    Ok(())
}

#[test]
fn test_list_operations() -> anyhow::Result<()> {
    let operations = Operations::new(MIXED_STREAM, 0).collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        operations,
        vec![
            (0, Operation::Literal(3)),
            (4, Operation::ShortCopy { count: 3, back: 3 }),
            (6, Operation::Fill { count: 5, value: b'z' }),
            (10, Operation::MediumCopy { count: 4, offset: 0 }),
            (13, Operation::LongCopy { count: 6, offset: 2 }),
            (18, Operation::End),
        ]
    );

    Ok(())
}

#[test]
fn test_operations_stop_after_error() {
    let mut operations = Operations::new(&[0x81, b'a', 0xfe], 0);

    assert_eq!(operations.next(), Some(Ok((0, Operation::Literal(1)))));
    assert_eq!(
        operations.next(),
        Some(Err(DecompressError::TruncatedStream { at: 3 }))
    );
    assert_eq!(operations.next(), None);
}

#[test]
fn test_operations_encode_like_they_decode() -> anyhow::Result<()> {
    let operations = [
        Operation::ShortCopy {
            count: 10,
            back: 0x0fff,
        },
        Operation::Literal(63),
        Operation::Fill {
            count: 0x1234,
            value: 7,
        },
        Operation::MediumCopy {
            count: 64,
            offset: 0xbeef,
        },
        Operation::LongCopy {
            count: 0xffff,
            offset: 1,
        },
        Operation::End,
    ];

    let mut stream = Vec::new();
    for operation in operations {
        operation.encode(&mut stream)?;
        if let Operation::Literal(count) = operation {
            stream.extend(std::iter::repeat(0).take(count as usize));
        }
    }

    let decoded = Operations::new(&stream, 0)
        .map(|entry| entry.map(|(_, operation)| operation))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(decoded, operations);

    let mut medium = Vec::new();
    operations[3].encode(&mut medium)?;
    assert_eq!(medium, [0xfd, 0xef, 0xbe]);

    Ok(())
}

#[test]
fn test_encode_rejects_operations_outside_their_family() {
    let invalid = [
        // tag would read as a fill
        Operation::MediumCopy {
            count: 65,
            offset: 0,
        },
        Operation::MediumCopy {
            count: 2,
            offset: 0,
        },
        // tag would read as the end marker
        Operation::Literal(0),
        Operation::Literal(64),
        Operation::ShortCopy { count: 11, back: 1 },
        Operation::ShortCopy { count: 2, back: 1 },
        Operation::ShortCopy {
            count: 3,
            back: 0x1000,
        },
    ];

    for operation in invalid {
        let mut stream = vec![0x81, b'a'];
        assert_eq!(
            operation.encode(&mut stream),
            Err(EncodeError(operation)),
            "{:?}",
            operation
        );
        assert_eq!(stream, [0x81, b'a']);
    }
}

#[test]
fn test_format_default_is_absolute() {
    assert_eq!(Format::default().copy_offsets, CopyOffsets::Absolute);
}
