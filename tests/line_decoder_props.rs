use console_runner::exec::multiplex::LineDecoder;
use proptest::prelude::*;

fn decode_in_chunks(bytes: &[u8], chunk: usize) -> Vec<String> {
    decode_with(LineDecoder::default(), bytes, chunk)
}

fn decode_with(mut decoder: LineDecoder, bytes: &[u8], chunk: usize) -> Vec<String> {
    let mut out = Vec::new();
    for piece in bytes.chunks(chunk.max(1)) {
        out.extend(decoder.push(piece).into_iter().map(|l| l.text));
    }
    out.extend(decoder.finish().map(|l| l.text));
    out
}

proptest! {
    #[test]
    fn chunking_does_not_change_lines(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
        chunk in 1usize..64,
    ) {
        let whole = decode_in_chunks(&bytes, bytes.len().max(1));
        let split = decode_in_chunks(&bytes, chunk);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn ascii_lines_match_text_split(
        lines in proptest::collection::vec("[a-z0-9 ]{0,20}", 0..20),
        chunk in 1usize..16,
    ) {
        let mut text = lines.join("\n");
        text.push('\n');
        let decoded = decode_in_chunks(text.as_bytes(), chunk);
        let expected: Vec<String> = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines.clone()
        };
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn decoded_lines_never_hold_newlines(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        chunk in 1usize..32,
    ) {
        for line in decode_in_chunks(&bytes, chunk) {
            prop_assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn capped_lines_split_the_same_way_whatever_the_chunking(
        bytes in proptest::collection::vec(prop_oneof![Just(b'\n'), Just(b'\r'), b'a'..=b'z'], 0..400),
        chunk in 1usize..64,
        max_line in 1usize..32,
    ) {
        let whole = decode_with(LineDecoder::with_max_line(max_line), &bytes, bytes.len().max(1));
        let split = decode_with(LineDecoder::with_max_line(max_line), &bytes, chunk);
        prop_assert_eq!(&whole, &split);
        for line in &whole {
            prop_assert!(line.len() <= max_line);
        }
    }
}
