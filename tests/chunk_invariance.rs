#[cfg(test)]
mod integration {
    use ::delimstream::enums::BufferChunkSize;
    use ::delimstream::models::readers::delimited_reader::DelimitedReader;
    use ::delimstream::models::writers::delimited_writer::DelimitedWriter;
    use ::delimstream::traits::field_decoder::Utf8Decoder;
    use ::delimstream::{DialectConfig, DialectOptions, MalformedReason, ParseOutcome, RecordDecoder};
    use proptest::prelude::*;

    type Outcomes = Vec<Result<Vec<Option<Vec<u8>>>, MalformedReason>>;

    fn decode_chunks(config: DialectConfig, chunks: &[&[u8]]) -> Outcomes {
        let mut d: RecordDecoder = RecordDecoder::new(config);
        let mut chunks = chunks.iter();
        let mut out = Vec::new();
        loop {
            match d.next_record() {
                ParseOutcome::Row(r) => out.push(Ok(r.to_owned_fields())),
                ParseOutcome::Malformed(m) => out.push(Err(m.reason)),
                ParseOutcome::EndOfStream => return out,
                ParseOutcome::NeedMoreInput => match chunks.next() {
                    Some(c) => {
                        d.feed(c);
                    }
                    None => d.at_end_of_input(),
                },
            }
        }
    }

    fn split_at_points<'a>(data: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
        let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
        cuts.sort_unstable();
        let mut out = Vec::new();
        let mut prev = 0;
        for c in cuts {
            out.push(&data[prev..c]);
            prev = c;
        }
        out.push(&data[prev..]);
        out
    }

    fn config(options: DialectOptions) -> DialectConfig {
        DialectConfig::with_text_columns(&options, 3).unwrap()
    }

    fn write_then_read(options: DialectOptions, rows: &[Vec<Option<String>>], chunk: usize) -> Vec<Vec<Option<String>>> {
        let config = config(options);
        let mut w = DelimitedWriter::new_vec(&config);
        for row in rows {
            let fields: Vec<Option<&[u8]>> = row.iter().map(|v| v.as_deref().map(str::as_bytes)).collect();
            w.write_row(&fields).unwrap();
        }
        w.write_end_marker().unwrap();
        let bytes = w.into_inner();

        let mut reader: DelimitedReader<&[u8]> =
            DelimitedReader::from_slice(&bytes, config).with_chunk_size(BufferChunkSize::Custom(chunk));
        reader.read_rows(&mut Utf8Decoder).unwrap().into_iter().map(|r| r.values).collect()
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<Vec<Option<String>>>> {
        let value = prop::option::of("[a-z,\"\\\\\t\n\ré .N]{0,6}");
        prop::collection::vec(prop::collection::vec(value, 3), 0..8)
    }

    proptest! {
        #[test]
        fn csv_outcomes_ignore_chunking(
            input in prop::collection::vec(prop::sample::select(b"a,\"\n\\.".to_vec()), 0..40),
            cuts in prop::collection::vec(any::<usize>(), 0..6),
        ) {
            let whole = decode_chunks(config(DialectOptions::csv()), &[&input]);
            let pieces = decode_chunks(config(DialectOptions::csv()), &split_at_points(&input, &cuts));
            prop_assert_eq!(whole, pieces);
        }

        #[test]
        fn text_outcomes_ignore_chunking(
            input in prop::collection::vec(prop::sample::select(b"a\t\\N.\n".to_vec()), 0..40),
            cuts in prop::collection::vec(any::<usize>(), 0..6),
        ) {
            let whole = decode_chunks(config(DialectOptions::text()), &[&input]);
            let pieces = decode_chunks(config(DialectOptions::text()), &split_at_points(&input, &cuts));
            prop_assert_eq!(whole, pieces);
        }

        #[test]
        fn csv_rows_round_trip(rows in rows_strategy(), chunk in 1usize..9) {
            prop_assert_eq!(write_then_read(DialectOptions::csv(), &rows, chunk), rows);
        }

        #[test]
        fn text_rows_round_trip(rows in rows_strategy(), chunk in 1usize..9) {
            prop_assert_eq!(write_then_read(DialectOptions::text(), &rows, chunk), rows);
        }
    }
}
