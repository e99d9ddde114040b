#[cfg(test)]
mod integration {
    use ::delimstream::models::readers::delimited_reader::DelimitedReader;
    use ::delimstream::models::writers::delimited_writer::DelimitedWriter;
    use ::delimstream::traits::field_decoder::BytesDecoder;
    use ::delimstream::{
        DialectConfig, DialectOptions, MalformedReason, ParseOutcome, RecordDecoder, Terminator,
    };

    fn owned(outcome: ParseOutcome<'_>) -> Result<Option<Vec<Option<Vec<u8>>>>, MalformedReason> {
        match outcome {
            ParseOutcome::Row(r) => Ok(Some(r.to_owned_fields())),
            ParseOutcome::Malformed(m) => Err(m.reason),
            ParseOutcome::NeedMoreInput | ParseOutcome::EndOfStream => Ok(None),
        }
    }

    fn text_decoder(options: DialectOptions, columns: usize) -> RecordDecoder {
        RecordDecoder::new(DialectConfig::with_text_columns(&options, columns).unwrap())
    }

    #[test]
    fn tab_delimited_row() {
        let mut d = text_decoder(DialectOptions::text(), 3);
        d.feed(b"a\tb\tc\n");
        assert_eq!(
            owned(d.next_record()),
            Ok(Some(vec![Some(b"a".to_vec()), Some(b"b".to_vec()), Some(b"c".to_vec())]))
        );
        assert!(matches!(d.next_record(), ParseOutcome::NeedMoreInput));
    }

    #[test]
    fn escape_sequences_decode() {
        let mut d = text_decoder(DialectOptions::text(), 2);
        d.feed(b"\\101\\x42\\n\\q\t\\\\N\n");
        assert_eq!(
            owned(d.next_record()),
            Ok(Some(vec![Some(b"AB\nq".to_vec()), Some(b"\\N".to_vec())]))
        );
    }

    #[test]
    fn end_marker_returns_pending_data() {
        let mut d = text_decoder(DialectOptions::text(), 2);
        d.feed(b"x\ty\n1\t2\\.\nignored\n");
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"x".to_vec()), Some(b"y".to_vec())])));
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"1".to_vec()), Some(b"2".to_vec())])));
        assert!(matches!(d.next_record(), ParseOutcome::EndOfStream));
        assert!(d.is_finished());
    }

    #[test]
    fn end_marker_errors() {
        let mut d = text_decoder(DialectOptions::text(), 1);
        d.feed(b"a\n\\.x\n");
        d.at_end_of_input();
        assert!(owned(d.next_record()).unwrap().is_some());
        assert_eq!(owned(d.next_record()), Err(MalformedReason::EndMarkerCorrupt));

        let mut d = text_decoder(DialectOptions::text(), 1);
        d.feed(b"a\r\n\\.\n");
        d.at_end_of_input();
        assert!(owned(d.next_record()).unwrap().is_some());
        assert_eq!(owned(d.next_record()), Err(MalformedReason::EndMarkerNewlineMismatch));
    }

    #[test]
    fn terminator_frozen_on_first_line() {
        let mut d = text_decoder(DialectOptions::text(), 1);
        d.feed(b"a\r\nb\nc\r\n");
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"a".to_vec())])));
        assert_eq!(d.detected_terminator(), Some(Terminator::CrLf));
        // lenient: the bare LF is data
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"b\nc".to_vec())])));
    }

    #[test]
    fn strict_newlines_reject_stray_lf() {
        let options = DialectOptions { lenient_newlines: false, ..DialectOptions::text() };
        let mut d = text_decoder(options, 1);
        d.feed(b"a\r\nb\nc\r\nd\r\n");
        assert!(owned(d.next_record()).unwrap().is_some());
        assert_eq!(owned(d.next_record()), Err(MalformedReason::LiteralNewline));
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"d".to_vec())])));
    }

    #[test]
    fn partial_record_at_end_of_input() {
        let mut d = text_decoder(DialectOptions::text(), 2);
        d.feed(b"a\tb");
        assert!(matches!(d.next_record(), ParseOutcome::NeedMoreInput));
        d.at_end_of_input();
        assert_eq!(owned(d.next_record()), Err(MalformedReason::UnexpectedEof));
        assert!(matches!(d.next_record(), ParseOutcome::EndOfStream));
    }

    #[test]
    fn writer_output_reads_back() {
        let rows: Vec<Vec<Option<&[u8]>>> = vec![
            vec![Some(b"tab\there".as_slice()), Some(b"line\nbreak".as_slice()), None],
            vec![Some(b"back\\slash".as_slice()), Some(b"\\N".as_slice()), Some(b"".as_slice())],
            vec![Some(b"cr\rx".as_slice()), Some(b"\\.".as_slice()), Some(b"\x0b\x0c".as_slice())],
        ];
        let config = DialectConfig::with_text_columns(&DialectOptions::text(), 3).unwrap();
        let mut w = DelimitedWriter::new_vec(&config);
        for row in &rows {
            w.write_row(row).unwrap();
        }
        w.write_end_marker().unwrap();
        let bytes = w.into_inner();

        let mut reader: DelimitedReader<&[u8]> = DelimitedReader::from_slice(&bytes, config);
        let decoded = reader.read_rows(&mut BytesDecoder).unwrap();
        assert_eq!(decoded.len(), rows.len());
        for (got, want) in decoded.iter().zip(&rows) {
            let want: Vec<Option<Vec<u8>>> = want.iter().map(|v| v.map(<[u8]>::to_vec)).collect();
            assert_eq!(got.values, want);
        }
    }

    #[test]
    fn single_column_with_delimiter_off() {
        let options = DialectOptions { delimiter: Some("off".into()), ..DialectOptions::text() };
        let mut d = text_decoder(options, 1);
        d.feed(b"a\tb,c\n");
        assert_eq!(owned(d.next_record()), Ok(Some(vec![Some(b"a\tb,c".to_vec())])));
    }
}
