#[cfg(test)]
mod integration {
    use ::delimstream::models::readers::delimited_reader::DelimitedReader;
    use ::delimstream::models::writers::delimited_writer::DelimitedWriter;
    use ::delimstream::error::FieldDecodeError;
    use ::delimstream::traits::field_decoder::{BytesDecoder, Utf8Decoder};
    use ::delimstream::{
        ColumnSpec, DialectConfig, DialectOptions, MalformedReason, ParseOutcome, RecordDecoder,
    };

    type Fields = Vec<Option<Vec<u8>>>;

    fn drain(config: DialectConfig, input: &[u8]) -> Vec<Result<Fields, MalformedReason>> {
        let mut d: RecordDecoder = RecordDecoder::new(config);
        d.feed(input);
        d.at_end_of_input();
        let mut out = Vec::new();
        loop {
            match d.next_record() {
                ParseOutcome::Row(r) => out.push(Ok(r.to_owned_fields())),
                ParseOutcome::Malformed(m) => out.push(Err(m.reason)),
                ParseOutcome::EndOfStream => return out,
                ParseOutcome::NeedMoreInput => panic!("input already ended"),
            }
        }
    }

    fn csv(columns: usize) -> DialectConfig {
        DialectConfig::with_text_columns(&DialectOptions::csv(), columns).unwrap()
    }

    fn f(v: &str) -> Option<Vec<u8>> {
        Some(v.as_bytes().to_vec())
    }

    #[test]
    fn quoted_empty_is_not_null() {
        let out = drain(csv(3), b"\"hi, there\",\"\",x\n");
        assert_eq!(out, vec![Ok(vec![f("hi, there"), f(""), f("x")])]);

        let out = drain(csv(2), b",a\n");
        assert_eq!(out, vec![Ok(vec![None, f("a")])]);
    }

    #[test]
    fn unterminated_quote_at_end_of_input() {
        let out = drain(csv(1), b"\"abc\n");
        assert_eq!(out, vec![Err(MalformedReason::UnterminatedQuote)]);
    }

    #[test]
    fn partial_record_needs_more_then_fails() {
        let mut d: RecordDecoder = RecordDecoder::new(csv(2));
        d.feed(b"a,b");
        assert!(matches!(d.next_record(), ParseOutcome::NeedMoreInput));
        d.at_end_of_input();
        match d.next_record() {
            ParseOutcome::Malformed(m) => {
                assert_eq!(m.reason, MalformedReason::UnexpectedEof);
                assert_eq!(m.to_string(), "unexpected end of input (record 1, offset 0): \"a,b\"");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quoted_newlines_and_doubled_quotes() {
        let out = drain(csv(2), b"\"multi\nline\",\"say \"\"hi\"\"\"\r\nx,y\r\n");
        assert_eq!(out, vec![Ok(vec![f("multi\nline"), f("say \"hi\"")]), Ok(vec![f("x"), f("y")])]);
    }

    #[test]
    fn distinct_escape_character() {
        let options = DialectOptions { escape: Some("\\".into()), ..DialectOptions::csv() };
        let config = DialectConfig::with_text_columns(&options, 2).unwrap();
        let out = drain(config, b"\"a\\\"b\",\"c\\\\d\"\n");
        assert_eq!(out, vec![Ok(vec![f("a\"b"), f("c\\d")])]);
    }

    #[test]
    fn end_marker_only_on_its_own_line() {
        let out = drain(csv(2), b"a,\\.\n\\.\nlater,row\n");
        assert_eq!(out, vec![Ok(vec![f("a"), f("\\.")])]);
    }

    #[test]
    fn header_and_force_options() {
        let options = DialectOptions { header: true, ..DialectOptions::csv() };
        let config = options
            .validate(vec![
                ColumnSpec::text("keep").with_force_not_null(),
                ColumnSpec::text("nullify").with_force_null(),
                ColumnSpec::text("plain"),
            ])
            .unwrap();
        let out = drain(config, b"keep,nullify,plain\n,\"\",\"\"\n");
        assert_eq!(out, vec![Ok(vec![f(""), None, f("")])]);
    }

    #[test]
    fn force_options_need_csv() {
        let err = DialectOptions::text()
            .validate(vec![ColumnSpec::text("a").with_force_null()])
            .unwrap_err();
        assert_eq!(err.to_string(), "force null available only in CSV mode");
    }

    #[test]
    fn writer_output_reads_back() {
        let rows: Vec<Vec<Option<&[u8]>>> = vec![
            vec![Some(b"plain".as_slice()), Some(b"a,b".as_slice()), None],
            vec![Some(b"".as_slice()), Some(b"say \"hi\"".as_slice()), Some(b"two\nlines".as_slice())],
            vec![Some(b"\\.".as_slice()), Some(b"cr\r".as_slice()), Some(b" spaced ".as_slice())],
        ];
        let config = DialectConfig::with_text_columns(&DialectOptions::csv(), 3).unwrap();
        let mut w = DelimitedWriter::new_vec(&config);
        for row in &rows {
            w.write_row(row).unwrap();
        }
        let bytes = w.into_inner();

        let mut reader: DelimitedReader<&[u8]> = DelimitedReader::from_slice(&bytes, config);
        let decoded = reader.read_rows(&mut BytesDecoder).unwrap();
        let want: Vec<Fields> =
            rows.iter().map(|r| r.iter().map(|v| v.map(<[u8]>::to_vec)).collect()).collect();
        let got: Vec<Fields> = decoded.into_iter().map(|r| r.values).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn reader_reports_decode_column() {
        let config = DialectOptions::csv()
            .validate(vec![ColumnSpec::text("a"), ColumnSpec::text("b")])
            .unwrap();
        let mut reader: DelimitedReader<&[u8]> = DelimitedReader::from_slice(b"ok,nope\n", config);
        let mut digits_in_b = |column: &ColumnSpec, raw: &[u8]| -> Result<Vec<u8>, FieldDecodeError> {
            if column.name == "b" && !raw.iter().all(u8::is_ascii_digit) {
                return Err(FieldDecodeError::new("expected digits"));
            }
            Ok(raw.to_vec())
        };
        let err = reader.next_row(&mut digits_in_b).unwrap_err();
        assert_eq!(err.to_string(), "expected digits, column b: \"nope\"");

        let mut reader: DelimitedReader<&[u8]> = DelimitedReader::from_slice(b"ok,\xff\xfe\n", csv(2));
        match reader.next_row(&mut Utf8Decoder) {
            Err(e) => assert!(e.to_string().starts_with("invalid byte sequence for encoding \"UTF8\"")),
            Ok(row) => panic!("unexpected {row:?}"),
        }
    }
}
