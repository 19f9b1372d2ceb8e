use rstest::rstest;
use serde_json::Value;
use tabwire::{ParseOptions, RowReader, StreamParser};

/// Feed `input` in chunks of `size` bytes (split at char boundaries) and
/// collect every emitted row.
fn stream_in_chunks(input: &str, size: usize, options: &ParseOptions) -> Vec<Value> {
    let mut parser = StreamParser::new(options.clone()).unwrap();
    let mut rows = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while end < rest.len() && !rest.is_char_boundary(end) {
            end += 1;
        }
        let (chunk, tail) = rest.split_at(end);
        rows.extend(parser.feed(chunk).unwrap());
        rest = tail;
    }
    rows.extend(parser.finish().unwrap());
    rows
}

fn fixture(lines: usize) -> String {
    let mut input = String::from("id,name,note\n");
    for i in 0..lines {
        if i % 7 == 3 {
            input.push_str(&format!("{i},\"name, {i}\",\"line1\nline2\"\n"));
        } else {
            input.push_str(&format!("{i},user{i},plain\n"));
        }
    }
    input
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(7)]
#[case(64)]
#[case(1024)]
fn chunk_boundary_invariance(#[case] size: usize) {
    let input = fixture(100);
    let options = ParseOptions::default();
    let bulk = tabwire::parse_str_with_options(&input, &options).unwrap();
    let streamed = stream_in_chunks(&input, size, &options);
    assert_eq!(bulk, streamed);
}

#[rstest]
fn chunk_invariance_with_split_inside_quoted_field() {
    let input = "id,note\n1,\"alpha\nbeta\"\n2,plain\n";
    let options = ParseOptions::default();
    let bulk = tabwire::parse_str_with_options(input, &options).unwrap();
    for size in 1..input.len() {
        let streamed = stream_in_chunks(input, size, &options);
        assert_eq!(bulk, streamed, "chunk size {size}");
    }
}

#[rstest]
fn chunk_invariance_in_compact_mode_with_coercion() {
    let input = fixture(80);
    let options = ParseOptions::new()
        .with_output(tabwire::OutputMode::Compact)
        .with_coerce_types(true);
    let bulk = tabwire::parse_str_with_options(&input, &options).unwrap();
    for size in [1, 5, 17, 256] {
        assert_eq!(bulk, stream_in_chunks(&input, size, &options));
    }
}

#[rstest]
fn single_feed_equals_bulk() {
    let input = fixture(10);
    let options = ParseOptions::default();
    let mut parser = StreamParser::new(options.clone()).unwrap();
    let mut rows = parser.feed(&input).unwrap();
    rows.extend(parser.finish().unwrap());
    assert_eq!(rows, tabwire::parse_str_with_options(&input, &options).unwrap());
}

#[rstest]
fn rows_are_withheld_until_their_terminator_arrives() {
    let mut parser = StreamParser::new(ParseOptions::default()).unwrap();
    let mut rows = Vec::new();
    rows.extend(parser.feed("c1,c2\n").unwrap());
    // More lines than the analysis window so emission starts mid-stream.
    for i in 0..200 {
        rows.extend(parser.feed(&format!("{i},x\n")).unwrap());
    }
    assert!(!rows.is_empty());
    // The last fed row always ended in a terminator, so nothing stale
    // remains beyond the repair lookahead.
    let total = rows.len() + parser.finish().unwrap().len();
    assert_eq!(total, 200);
}

#[rstest]
fn unterminated_quote_at_end_of_stream_errors() {
    let mut parser = StreamParser::new(ParseOptions::default()).unwrap();
    parser.feed("a,b\n1,\"never closed").unwrap();
    assert!(parser.finish().is_err());
}

#[rstest]
fn streaming_repair_holds_exactly_one_pending_row() {
    let mut input = String::from("id,note,flag\n");
    for i in 0..70 {
        input.push_str(&format!("{i},plain,ok\n"));
    }
    input.push_str("70,\"wrapped\nvalue\",yes\n");

    let options = ParseOptions::default();
    let bulk = tabwire::parse_str_with_options(&input, &options).unwrap();
    for size in [3, 10, 1000] {
        assert_eq!(bulk, stream_in_chunks(&input, size, &options));
    }
    assert_eq!(bulk.len(), 71);
}

#[rstest]
fn row_reader_yields_same_rows_as_bulk() {
    let input = fixture(50);
    let options = ParseOptions::default();
    let bulk = tabwire::parse_str_with_options(&input, &options).unwrap();

    let cursor = std::io::Cursor::new(input.into_bytes());
    let reader = RowReader::with_chunk_size(cursor, options, 11).unwrap();
    let streamed: tabwire::Result<Vec<Value>> = reader.collect();
    assert_eq!(bulk, streamed.unwrap());
}

#[rstest]
fn row_reader_survives_multibyte_chunk_splits() {
    let input = "name,city\nJosé,Zürich\nØyvind,Tromsø\n";
    let options = ParseOptions::default();
    let bulk = tabwire::parse_str_with_options(input, &options).unwrap();

    for size in 1..8 {
        let cursor = std::io::Cursor::new(input.as_bytes().to_vec());
        let reader = RowReader::with_chunk_size(cursor, options.clone(), size).unwrap();
        let streamed: tabwire::Result<Vec<Value>> = reader.collect();
        assert_eq!(bulk, streamed.unwrap(), "chunk size {size}");
    }
}

#[rstest]
fn stream_parser_validates_options_up_front() {
    let options = ParseOptions::new().with_auto_detect(false);
    assert!(StreamParser::new(options).is_err());
}
