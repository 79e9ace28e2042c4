//! Codec Tests
//!
//! Tests for request encoding and reply decoding.

use std::collections::BTreeMap;
use std::io::Cursor;

use hlld_client::protocol::{
    decode_response, encode_command, read_line, Command, CommandKind, CreateOptions, Decoder,
    Value,
};
use hlld_client::{HlldError, ServiceErrorKind};

// =============================================================================
// Helper Functions
// =============================================================================

fn decode(command: &Command, wire: &str) -> hlld_client::Result<Value> {
    let mut reader = Cursor::new(wire.as_bytes().to_vec());
    decode_response(command, &mut reader)
}

fn service_kind(result: hlld_client::Result<Value>) -> ServiceErrorKind {
    match result {
        Err(HlldError::Service { kind, .. }) => kind,
        other => panic!("Expected service error, got {:?}", other),
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_simple_commands() {
    let cases = [
        (Command::drop("s"), "drop s\n"),
        (Command::close("s"), "close s\n"),
        (Command::clear("s"), "clear s\n"),
        (Command::add("s", "k"), "set s k\n"),
        (Command::check("s", "k"), "check s k\n"),
        (Command::info("s"), "info s\n"),
        (Command::flush(Some("s")), "flush s\n"),
        (Command::flush(None), "flush\n"),
        (Command::list(None), "list\n"),
        (Command::list(Some("web.")), "list web.\n"),
    ];

    for (command, expected) in cases {
        assert_eq!(encode_command(&command).unwrap(), expected);
    }
}

#[test]
fn test_encode_create_with_options() {
    let plain = Command::create("s", &CreateOptions::default());
    assert_eq!(encode_command(&plain).unwrap(), "create s\n");

    let tuned = Command::create("s", &CreateOptions::default().precision(14).in_memory(true));
    assert_eq!(
        encode_command(&tuned).unwrap(),
        "create s precision=14 in_memory=1\n"
    );

    let by_eps = Command::create("s", &CreateOptions::default().eps(0.01));
    assert_eq!(encode_command(&by_eps).unwrap(), "create s eps=0.01\n");
}

#[test]
fn test_encode_create_rejects_precision_and_eps() {
    let options = CreateOptions::default().precision(12).eps(0.02);
    let result = encode_command(&Command::create("s", &options));
    assert!(matches!(result, Err(HlldError::InvalidArgument(_))));
}

#[test]
fn test_encode_bulk_keys_on_one_line() {
    let add = Command::bulk_add("s", ["a", "b", "c"]);
    assert_eq!(encode_command(&add).unwrap(), "bulk s a b c\n");

    let check = Command::bulk_check("s", vec!["a".to_string(), "b".to_string()]);
    assert_eq!(encode_command(&check).unwrap(), "multi s a b\n");
    assert_eq!(check.kind(), CommandKind::BulkCheck);
    assert_eq!(check.key_count(), 2);
}

#[test]
fn test_encode_rejects_framing_breakers() {
    let bad = [
        Command::add("s", "two words"),
        Command::add("s", "line\nbreak"),
        Command::add("s", ""),
        Command::info("my set"),
        Command::bulk_add("s", Vec::<String>::new()),
        Command::bulk_check("s", ["ok", "tab\there"]),
    ];

    for command in &bad {
        assert!(
            matches!(encode_command(command), Err(HlldError::InvalidArgument(_))),
            "expected {:?} to be rejected",
            command
        );
    }
}

// =============================================================================
// Single-line Decoding Tests
// =============================================================================

#[test]
fn test_decode_done_acknowledgements() {
    let create = Command::create("s", &CreateOptions::default());
    assert_eq!(decode(&create, "Done\n").unwrap(), Value::Unit);
    assert_eq!(decode(&Command::add("s", "k"), "Done\n").unwrap(), Value::Unit);
    assert_eq!(decode(&Command::flush(None), "Done\r\n").unwrap(), Value::Unit);
}

#[test]
fn test_decode_check() {
    let check = Command::check("s", "k");
    assert_eq!(decode(&check, "Yes\n").unwrap(), Value::Bool(true));
    assert_eq!(decode(&check, "No\n").unwrap(), Value::Bool(false));
}

#[test]
fn test_decode_bulk_check_positional() {
    let check = Command::bulk_check("s", ["a", "b", "c"]);
    assert_eq!(
        decode(&check, "Yes No Yes\n").unwrap(),
        Value::Bools(vec![true, false, true])
    );
}

#[test]
fn test_decode_bulk_check_count_mismatch() {
    let check = Command::bulk_check("s", ["a", "b", "c"]);
    assert!(matches!(decode(&check, "Yes No\n"), Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_bulk_add_tokens_and_done() {
    let add = Command::bulk_add("s", ["a", "b", "c"]);
    assert_eq!(
        decode(&add, "Yes Exists No\n").unwrap(),
        Value::Bools(vec![true, false, false])
    );
    assert_eq!(
        decode(&add, "Done\n").unwrap(),
        Value::Bools(vec![true, true, true])
    );
}

#[test]
fn test_decode_error_lines_for_any_single_line_verb() {
    let commands = [
        Command::create("s", &CreateOptions::default()),
        Command::drop("s"),
        Command::close("s"),
        Command::add("s", "k"),
        Command::flush(Some("s")),
        Command::check("s", "k"),
        Command::bulk_check("s", ["a", "b"]),
        Command::bulk_add("s", ["a", "b"]),
    ];

    for command in &commands {
        assert_eq!(
            service_kind(decode(command, "Set does not exist\n")),
            ServiceErrorKind::SetNotExist,
            "for {:?}",
            command
        );
    }
}

#[test]
fn test_decode_known_error_tokens() {
    let create = Command::create("s", &CreateOptions::default());
    assert_eq!(service_kind(decode(&create, "Set already exists\n")), ServiceErrorKind::SetExists);
    assert_eq!(service_kind(decode(&create, "Exists\n")), ServiceErrorKind::SetExists);
    assert_eq!(service_kind(decode(&create, "Delete in progress\n")), ServiceErrorKind::SetDeleted);

    let add = Command::add("s", "k");
    assert_eq!(service_kind(decode(&add, "Set is not enabled\n")), ServiceErrorKind::SetDisabled);
    assert_eq!(
        service_kind(decode(&add, "Client Error: Command not supported\n")),
        ServiceErrorKind::UnknownCommand
    );
    assert_eq!(service_kind(decode(&add, "Internal Error\n")), ServiceErrorKind::InternalError);
}

#[test]
fn test_decode_service_error_keeps_message() {
    let result = decode(&Command::drop("s"), "Client Error: Bad arguments\n");
    match result {
        Err(HlldError::Service { kind, message }) => {
            assert_eq!(kind, ServiceErrorKind::UnknownCommand);
            assert_eq!(message, "Client Error: Bad arguments");
        }
        other => panic!("Expected service error, got {:?}", other),
    }
}

#[test]
fn test_decode_unknown_reply_is_protocol_error() {
    let result = decode(&Command::add("s", "k"), "Maybe\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));

    let result = decode(&Command::check("s", "k"), "Done\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_eof_is_connection_error() {
    let result = decode(&Command::add("s", "k"), "");
    assert!(matches!(result, Err(HlldError::Connection(_))));

    let result = decode(&Command::add("s", "k"), "Do");
    assert!(matches!(result, Err(HlldError::Connection(_))));
}

// =============================================================================
// Block Decoding Tests
// =============================================================================

#[test]
fn test_decode_info_block() {
    let info = decode(&Command::info("s"), "size 10\nstorage 512\nEND\n").unwrap();

    let mut expected = BTreeMap::new();
    expected.insert("size".to_string(), "10".to_string());
    expected.insert("storage".to_string(), "512".to_string());
    assert_eq!(info, Value::Info(expected));
}

#[test]
fn test_decode_info_block_with_start_marker() {
    let wire = "START\nin_memory 0\nprecision 12\nsize 3\nEND\n";
    let info = decode(&Command::info("s"), wire).unwrap().into_info().unwrap();
    assert_eq!(info.len(), 3);
    assert_eq!(info["precision"], "12");
}

#[test]
fn test_decode_info_value_keeps_spaces() {
    let info = decode(&Command::info("s"), "note a b c\nEND\n").unwrap().into_info().unwrap();
    assert_eq!(info["note"], "a b c");
}

#[test]
fn test_decode_info_missing_end() {
    let result = decode(&Command::info("s"), "size 10\nstorage 512\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_info_blank_line_is_malformed() {
    let result = decode(&Command::info("s"), "size 10\n\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_info_line_without_value() {
    let result = decode(&Command::info("s"), "size\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_info_missing_set() {
    let result = decode(&Command::info("s"), "Set does not exist\n");
    assert_eq!(service_kind(result), ServiceErrorKind::SetNotExist);
}

#[test]
fn test_decode_list_block_names_only() {
    let wire = "START\nfoo 0.016 12 3280 42\nbar 0.016 12 3280 0\nEND\n";
    let names = decode(&Command::list(None), wire).unwrap();
    assert_eq!(names, Value::List(vec!["foo".to_string(), "bar".to_string()]));
}

#[test]
fn test_decode_empty_list() {
    assert_eq!(decode(&Command::list(None), "START\nEND\n").unwrap(), Value::List(vec![]));
    assert_eq!(decode(&Command::list(None), "END\n").unwrap(), Value::List(vec![]));
}

#[test]
fn test_decode_list_missing_end() {
    let result = decode(&Command::list(None), "START\nfoo 0.016 12 3280 42\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_list_rejects_foreign_replies() {
    let mut reader = Cursor::new(b"Done\nSTART\nsize 1\nEND\nYes\n".to_vec());
    let result = decode_response(&Command::list(None), &mut reader);
    assert!(matches!(result, Err(HlldError::Protocol(_))));

    // Fails on the first line instead of reading ahead to a later END
    assert_eq!(read_line(&mut reader).unwrap(), "START");
}

#[test]
fn test_decode_list_line_needs_all_fields() {
    let result = decode(&Command::list(None), "START\nfoo 0.016 12\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));

    let result = decode(&Command::list(None), "START\nfoo 0.016 twelve 3280 42\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_block_rejects_nested_start() {
    let result = decode(&Command::info("s"), "START\nSTART\nsize 1\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));

    let result = decode(&Command::list(None), "START\nfoo 0.016 12 3280 42\nSTART\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

#[test]
fn test_decode_info_rejects_ack_line() {
    let result = decode(&Command::info("s"), "Done\nsize 1\nEND\n");
    assert!(matches!(result, Err(HlldError::Protocol(_))));
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_decoders_consume_exactly_one_reply() {
    let wire = "Done\nsize 1\nEND\nYes No\nNo\n";
    let mut reader = Cursor::new(wire.as_bytes().to_vec());

    assert_eq!(Decoder::Ack.decode(&mut reader).unwrap(), Value::Unit);
    assert!(matches!(Decoder::Info.decode(&mut reader).unwrap(), Value::Info(_)));
    assert_eq!(
        Decoder::BulkCheck { keys: 2 }.decode(&mut reader).unwrap(),
        Value::Bools(vec![true, false])
    );
    assert_eq!(Decoder::Check.decode(&mut reader).unwrap(), Value::Bool(false));
}

#[test]
fn test_read_line_strips_terminators() {
    let mut reader = Cursor::new(b"one\r\ntwo\n".to_vec());
    assert_eq!(read_line(&mut reader).unwrap(), "one");
    assert_eq!(read_line(&mut reader).unwrap(), "two");
    assert!(matches!(read_line(&mut reader), Err(HlldError::Connection(_))));
}

#[test]
fn test_read_line_rejects_invalid_utf8() {
    let mut reader = Cursor::new(vec![0xff, 0xfe, b'\n']);
    assert!(matches!(read_line(&mut reader), Err(HlldError::Protocol(_))));
}

#[test]
fn test_value_accessors_report_mismatch() {
    assert!(Value::Unit.into_unit().is_ok());
    assert!(matches!(Value::Unit.into_bool(), Err(HlldError::Protocol(_))));
    assert_eq!(Value::Bools(vec![true]).into_bools().unwrap(), vec![true]);
    assert!(matches!(Value::Bool(true).into_list(), Err(HlldError::Protocol(_))));
}
