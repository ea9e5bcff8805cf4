use pretty_assertions::assert_eq;
use serde_json::json;
use weft_core::prelude::*;
use weft_core::Contents;
use weft_test_utils::{counting_transformer, failing_plugin, literal_processor, root_of, uppercase_plugin};

fn set_parser() -> Plugin {
    Plugin::new("setParser", |ctx, _| {
        ctx.set_parser(Parser::new(|text, _| Ok(Node::root().with("value", json!(text)))));
        Ok(None)
    })
}

fn upper() -> Plugin {
    Plugin::new("upper", |_, _| {
        Ok(Some(Transformer::sync(|tree, _, _| {
            let value = tree.value().unwrap_or_default().to_uppercase();
            Ok(Some(tree.clone().with("value", json!(value))))
        })))
    })
}

fn set_compiler() -> Plugin {
    Plugin::new("setCompiler", |ctx, _| {
        ctx.set_compiler(Compiler::new(|tree, _| {
            Ok(Output::Text(tree.value().unwrap_or_default().to_string()))
        }));
        Ok(None)
    })
}

#[test]
fn test_process_sync_uppercases() {
    let mut processor = Processor::new()
        .use_plugin(vec![set_parser(), upper(), set_compiler()])
        .unwrap();

    let file = processor.process_sync("abc").unwrap();
    assert_eq!(file.to_string(), "ABC");
    assert!(file.result.is_none());
}

#[tokio::test]
async fn test_process_async_matches_sync() {
    let mut processor = Processor::new()
        .use_plugin(vec![set_parser(), upper(), set_compiler()])
        .unwrap();

    let file = processor.process("abc").await.unwrap();
    assert_eq!(file.to_string(), "ABC");

    let (tx, rx) = tokio::sync::oneshot::channel();
    processor
        .process_with("xyz", move |result| {
            let _ = tx.send(result.map(|file| file.to_string()));
        })
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap().unwrap(), "XYZ");
}

#[test]
fn test_parse_empty_without_parser_is_empty_root() {
    let mut processor = Processor::new();
    let tree = processor.parse("").unwrap();
    assert_eq!(tree, Node::root());
    assert!(tree.children().is_empty());
}

#[test]
fn test_stringify_without_compiler_returns_tree() {
    let mut processor = Processor::new();
    let tree = root_of(&["a", "b"]);
    let output = processor.stringify(tree.clone(), &VFile::new()).unwrap();
    assert_eq!(output.as_tree(), Some(&tree));
}

#[test]
fn test_process_without_compiler_stores_tree_in_result() {
    let mut processor = Processor::new().use_plugin(set_parser()).unwrap();
    let file = processor.process_sync("kept").unwrap();

    assert_eq!(file.to_string(), "kept");
    let tree = file.result.as_ref().and_then(Output::as_tree).unwrap();
    assert_eq!(tree.value(), Some("kept"));
}

#[test]
fn test_bytes_output_becomes_file_content() {
    let mut processor = Processor::new()
        .with_compiler(Compiler::new(|tree, _| Ok(Output::Bytes(tree.kind().as_bytes().to_vec()))));
    let file = processor.process_sync(Vec::from(&b"raw"[..])).unwrap();

    assert!(matches!(file.value, Some(Contents::Bytes(ref bytes)) if bytes == b"root"));
    assert!(file.result.is_none());
}

#[test]
fn test_opaque_output_lands_in_result() {
    #[derive(Debug, PartialEq)]
    struct Summary(usize);

    let mut processor = Processor::new()
        .use_plugin(set_parser())
        .unwrap()
        .with_compiler(Compiler::new(|tree, _| {
            Ok(Output::opaque(Summary(tree.value().map_or(0, str::len))))
        }));
    let file = processor.process_sync("four").unwrap();

    let summary = file.result.as_ref().and_then(Output::downcast_ref::<Summary>);
    assert_eq!(summary, Some(&Summary(4)));
}

#[test]
fn test_process_failure_short_circuits_compile() {
    let (after, calls) = counting_transformer("after");
    let compiled = weft_test_utils::Counter::new();
    let seen = compiled.clone();
    let mut processor = literal_processor()
        .use_plugin(vec![failing_plugin("broken", "nope"), after])
        .unwrap()
        .with_compiler(Compiler::new(move |_, _| {
            seen.bump();
            Ok(Output::from("unreachable"))
        }));

    let err = processor.process_sync("x").unwrap_err();
    assert!(err.is_transform_failure());
    assert_eq!(calls.get(), 0);
    assert_eq!(compiled.get(), 0);
}

#[test]
fn test_parse_failure_short_circuits_run() {
    let (transform, calls) = counting_transformer("t");
    let mut processor = Processor::new()
        .with_parser(Parser::new(|_, _| Err("unparseable".into())))
        .use_plugin(transform)
        .unwrap();

    let err = processor.process_sync("x").unwrap_err();
    assert!(matches!(err, ProcessorError::Parse(_)));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_process_sync_rejects_async_transformers() {
    let mut processor = literal_processor()
        .use_plugin(uppercase_plugin())
        .unwrap()
        .use_plugin(Plugin::transformer(
            "later",
            Transformer::future(|tree, file, _| async move { Ok::<_, BoxError>((tree, file)) }),
        ))
        .unwrap();

    let err = processor.process_sync("abc").unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::AsyncUsage { operation: "process_sync", index: 3, .. }
    ));
}

#[test]
fn test_file_path_and_messages_flow_through() {
    let mut processor = literal_processor()
        .use_plugin(Plugin::transformer(
            "note",
            Transformer::sync(|_, file, _| {
                file.message("looked at it", Some("note"));
                Ok(None)
            }),
        ))
        .unwrap();

    let file = processor
        .process_sync(VFile::from("body").with_path("doc.txt"))
        .unwrap();
    assert_eq!(file.path.as_deref(), Some(std::path::Path::new("doc.txt")));
    assert_eq!(file.messages.len(), 1);
    assert_eq!(file.messages[0].to_string(), "warning: looked at it (note)");
}

#[test]
fn test_transformer_can_fail_through_the_file() {
    let mut processor = literal_processor()
        .use_plugin(Plugin::transformer(
            "strict",
            Transformer::sync(|_, file, _| Err(file.fail("not allowed", Some("strict")).into())),
        ))
        .unwrap();

    let err = processor.process_sync("x").unwrap_err();
    assert!(err.to_string().contains("not allowed"));
}
