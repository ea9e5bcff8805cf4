use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use weft_core::prelude::*;
use weft_test_utils::{literal, literal_processor};

/// Copies namespace `key` into the tree at run time; also records what the
/// attacher saw at freeze time
fn echo_plugin(key: &'static str) -> Plugin {
    Plugin::new("echo", move |ctx, _| {
        let at_freeze = ctx.data_get(key).cloned().unwrap_or_default();
        Ok(Some(Transformer::sync(move |tree, _, namespace| {
            tree.set("atFreeze", at_freeze.clone());
            tree.set(key, namespace.get(key).unwrap_or_default());
            Ok(None)
        })))
    })
}

/// Writes the document text into the namespace, waits, then reports what the
/// namespace holds in `file.data`
fn stash_plugin() -> Plugin {
    Plugin::transformer(
        "stash",
        Transformer::future(|tree, mut file, namespace| async move {
            namespace.insert("doc", json!(file.text()));
            tokio::time::sleep(Duration::from_millis(20)).await;
            let seen = namespace.get("doc").unwrap_or_default();
            file.data.insert("seen".into(), seen);
            Ok::<_, BoxError>((tree, file))
        }),
    )
}

#[test]
fn test_transformer_sees_data_set_after_freeze() {
    let mut processor = Processor::new().use_plugin(echo_plugin("mode")).unwrap();
    processor.set_data("mode", json!("before"));
    processor.freeze().unwrap();
    processor.set_data("mode", json!("after"));

    let (tree, _) = processor.run_sync(Node::root(), VFile::new()).unwrap();
    assert_eq!(tree.get("atFreeze"), Some(&json!("before")));
    assert_eq!(tree.get("mode"), Some(&json!("after")));
}

#[test]
fn test_transformers_share_state_within_a_run() {
    let counter = Plugin::transformer(
        "counter",
        Transformer::sync(|tree, _, namespace| {
            let words = tree.value().unwrap_or_default().split_whitespace().count();
            namespace.insert("words", json!(words));
            Ok(None)
        }),
    );
    let reporter = Plugin::transformer(
        "reporter",
        Transformer::callback(|_, file, namespace, next| {
            let words = namespace.get("words").unwrap_or_default();
            next.done(literal(format!("{words} words")), file)?;
            Ok(())
        }),
    );

    let mut processor = literal_processor()
        .use_plugin(vec![counter, reporter])
        .unwrap();
    let file = processor.process_sync("one two three").unwrap();

    assert_eq!(file.to_string(), "3 words");
    assert_eq!(processor.data_get("words"), None);
}

#[tokio::test]
async fn test_concurrent_process_calls_use_separate_namespaces() {
    let mut processor = literal_processor().use_plugin(stash_plugin()).unwrap();
    processor.set_data("doc", json!("initial"));

    let first = processor.process("first");
    let second = processor.process("second");
    let (first, second) = tokio::join!(first, second);
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.data.get("seen"), Some(&json!("first")));
    assert_eq!(second.data.get("seen"), Some(&json!("second")));
    assert_eq!(processor.data_get("doc"), Some(json!("initial")));
}

#[tokio::test]
async fn test_shared_run_mutates_the_processor_namespace() {
    let mut processor = literal_processor().use_plugin(stash_plugin()).unwrap();
    let (_, file) = processor
        .run(literal("ignored"), VFile::from("shared"))
        .await
        .unwrap();

    assert_eq!(file.data.get("seen"), Some(&json!("shared")));
    assert_eq!(processor.data_get("doc"), Some(json!("shared")));
}

#[tokio::test]
async fn test_frozen_processor_driven_through_an_arc() {
    let mut processor = literal_processor().use_plugin(stash_plugin()).unwrap();
    processor.freeze().unwrap();
    let shared = Arc::new(processor);

    let tasks: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|doc| {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let Some(pipeline) = shared.pipeline() else {
                    panic!("processor should be frozen");
                };
                pipeline
                    .process(VFile::from(doc), shared.namespace().fork())
                    .await
            })
        })
        .collect();

    for (task, doc) in tasks.into_iter().zip(["a", "b", "c"]) {
        let file = task.await.unwrap().unwrap();
        assert_eq!(file.to_string(), doc);
        assert_eq!(file.data.get("seen"), Some(&json!(doc)));
    }
    assert_eq!(shared.data_get("doc"), None);
}

#[test]
fn test_pipeline_parse_and_stringify_need_no_mutable_access() {
    let mut processor = literal_processor();
    processor.freeze().unwrap();
    let processor = &processor;

    let pipeline = processor.pipeline().unwrap();
    let tree = pipeline.parse(&VFile::from("abc")).unwrap();
    let output = pipeline.stringify(tree, &VFile::new()).unwrap();
    assert_eq!(output.as_text(), Some("abc"));

    let file = pipeline
        .process_sync(VFile::from("xyz"), &processor.namespace().fork())
        .unwrap();
    assert_eq!(file.to_string(), "xyz");
}
