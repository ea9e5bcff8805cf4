//! Built-in plain-text plugins
//!
//! Each constructor returns the same plugin every time, so registering it
//! twice (for example to switch it off) updates one entry.

use crate::syntax::{map_text, parse_paragraphs, text_values, TextCompiler, PARAGRAPH};
use serde_json::{json, Value};
use std::sync::OnceLock;
use weft_core::{AsyncTransform, BoxError, Compiler, Node, Parser, Plugin, SharedNamespace, Transformer, VFile};

/// File data key written by [`word_count`]
pub const WORD_COUNT_KEY: &str = "wordCount";

fn shared(cell: &'static OnceLock<Plugin>, make: fn() -> Plugin) -> Plugin {
    cell.get_or_init(make).clone()
}

/// Parser splitting paragraphs on blank lines
///
/// Trims paragraphs when the first option or `settings.text.trim` says so;
/// the option wins.
#[must_use]
pub fn text_parse() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::new("text_parse", |ctx, options| {
            let from_settings = ctx
                .settings()
                .and_then(|settings| settings.get("text"))
                .and_then(|text| text.get("trim"))
                .and_then(Value::as_bool);
            let from_options = options
                .first()
                .and_then(|options| options.get("trim"))
                .and_then(Value::as_bool);
            let trim = from_options.or(from_settings).unwrap_or(false);
            tracing::debug!(trim, "text parser attached");
            ctx.set_parser(Parser::new(move |document, _| Ok(parse_paragraphs(document, trim))));
            Ok(None)
        })
    })
}

/// Compiler joining paragraphs with a blank line
#[must_use]
pub fn text_stringify() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::compiler("text_stringify", Compiler::from_type::<TextCompiler>())
    })
}

/// Uppercase every text node
#[must_use]
pub fn uppercase() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::transformer(
            "uppercase",
            Transformer::sync(|tree, _, _| {
                map_text(tree, &str::to_uppercase);
                Ok(None)
            }),
        )
    })
}

/// Trim every text node and drop paragraphs left empty
#[must_use]
pub fn trim() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::transformer(
            "trim",
            Transformer::sync(|tree, _, _| {
                map_text(tree, &|value| value.trim().to_string());
                let kept: Vec<Node> = tree
                    .children()
                    .into_iter()
                    .filter(|child| child.kind() != PARAGRAPH || !text_values(child).concat().is_empty())
                    .collect();
                tree.set_children(kept);
                Ok(None)
            }),
        )
    })
}

struct WordCount;

#[async_trait::async_trait]
impl AsyncTransform for WordCount {
    async fn transform(
        &self,
        tree: &mut Node,
        file: &mut VFile,
        _: &SharedNamespace,
    ) -> Result<Option<Node>, BoxError> {
        let words: usize = text_values(tree)
            .iter()
            .map(|value| value.split_whitespace().count())
            .sum();
        tracing::trace!(words, "counted words");
        file.data.insert(WORD_COUNT_KEY.to_string(), json!(words));
        Ok(None)
    }
}

/// Count words into `file.data["wordCount"]`; completes asynchronously
#[must_use]
pub fn word_count() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::transformer("word_count", Transformer::from_async(WordCount))
    })
}

/// Record a message on the file; completes through its callback
///
/// Takes an optional `{ "reason": "..." }` option, defaulting to a paragraph
/// count.
#[must_use]
pub fn annotate() -> Plugin {
    static PLUGIN: OnceLock<Plugin> = OnceLock::new();
    shared(&PLUGIN, || {
        Plugin::new("annotate", |_, options| {
            let reason = options
                .first()
                .and_then(|options| options.get("reason"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(Some(Transformer::callback(move |tree, mut file, _, next| {
                let reason = reason.clone().unwrap_or_else(|| {
                    let count = tree.children().iter().filter(|c| c.kind() == PARAGRAPH).count();
                    format!("{count} paragraph(s)")
                });
                file.message(reason, Some("annotate"));
                next.done(tree, file)?;
                Ok(())
            })))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weft_core::Processor;

    #[test]
    fn constructors_return_the_same_plugin() {
        assert!(uppercase().same_as(&uppercase()));
        assert!(!uppercase().same_as(&trim()));
    }

    #[test]
    fn uppercase_and_trim_run_synchronously() {
        let mut processor = Processor::new()
            .use_plugin(vec![text_parse(), trim(), uppercase(), text_stringify()])
            .unwrap();
        let file = processor.process_sync(" hello \n\nworld").unwrap();
        assert_eq!(file.to_string(), "HELLO\n\nWORLD");
    }

    #[test]
    fn parse_option_overrides_settings() {
        let mut processor = Processor::new()
            .use_plugin(weft_core::Preset::new().with_settings(json!({"text": {"trim": false}})))
            .unwrap()
            .use_plugin((text_parse(), json!({"trim": true})))
            .unwrap()
            .use_plugin(text_stringify())
            .unwrap();
        let file = processor.process_sync("  spaced  ").unwrap();
        assert_eq!(file.to_string(), "spaced");
    }

    #[test]
    fn annotate_completes_synchronously_through_next() {
        let mut processor = Processor::new()
            .use_plugin(vec![text_parse(), annotate(), text_stringify()])
            .unwrap();
        let file = processor.process_sync("a\n\nb").unwrap();
        assert_eq!(file.messages.len(), 1);
        assert_eq!(file.messages[0].reason, "2 paragraph(s)");
    }

    #[test]
    fn word_count_needs_async_entry_point() {
        let mut processor = Processor::new()
            .use_plugin(vec![text_parse(), word_count()])
            .unwrap();
        let err = processor.process_sync("one two").unwrap_err();
        assert!(matches!(err, weft_core::ProcessorError::AsyncUsage { .. }));
    }
}
