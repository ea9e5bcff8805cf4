use pretty_assertions::assert_eq;
use serde_json::json;
use weft_core::Processor;
use weft_preset::PresetConfig;
use weft_text::{catalog, WORD_COUNT_KEY};

#[tokio::test]
async fn test_all_styles_in_one_run() {
    let config = PresetConfig::from_toml_str(
        r#"
        plugins = ["text_parse", "trim", "uppercase", "word_count", { name = "annotate", options = [{ reason = "checked" }] }, "text_stringify"]
        "#,
    )
    .unwrap();
    let preset = catalog().resolve(&config).unwrap();

    let mut processor = Processor::new().use_plugin(preset).unwrap();
    let file = processor.process("  the quick fox \n\n jumps ").await.unwrap();

    assert_eq!(file.to_string(), "THE QUICK FOX\n\nJUMPS");
    assert_eq!(file.data.get(WORD_COUNT_KEY), Some(&json!(4)));
    assert_eq!(file.messages[0].to_string(), "warning: checked (annotate)");
}

#[test]
fn test_settings_drive_the_parser() {
    let config = PresetConfig::from_yaml_str("plugins: [text_parse, text_stringify]\nsettings:\n  text:\n    trim: true\n").unwrap();
    let mut processor = Processor::new().use_plugin(catalog().resolve(&config).unwrap()).unwrap();

    let file = processor.process_sync("  a  \n\n  b  ").unwrap();
    assert_eq!(file.to_string(), "a\n\nb");
}

#[test]
fn test_catalog_lists_builtins() {
    let names: Vec<_> = catalog().names().map(str::to_string).collect();
    assert_eq!(
        names,
        vec!["text_parse", "text_stringify", "uppercase", "trim", "word_count", "annotate"]
    );
}
