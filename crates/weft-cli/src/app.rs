//! Processor assembly and output rendering

use anyhow::Context;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use weft_core::{Output, Processor, VFile};
use weft_preset::PluginCatalog;

/// What to run, as given on the command line
#[derive(Debug, Default)]
pub(crate) struct Options {
    pub(crate) input: Option<PathBuf>,
    pub(crate) preset: Option<PathBuf>,
    pub(crate) plugins: Vec<String>,
    pub(crate) sync: bool,
}

/// Build the processor: the preset, or the plain-text parser and compiler, then `--use` plugins
pub(crate) fn build(catalog: &PluginCatalog, options: &Options) -> anyhow::Result<Processor> {
    let mut processor = Processor::new();
    match &options.preset {
        Some(path) => {
            let preset = catalog
                .load(path)
                .with_context(|| format!("loading preset {}", path.display()))?;
            processor = processor.use_plugin(preset)?;
        }
        None => {
            processor = processor.use_plugin(vec![weft_text::text_parse(), weft_text::text_stringify()])?;
        }
    }
    for name in &options.plugins {
        processor = processor.use_plugin(catalog.require(name)?)?;
    }
    tracing::debug!(attachers = processor.attachers().len(), "processor assembled");
    Ok(processor)
}

async fn read_input(input: Option<&PathBuf>) -> anyhow::Result<VFile> {
    match input {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(VFile::from(text).with_path(path))
        }
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading stdin")?;
            Ok(VFile::from(text))
        }
    }
}

/// Read the input and process it
pub(crate) async fn run(catalog: &PluginCatalog, options: &Options) -> anyhow::Result<VFile> {
    let mut processor = build(catalog, options)?;
    let file = read_input(options.input.as_ref()).await?;
    let processed = if options.sync {
        processor.process_sync(file)?
    } else {
        processor.process(file).await?
    };
    Ok(processed)
}

/// Printable view of a processed file
pub(crate) struct Report<'a> {
    file: &'a VFile,
}

impl<'a> Report<'a> {
    pub(crate) fn new(file: &'a VFile) -> Self {
        Self { file }
    }

    fn result(&self) -> Option<Value> {
        match self.file.result.as_ref()? {
            Output::Text(text) => Some(json!(text)),
            Output::Bytes(bytes) => Some(json!(String::from_utf8_lossy(bytes))),
            Output::Tree(tree) => Some(tree.clone().into()),
            Output::Value(value) => Some(value.clone()),
            Output::Opaque(_) => None,
        }
    }

    /// File contents, or the non-textual result when there is one
    pub(crate) fn render(&self) -> String {
        match self.result() {
            Some(result) => serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string()),
            None => self.file.to_string(),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "path": self.file.path.as_ref().map(|path| path.display().to_string()),
            "value": self.file.to_string(),
            "result": self.result(),
            "data": self.file.data,
            "messages": self.file.messages.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    }
}
