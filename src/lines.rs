use anyhow::{Context, Error, Result, bail};
use async_std::fs;
use async_std::io::{ReadExt, stdin};
use async_walkdir::{DirEntry, WalkDir};
use futures::FutureExt;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_yaml::{Deserializer, Value};
use std::path::{Component, PathBuf};

/// The yaml documents of a text, in order. Empty documents, such as one
/// holding only comments, are dropped.
pub fn split_docs(text: &str) -> Result<Vec<Value>> {
    let mut docs = Vec::new();
    let blank = text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(docs);
    }
    for doc in Deserializer::from_str(text) {
        let value = Value::deserialize(doc)?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Every file under a dir, leaving out hidden files and anything in a hidden dir
fn dir_files(dir: &str) -> impl Stream<Item = std::io::Result<PathBuf>> + use<> {
    let root = PathBuf::from(dir);
    WalkDir::new(dir).try_filter_map(move |dir_entry: DirEntry| {
        let root = root.clone();
        async move {
            let path = dir_entry.path();
            let hidden = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .components()
                .any(|component| match component {
                    Component::Normal(name) => name.to_string_lossy().starts_with('.'),
                    _ => false,
                });
            if path.is_dir() || hidden {
                return Ok(None);
            };
            Ok(Some(path))
        }
    })
}

async fn file_docs(path: PathBuf) -> Result<Vec<Value>> {
    let text = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    split_docs(&text).with_context(|| format!("Failed to parse yaml in {}", path.display()))
}

fn doc_stream(docs: Vec<Value>) -> impl Stream<Item = Result<Value>> {
    stream::iter(docs.into_iter().map(Ok))
}

/// Reads docs of a dir or a file. A document never spans two files.
async fn dir_or_file_docs(pathstr: String) -> Result<impl Stream<Item = Result<Value>>> {
    let metadata = fs::metadata(&pathstr)
        .await
        .with_context(|| format!("The path {} does not exist", pathstr))?;
    if metadata.is_file() {
        let docs = file_docs(PathBuf::from(&pathstr)).await?;
        Ok(doc_stream(docs).left_stream())
    } else if metadata.is_dir() {
        Ok(dir_files(&pathstr)
            .map_err(Error::new)
            .and_then(file_docs)
            .map_ok(doc_stream)
            .try_flatten()
            .right_stream())
    } else {
        bail!("The path {} is neither a file nor a directory", pathstr)
    }
}

async fn stdin_docs() -> Result<Vec<Value>> {
    let mut text = String::new();
    stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read stdin")?;
    split_docs(&text).context("Failed to parse yaml from stdin")
}

/// Reads the yaml documents of given dir or file, or stdin if None
pub fn docs(path: Option<String>) -> impl Stream<Item = Result<Value>> {
    if let Some(pathstr) = path {
        dir_or_file_docs(pathstr)
            .into_stream()
            .try_flatten()
            .left_stream()
    } else {
        stdin_docs()
            .into_stream()
            .map_ok(doc_stream)
            .try_flatten()
            .right_stream()
    }
}
