//! Applying a freshly produced map onto a file's existing map chain.

use super::mappings::{self, Original, Segment};
use super::{unix_style, SourceMap, SourceMapError};
use crate::file::File;
use std::collections::HashMap;

/// Merges a map produced by the engine into the file's source map.
///
/// This is the seam the stage calls in [`SourceMapMode::Apply`](crate::SourceMapMode).
pub trait SourceMapApplier: Send + Sync {
    fn apply(&self, file: &mut File, map: SourceMap) -> Result<(), SourceMapError>;
}

/// Composes the produced map with the file's existing chain.
///
/// An existing map with no mappings yet (fresh from the init step) is simply
/// replaced. Otherwise every produced segment that points into the existing
/// map's `file` is traced one step further back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainApplier;

impl SourceMapApplier for ChainApplier {
    fn apply(&self, file: &mut File, mut map: SourceMap) -> Result<(), SourceMapError> {
        let target = map.file.as_deref().ok_or(SourceMapError::MissingField("file"))?;
        map.file = Some(unix_style(target));
        map.sources = map.sources.iter().map(|s| unix_style(s)).collect();

        let composed = match &file.source_map {
            Some(existing) if !existing.mappings.is_empty() => compose(&map, existing)?,
            _ => map,
        };
        file.source_map = Some(composed);
        Ok(())
    }
}

/// Source and name tables of the composed map, deduplicated by value.
#[derive(Default)]
struct Tables {
    sources: Vec<String>,
    contents: Vec<Option<String>>,
    source_index: HashMap<String, u32>,
    names: Vec<String>,
    name_index: HashMap<String, u32>,
}

impl Tables {
    fn source(&mut self, map: &SourceMap, index: u32) -> Result<u32, SourceMapError> {
        let source = map
            .sources
            .get(index as usize)
            .ok_or(SourceMapError::SourceOutOfRange(index))?;
        if let Some(&existing) = self.source_index.get(source) {
            return Ok(existing);
        }
        let id = self.sources.len() as u32;
        self.sources.push(source.clone());
        self.contents
            .push(map.sources_content.get(index as usize).cloned().flatten());
        self.source_index.insert(source.clone(), id);
        Ok(id)
    }

    fn name(&mut self, map: &SourceMap, index: u32) -> Result<u32, SourceMapError> {
        let name = map
            .names
            .get(index as usize)
            .ok_or(SourceMapError::NameOutOfRange(index))?;
        if let Some(&existing) = self.name_index.get(name) {
            return Ok(existing);
        }
        let id = self.names.len() as u32;
        self.names.push(name.clone());
        self.name_index.insert(name.clone(), id);
        Ok(id)
    }
}

/// Greatest-lower-bound lookup on one generated line of the inner map.
fn trace(inner: &[Vec<Segment>], line: u32, column: u32) -> Option<Original> {
    let segments = inner.get(line as usize)?;
    let idx = segments.partition_point(|s| s.generated_column <= column);
    if idx == 0 {
        return None;
    }
    segments[idx - 1].original
}

/// Compose `outer` (the newest transform) with `inner` (the chain so far).
///
/// The result maps `outer`'s generated positions straight to `inner`'s
/// original sources. Segments that cannot be traced keep pointing at the
/// intermediate source.
pub fn compose(outer: &SourceMap, inner: &SourceMap) -> Result<SourceMap, SourceMapError> {
    let target = match (&inner.file, outer.sources.as_slice()) {
        (Some(file), _) => unix_style(file),
        (None, [only]) => only.clone(),
        (None, _) => return Err(SourceMapError::MissingField("file")),
    };

    let outer_lines = mappings::decode(&outer.mappings)?;
    let mut inner_lines = mappings::decode(&inner.mappings)?;
    for line in &mut inner_lines {
        line.sort_by_key(|s| s.generated_column);
    }

    let mut tables = Tables::default();
    let mut lines = Vec::with_capacity(outer_lines.len());

    for segments in &outer_lines {
        let mut line = Vec::with_capacity(segments.len());
        for segment in segments {
            let original = match segment.original {
                None => None,
                Some(o) => {
                    let source = outer
                        .sources
                        .get(o.source as usize)
                        .ok_or(SourceMapError::SourceOutOfRange(o.source))?;
                    let traced = if *source == target {
                        trace(&inner_lines, o.line, o.column)
                    } else {
                        None
                    };

                    Some(match traced {
                        Some(t) => Original {
                            source: tables.source(inner, t.source)?,
                            line: t.line,
                            column: t.column,
                            name: match (t.name, o.name) {
                                (Some(n), _) => Some(tables.name(inner, n)?),
                                (None, Some(n)) => Some(tables.name(outer, n)?),
                                (None, None) => None,
                            },
                        },
                        None => Original {
                            source: tables.source(outer, o.source)?,
                            line: o.line,
                            column: o.column,
                            name: o.name.map(|n| tables.name(outer, n)).transpose()?,
                        },
                    })
                }
            };
            line.push(Segment {
                generated_column: segment.generated_column,
                original,
            });
        }
        lines.push(line);
    }

    let sources_content = if tables.contents.iter().any(Option::is_some) {
        tables.contents
    } else {
        Vec::new()
    };

    Ok(SourceMap {
        version: 3,
        file: outer.file.clone(),
        source_root: outer.source_root.clone(),
        sources: tables.sources,
        sources_content,
        names: tables.names,
        mappings: mappings::encode(&lines),
    })
}
