//! Shared fixtures for the integration tests and benchmarks.
//!
//! The wire bytes are produced by a small hand-written writer so the tests
//! can state the format they expect without depending on an encoder.

use std::fmt::Write as _;

use trickle_compose::{DecodingScope, composed_decoder};
use trickle_wire::{Decoder, State, input};

/// A labelled, weighted tree.
///
/// ```text
///   label    i32 BE byte length, UTF-8 bytes
///   weight   i32 BE
///   children i32 BE count, then each child
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    pub label: String,
    pub weight: i32,
    pub children: Vec<Tree>,
}

impl Tree {
    #[must_use]
    pub fn leaf(label: &str, weight: i32) -> Self {
        Self {
            label: label.to_owned(),
            weight,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Tree>) -> Self {
        self.children = children;
        self
    }

    /// A complete tree of the given fan-out and depth (depth 0 is a leaf).
    #[must_use]
    pub fn complete(width: usize, depth: usize) -> Self {
        let children = if depth == 0 {
            Vec::new()
        } else {
            (0..width).map(|_| Self::complete(width, depth - 1)).collect()
        };
        Self {
            label: format!("d{depth}"),
            weight: i32::try_from(depth).unwrap_or(i32::MAX),
            children,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        write_len(out, self.label.len());
        out.extend_from_slice(self.label.as_bytes());
        out.extend_from_slice(&self.weight.to_be_bytes());
        write_len(out, self.children.len());
        for child in &self.children {
            child.write(out);
        }
    }

    /// One-line rendering, e.g. `root:3[a:1, b:2[c:0]]`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        let _ = write!(out, "{}:{}", self.label, self.weight);
        if self.children.is_empty() {
            return;
        }
        out.push('[');
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            child.render_into(out);
        }
        out.push(']');
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    let len = i32::try_from(len).unwrap_or(i32::MAX);
    out.extend_from_slice(&len.to_be_bytes());
}

/// Composed decoder for [`Tree`].
pub fn tree_decoder() -> impl Decoder<Output = Tree> {
    composed_decoder(|scope: &mut DecodingScope<'_, Tree>| {
        let label = scope.string()?;
        let weight = scope.int()?;
        let children = scope.self_vec()?;
        Ok(Tree {
            label,
            weight,
            children,
        })
    })
}

/// Feed `bytes` to `decoder` in chunks of `chunk` bytes, collecting the
/// state returned after each chunk.
pub fn decode_chunked<D: Decoder>(decoder: &mut D, bytes: &[u8], chunk: usize) -> Vec<State<D::Output>> {
    bytes
        .chunks(chunk.max(1))
        .map(|piece| decoder.decode(&mut input::from_slice(piece)))
        .collect()
}
