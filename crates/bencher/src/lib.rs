//! Shared fixtures for the benchmarks.

/// A named wire sample.
#[derive(Debug, Copy, Clone)]
pub struct Fixture {
    name: &'static str,
    content: &'static str,
}

impl Fixture {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Non-empty lines, for fixtures holding one sample per line.
    pub fn lines(&self) -> impl Iterator<Item = &'static str> {
        self.content.lines().filter(|line| !line.is_empty())
    }
}
