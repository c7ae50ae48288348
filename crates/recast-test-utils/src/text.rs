//! Line-oriented text trees

use im::Vector;
use recast_tree::{downcast, Fingerprint, Source, Tree, TreeError, TreeKind};

/// Plain text split into lines
#[derive(Debug, Clone, Copy)]
pub struct TextKind;

/// Content of a [`TextKind`] tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextContent {
    lines: Vector<String>,
}

impl TextContent {
    /// Split `text` into lines
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn lines(&self) -> &Vector<String> {
        &self.lines
    }

    /// Lines joined with `\n`
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    #[must_use]
    pub fn map_lines(&self, mut f: impl FnMut(&str) -> String) -> Self {
        Self {
            lines: self.lines.iter().map(|l| f(l)).collect(),
        }
    }

    /// Copy with `line` appended; shares structure with `self`
    #[must_use]
    pub fn push_line(&self, line: impl Into<String>) -> Self {
        let mut lines = self.lines.clone();
        lines.push_back(line.into());
        Self { lines }
    }

    #[must_use]
    pub fn contains_line(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}

impl TreeKind for TextKind {
    type Content = TextContent;

    const TYPE_ID: &'static str = "text";

    fn fingerprint(content: &TextContent) -> Fingerprint {
        Fingerprint::compute_parts(content.lines.iter().map(String::as_bytes))
    }

    fn validate_content(content: &TextContent) -> Result<(), TreeError> {
        if content.lines.iter().any(|l| l.contains('\n')) {
            return Err(TreeError::invariant("", "line contains a line break"));
        }
        Ok(())
    }
}

pub type TextTree = Tree<TextKind>;

/// Parse `text` into a tree at `path`
pub fn text_tree(path: &str, text: &str) -> TextTree {
    Tree::new(path, TextContent::parse(text)).unwrap()
}

/// Parse `text` into a type-erased source at `path`
pub fn text_source(path: &str, text: &str) -> Source {
    text_tree(path, text).into_source()
}

/// Rendered text of a [`TextKind`] source, `None` for other kinds
pub fn render(source: &Source) -> Option<String> {
    downcast::<TextKind>(source).map(|t| t.content().render())
}

/// Rendered text of an optional source, `None` if absent or another kind
pub fn render_opt(source: Option<&Source>) -> Option<String> {
    source.and_then(render)
}
