//! Canned rules over [`TextKind`] trees

use crate::text::{text_source, TextKind};
use recast_core::{Continuations, Edit, Rule, RuleError, Typed, TypedRule};
use recast_tree::{Source, Tree};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Uppercases every line
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl TypedRule<TextKind> for Uppercase {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn visit_tree(&mut self, tree: &Tree<TextKind>) -> Result<Edit<TextKind>, RuleError> {
        let upper = tree.content().map_lines(str::to_uppercase);
        if upper == *tree.content() {
            return Ok(Edit::Unchanged);
        }
        Ok(Edit::Replace(tree.with_content(upper)))
    }
}

pub fn uppercase() -> Typed<TextKind, Uppercase> {
    Typed::new(Uppercase)
}

/// Replaces `from` with `to` in every line
#[derive(Debug, Clone)]
pub struct ReplaceText {
    name: String,
    from: String,
    to: String,
}

impl TypedRule<TextKind> for ReplaceText {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit_tree(&mut self, tree: &Tree<TextKind>) -> Result<Edit<TextKind>, RuleError> {
        if !tree.content().lines().iter().any(|l| l.contains(&self.from)) {
            return Ok(Edit::Unchanged);
        }
        let replaced = tree
            .content()
            .map_lines(|l| l.replace(&self.from, &self.to));
        Ok(Edit::Replace(tree.with_content(replaced)))
    }
}

pub fn replace(name: &str, from: &str, to: &str) -> Typed<TextKind, ReplaceText> {
    Typed::new(ReplaceText {
        name: name.to_owned(),
        from: from.to_owned(),
        to: to.to_owned(),
    })
}

/// Appends a line, either once per tree or on every visit
#[derive(Debug, Clone)]
pub struct AppendLine {
    name: String,
    line: String,
    always: bool,
}

impl TypedRule<TextKind> for AppendLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idempotent(&self) -> bool {
        !self.always
    }

    fn visit_tree(&mut self, tree: &Tree<TextKind>) -> Result<Edit<TextKind>, RuleError> {
        if !self.always && tree.content().contains_line(&self.line) {
            return Ok(Edit::Unchanged);
        }
        Ok(Edit::Replace(
            tree.with_content(tree.content().push_line(self.line.as_str())),
        ))
    }
}

/// Idempotent: appends `line` unless already present
pub fn append_line(name: &str, line: &str) -> Typed<TextKind, AppendLine> {
    Typed::new(AppendLine {
        name: name.to_owned(),
        line: line.to_owned(),
        always: false,
    })
}

/// Non-idempotent: appends `line` on every visit
pub fn append_always(name: &str, line: &str) -> Typed<TextKind, AppendLine> {
    Typed::new(AppendLine {
        name: name.to_owned(),
        line: line.to_owned(),
        always: true,
    })
}

/// Deletes trees whose rendered text equals `text`
#[derive(Debug, Clone)]
pub struct DeleteMatching {
    name: String,
    text: String,
}

impl TypedRule<TextKind> for DeleteMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit_tree(&mut self, tree: &Tree<TextKind>) -> Result<Edit<TextKind>, RuleError> {
        if tree.content().render() == self.text {
            Ok(Edit::Delete)
        } else {
            Ok(Edit::Unchanged)
        }
    }
}

pub fn delete_matching(name: &str, text: &str) -> Typed<TextKind, DeleteMatching> {
    Typed::new(DeleteMatching {
        name: name.to_owned(),
        text: text.to_owned(),
    })
}

/// Fails on every visit
#[derive(Debug, Clone)]
pub struct AlwaysFails {
    name: String,
}

impl Rule for AlwaysFails {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        Err(RuleError::failed(
            &self.name,
            format!("refusing to visit {}", tree.path()),
        ))
    }
}

pub fn always_fails(name: &str) -> AlwaysFails {
    AlwaysFails {
        name: name.to_owned(),
    }
}

/// Panics on every visit
#[derive(Debug, Clone)]
pub struct Panicking {
    name: String,
}

impl Rule for Panicking {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        panic!("{} cannot handle {}", self.name, tree.path())
    }
}

pub fn panicking(name: &str) -> Panicking {
    Panicking {
        name: name.to_owned(),
    }
}

/// Generates one text source the first time it is asked
#[derive(Debug, Clone)]
pub struct GenerateOnce {
    name: String,
    path: String,
    text: String,
    done: bool,
}

impl Rule for GenerateOnce {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        Ok(Some(tree))
    }

    fn generate(&mut self) -> Vec<Source> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        vec![text_source(&self.path, &self.text)]
    }
}

pub fn generate_once(name: &str, path: &str, text: &str) -> GenerateOnce {
    GenerateOnce {
        name: name.to_owned(),
        path: path.to_owned(),
        text: text.to_owned(),
        done: false,
    }
}

type RuleFactory = Box<dyn FnMut() -> Box<dyn Rule> + Send>;

/// Runs `first`, then queues freshly built follow-up rules on every visit
pub struct Chain {
    first: Box<dyn Rule>,
    factories: Vec<RuleFactory>,
    next: Continuations,
}

impl Chain {
    pub fn new(first: impl Rule + 'static) -> Self {
        Self {
            first: Box::new(first),
            factories: Vec::new(),
            next: Continuations::new(),
        }
    }

    /// Queue a rule built by `make` after every visit
    #[must_use]
    pub fn then<R, F>(mut self, mut make: F) -> Self
    where
        R: Rule + 'static,
        F: FnMut() -> R + Send + 'static,
    {
        self.factories
            .push(Box::new(move || Box::new(make()) as Box<dyn Rule>));
        self
    }
}

impl Rule for Chain {
    fn name(&self) -> &str {
        self.first.name()
    }

    fn is_idempotent(&self) -> bool {
        self.first.is_idempotent()
    }

    fn begin_application_unit(&mut self) {
        self.next.clear();
        self.first.begin_application_unit();
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        let out = self.first.visit(tree)?;
        for make in &mut self.factories {
            self.next.and_then(make());
        }
        Ok(out)
    }

    fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
        self.next.take()
    }
}

/// Shared counters of a [`Probe`]
#[derive(Debug, Clone, Default)]
pub struct ProbeCounts {
    resets: Arc<AtomicUsize>,
    visits: Arc<AtomicUsize>,
}

impl ProbeCounts {
    /// `begin_application_unit` calls so far
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// `visit` calls so far
    pub fn visits(&self) -> usize {
        self.visits.load(Ordering::SeqCst)
    }
}

/// Leaves every tree alone and counts how it is driven
#[derive(Debug, Clone)]
pub struct Probe {
    name: String,
    idempotent: bool,
    counts: ProbeCounts,
}

impl Probe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            idempotent: true,
            counts: ProbeCounts::default(),
        }
    }

    #[must_use]
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn counts(&self) -> ProbeCounts {
        self.counts.clone()
    }
}

impl Rule for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    fn begin_application_unit(&mut self) {
        self.counts.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        self.counts.visits.fetch_add(1, Ordering::SeqCst);
        Ok(Some(tree))
    }
}
