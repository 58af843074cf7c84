#[derive(Debug, Clone)]
pub struct FormatterConfig {
    pub indent_spaces: usize,
    /// Write a `<!-- phrase -->` comment above every leaf.
    pub annotate: bool,
    /// Emit an `<?xml ?>` prolog before `<root>`.
    pub prolog: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            indent_spaces: 2,
            annotate: false,
            prolog: false,
        }
    }
}
