/// A `String` builder that tracks a stack of indent prefixes. Every
/// `newline()` begins the following text with the current prefix, so
/// nested blocks don't need to re-thread an indent string through every
/// recursive call the way a plain `String` would.
#[derive(Debug, Default)]
pub struct IndentedWriter {
    out: String,
    stack: Vec<String>,
    at_line_start: bool,
}

impl IndentedWriter {
    pub fn new() -> Self {
        IndentedWriter {
            out: String::new(),
            stack: Vec::new(),
            at_line_start: true,
        }
    }

    fn current_indent(&self) -> String {
        self.stack.concat()
    }

    pub fn push_str(&mut self, s: &str) {
        if self.at_line_start && !s.is_empty() {
            self.out.push_str(&self.current_indent());
            self.at_line_start = false;
        }
        self.out.push_str(s);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    pub fn indented(&mut self, prefix: impl Into<String>, body: impl FnOnce(&mut Self)) {
        self.stack.push(prefix.into());
        body(self);
        self.stack.pop();
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_indents_accumulate() {
        let mut w = IndentedWriter::new();
        w.push_str("CREATE TABLE t (");
        w.newline();
        w.indented("  ", |w| {
            w.push_str("a int,");
            w.newline();
            w.indented("  ", |w| {
                w.push_str("nested");
                w.newline();
            });
        });
        w.push_str(")");
        assert_eq!(w.finish(), "CREATE TABLE t (\n  a int,\n    nested\n)");
    }

    #[test]
    fn no_indent_when_stack_is_empty() {
        let mut w = IndentedWriter::new();
        w.push_str("line one");
        w.newline();
        w.push_str("line two");
        assert_eq!(w.finish(), "line one\nline two");
    }
}
