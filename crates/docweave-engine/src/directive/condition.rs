/// The attribute expression of an `ifdef`/`ifndef` directive.
///
/// `a,b` holds when any name is set, `a+b` only when all are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition<'a> {
    raw: &'a str,
}

impl<'a> Condition<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw: raw.trim() }
    }

    /// The expression as written, used to match the closing `endif`
    pub fn name(&self) -> &'a str {
        self.raw
    }

    pub fn holds<F>(&self, is_set: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        if self.raw.contains(',') {
            self.names(',').any(is_set)
        } else if self.raw.contains('+') {
            self.names('+').all(is_set)
        } else {
            is_set(self.raw)
        }
    }

    fn names(&self, separator: char) -> impl Iterator<Item = &'a str> {
        self.raw
            .split(separator)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
