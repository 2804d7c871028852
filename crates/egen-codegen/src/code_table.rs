use std::collections::HashMap;

/// Dense integer codes for declared names.
///
/// Names get codes 1..=n in declaration order. Code 0 is reserved for the
/// sentinel, which is what undeclared codes decode to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    sentinel: String,
    names: Vec<String>,
    codes: HashMap<String, u32>,
}

impl CodeTable {
    pub fn new<I, S>(sentinel: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let codes = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as u32 + 1))
            .collect();
        Self {
            sentinel: sentinel.into(),
            names,
            codes,
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Code of `name`, or 0 if it was never declared.
    pub fn encode(&self, name: &str) -> u32 {
        self.codes.get(name).copied().unwrap_or(0)
    }

    /// Name for `code`, or the sentinel if no name has that code.
    pub fn decode(&self, code: u32) -> &str {
        code.checked_sub(1)
            .and_then(|i| self.names.get(i as usize))
            .map(String::as_str)
            .unwrap_or(&self.sentinel)
    }

    /// `(name, code)` pairs in code order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as u32 + 1))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
