use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// Placeholder bindings collected while descending one branch of a traversal.
///
/// Bindings are only added through a [`Scope`], which puts every name it touched
/// back the way it found it when dropped. A sibling branch therefore never sees
/// what a previous one bound, whichever way the previous branch returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeContext {
    bindings: BTreeMap<String, String>,
}

impl AttributeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context with bindings known before the traversal starts.
    pub fn with_bindings<I, K, V>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            bindings: bindings
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Value copy of the current bindings, detached from the live context.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.bindings.clone()
    }

    /// Open a binding scope for one branch.
    pub fn scope(&mut self) -> Scope<'_> {
        Scope {
            ctx: self,
            saved: Vec::new(),
        }
    }
}

/// Branch-local view of an [`AttributeContext`]; undoes its bindings on drop.
pub struct Scope<'a> {
    ctx: &'a mut AttributeContext,
    saved: Vec<(String, Option<String>)>,
}

impl Scope<'_> {
    /// Bind `name`, shadowing any outer binding until the scope ends.
    pub fn bind(&mut self, name: &str, value: impl Into<String>) {
        let previous = self.ctx.bindings.insert(name.to_string(), value.into());
        self.saved.push((name.to_string(), previous));
    }
}

impl Deref for Scope<'_> {
    type Target = AttributeContext;

    fn deref(&self) -> &AttributeContext {
        self.ctx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut AttributeContext {
        self.ctx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // Restore newest first so a name bound twice ends at its original value.
        while let Some((name, previous)) = self.saved.pop() {
            match previous {
                Some(value) => {
                    self.ctx.bindings.insert(name, value);
                }
                None => {
                    self.ctx.bindings.remove(&name);
                }
            }
        }
    }
}
