//! Data accumulated by a pipeline run.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::parser::{Field, Parsed};

/// Parsed fields, keyed by [`Field`], handed to the final handler.
///
/// Values are type-erased; ask for them with the type the schema produced.
/// A later step that parses the same field replaces the earlier value.
#[derive(Default)]
pub struct Context {
    values: HashMap<Field, Box<dyn Any + Send>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + 'static>(&mut self, field: Field, value: T) {
        self.values.insert(field, Box::new(value));
    }

    /// The value parsed for `field`, if present and of type `T`.
    pub fn get<T: 'static>(&self, field: Field) -> Option<&T> {
        self.values.get(&field)?.downcast_ref()
    }

    /// Takes the value parsed for `field` out of the context.
    ///
    /// A value of another type is left in place and `None` is returned.
    pub fn remove<T: 'static>(&mut self, field: Field) -> Option<T> {
        if !self.values.get(&field)?.is::<T>() {
            return None;
        }
        let boxed = self.values.remove(&field)?;
        boxed.downcast().ok().map(|value| *value)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// A continue payload that knows how to fold itself into a [`Context`].
pub trait Merge {
    fn merge_into(self, ctx: &mut Context);
}

impl<T: Send + 'static> Merge for Parsed<T> {
    fn merge_into(self, ctx: &mut Context) {
        let (field, value) = self.into_parts();
        ctx.insert(field, value);
    }
}

impl Merge for Context {
    fn merge_into(self, ctx: &mut Context) {
        ctx.values.extend(self.values);
    }
}
