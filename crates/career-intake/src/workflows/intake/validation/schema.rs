use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::super::documents::DocumentKind;
use super::super::record::{
    Address, ApplicationRecord, CurrentEmployment, Referee, RefereeRelationship, YesNo,
};

/// Field path (`education[0].grade`) to message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first message reported for a path.
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (path, message) in other.0 {
            self.insert(path, message);
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(path, message)| (path.as_str(), message.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(path, message)| format!("{path} {message}"))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Read-only state a rule may consult besides the candidate itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub record: &'a ApplicationRecord,
    pub today: NaiveDate,
    pub pending_uploads: &'a BTreeSet<DocumentKind>,
}

/// Whether a field holds a usable answer.
pub trait FieldValue {
    fn is_blank(&self) -> bool;
}

impl FieldValue for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<V: FieldValue> FieldValue for Option<V> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, FieldValue::is_blank)
    }
}

impl<V> FieldValue for Vec<V> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! always_filled {
    ($($ty:ty),* $(,)?) => {
        $(impl FieldValue for $ty {
            fn is_blank(&self) -> bool {
                false
            }
        })*
    };
}

always_filled!(
    bool,
    NaiveDate,
    YesNo,
    RefereeRelationship,
    Address,
    CurrentEmployment,
    Referee,
);

type Check<T> = Box<dyn Fn(&T, &ValidationContext<'_>, &str, &mut FieldErrors) + Send + Sync>;
type Normalizer<T> = Box<dyn Fn(&mut T) + Send + Sync>;

fn boxed_check<T, F>(check: F) -> Check<T>
where
    F: Fn(&T, &ValidationContext<'_>, &str, &mut FieldErrors) + Send + Sync + 'static,
{
    Box::new(check)
}

fn boxed_normalizer<T, F>(normalizer: F) -> Normalizer<T>
where
    F: Fn(&mut T) + Send + Sync + 'static,
{
    Box::new(normalizer)
}

/// Declarative rule set for one screen's payload.
///
/// Normalizers (gate clearing) always run before checks, so a detail field
/// whose gate is off is both emptied and exempt from its requirement.
pub struct StepSchema<T> {
    checks: Vec<Check<T>>,
    normalizers: Vec<Normalizer<T>>,
}

impl<T> Default for StepSchema<T> {
    fn default() -> Self {
        Self {
            checks: Vec::new(),
            normalizers: Vec::new(),
        }
    }
}

fn join(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{path}"),
    }
}

impl<T: 'static> StepSchema<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<V: FieldValue + 'static>(
        mut self,
        path: &'static str,
        read: fn(&T) -> &V,
    ) -> Self {
        self.checks.push(boxed_check::<T, _>(move |value, _, prefix, errors| {
            if read(value).is_blank() {
                errors.insert(join(prefix, path), "is required");
            }
        }));
        self
    }

    pub fn required_if<V: FieldValue + 'static>(
        mut self,
        path: &'static str,
        gate: fn(&T) -> bool,
        read: fn(&T) -> &V,
    ) -> Self {
        self.checks.push(boxed_check::<T, _>(move |value, _, prefix, errors| {
            if gate(value) && read(value).is_blank() {
                errors.insert(join(prefix, path), "is required");
            }
        }));
        self
    }

    /// Reset a field to its default whenever `gate` is off.
    pub fn clear_unless<V: Default + 'static>(
        mut self,
        gate: fn(&T) -> bool,
        field: fn(&mut T) -> &mut V,
    ) -> Self {
        self.normalizers.push(boxed_normalizer::<T, _>(move |value| {
            if !gate(value) {
                *field(value) = V::default();
            }
        }));
        self
    }

    /// Rewrite the candidate before any rule sees it.
    pub fn normalize_with(mut self, normalizer: fn(&mut T)) -> Self {
        self.normalizers.push(boxed_normalizer::<T, _>(normalizer));
        self
    }

    /// A detail field that is required when its gate is on and cleared when it is off.
    pub fn gated<V: FieldValue + Default + 'static>(
        self,
        path: &'static str,
        gate: fn(&T) -> bool,
        read: fn(&T) -> &V,
        field: fn(&mut T) -> &mut V,
    ) -> Self {
        self.clear_unless(gate, field).required_if(path, gate, read)
    }

    pub fn min_count(mut self, path: &'static str, min: usize, count: fn(&T) -> usize) -> Self {
        self.checks.push(boxed_check::<T, _>(move |value, _, prefix, errors| {
            if count(value) < min {
                let message = if min == 1 {
                    "requires at least one entry".to_string()
                } else {
                    format!("requires at least {min} entries")
                };
                errors.insert(join(prefix, path), message);
            }
        }));
        self
    }

    pub fn at_least_one(
        mut self,
        path: &'static str,
        message: &'static str,
        flags: fn(&T) -> Vec<bool>,
    ) -> Self {
        self.checks.push(boxed_check::<T, _>(move |value, _, prefix, errors| {
            if !flags(value).into_iter().any(|flag| flag) {
                errors.insert(join(prefix, path), message);
            }
        }));
        self
    }

    /// Cross-field rule: `valid` returning false reports `message` at `path`.
    pub fn refine<F>(mut self, path: &'static str, message: &'static str, valid: F) -> Self
    where
        F: Fn(&T, &ValidationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.checks.push(boxed_check::<T, _>(move |value, context, prefix, errors| {
            if !valid(value, context) {
                errors.insert(join(prefix, path), message);
            }
        }));
        self
    }

    /// Rule with a computed message; `None` means the field passed.
    pub fn check<F>(mut self, path: &'static str, rule: F) -> Self
    where
        F: Fn(&T, &ValidationContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.checks.push(boxed_check::<T, _>(move |value, context, prefix, errors| {
            if let Some(message) = rule(value, context) {
                errors.insert(join(prefix, path), message);
            }
        }));
        self
    }

    /// Apply `schema` to every entry of a list, reporting paths as `path[index].field`.
    pub fn each<E: 'static>(
        mut self,
        path: &'static str,
        items: fn(&T) -> &[E],
        items_mut: fn(&mut T) -> &mut [E],
        schema: StepSchema<E>,
    ) -> Self {
        let schema = Arc::new(schema);

        let normalize_with = Arc::clone(&schema);
        self.normalizers.push(boxed_normalizer::<T, _>(move |value| {
            for item in items_mut(value).iter_mut() {
                normalize_with.normalize(item);
            }
        }));

        self.checks.push(boxed_check::<T, _>(move |value, context, prefix, errors| {
            let base = join(prefix, path);
            for (index, item) in items(value).iter().enumerate() {
                schema.check_into(item, context, &format!("{base}[{index}]"), errors);
            }
        }));
        self
    }

    /// Apply `schema` to an optional nested object when it is present.
    pub fn nested<E: 'static>(
        mut self,
        path: &'static str,
        item: fn(&T) -> Option<&E>,
        item_mut: fn(&mut T) -> Option<&mut E>,
        schema: StepSchema<E>,
    ) -> Self {
        let schema = Arc::new(schema);

        let normalize_with = Arc::clone(&schema);
        self.normalizers.push(boxed_normalizer::<T, _>(move |value| {
            if let Some(nested) = item_mut(value) {
                normalize_with.normalize(nested);
            }
        }));

        self.checks.push(boxed_check::<T, _>(move |value, context, prefix, errors| {
            if let Some(nested) = item(value) {
                schema.check_into(nested, context, &join(prefix, path), errors);
            }
        }));
        self
    }

    pub fn normalize(&self, value: &mut T) {
        for normalizer in &self.normalizers {
            normalizer(value);
        }
    }

    pub fn check_into(
        &self,
        value: &T,
        context: &ValidationContext<'_>,
        prefix: &str,
        errors: &mut FieldErrors,
    ) {
        for check in &self.checks {
            check(value, context, prefix, errors);
        }
    }

    /// Normalize the candidate, then run every rule against it.
    pub fn apply(&self, mut value: T, context: &ValidationContext<'_>) -> Result<T, FieldErrors> {
        self.normalize(&mut value);

        let mut errors = FieldErrors::new();
        self.check_into(&value, context, "", &mut errors);

        if errors.is_empty() {
            Ok(value)
        } else {
            Err(errors)
        }
    }
}
