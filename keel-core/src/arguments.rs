use crate::{IntoValue, Value};

/// An ordered set of named values supplied by the caller: the new values of an
/// insert/update, the equality filter of a query, or the parameters of a
/// where-clause fragment or routine call.
///
/// Names are matched case-insensitively; inserting an existing name replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    fields: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl IntoValue) {
        let name = name.into();
        let value = value.into_value();
        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: IntoValue> FromIterator<(N, V)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut result = Arguments::new();
        for (name, value) in iter {
            result.insert(name, value);
        }
        result
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Shorthand for building an [`Arguments`] literal.
#[macro_export]
macro_rules! args {
    { $($name:expr => $value:expr),* $(,)? } => {{
        #[allow(unused_mut)]
        let mut result = $crate::Arguments::new();
        $( result.insert($name, $value); )*
        result
    }};
}

/// Types that can supply their field values as [`Arguments`].
///
/// The original design reflected over an object's properties at call time;
/// here the mapping is an explicit, inspectable conversion implemented once
/// per type.
pub trait ToArguments {
    fn to_arguments(&self) -> Arguments;
}

impl ToArguments for Arguments {
    fn to_arguments(&self) -> Arguments {
        self.clone()
    }
}

/// A change-tracked argument set: current values paired with a baseline
/// snapshot captured at a defined checkpoint. "Changed fields" is the set
/// difference, used by updates restricted to changed properties only.
#[derive(Debug, Clone, Default)]
pub struct Tracked {
    baseline: Arguments,
    current: Arguments,
}

impl Tracked {
    /// Capture `values` as both current state and baseline; nothing is
    /// considered changed until a subsequent [`Tracked::set`].
    pub fn new(values: Arguments) -> Self {
        Self {
            baseline: values.clone(),
            current: values,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl IntoValue) {
        self.current.insert(name, value);
    }

    pub fn current(&self) -> &Arguments {
        &self.current
    }

    /// Fields whose current value differs from the baseline, plus fields with
    /// no baseline at all.
    pub fn changed(&self) -> Arguments {
        self.current
            .iter()
            .filter(|(name, value)| self.baseline.get(name) != Some(value))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Re-baseline: the current state becomes the new checkpoint.
    pub fn accept_changes(&mut self) {
        self.baseline = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_case_insensitively_and_keeps_order() {
        let mut args = args! { "FirstName" => "A", "Age" => 3 };
        args.insert("firstname", "B");
        assert_eq!(args.len(), 2);
        assert_eq!(args.names().collect::<Vec<_>>(), ["FirstName", "Age"]);
        assert_eq!(args.get("FIRSTNAME"), Some(&Value::Varchar(Some("B".into()))));
    }

    #[test]
    fn tracked_diff_is_empty_until_a_set() {
        let mut tracked = Tracked::new(args! { "Name" => "A", "Age" => 3 });
        assert!(tracked.changed().is_empty());

        tracked.set("Age", 4);
        let changed = tracked.changed();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed.get("Age"), Some(&Value::Int32(Some(4))));

        tracked.accept_changes();
        assert!(tracked.changed().is_empty());
    }

    #[test]
    fn setting_back_to_baseline_counts_as_unchanged() {
        let mut tracked = Tracked::new(args! { "Name" => "A" });
        tracked.set("Name", "B");
        tracked.set("Name", "A");
        assert!(tracked.changed().is_empty());
    }
}
