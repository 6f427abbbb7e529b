//! Property constraint sets
//!
//! Each named property is either a wildcard (any value) or a finite set of
//! acceptable values, and may be flagged optional (absence in the other set is
//! acceptable). Properties not present impose no constraint.
//!
//! Two operations drive resolution:
//! - `desired.is_satisfied_by(&produced)`: may `produced` be handed to a
//!   caller that asked for `desired`?
//! - `produced.compose(&desired)`: the narrowest specialization of a
//!   function's output template that satisfies `desired`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Property name, compared case-insensitively
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyName(String);

impl PropertyName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for PropertyName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PropertyName {}

impl Hash for PropertyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl Ord for PropertyName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl PartialOrd for PropertyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PropertyName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Value side of a property constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Any value is acceptable; carries no commitment
    Any,
    /// One of a finite set of values
    OneOf(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyConstraint {
    pub value: PropertyValue,
    /// Absence of the property in the other set is acceptable
    pub optional: bool,
}

impl PropertyConstraint {
    pub fn any() -> Self {
        Self {
            value: PropertyValue::Any,
            optional: false,
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: PropertyValue::OneOf(values.into_iter().map(Into::into).collect()),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.value, PropertyValue::Any)
    }
}

/// Immutable set of property constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyConstraintSet {
    entries: BTreeMap<PropertyName, PropertyConstraint>,
}

impl PropertyConstraintSet {
    /// The set with no constraints
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> PropertyConstraintSetBuilder {
        PropertyConstraintSetBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyConstraint> {
        self.entries.get(&PropertyName::new(name))
    }

    /// Finite values for `name`, `None` if absent or wildcard
    pub fn values(&self, name: &str) -> Option<&BTreeSet<String>> {
        match self.get(name).map(|c| &c.value) {
            Some(PropertyValue::OneOf(values)) => Some(values),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &PropertyConstraint)> {
        self.entries.iter()
    }

    /// Number of wildcard properties left to bind
    pub fn wildcard_count(&self) -> usize {
        self.entries.values().filter(|c| c.is_wildcard()).count()
    }

    /// Copy with `name` set to `constraint`
    pub fn with(&self, name: impl Into<PropertyName>, constraint: PropertyConstraint) -> Self {
        let mut next = self.clone();
        let name = name.into();
        next.entries.remove(&name);
        next.entries.insert(name, constraint);
        next
    }

    /// Copy without `name`
    pub fn without(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.entries.remove(&PropertyName::new(name));
        next
    }

    /// Is `other` an acceptable answer to a request constrained by `self`?
    pub fn is_satisfied_by(&self, other: &PropertyConstraintSet) -> bool {
        self.entries.iter().all(|(name, wanted)| {
            match other.entries.get(name) {
                None => wanted.optional,
                Some(offered) => match (&wanted.value, &offered.value) {
                    (PropertyValue::Any, _) => true,
                    // A wildcard offer can be narrowed by composition
                    (PropertyValue::OneOf(_), PropertyValue::Any) => true,
                    (PropertyValue::OneOf(accepted), PropertyValue::OneOf(offered)) => {
                        offered.is_subset(accepted)
                    }
                },
            }
        })
    }

    /// Narrow `self` (a produced template) to satisfy `desired`
    ///
    /// Returns `None` when no subset of `self` satisfies `desired`.
    pub fn compose(&self, desired: &PropertyConstraintSet) -> Option<PropertyConstraintSet> {
        let mut result = self.clone();

        for (name, wanted) in &desired.entries {
            let Some(produced) = result.entries.get_mut(name) else {
                if wanted.optional {
                    continue;
                }
                return None;
            };

            match (&produced.value, &wanted.value) {
                (_, PropertyValue::Any) => {}
                (PropertyValue::Any, PropertyValue::OneOf(accepted)) => {
                    produced.value = PropertyValue::OneOf(accepted.clone());
                }
                (PropertyValue::OneOf(offered), PropertyValue::OneOf(accepted)) => {
                    let narrowed: BTreeSet<String> =
                        offered.intersection(accepted).cloned().collect();
                    if narrowed.is_empty() {
                        return None;
                    }
                    produced.value = PropertyValue::OneOf(narrowed);
                }
            }
        }

        Some(result)
    }

    /// True if `compose` would succeed
    pub fn is_compatible_with(&self, desired: &PropertyConstraintSet) -> bool {
        self.compose(desired).is_some()
    }
}

impl fmt::Display for PropertyConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, constraint)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if constraint.optional {
                write!(f, "?")?;
            }
            match &constraint.value {
                PropertyValue::Any => write!(f, "{}=*", name)?,
                PropertyValue::OneOf(values) => {
                    let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                    write!(f, "{}=[{}]", name, joined.join(", "))?
                }
            }
        }
        f.write_str("}")
    }
}

/// Builder for `PropertyConstraintSet`
#[derive(Debug, Default)]
pub struct PropertyConstraintSetBuilder {
    entries: BTreeMap<PropertyName, PropertyConstraint>,
}

impl PropertyConstraintSetBuilder {
    fn put(mut self, name: impl Into<PropertyName>, constraint: PropertyConstraint) -> Self {
        let name = name.into();
        self.entries.remove(&name);
        self.entries.insert(name, constraint);
        self
    }

    pub fn with_values<I, S>(self, name: impl Into<PropertyName>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put(name, PropertyConstraint::one_of(values))
    }

    pub fn with_value(self, name: impl Into<PropertyName>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.with_values(name, [value])
    }

    pub fn with_any(self, name: impl Into<PropertyName>) -> Self {
        self.put(name, PropertyConstraint::any())
    }

    pub fn with_optional_any(self, name: impl Into<PropertyName>) -> Self {
        self.put(name, PropertyConstraint::any().optional())
    }

    pub fn with_optional_values<I, S>(self, name: impl Into<PropertyName>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put(name, PropertyConstraint::one_of(values).optional())
    }

    pub fn with_constraint(
        self,
        name: impl Into<PropertyName>,
        constraint: PropertyConstraint,
    ) -> Self {
        self.put(name, constraint)
    }

    pub fn build(self) -> PropertyConstraintSet {
        PropertyConstraintSet {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currency(values: &[&str]) -> PropertyConstraintSet {
        PropertyConstraintSet::builder()
            .with_values("Currency", values.iter().copied())
            .build()
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let set = PropertyConstraintSet::builder()
            .with_value("Currency", "USD")
            .with_value("CURRENCY", "EUR")
            .build();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.values("currency").unwrap().iter().collect::<Vec<_>>(),
            vec!["EUR"]
        );
    }

    #[test]
    fn test_wildcard_satisfied_by_any_declaration() {
        let desired = PropertyConstraintSet::builder().with_any("Currency").build();

        assert!(desired.is_satisfied_by(&currency(&["USD"])));
        assert!(desired.is_satisfied_by(
            &PropertyConstraintSet::builder().with_any("Currency").build()
        ));
        assert!(!desired.is_satisfied_by(&PropertyConstraintSet::empty()));
    }

    #[test]
    fn test_optional_absence_is_acceptable() {
        let desired = PropertyConstraintSet::builder()
            .with_optional_values("CurveName", ["Discounting"])
            .build();

        assert!(desired.is_satisfied_by(&PropertyConstraintSet::empty()));
        assert!(desired.is_satisfied_by(
            &PropertyConstraintSet::builder()
                .with_value("CurveName", "Discounting")
                .build()
        ));
        assert!(!desired.is_satisfied_by(
            &PropertyConstraintSet::builder()
                .with_value("CurveName", "Forward")
                .build()
        ));
    }

    #[test]
    fn test_finite_set_requires_subset() {
        let desired = currency(&["USD", "EUR"]);

        assert!(desired.is_satisfied_by(&currency(&["USD"])));
        assert!(!desired.is_satisfied_by(&currency(&["USD", "GBP"])));
        assert!(desired.is_satisfied_by(
            &PropertyConstraintSet::builder().with_any("Currency").build()
        ));
    }

    #[test]
    fn test_compose_narrows_wildcard_template() {
        let produced = PropertyConstraintSet::builder()
            .with_any("Currency")
            .with_value("Method", "Discounting")
            .build();
        let desired = currency(&["EUR"]);

        let composed = produced.compose(&desired).unwrap();
        assert_eq!(composed, produced.with("Currency", PropertyConstraint::one_of(["EUR"])));
        assert!(desired.is_satisfied_by(&composed));
        assert!(produced.is_satisfied_by(&composed));
    }

    #[test]
    fn test_compose_intersects_finite_sets() {
        let composed = currency(&["USD", "GBP"])
            .compose(&currency(&["USD", "EUR"]))
            .unwrap();
        assert_eq!(composed, currency(&["USD"]));

        assert!(currency(&["GBP"]).compose(&currency(&["USD"])).is_none());
    }

    #[test]
    fn test_compose_missing_property() {
        let produced = PropertyConstraintSet::empty();

        assert!(produced.compose(&currency(&["USD"])).is_none());

        let optional = PropertyConstraintSet::builder()
            .with_optional_values("Currency", ["USD"])
            .build();
        assert_eq!(produced.compose(&optional), Some(PropertyConstraintSet::empty()));
    }

    #[test]
    fn test_wildcard_count_and_display() {
        let set = PropertyConstraintSet::builder()
            .with_any("Curve")
            .with_value("Currency", "USD")
            .with_optional_any("Calendar")
            .build();

        assert_eq!(set.wildcard_count(), 2);
        assert_eq!(set.to_string(), "{?Calendar=*, Currency=[USD], Curve=*}");
    }
}
