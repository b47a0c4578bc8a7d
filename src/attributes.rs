//! Named per-primitive attributes and categorical label selection.
//!
//! Models and point collections carry any number of named attribute arrays.
//! Comparison needs exactly one *categorical* array per side; which one is
//! decided by an [`AttributeSelector`], an ordered list of rules tried in
//! priority order. A selector never falls back to an arbitrary attribute: if
//! no rule matches, selection fails with [`CompareError::NoCategoricalAttribute`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::CompareError;

/// Values of one attribute, one per subblock or point.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Text(Vec<String>),
    Integer(Vec<i64>),
    Real(Vec<f64>),
}

impl AttributeValues {
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Text(v) => v.len(),
            AttributeValues::Integer(v) => v.len(),
            AttributeValues::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text and integer attributes are categorical; reals are not.
    pub fn is_categorical(&self) -> bool {
        !matches!(self, AttributeValues::Real(_))
    }
}

/// Ordered collection of named attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    entries: Vec<(String, AttributeValues)>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, values: AttributeValues) -> Self {
        self.insert(name, values);
        self
    }

    /// Insert or replace an attribute. Insertion order is kept for new names.
    pub fn insert(&mut self, name: impl Into<String>, values: AttributeValues) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = values;
        } else {
            self.entries.push((name, values));
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValues> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValues)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn check_len(&self, expected: usize, what: &'static str) -> Result<(), CompareError> {
        for (_, values) in &self.entries {
            if values.len() != expected {
                return Err(CompareError::LengthMismatch {
                    what,
                    expected,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }
}

/// One rule of an [`AttributeSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRule {
    /// Attribute name equals this string exactly.
    Exact(String),
    /// Attribute name equals this string ignoring ASCII case.
    IgnoreCase(String),
    /// The first categorical attribute in table order.
    FirstCategorical,
}

impl SelectionRule {
    fn matches(&self, name: &str, values: &AttributeValues) -> bool {
        match self {
            SelectionRule::Exact(want) => name == want,
            SelectionRule::IgnoreCase(want) => name.eq_ignore_ascii_case(want),
            SelectionRule::FirstCategorical => values.is_categorical(),
        }
    }
}

/// Names recognised as domain attributes when nothing else is configured.
pub const DEFAULT_DOMAIN_ALIASES: [&str; 3] = ["Domain", "domain", "geocod"];

/// Prioritised attribute selection strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    rules: Vec<SelectionRule>,
}

impl Default for AttributeSelector {
    fn default() -> Self {
        Self::aliases(DEFAULT_DOMAIN_ALIASES)
    }
}

impl AttributeSelector {
    pub fn new(rules: Vec<SelectionRule>) -> Self {
        Self { rules }
    }

    /// Exact-name rules, one per alias, in the given priority order.
    pub fn aliases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|n| SelectionRule::Exact(n.into()))
                .collect(),
        )
    }

    /// Only the "first categorical attribute" rule.
    pub fn first_categorical() -> Self {
        Self::new(vec![SelectionRule::FirstCategorical])
    }

    /// Append a lower-priority rule.
    pub fn then(mut self, rule: SelectionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// Pick the attribute matched by the highest-priority rule.
    ///
    /// Name rules that hit a non-categorical attribute are skipped with a
    /// warning rather than accepted.
    pub fn select<'a>(
        &self,
        table: &'a AttributeTable,
    ) -> Result<(&'a str, &'a AttributeValues), CompareError> {
        for rule in &self.rules {
            for (name, values) in table.iter() {
                if !rule.matches(name, values) {
                    continue;
                }
                if !values.is_categorical() {
                    log::warn!("attribute {:?} matched {:?} but is not categorical", name, rule);
                    continue;
                }
                return Ok((name, values));
            }
        }
        Err(CompareError::NoCategoricalAttribute {
            available: table.names().map(str::to_string).collect(),
        })
    }
}

/// Case handling applied to labels before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelCase {
    #[default]
    Preserve,
    Lowercase,
}

impl LabelCase {
    fn apply(self, s: &str) -> String {
        match self {
            LabelCase::Preserve => s.to_string(),
            LabelCase::Lowercase => s.to_lowercase(),
        }
    }
}

/// Interned categorical labels: one id per primitive plus the id vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    names: Vec<String>,
    ids: Vec<u32>,
}

impl Labels {
    /// Intern a sequence of labels. Ids are assigned in first-seen order.
    pub fn intern<I, S>(values: I, case: LabelCase) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lookup: FxHashMap<String, u32> = FxHashMap::default();
        let mut names = Vec::new();
        let ids = values
            .into_iter()
            .map(|v| {
                let label = case.apply(v.as_ref());
                *lookup.entry(label).or_insert_with_key(|key| {
                    names.push(key.clone());
                    (names.len() - 1) as u32
                })
            })
            .collect();
        Self { names, ids }
    }

    /// Labels from a categorical attribute.
    pub fn from_values(values: &AttributeValues, case: LabelCase) -> Result<Self, CompareError> {
        match values {
            AttributeValues::Text(v) => Ok(Self::intern(v, case)),
            AttributeValues::Integer(v) => Ok(Self::intern(v.iter().map(|i| i.to_string()), case)),
            AttributeValues::Real(_) => Err(CompareError::NoCategoricalAttribute {
                available: Vec::new(),
            }),
        }
    }

    /// Select an attribute from `table` and intern it.
    pub fn select(
        table: &AttributeTable,
        selector: &AttributeSelector,
        case: LabelCase,
    ) -> Result<Self, CompareError> {
        let (name, values) = selector.select(table)?;
        log::debug!("using attribute {:?} for labels", name);
        Self::from_values(values, case)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Label id of primitive `index`.
    #[inline]
    pub fn id(&self, index: usize) -> u32 {
        self.ids[index]
    }

    /// Label text of primitive `index`.
    #[inline]
    pub fn label(&self, index: usize) -> &str {
        &self.names[self.ids[index] as usize]
    }

    /// Text for a label id.
    #[inline]
    pub fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// Distinct labels, indexed by id.
    pub fn vocabulary(&self) -> &[String] {
        &self.names
    }
}
