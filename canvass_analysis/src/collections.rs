//! String-keyed collections used throughout the analysis.
//!
//! All of them keep the order in which keys were first seen, so that the
//! rectangles built from them are stable from one run to the next.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use crate::config::{column_names, AnalysisErrors, SheetContents};

/// An ordered map from strings to values.
///
/// Keys are compared exactly (case-sensitive). Replacing the value of an existing
/// key keeps its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct Dict<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for Dict<V> {
    fn default() -> Self {
        Dict {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> Dict<V> {
    pub fn new() -> Dict<V> {
        Dict::default()
    }

    /// Inserts the value, returning the previous one if the key was present.
    pub fn add(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(&idx) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[idx].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&idx) => Some(&mut self.entries[idx].1),
            None => None,
        }
    }

    /// Returns the value for this key, inserting the result of `init` first if needed.
    pub fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.add(key, init());
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// No-op if the key is absent.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.entries.remove(idx);
        for (k, _) in self.entries[idx..].iter() {
            if let Some(pos) = self.index.get_mut(k) {
                *pos -= 1;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_values(self) -> Vec<V> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

impl<V> FromIterator<(String, V)> for Dict<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut d = Dict::new();
        for (k, v) in iter {
            d.add(k, v);
        }
        d
    }
}

impl<V> IntoIterator for Dict<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Counts unique items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedCounter {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl KeyedCounter {
    pub fn new() -> KeyedCounter {
        KeyedCounter::default()
    }

    /// Returns true if the key was not seen before.
    pub fn add(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        self.order.push(key.to_string());
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// The keys, in the order they were first added.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn for_each(&self, mut callback: impl FnMut(&str)) {
        for k in self.order.iter() {
            callback(k);
        }
    }
}

impl<'a> FromIterator<&'a str> for KeyedCounter {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut c = KeyedCounter::new();
        for k in iter {
            c.add(k);
        }
        c
    }
}

impl Display for KeyedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// A sparse table indexed by a pair of keys.
///
/// The pair is stored structurally, so ("a*b", "c") and ("a", "b*c") never share a cell.
#[derive(Debug, Clone)]
pub struct TwoKeyTable<V> {
    data: HashMap<String, HashMap<String, V>>,
    key1s: KeyedCounter,
    key2s: KeyedCounter,
}

impl<V> Default for TwoKeyTable<V> {
    fn default() -> Self {
        TwoKeyTable {
            data: HashMap::new(),
            key1s: KeyedCounter::new(),
            key2s: KeyedCounter::new(),
        }
    }
}

impl<V> TwoKeyTable<V> {
    pub fn new() -> TwoKeyTable<V> {
        TwoKeyTable::default()
    }

    /// Stores the value, replacing any previous value for the same pair.
    pub fn add(&mut self, key1: &str, key2: &str, value: V) {
        self.key1s.add(key1);
        self.key2s.add(key2);
        self.data
            .entry(key1.to_string())
            .or_default()
            .insert(key2.to_string(), value);
    }

    pub fn get(&self, key1: &str, key2: &str) -> Option<&V> {
        self.data.get(key1).and_then(|row| row.get(key2))
    }

    pub fn key1s(&self) -> &[String] {
        self.key1s.keys()
    }

    pub fn key2s(&self) -> &[String] {
        self.key2s.keys()
    }
}

impl<V: Display> TwoKeyTable<V> {
    /// Pivots the table into a rectangle.
    ///
    /// The first column is named `first_column_name` and lists the key1 values. Every
    /// key2 value becomes a column. Missing cells are empty strings.
    pub fn to_rectangle(&self, first_column_name: &str) -> Result<SheetContents, AnalysisErrors> {
        if self.key2s.contains(first_column_name) {
            return Err(AnalysisErrors::KeyCollision {
                key: first_column_name.to_string(),
            });
        }
        let mut res = SheetContents::new();
        res.add(first_column_name, self.key1s.keys().to_vec());
        for k2 in self.key2s.iter() {
            let col: Vec<String> = self
                .key1s
                .iter()
                .map(|k1| {
                    self.get(k1, k2)
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                })
                .collect();
            res.add(k2, col);
        }
        Ok(res)
    }
}

/// Counts how many observations out of a total matched some condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    count: u64,
    total: u64,
}

impl Counter {
    pub fn new() -> Counter {
        Counter::default()
    }

    pub fn add(&mut self, include: bool) {
        if include {
            self.count += 1;
        }
        self.total += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn percentage(&self) -> String {
        percentage(self.count, self.total)
    }
}

impl Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} ({})", self.count, self.total, self.percentage())
    }
}

/// Formats `top / bottom` as a percentage with at most two decimals, or "na" if
/// `bottom` is zero.
pub fn percentage(top: u64, bottom: u64) -> String {
    if bottom == 0 {
        return "na".to_string();
    }
    let x = ((top as f64) * 100.0 * 100.0 / (bottom as f64)).round() / 100.0;
    format!("{}%", x)
}

/// Looks up a column that must be present.
pub fn required_column<'a>(
    contents: &'a SheetContents,
    name: &str,
) -> Result<&'a [String], AnalysisErrors> {
    contents
        .get(name)
        .map(|c| c.as_slice())
        .ok_or_else(|| AnalysisErrors::MissingColumn {
            column: name.to_string(),
        })
}

/// Looks up a column that must be present and aligned with `num_rows`.
pub fn aligned_column<'a>(
    contents: &'a SheetContents,
    name: &str,
    num_rows: usize,
) -> Result<&'a [String], AnalysisErrors> {
    let col = required_column(contents, name)?;
    check_aligned(name, col, num_rows)?;
    Ok(col)
}

/// Looks up a column that may be absent. If present, it must be aligned.
pub fn optional_column<'a>(
    contents: &'a SheetContents,
    name: &str,
    num_rows: usize,
) -> Result<Option<&'a [String]>, AnalysisErrors> {
    match contents.get(name) {
        Some(col) => {
            check_aligned(name, col, num_rows)?;
            Ok(Some(col.as_slice()))
        }
        None => Ok(None),
    }
}

fn check_aligned(name: &str, col: &[String], num_rows: usize) -> Result<(), AnalysisErrors> {
    if col.len() < num_rows {
        return Err(AnalysisErrors::RaggedColumns {
            column: name.to_string(),
            expected: num_rows,
            found: col.len(),
        });
    }
    Ok(())
}

/// Walks a column-oriented payload cell by cell.
///
/// The callback receives `(rec_id, column_name, value)` for every column other than
/// the record id, row by row.
pub fn for_each_cell(
    contents: &SheetContents,
    mut callback: impl FnMut(&str, &str, &str),
) -> Result<(), AnalysisErrors> {
    let rec_ids = required_column(contents, column_names::REC_ID)?;
    for (name, col) in contents.iter() {
        if name != column_names::REC_ID {
            check_aligned(name, col, rec_ids.len())?;
        }
    }
    for (idx, rec_id) in rec_ids.iter().enumerate() {
        for (name, col) in contents.iter() {
            if name == column_names::REC_ID {
                continue;
            }
            callback(rec_id, name, &col[idx]);
        }
    }
    Ok(())
}
