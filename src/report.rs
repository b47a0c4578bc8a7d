//! Aggregation of resolved label pairs into a comparison report.
//!
//! Input is a [`LabeledPairs`]: for every query that resolved on both sides,
//! its index plus the interned label on side A (points, or the first model)
//! and side B (the model, or the second model). Queries that did not resolve
//! are carried alongside so the report can list them, but they never enter a
//! denominator.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::CompareError;

/// Name of the catch-all category used by top-N collapsing.
pub const OTHERS_LABEL: &str = "others";

/// One query that resolved on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPair {
    /// Position of the query in its input sequence.
    pub index: usize,
    pub a: u32,
    pub b: u32,
}

/// Resolved label pairs plus the queries excluded from them.
#[derive(Debug, Clone, Default)]
pub struct LabeledPairs {
    pub side_a: String,
    pub side_b: String,
    vocab_a: Vec<String>,
    vocab_b: Vec<String>,
    pairs: Vec<LabelPair>,
    /// Queries outside at least one side.
    pub outside: Vec<usize>,
    /// Queries with candidates but no containing subblock on at least one side.
    pub unresolved: Vec<usize>,
}

impl LabeledPairs {
    /// `vocab_a` / `vocab_b` map label ids to text for each side.
    pub fn new(
        side_a: impl Into<String>,
        vocab_a: Vec<String>,
        side_b: impl Into<String>,
        vocab_b: Vec<String>,
    ) -> Self {
        Self {
            side_a: side_a.into(),
            side_b: side_b.into(),
            vocab_a,
            vocab_b,
            ..Default::default()
        }
    }

    /// Build from label text directly; query indices are positions.
    pub fn from_labels<'s, I>(side_a: &str, side_b: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let mut ids_a: FxHashMap<&str, u32> = FxHashMap::default();
        let mut ids_b: FxHashMap<&str, u32> = FxHashMap::default();
        let mut out = Self::new(side_a, Vec::new(), side_b, Vec::new());
        for (index, (a, b)) in labels.into_iter().enumerate() {
            let a = *ids_a.entry(a).or_insert_with(|| {
                out.vocab_a.push(a.to_string());
                (out.vocab_a.len() - 1) as u32
            });
            let b = *ids_b.entry(b).or_insert_with(|| {
                out.vocab_b.push(b.to_string());
                (out.vocab_b.len() - 1) as u32
            });
            out.pairs.push(LabelPair { index, a, b });
        }
        out
    }

    #[inline]
    pub fn push(&mut self, index: usize, a: u32, b: u32) {
        debug_assert!((a as usize) < self.vocab_a.len());
        debug_assert!((b as usize) < self.vocab_b.len());
        self.pairs.push(LabelPair { index, a, b });
    }

    pub fn pairs(&self) -> &[LabelPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn label_a(&self, id: u32) -> &str {
        &self.vocab_a[id as usize]
    }

    pub fn label_b(&self, id: u32) -> &str {
        &self.vocab_b[id as usize]
    }

    /// For each side-A id, the side-B id with the same text, if any.
    fn a_to_b(&self) -> Vec<Option<u32>> {
        let b_ids: FxHashMap<&str, u32> = self
            .vocab_b
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i as u32))
            .collect();
        self.vocab_a
            .iter()
            .map(|s| b_ids.get(s.as_str()).copied())
            .collect()
    }

    #[inline]
    fn is_match(map: &[Option<u32>], pair: &LabelPair) -> bool {
        map[pair.a as usize] == Some(pair.b)
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Count per id over a vocabulary.
fn tally(ids: impl Iterator<Item = u32>, vocab_len: usize) -> Vec<u64> {
    let mut counts = vec![0u64; vocab_len];
    for id in ids {
        counts[id as usize] += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub label: String,
    pub count: u64,
    pub percent: f64,
}

/// Per-category counts for one side, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub rows: Vec<FrequencyRow>,
    pub total: u64,
}

impl FrequencyTable {
    fn from_counts(vocab: &[String], counts: &[u64]) -> Self {
        let total = counts.iter().sum();
        let mut rows: Vec<FrequencyRow> = vocab
            .iter()
            .zip(counts)
            .filter(|(_, &c)| c > 0)
            .map(|(label, &count)| FrequencyRow {
                label: label.clone(),
                count,
                percent: percent(count, total),
            })
            .collect();
        rows.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| x.label.cmp(&y.label)));
        Self { rows, total }
    }

    pub fn get(&self, label: &str) -> Option<&FrequencyRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cross-tabulation of side-A categories (rows) against side-B (columns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `counts[r][c]`.
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn count(&self, row: &str, column: &str) -> u64 {
        let r = self.rows.iter().position(|x| x == row);
        let c = self.columns.iter().position(|x| x == column);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    /// Grand total; equals the number of pairs the table was built from.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Cell as a percentage of the grand total.
    pub fn percent(&self, row: &str, column: &str) -> f64 {
        percent(self.count(row, column), self.total())
    }

    pub fn row_total(&self, row: &str) -> u64 {
        self.rows
            .iter()
            .position(|x| x == row)
            .map_or(0, |r| self.counts[r].iter().sum())
    }

    pub fn column_total(&self, column: &str) -> u64 {
        self.columns
            .iter()
            .position(|x| x == column)
            .map_or(0, |c| self.counts.iter().map(|row| row[c]).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Table over `rows` x `columns` from per-pair row/column positions.
    fn tabulate(
        rows: Vec<String>,
        columns: Vec<String>,
        cells: impl Iterator<Item = (usize, usize)>,
    ) -> Self {
        let mut counts = vec![vec![0u64; columns.len()]; rows.len()];
        for (r, c) in cells {
            counts[r][c] += 1;
        }
        Self {
            rows,
            columns,
            counts,
        }
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .chain(&self.columns)
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);
        write!(f, "{:>width$}", "", width = width)?;
        for c in &self.columns {
            write!(f, " {:>width$}", c, width = width)?;
        }
        writeln!(f)?;
        for (r, row) in self.rows.iter().enumerate() {
            write!(f, "{:>width$}", row, width = width)?;
            for count in &self.counts[r] {
                write!(f, " {:>width$}", count, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Ids ordered by count descending, ties by label ascending.
fn rank(vocab: &[String], counts: &[u64]) -> Vec<u32> {
    let mut ids: Vec<u32> = (0..vocab.len() as u32)
        .filter(|&id| counts[id as usize] > 0)
        .collect();
    ids.sort_by(|&x, &y| {
        counts[y as usize]
            .cmp(&counts[x as usize])
            .then_with(|| vocab[x as usize].cmp(&vocab[y as usize]))
    });
    ids
}

/// Position of each id in the collapsed axis, plus the axis labels.
fn collapse_axis(vocab: &[String], counts: &[u64], n: usize) -> (Vec<usize>, Vec<String>) {
    let ranked = rank(vocab, counts);
    let kept = ranked.len().min(n);
    let mut labels: Vec<String> = ranked[..kept]
        .iter()
        .map(|&id| vocab[id as usize].clone())
        .collect();
    // A kept category literally named "others" doubles as the catch-all.
    let existing = labels.iter().position(|l| l == OTHERS_LABEL);
    let others = existing.unwrap_or(labels.len());
    let mut position = vec![others; vocab.len()];
    for (p, &id) in ranked[..kept].iter().enumerate() {
        position[id as usize] = p;
    }
    if existing.is_none() && ranked.len() > kept {
        labels.push(OTHERS_LABEL.to_string());
    }
    (position, labels)
}

/// Axis with every label present, sorted ascending.
fn sorted_axis(vocab: &[String], counts: &[u64]) -> (Vec<usize>, Vec<String>) {
    let mut ids: Vec<u32> = (0..vocab.len() as u32)
        .filter(|&id| counts[id as usize] > 0)
        .collect();
    ids.sort_by(|&x, &y| vocab[x as usize].cmp(&vocab[y as usize]));
    let mut position = vec![usize::MAX; vocab.len()];
    for (p, &id) in ids.iter().enumerate() {
        position[id as usize] = p;
    }
    let labels = ids.iter().map(|&id| vocab[id as usize].clone()).collect();
    (position, labels)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Per-category precision, recall and F1 with side A as the reference and
/// side B as the prediction.
///
/// A ratio with a zero denominator counts as 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    fn build(pairs: &LabeledPairs, a_to_b: &[Option<u32>]) -> Self {
        // Union of labels from both sides, sorted.
        let mut labels: Vec<&str> = pairs
            .vocab_a
            .iter()
            .chain(&pairs.vocab_b)
            .map(String::as_str)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        let slot: FxHashMap<&str, usize> =
            labels.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let slot_a: Vec<usize> = pairs.vocab_a.iter().map(|s| slot[s.as_str()]).collect();
        let slot_b: Vec<usize> = pairs.vocab_b.iter().map(|s| slot[s.as_str()]).collect();

        let mut tp = vec![0u64; labels.len()];
        let mut support = vec![0u64; labels.len()];
        let mut predicted = vec![0u64; labels.len()];
        let mut correct = 0u64;
        for p in &pairs.pairs {
            let (a, b) = (slot_a[p.a as usize], slot_b[p.b as usize]);
            support[a] += 1;
            predicted[b] += 1;
            if LabeledPairs::is_match(a_to_b, p) {
                tp[a] += 1;
                correct += 1;
            }
        }

        let ratio = |num: u64, den: u64| if den == 0 { 1.0 } else { num as f64 / den as f64 };
        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .filter(|&(i, _)| support[i] > 0 || predicted[i] > 0)
            .map(|(i, &label)| ClassMetrics {
                label: label.to_string(),
                precision: ratio(tp[i], predicted[i]),
                recall: ratio(tp[i], support[i]),
                f1: ratio(2 * tp[i], support[i] + predicted[i]),
                support: support[i],
            })
            .collect();

        let total = pairs.len() as u64;
        let k = classes.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
            support: total,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

/// Aggregated agreement statistics for one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainReport {
    pub side_a: String,
    pub side_b: String,
    /// Pairs that resolved on both sides.
    pub total: u64,
    pub matches: u64,
    pub mismatches: u64,
    pub match_percent: f64,
    pub frequency_a: FrequencyTable,
    pub frequency_b: FrequencyTable,
    pub contingency: ContingencyTable,
    /// Contingency table with categories beyond the N most frequent merged
    /// into `"others"`.
    pub top_n: Option<ContingencyTable>,
    pub classification: ClassificationReport,
    /// Query indices whose labels differ.
    pub mismatched: Vec<usize>,
    pub outside: Vec<usize>,
    pub unresolved: Vec<usize>,
}

impl DomainReport {
    /// Aggregate `pairs`. Fails with [`CompareError::NoData`] if no query
    /// resolved on both sides.
    pub fn build(pairs: &LabeledPairs, top_n: Option<usize>) -> Result<Self, CompareError> {
        if pairs.is_empty() {
            return Err(CompareError::NoData);
        }
        let a_to_b = pairs.a_to_b();
        let mismatched: Vec<usize> = pairs
            .pairs
            .iter()
            .filter(|p| !LabeledPairs::is_match(&a_to_b, p))
            .map(|p| p.index)
            .collect();
        let total = pairs.len() as u64;
        let mismatches = mismatched.len() as u64;
        let matches = total - mismatches;

        let counts_a = tally(pairs.pairs.iter().map(|p| p.a), pairs.vocab_a.len());
        let counts_b = tally(pairs.pairs.iter().map(|p| p.b), pairs.vocab_b.len());

        let (pos_a, rows) = sorted_axis(&pairs.vocab_a, &counts_a);
        let (pos_b, columns) = sorted_axis(&pairs.vocab_b, &counts_b);
        let contingency = ContingencyTable::tabulate(
            rows,
            columns,
            pairs
                .pairs
                .iter()
                .map(|p| (pos_a[p.a as usize], pos_b[p.b as usize])),
        );

        let top_n = top_n.map(|n| {
            let (pos_a, rows) = collapse_axis(&pairs.vocab_a, &counts_a, n);
            let (pos_b, columns) = collapse_axis(&pairs.vocab_b, &counts_b, n);
            ContingencyTable::tabulate(
                rows,
                columns,
                pairs
                    .pairs
                    .iter()
                    .map(|p| (pos_a[p.a as usize], pos_b[p.b as usize])),
            )
        });

        let match_percent = percent(matches, total);
        log::info!(
            "{} vs {}: {} of {} resolved pairs match ({:.2}%)",
            pairs.side_a,
            pairs.side_b,
            matches,
            total,
            match_percent
        );

        Ok(Self {
            side_a: pairs.side_a.clone(),
            side_b: pairs.side_b.clone(),
            total,
            matches,
            mismatches,
            match_percent,
            frequency_a: FrequencyTable::from_counts(&pairs.vocab_a, &counts_a),
            frequency_b: FrequencyTable::from_counts(&pairs.vocab_b, &counts_b),
            contingency,
            top_n,
            classification: ClassificationReport::build(pairs, &a_to_b),
            mismatched,
            outside: pairs.outside.clone(),
            unresolved: pairs.unresolved.clone(),
        })
    }

    /// Short multi-line summary for terminals and logs.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("{} vs {}", self.side_a, self.side_b),
            format!(
                "  resolved pairs: {}  matches: {}  mismatches: {}",
                self.total, self.matches, self.mismatches
            ),
            format!("  match: {:.2}%", self.match_percent),
        ];
        if !self.outside.is_empty() {
            lines.push(format!("  outside: {}", self.outside.len()));
        }
        if !self.unresolved.is_empty() {
            lines.push(format!("  unresolved: {}", self.unresolved.len()));
        }
        lines.push(format!(
            "  accuracy: {:.4}  macro F1: {:.4}  weighted F1: {:.4}",
            self.classification.accuracy,
            self.classification.macro_avg.f1,
            self.classification.weighted_avg.f1
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(labels: &[(&'static str, &'static str)]) -> LabeledPairs {
        LabeledPairs::from_labels("points", "model", labels.iter().copied())
    }

    #[test]
    fn test_no_pairs_is_no_data() {
        let p = pairs(&[]);
        assert_eq!(DomainReport::build(&p, None), Err(CompareError::NoData));
    }

    #[test]
    fn test_match_counts_and_mismatch_indices() {
        let p = pairs(&[("A", "A"), ("A", "B"), ("B", "B"), ("C", "B")]);
        let r = DomainReport::build(&p, None).unwrap();
        assert_eq!(r.total, 4);
        assert_eq!(r.matches, 2);
        assert_eq!(r.mismatches, 2);
        assert_eq!(r.match_percent, 50.0);
        assert_eq!(r.mismatched, vec![1, 3]);
    }

    #[test]
    fn test_all_agree_is_full_match() {
        let p = pairs(&[("A", "A"); 5]);
        let r = DomainReport::build(&p, None).unwrap();
        assert_eq!(r.match_percent, 100.0);
        assert!(r.mismatched.is_empty());
        assert_eq!(r.classification.accuracy, 1.0);
    }

    #[test]
    fn test_frequency_tables_most_frequent_first() {
        let p = pairs(&[("b", "x"), ("a", "x"), ("b", "y"), ("c", "x")]);
        let r = DomainReport::build(&p, None).unwrap();
        let labels: Vec<&str> = r.frequency_a.rows.iter().map(|x| x.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
        assert_eq!(r.frequency_a.get("b").unwrap().percent, 50.0);
        assert_eq!(r.frequency_b.get("x").unwrap().count, 3);
        assert_eq!(r.frequency_b.total, 4);
    }

    #[test]
    fn test_contingency_sums_to_pair_count() {
        let p = pairs(&[("b", "x"), ("a", "x"), ("b", "y"), ("b", "y"), ("c", "z")]);
        let r = DomainReport::build(&p, None).unwrap();
        let t = &r.contingency;
        assert_eq!(t.rows, vec!["a", "b", "c"]);
        assert_eq!(t.columns, vec!["x", "y", "z"]);
        assert_eq!(t.total(), 5);
        assert_eq!(t.count("b", "y"), 2);
        assert_eq!(t.count("a", "z"), 0);
        assert_eq!(t.percent("b", "y"), 40.0);
        assert_eq!(t.row_total("b"), 3);
        assert_eq!(t.column_total("x"), 2);
    }

    #[test]
    fn test_top_n_collapses_into_others() {
        let p = pairs(&[
            ("a", "a"),
            ("a", "a"),
            ("a", "a"),
            ("b", "b"),
            ("b", "b"),
            ("c", "c"),
            ("d", "a"),
        ]);
        let r = DomainReport::build(&p, Some(2)).unwrap();
        let t = r.top_n.as_ref().unwrap();
        assert_eq!(t.rows, vec!["a", "b", "others"]);
        assert_eq!(t.columns, vec!["a", "b", "others"]);
        assert_eq!(t.count("others", "a"), 1);
        assert_eq!(t.count("others", "others"), 1);
        assert_eq!(t.total(), r.contingency.total());
        // Underlying statistics are unchanged.
        assert_eq!(r.matches, 6);
    }

    #[test]
    fn test_top_n_merges_into_existing_others_category() {
        let p = pairs(&[
            ("x", "x"),
            ("x", "x"),
            ("others", "others"),
            ("others", "others"),
            ("y", "y"),
            ("z", "z"),
        ]);
        let r = DomainReport::build(&p, Some(2)).unwrap();
        let t = r.top_n.as_ref().unwrap();
        assert_eq!(t.rows, vec!["others", "x"]);
        assert_eq!(t.columns, vec!["others", "x"]);
        assert_eq!(t.count("others", "others"), 4);
        assert_eq!(t.total(), 6);

        // Collapsed away, a real "others" lands in the single catch-all.
        let p = pairs(&[("a", "a"), ("a", "a"), ("b", "b"), ("others", "others"), ("c", "c")]);
        let r = DomainReport::build(&p, Some(2)).unwrap();
        let t = r.top_n.as_ref().unwrap();
        assert_eq!(t.rows, vec!["a", "b", "others"]);
        assert_eq!(t.count("others", "others"), 2);
    }

    #[test]
    fn test_top_n_ties_broken_by_label() {
        let p = pairs(&[("z", "z"), ("y", "y"), ("x", "x")]);
        let r = DomainReport::build(&p, Some(2)).unwrap();
        assert_eq!(r.top_n.unwrap().rows, vec!["x", "y", "others"]);
    }

    #[test]
    fn test_top_n_larger_than_categories_has_no_others() {
        let p = pairs(&[("a", "a"), ("b", "b")]);
        let r = DomainReport::build(&p, Some(10)).unwrap();
        assert_eq!(r.top_n.unwrap().rows, vec!["a", "b"]);
    }

    #[test]
    fn test_classification_metrics() {
        // reference: A A B B, prediction: A B B B
        let p = pairs(&[("A", "A"), ("A", "B"), ("B", "B"), ("B", "B")]);
        let r = DomainReport::build(&p, None).unwrap();
        let c = &r.classification;
        let a = c.class("A").unwrap();
        assert_eq!(a.precision, 1.0);
        assert_eq!(a.recall, 0.5);
        assert!((a.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(a.support, 2);
        let b = c.class("B").unwrap();
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(b.recall, 1.0);
        assert_eq!(c.accuracy, 0.75);
        assert_eq!(c.macro_avg.support, 4);
    }

    #[test]
    fn test_prediction_only_class_uses_zero_division_one() {
        let p = pairs(&[("A", "C")]);
        let r = DomainReport::build(&p, None).unwrap();
        let c = r.classification.class("C").unwrap();
        assert_eq!(c.support, 0);
        assert_eq!(c.precision, 0.0);
        assert_eq!(c.recall, 1.0);
    }
}
