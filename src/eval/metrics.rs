use serde::{Serialize, Deserialize};
use std::fmt;

/// Scores of one evaluation pass.
///
/// `confusion[actual][predicted]` counts samples.  Per-class scores with a
/// zero denominator are 0.  Classes that never occur and are never
/// predicted are left out of the macro averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub class_names: Vec<String>,
    pub confusion: Vec<Vec<usize>>,
}

impl Evaluation {
    pub fn new(class_names: Vec<String>) -> Evaluation {
        let n = class_names.len();
        Evaluation { class_names, confusion: vec![vec![0; n]; n] }
    }

    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.confusion[actual][predicted] += 1;
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    fn true_positives(&self, class: usize) -> usize {
        self.confusion[class][class]
    }

    fn actual_count(&self, class: usize) -> usize {
        self.confusion[class].iter().sum()
    }

    fn predicted_count(&self, class: usize) -> usize {
        self.confusion.iter().map(|row| row[class]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.num_classes()).map(|c| self.true_positives(c)).sum();
        ratio(correct, self.total())
    }

    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.predicted_count(class))
    }

    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.actual_count(class))
    }

    pub fn f1(&self, class: usize) -> f64 {
        let (p, r) = (self.precision(class), self.recall(class));
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    fn active_classes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_classes()).filter(|&c| self.actual_count(c) + self.predicted_count(c) > 0)
    }

    fn macro_average<F: Fn(usize) -> f64>(&self, score: F) -> f64 {
        let (sum, n) = self.active_classes().fold((0.0, 0usize), |(s, n), c| (s + score(c), n + 1));
        if n == 0 { 0.0 } else { sum / n as f64 }
    }

    pub fn macro_precision(&self) -> f64 {
        self.macro_average(|c| self.precision(c))
    }

    pub fn macro_recall(&self) -> f64 {
        self.macro_average(|c| self.recall(c))
    }

    pub fn macro_f1(&self) -> f64 {
        self.macro_average(|c| self.f1(c))
    }

    /// Multi-line report: summary scores followed by the confusion matrix.
    pub fn stats(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Examples:  {}\n", self.total()));
        out.push_str(&format!("Accuracy:  {:.4}\n", self.accuracy()));
        out.push_str(&format!("Precision: {:.4}\n", self.macro_precision()));
        out.push_str(&format!("Recall:    {:.4}\n", self.macro_recall()));
        out.push_str(&format!("F1 Score:  {:.4}\n", self.macro_f1()));
        out.push_str("\nConfusion matrix (rows = actual, columns = predicted):\n");

        let width = self.class_names.iter().map(|n| n.len()).max().unwrap_or(0).max(6);
        out.push_str(&format!("{:>width$}", ""));
        for i in 0..self.num_classes() {
            out.push_str(&format!(" {i:>6}"));
        }
        out.push('\n');
        for (i, row) in self.confusion.iter().enumerate() {
            out.push_str(&format!("{:>width$}", self.class_names[i]));
            for count in row {
                out.push_str(&format!(" {count:>6}"));
            }
            out.push_str(&format!("  | {i}\n"));
        }
        out
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stats())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
