//! Myers' O(ND) difference algorithm, in linear space
//!
//! Computes a minimal edit script between two sequences. Each edit keeps the
//! 1-based line number of the element on the side(s) it belongs to, so hunks
//! can be built without re-counting.

use derive_new::new;
use std::fmt::Display;

/// An element together with its 1-based position in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Line<T> {
    pub number: usize,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<T> {
    Delete { old: Line<T> },
    Insert { new: Line<T> },
    Equal { old: Line<T>, new: Line<T> },
}

impl<T> Edit<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, Edit::Equal { .. })
    }

    pub fn old_line(&self) -> Option<&Line<T>> {
        match self {
            Edit::Delete { old } | Edit::Equal { old, .. } => Some(old),
            Edit::Insert { .. } => None,
        }
    }

    pub fn new_line(&self) -> Option<&Line<T>> {
        match self {
            Edit::Insert { new } | Edit::Equal { new, .. } => Some(new),
            Edit::Delete { .. } => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Edit::Delete { .. } => '-',
            Edit::Insert { .. } => '+',
            Edit::Equal { .. } => ' ',
        }
    }

    /// The element as it appears in the output: old side unless inserted
    pub fn value(&self) -> &T {
        match self {
            Edit::Delete { old } | Edit::Equal { old, .. } => &old.value,
            Edit::Insert { new } => &new.value,
        }
    }
}

impl<T: Display> Display for Edit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.symbol(), self.value())
    }
}

pub trait DiffAlgorithm<T> {
    type EditScript;

    fn diff(&self) -> Self::EditScript;
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

/// Furthest-reaching x per diagonal `k`, for `k` in `-bound..=bound`
struct Frontier {
    offset: isize,
    v: Vec<isize>,
}

impl Frontier {
    fn new(bound: usize) -> Self {
        Frontier {
            offset: bound as isize,
            v: vec![0; 2 * bound + 1],
        }
    }

    fn get(&self, k: isize) -> isize {
        self.v[(self.offset + k) as usize]
    }

    fn set(&mut self, k: isize, x: isize) {
        self.v[(self.offset + k) as usize] = x;
    }
}

impl<T: Eq + Clone> DiffAlgorithm<T> for MyersDiff<'_, T> {
    type EditScript = Vec<Edit<T>>;

    /// Linear-space variant: split on a middle snake and recurse into both
    /// halves, so memory stays proportional to the input length.
    fn diff(&self) -> Self::EditScript {
        let (n, m) = (self.a.len(), self.b.len());
        let mut edits = Vec::with_capacity(n.max(m));

        if n == 0 || m == 0 {
            self.push_changes(0..n, 0..m, &mut edits);
            return edits;
        }

        let bound = (n + m).div_ceil(2) + 1;
        let mut forward = Frontier::new(bound);
        let mut backward = Frontier::new(bound);
        self.conquer(0..n, 0..m, &mut forward, &mut backward, &mut edits);

        deletions_first(&mut edits);
        edits
    }
}

impl<T: Eq + Clone> MyersDiff<'_, T> {
    fn line_a(&self, i: usize) -> Line<T> {
        Line::new(i + 1, self.a[i].clone())
    }

    fn line_b(&self, j: usize) -> Line<T> {
        Line::new(j + 1, self.b[j].clone())
    }

    fn push_equal(&self, i: usize, j: usize, edits: &mut Vec<Edit<T>>) {
        edits.push(Edit::Equal {
            old: self.line_a(i),
            new: self.line_b(j),
        });
    }

    fn push_changes(
        &self,
        old: std::ops::Range<usize>,
        new: std::ops::Range<usize>,
        edits: &mut Vec<Edit<T>>,
    ) {
        edits.extend(old.map(|i| Edit::Delete { old: self.line_a(i) }));
        edits.extend(new.map(|j| Edit::Insert { new: self.line_b(j) }));
    }

    fn conquer(
        &self,
        mut old: std::ops::Range<usize>,
        mut new: std::ops::Range<usize>,
        forward: &mut Frontier,
        backward: &mut Frontier,
        edits: &mut Vec<Edit<T>>,
    ) {
        while !old.is_empty() && !new.is_empty() && self.a[old.start] == self.b[new.start] {
            self.push_equal(old.start, new.start, edits);
            old.start += 1;
            new.start += 1;
        }

        let mut suffix = 0;
        while old.end - suffix > old.start
            && new.end - suffix > new.start
            && self.a[old.end - suffix - 1] == self.b[new.end - suffix - 1]
        {
            suffix += 1;
        }
        old.end -= suffix;
        new.end -= suffix;

        if old.is_empty() || new.is_empty() {
            self.push_changes(old.clone(), new.clone(), edits);
        } else if let Some((x, y)) = self.middle_snake(&old, &new, forward, backward) {
            self.conquer(old.start..x, new.start..y, forward, backward, edits);
            self.conquer(x..old.end, y..new.end, forward, backward, edits);
        } else {
            self.push_changes(old.clone(), new.clone(), edits);
        }

        for i in 0..suffix {
            self.push_equal(old.end + i, new.end + i, edits);
        }
    }

    /// Start of the middle snake of the shortest edit between the two ranges
    fn middle_snake(
        &self,
        old: &std::ops::Range<usize>,
        new: &std::ops::Range<usize>,
        forward: &mut Frontier,
        backward: &mut Frontier,
    ) -> Option<(usize, usize)> {
        let (n, m) = (old.len() as isize, new.len() as isize);
        let a = |x: isize| &self.a[old.start + x as usize];
        let b = |y: isize| &self.b[new.start + y as usize];

        let delta = n - m;
        let odd = delta & 1 == 1;
        let max_d = (n + m + 1) / 2;
        forward.set(1, 0);
        backward.set(1, 0);

        for d in 0..=max_d {
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && forward.get(k - 1) < forward.get(k + 1)) {
                    forward.get(k + 1)
                } else {
                    forward.get(k - 1) + 1
                };
                let mut y = x - k;
                let (x0, y0) = (x, y);
                while x < n && y < m && y >= 0 && a(x) == b(y) {
                    x += 1;
                    y += 1;
                }
                forward.set(k, x);

                if odd && (k - delta).abs() < d && forward.get(k) + backward.get(delta - k) >= n {
                    return Some((old.start + x0 as usize, new.start + y0 as usize));
                }
            }

            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && backward.get(k - 1) < backward.get(k + 1)) {
                    backward.get(k + 1)
                } else {
                    backward.get(k - 1) + 1
                };
                let mut y = x - k;
                while x < n && y < m && y >= 0 && a(n - x - 1) == b(m - y - 1) {
                    x += 1;
                    y += 1;
                }
                backward.set(k, x);

                if !odd && (k - delta).abs() <= d && backward.get(k) + forward.get(delta - k) >= n {
                    return Some((old.start + (n - x) as usize, new.start + (m - y) as usize));
                }
            }
        }

        None
    }
}

/// Within each run of changes, list deletions before insertions
fn deletions_first<T>(edits: &mut [Edit<T>]) {
    for run in edits.split_mut(|edit| !edit.is_change()) {
        run.sort_by_key(|edit| matches!(edit, Edit::Insert { .. }));
    }
}
