//! Cycle detection for template and group recursion

/// Names visited on the way down to the current recursion frame
///
/// Each frame extends its parent's trail by one name, so the trail only ever
/// describes the current path. Siblings never observe each other's names,
/// which keeps a group that references the same subgroup twice from being
/// mistaken for a cycle.
#[derive(Debug, Clone, Copy)]
pub struct Trail<'a> {
    name: &'a str,
    parent: Option<&'a Trail<'a>>,
}

impl<'a> Trail<'a> {
    /// Start a trail at the top-level name
    pub fn root(name: &'a str) -> Self {
        Self { name, parent: None }
    }

    /// Extend an optional trail with one more name
    pub fn extend(parent: Option<&'a Trail<'a>>, name: &'a str) -> Self {
        Self { name, parent }
    }

    pub fn push(&'a self, name: &'a str) -> Self {
        Self::extend(Some(self), name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }

    /// Names from the current frame back to the root
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        std::iter::successors(Some(self), |t| t.parent).map(|t| t.name)
    }

    /// Render the path root-first, closed by the name that repeats
    pub fn chain_to(&self, repeated: &str) -> String {
        let mut names: Vec<&str> = self.iter().collect();
        names.reverse();
        names.push(repeated);
        names.join(" -> ")
    }
}
