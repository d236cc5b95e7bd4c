//! Verification suite
//!
//! A suite is an ordered list of named [`Case`]s. Each case carries tags for
//! selection and an optional list of cases it depends on. Dependencies are an
//! ordering constraint on the schedule: a case runs after the cases it
//! depends on and is skipped when one of them did not pass.
//!
//! Dependency names are checked when the suite is built; an unknown name or a
//! cycle is an error rather than a silently ignored hint.

pub mod builtin;
pub mod runner;

pub use builtin::builtin_suite;
pub use runner::{CaseOutcome, CaseResult, Report, Runner};

use crate::probe::mock::MockSetup;
use crate::probe::ExpectedResponse;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Case selection tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Catalog,
    Product,
    Uploader,
    Common,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Catalog => "catalog",
            Tag::Product => "product",
            Tag::Uploader => "uploader",
            Tag::Common => "common",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "catalog" => Ok(Tag::Catalog),
            "product" => Ok(Tag::Product),
            "uploader" => Ok(Tag::Uploader),
            "common" => Ok(Tag::Common),
            other => Err(SuiteError::UnknownTag(other.to_string())),
        }
    }
}

/// Suite construction and scheduling errors
#[derive(Error, Debug, PartialEq)]
pub enum SuiteError {
    #[error("duplicate case name '{0}'")]
    DuplicateCase(String),

    #[error("case '{case}' depends on unknown case '{dependency}'")]
    UnknownDependency { case: String, dependency: String },

    #[error("dependency cycle involving: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("unknown tag '{0}': expected catalog, product, uploader or common")]
    UnknownTag(String),
}

/// A probe against one URL with its mock setup and expectation
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCase {
    pub url: String,
    pub mock: MockSetup,
    pub expected: ExpectedResponse,
}

/// What a case does
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Upload a file and expect it to be listed
    Upload { file: String },
    /// Probe an endpoint through the mocking layer
    Probe(ProbeCase),
}

/// One verification case
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub name: String,
    pub tags: Vec<Tag>,
    pub depends_on: Vec<String>,
    pub action: Action,
}

impl Case {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            depends_on: Vec::new(),
            action,
        }
    }

    pub fn tagged(mut self, tag: Tag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.depends_on.contains(&name) {
            self.depends_on.push(name);
        }
        self
    }

    /// True when no tags are requested or the case carries any of them
    pub fn matches(&self, tags: &[Tag]) -> bool {
        tags.is_empty() || tags.iter().any(|t| self.tags.contains(t))
    }
}

/// A validated set of cases
#[derive(Debug, Clone)]
pub struct Suite {
    cases: Vec<Case>,
}

impl Suite {
    /// Validate names and dependencies
    pub fn new(cases: Vec<Case>) -> Result<Self, SuiteError> {
        let mut names = HashSet::new();
        for case in &cases {
            if !names.insert(case.name.as_str()) {
                return Err(SuiteError::DuplicateCase(case.name.clone()));
            }
        }

        for case in &cases {
            for dependency in &case.depends_on {
                if !names.contains(dependency.as_str()) {
                    return Err(SuiteError::UnknownDependency {
                        case: case.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let suite = Self { cases };
        // A cycle anywhere makes the full schedule impossible.
        suite.order(|_| true)?;
        Ok(suite)
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn get(&self, name: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Selected cases in execution order
    ///
    /// Dependencies come first; otherwise declaration order is kept.
    /// Unselected dependencies are not pulled in.
    pub fn schedule(&self, tags: &[Tag]) -> Result<Vec<&Case>, SuiteError> {
        self.order(|case| case.matches(tags))
    }

    fn order(&self, selected: impl Fn(&Case) -> bool) -> Result<Vec<&Case>, SuiteError> {
        let picked: Vec<&Case> = self.cases.iter().filter(|c| selected(*c)).collect();
        let picked_names: HashSet<&str> = picked.iter().map(|c| c.name.as_str()).collect();

        let mut pending: HashMap<&str, usize> = picked
            .iter()
            .map(|c| {
                // Counted by distinct name; each dependency releases once.
                let blocking = c
                    .depends_on
                    .iter()
                    .map(String::as_str)
                    .filter(|d| picked_names.contains(d))
                    .collect::<HashSet<&str>>()
                    .len();
                (c.name.as_str(), blocking)
            })
            .collect();

        let mut ordered: Vec<&Case> = Vec::with_capacity(picked.len());
        let mut done: HashSet<&str> = HashSet::new();

        while ordered.len() < picked.len() {
            let next = picked
                .iter()
                .find(|c| !done.contains(c.name.as_str()) && pending[c.name.as_str()] == 0);

            let Some(&next) = next else {
                let stuck = picked
                    .iter()
                    .filter(|c| !done.contains(c.name.as_str()))
                    .map(|c| c.name.clone())
                    .collect();
                return Err(SuiteError::DependencyCycle(stuck));
            };

            done.insert(next.name.as_str());
            ordered.push(next);

            for case in &picked {
                if case.depends_on.iter().any(|d| d == &next.name) {
                    if let Some(count) = pending.get_mut(case.name.as_str()) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
        }

        Ok(ordered)
    }
}
