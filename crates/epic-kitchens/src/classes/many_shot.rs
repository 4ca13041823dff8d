//! Many-shot class sets.
//!
//! A class is *many-shot* when it appears more than 100 times in the training
//! set; an action is many-shot when both its verb and noun are many-shot and
//! the pair occurs at least once in training. Precision and recall are only
//! reported over these classes.
//!
//! The sets are reference metadata distributed as CSV files. They are read
//! from a local directory; fetching them is left to the caller.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::ActionClass;
use crate::error::LoadError;
use crate::io::{parse_usize, read_column};

/// File holding the many-shot verb classes (`verb_class` column).
pub const MANY_SHOT_VERBS_FILE: &str = "EPIC_many_shot_verbs.csv";
/// File holding the many-shot noun classes (`noun_class` column).
pub const MANY_SHOT_NOUNS_FILE: &str = "EPIC_many_shot_nouns.csv";
/// File holding the many-shot actions (`action_class` column of `"(verb, noun)"` tuples).
pub const MANY_SHOT_ACTIONS_FILE: &str = "EPIC_many_shot_actions.csv";

/// Many-shot verb, noun and action classes.
///
/// A `None` set is unspecified: evaluation then falls back to every class
/// present in the ground truth for that task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManyShotClasses {
    pub verbs: Option<BTreeSet<usize>>,
    pub nouns: Option<BTreeSet<usize>>,
    pub actions: Option<BTreeSet<ActionClass>>,
}

impl ManyShotClasses {
    /// Fully specified many-shot sets.
    pub fn new<V, N, A>(verbs: V, nouns: N, actions: A) -> Self
    where
        V: IntoIterator<Item = usize>,
        N: IntoIterator<Item = usize>,
        A: IntoIterator,
        A::Item: Into<ActionClass>,
    {
        Self::default()
            .with_verbs(verbs)
            .with_nouns(nouns)
            .with_actions(actions)
    }

    pub fn with_verbs(mut self, verbs: impl IntoIterator<Item = usize>) -> Self {
        self.verbs = Some(verbs.into_iter().collect());
        self
    }

    pub fn with_nouns(mut self, nouns: impl IntoIterator<Item = usize>) -> Self {
        self.nouns = Some(nouns.into_iter().collect());
        self
    }

    pub fn with_actions<A>(mut self, actions: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<ActionClass>,
    {
        self.actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `verb_class` is in the verb set. An unspecified set contains nothing.
    pub fn is_many_shot_verb(&self, verb_class: usize) -> bool {
        self.verbs.as_ref().is_some_and(|s| s.contains(&verb_class))
    }

    /// Whether `noun_class` is in the noun set. An unspecified set contains nothing.
    pub fn is_many_shot_noun(&self, noun_class: usize) -> bool {
        self.nouns.as_ref().is_some_and(|s| s.contains(&noun_class))
    }

    /// Whether `action` is in the action set. An unspecified set contains nothing.
    pub fn is_many_shot_action(&self, action: impl Into<ActionClass>) -> bool {
        let action = action.into();
        self.actions.as_ref().is_some_and(|s| s.contains(&action))
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load all three sets from the reference CSV files in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let open = |name: &str| -> Result<BufReader<File>, LoadError> {
            Ok(BufReader::new(File::open(dir.join(name))?))
        };

        let classes = Self {
            verbs: Some(Self::read_verbs(open(MANY_SHOT_VERBS_FILE)?)?),
            nouns: Some(Self::read_nouns(open(MANY_SHOT_NOUNS_FILE)?)?),
            actions: Some(Self::read_actions(open(MANY_SHOT_ACTIONS_FILE)?)?),
        };
        log::debug!(
            "loaded many-shot classes from {}: {} verbs, {} nouns, {} actions",
            dir.display(),
            classes.verbs.as_ref().map_or(0, BTreeSet::len),
            classes.nouns.as_ref().map_or(0, BTreeSet::len),
            classes.actions.as_ref().map_or(0, BTreeSet::len),
        );
        Ok(classes)
    }

    /// Read the `verb_class` column of a many-shot verbs CSV.
    pub fn read_verbs<R: Read>(reader: R) -> Result<BTreeSet<usize>, LoadError> {
        Ok(read_column(reader, "verb_class", parse_usize)?
            .into_iter()
            .collect())
    }

    /// Read the `noun_class` column of a many-shot nouns CSV.
    pub fn read_nouns<R: Read>(reader: R) -> Result<BTreeSet<usize>, LoadError> {
        Ok(read_column(reader, "noun_class", parse_usize)?
            .into_iter()
            .collect())
    }

    /// Read the `action_class` column of a many-shot actions CSV.
    pub fn read_actions<R: Read>(reader: R) -> Result<BTreeSet<ActionClass>, LoadError> {
        Ok(read_column(reader, "action_class", parse_action_tuple)?
            .into_iter()
            .collect())
    }
}

/// Parse a `"(verb, noun)"` tuple literal.
fn parse_action_tuple(field: &str) -> Option<ActionClass> {
    let inner = field.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (verb, noun) = inner.split_once(',')?;
    Some(ActionClass::new(parse_usize(verb)?, parse_usize(noun)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_tuples() {
        assert_eq!(parse_action_tuple("(0, 1)"), Some(ActionClass::new(0, 1)));
        assert_eq!(parse_action_tuple(" (12,3) "), Some(ActionClass::new(12, 3)));
        assert_eq!(parse_action_tuple("0, 1"), None);
        assert_eq!(parse_action_tuple("(a, 1)"), None);
    }

    #[test]
    fn reads_action_csv() {
        let data = "action_class,verb,noun\n\"(0, 1)\",take,plate\n\"(2, 3)\",put,cup\n";
        let actions = ManyShotClasses::read_actions(data.as_bytes()).unwrap();
        let expected: BTreeSet<_> = [ActionClass::new(0, 1), ActionClass::new(2, 3)].into();
        assert_eq!(actions, expected);
    }

    #[test]
    fn membership() {
        let classes = ManyShotClasses::new([0, 1], [3], [ActionClass::new(0, 3)]);
        assert!(classes.is_many_shot_verb(1));
        assert!(!classes.is_many_shot_verb(2));
        assert!(classes.is_many_shot_noun(3));
        assert!(classes.is_many_shot_action(ActionClass::new(0, 3)));
        assert!(!classes.is_many_shot_action(ActionClass::new(1, 3)));

        let unspecified = ManyShotClasses::default();
        assert!(!unspecified.is_many_shot_verb(0));
    }

    #[test]
    fn loads_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANY_SHOT_VERBS_FILE), "verb_class,verb\n0,take\n1,put\n")
            .unwrap();
        std::fs::write(dir.path().join(MANY_SHOT_NOUNS_FILE), "noun_class,noun\n4,cup\n").unwrap();
        std::fs::write(
            dir.path().join(MANY_SHOT_ACTIONS_FILE),
            "action_class\n\"(0, 4)\"\n",
        )
        .unwrap();

        let classes = ManyShotClasses::from_dir(dir.path()).unwrap();
        assert_eq!(classes, ManyShotClasses::new([0, 1], [4], [ActionClass::new(0, 4)]));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManyShotClasses::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
