//! Verb and noun class vocabularies.
//!
//! Narrated verbs and nouns are clustered into classes. Each class has a
//! canonical key (e.g. `take`) and the words clustered into it (e.g. `take`,
//! `grab`, `pick up`). The reference files look like
//!
//! ```text
//! verb_id,class_key,verbs
//! 0,take,"['take', 'grab', 'pick up']"
//! 1,put,"['put', 'put-down', 'place']"
//! ```
//!
//! with `noun_id` and `nouns` columns for nouns.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::LoadError;
use crate::io::{csv_reader, parse_field, require_column};

/// File holding the verb classes.
pub const VERB_CLASSES_FILE: &str = "EPIC_verb_classes.csv";
/// File holding the noun classes.
pub const NOUN_CLASSES_FILE: &str = "EPIC_noun_classes.csv";

const CLASS_KEY_COLUMN: &str = "class_key";

/// Which vocabulary a file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Verb,
    Noun,
}

impl ClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verb => "verb",
            Self::Noun => "noun",
        }
    }

    /// Column holding the numeric class id.
    pub fn id_column(self) -> &'static str {
        match self {
            Self::Verb => "verb_id",
            Self::Noun => "noun_id",
        }
    }

    /// Column holding the list of words clustered into the class.
    pub fn members_column(self) -> &'static str {
        match self {
            Self::Verb => "verbs",
            Self::Noun => "nouns",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Verb => VERB_CLASSES_FILE,
            Self::Noun => NOUN_CLASSES_FILE,
        }
    }
}

impl std::fmt::Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verb or noun class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyClass {
    pub id: usize,
    /// Canonical word of the class.
    pub key: String,
    /// Words clustered into the class.
    pub members: Vec<String>,
}

/// Verb or noun classes with lookups in both directions.
///
/// # Example
///
/// ```
/// use epic_kitchens::{ClassKind, ClassVocabulary};
///
/// let csv = "verb_id,class_key,verbs\n0,take,\"['take', 'grab']\"\n1,put,\"['put', 'place']\"\n";
/// let verbs = ClassVocabulary::from_csv_reader(csv.as_bytes(), ClassKind::Verb).unwrap();
///
/// assert_eq!(verbs.class_of("grab"), Some(0));
/// assert_eq!(verbs.class_key(1), Some("put"));
/// assert_eq!(verbs.class_of("stir"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    kind: ClassKind,
    classes: BTreeMap<usize, VocabularyClass>,
    word_to_class: BTreeMap<String, usize>,
}

impl ClassVocabulary {
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, class: usize) -> Option<&VocabularyClass> {
        self.classes.get(&class)
    }

    /// Canonical word of `class`.
    pub fn class_key(&self, class: usize) -> Option<&str> {
        self.get(class).map(|c| c.key.as_str())
    }

    /// Class a narrated word is clustered into.
    pub fn class_of(&self, word: &str) -> Option<usize> {
        self.word_to_class.get(word).copied()
    }

    /// Classes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &VocabularyClass> {
        self.classes.values()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read a class file with the id column, `class_key` and member list
    /// columns of `kind`.
    ///
    /// A word listed under several classes maps to the last of them.
    ///
    /// # Errors
    ///
    /// - a missing column
    /// - an unparsable id, an empty key or a malformed member list
    /// - a class id listed twice
    pub fn from_csv_reader<R: Read>(reader: R, kind: ClassKind) -> Result<Self, LoadError> {
        let id_column = kind.id_column();
        let members_column = kind.members_column();

        let mut reader = csv_reader(reader);
        let id_idx = require_column(&mut reader, id_column)?;
        let key_idx = require_column(&mut reader, CLASS_KEY_COLUMN)?;
        let members_idx = require_column(&mut reader, members_column)?;

        let mut classes = BTreeMap::new();
        let mut word_to_class = BTreeMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let invalid = |column: &str, value: &str| LoadError::InvalidValue {
                column: column.to_string(),
                row,
                value: value.to_string(),
            };

            let id: usize = parse_field(&record, id_idx, id_column, row)?;
            if classes.contains_key(&id) {
                return Err(invalid(id_column, &id.to_string()));
            }
            let key = record.get(key_idx).unwrap_or("");
            if key.is_empty() {
                return Err(invalid(CLASS_KEY_COLUMN, key));
            }
            let members_field = record.get(members_idx).unwrap_or("");
            let members = parse_word_list(members_field)
                .ok_or_else(|| invalid(members_column, members_field))?;

            for word in &members {
                if let Some(previous) = word_to_class.insert(word.clone(), id) {
                    log::debug!("{kind} {word:?} moved from class {previous} to class {id}");
                }
            }
            classes.insert(
                id,
                VocabularyClass {
                    id,
                    key: key.to_string(),
                    members,
                },
            );
        }

        log::debug!(
            "loaded {} {kind} classes covering {} words",
            classes.len(),
            word_to_class.len()
        );
        Ok(Self {
            kind,
            classes,
            word_to_class,
        })
    }

    /// Read the reference class file of `kind` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>, kind: ClassKind) -> Result<Self, LoadError> {
        let file = File::open(dir.as_ref().join(kind.file_name()))?;
        Self::from_csv_reader(BufReader::new(file), kind)
    }
}

/// Parse a list literal of quoted words such as `['take', "pick up"]`.
///
/// Both quote styles are accepted; a backslash escapes the next character.
fn parse_word_list(field: &str) -> Option<Vec<String>> {
    let inner = field.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut chars = inner.chars().peekable();
    let mut words = Vec::new();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(quote) = chars.next() else {
            return Some(words);
        };
        if quote != '\'' && quote != '"' {
            return None;
        }

        let mut word = String::new();
        loop {
            match chars.next()? {
                '\\' => word.push(chars.next()?),
                c if c == quote => break,
                c => word.push(c),
            }
        }
        words.push(word);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => return Some(words),
            Some(',') => {}
            Some(_) => return None,
        }
    }
}
