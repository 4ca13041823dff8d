//! Verb, noun and action class ids.
//!
//! An action is a `(verb_class, noun_class)` pair. Wherever a single integer
//! is needed (sparse score mappings, label arrays) it is encoded densely as
//!
//! ```text
//! action_id = verb_class * NOUN_CLASS_COUNT + noun_class
//! ```
//!
//! which is invertible for every `noun_class < NOUN_CLASS_COUNT`. Labels
//! read from outside the crate go through [`checked_action_id`].

mod many_shot;
mod vocabulary;

pub use many_shot::{
    MANY_SHOT_ACTIONS_FILE, MANY_SHOT_NOUNS_FILE, MANY_SHOT_VERBS_FILE, ManyShotClasses,
};

pub use vocabulary::{
    ClassKind, ClassVocabulary, NOUN_CLASSES_FILE, VERB_CLASSES_FILE, VocabularyClass,
};

use serde::{Deserialize, Serialize};

/// Total number of noun classes.
pub const NOUN_CLASS_COUNT: usize = 352;

/// Total number of verb classes.
pub const VERB_CLASS_COUNT: usize = 125;

/// Noun class of a narration that names no object (e.g. "stir").
pub const EMPTY_NOUN_CLASS: usize = 0;

/// A `(verb_class, noun_class)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionClass {
    pub verb_class: usize,
    pub noun_class: usize,
}

impl ActionClass {
    pub fn new(verb_class: usize, noun_class: usize) -> Self {
        Self {
            verb_class,
            noun_class,
        }
    }

    /// Dense action id of this pair.
    #[inline]
    pub fn id(self) -> usize {
        action_id_from_verb_noun(self.verb_class, self.noun_class)
    }

    /// Decode a dense action id.
    #[inline]
    pub fn from_id(action_id: usize) -> Self {
        Self::new(
            verb_id_from_action_id(action_id),
            noun_id_from_action_id(action_id),
        )
    }
}

impl From<(usize, usize)> for ActionClass {
    fn from((verb_class, noun_class): (usize, usize)) -> Self {
        Self::new(verb_class, noun_class)
    }
}

impl std::fmt::Display for ActionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.verb_class, self.noun_class)
    }
}

/// Exclusive upper bound on verb ids whose action ids fit in a `usize`.
pub const VERB_CLASS_LIMIT: usize = usize::MAX / NOUN_CLASS_COUNT;

/// Encode a verb/noun pair as a dense action id.
///
/// `noun_class` must be below [`NOUN_CLASS_COUNT`] and `verb_class` below
/// [`VERB_CLASS_LIMIT`]; use [`checked_action_id`] for unvalidated ids.
#[inline]
pub fn action_id_from_verb_noun(verb_class: usize, noun_class: usize) -> usize {
    verb_class * NOUN_CLASS_COUNT + noun_class
}

/// Encode a verb/noun pair, or `None` if the pair has no action id.
///
/// ```
/// use epic_kitchens::classes::checked_action_id;
///
/// assert_eq!(checked_action_id(1, 1), Some(353));
/// assert_eq!(checked_action_id(0, 352), None);
/// assert_eq!(checked_action_id(usize::MAX / 10, 0), None);
/// ```
#[inline]
pub fn checked_action_id(verb_class: usize, noun_class: usize) -> Option<usize> {
    if noun_class >= NOUN_CLASS_COUNT {
        return None;
    }
    verb_class
        .checked_mul(NOUN_CLASS_COUNT)?
        .checked_add(noun_class)
}

#[inline]
pub fn noun_id_from_action_id(action_id: usize) -> usize {
    action_id % NOUN_CLASS_COUNT
}

#[inline]
pub fn verb_id_from_action_id(action_id: usize) -> usize {
    action_id / NOUN_CLASS_COUNT
}

/// Encode a collection of action pairs as action ids, preserving order.
pub fn action_tuples_to_ids<I>(actions: I) -> Vec<usize>
where
    I: IntoIterator,
    I::Item: Into<ActionClass>,
{
    actions.into_iter().map(|a| a.into().id()).collect()
}
