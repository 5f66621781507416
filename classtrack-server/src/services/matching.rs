//! Participant identity resolution
//!
//! The meeting provider exposes a free-text display name, not a stable
//! identity. Resolution tests each known user's normalized full name against
//! the normalized display name, checking enrolled students before the session
//! tutor, first match wins. A participant matching nobody is dropped: better
//! to miss an unmatched participant than to mis-bill an unrelated guest
//! joining from a shared account.
//!
//! A name matches when it survives intact inside the display name (substring
//! after normalization, e.g. "John Smith (iPad)"), or when its tokens appear
//! in the display name in the same order ("John A. Smith" still matches a
//! student "John Smith"). Tokens are never reordered: "Smith John" does not
//! match "John Smith". Known limitation, kept on purpose.

use crate::models::{Identity, User};

/// A participant resolved to a known user
#[derive(Debug, Clone, Copy)]
pub struct ResolvedParticipant<'a> {
    pub identity: Identity,
    pub user: &'a User,
}

/// Normalize a name for containment matching: lowercase, strip whitespace
/// and dots
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Split a name into normalized tokens, dropping empties
fn name_tokens(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(normalize_name)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whether `known` is recognizable inside `display`
///
/// True when the normalized known name is a contiguous substring of the
/// normalized display name, or when every token of the known name appears as
/// a token of the display name in the same relative order.
pub fn name_matches(display: &str, known: &str) -> bool {
    let display_normalized = normalize_name(display);
    let known_normalized = normalize_name(known);
    if display_normalized.is_empty() || known_normalized.is_empty() {
        return false;
    }
    if display_normalized.contains(&known_normalized) {
        return true;
    }

    // In-order token subsequence: extra tokens (middle initials, device tags)
    // may sit between the known tokens, but never before an earlier one
    let known_tokens = name_tokens(known);
    if known_tokens.is_empty() {
        return false;
    }
    let mut remaining = known_tokens.iter();
    let mut next = remaining.next();
    for token in name_tokens(display) {
        if let Some(expected) = next {
            if &token == expected {
                next = remaining.next();
            }
        }
    }
    next.is_none()
}

/// Resolve a display name against enrolled students, then the tutor
///
/// Students are checked first so a student sharing a name fragment with the
/// tutor bills as a student. Iteration order of `students` decides ties;
/// callers pass the enrollment list in a stable order.
pub fn resolve_participant<'a>(
    display_name: &str,
    students: &'a [User],
    tutor: Option<&'a User>,
) -> Option<ResolvedParticipant<'a>> {
    for student in students {
        if name_matches(display_name, &student.full_name) {
            tracing::debug!(
                display_name,
                student = %student.full_name,
                "Matched participant to enrolled student"
            );
            return Some(ResolvedParticipant {
                identity: Identity::Student(student.id),
                user: student,
            });
        }
    }

    if let Some(tutor) = tutor {
        if name_matches(display_name, &tutor.full_name) {
            tracing::debug!(display_name, tutor = %tutor.full_name, "Matched participant to tutor");
            return Some(ResolvedParticipant {
                identity: Identity::Tutor(tutor.id),
                user: tutor,
            });
        }
    }

    tracing::debug!(display_name, "Participant matched no enrolled student or tutor, dropping");
    None
}
