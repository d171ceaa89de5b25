//! Legacy site-selection policy (spec §4.6, bottom).
//!
//! Only used by the Basic and Legacy Manifest carriers — C2PA always
//! appends its wrapper as a suffix and never consults this module.

/// Where, in the text, a legacy payload may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Whitespace,
    Punctuation,
    FirstLetterOfWord,
    LastLetterOfWord,
    AllCharacters,
    EndOfText,
    EndOfTextWithFeffPrefix,
}

/// One candidate insertion point: a byte offset into the original text, and
/// whether the payload blob at this site must be preceded by a `U+FEFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub offset: usize,
    pub needs_feff: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic()
}

/// All candidate insertion sites for `target`, in ascending text order.
pub fn find_sites(text: &str, target: Target) -> Vec<Site> {
    match target {
        Target::Whitespace => text
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .map(|(i, c)| Site {
                offset: i + c.len_utf8(),
                needs_feff: false,
            })
            .collect(),
        Target::Punctuation => text
            .char_indices()
            .filter(|(_, c)| c.is_ascii_punctuation())
            .map(|(i, c)| Site {
                offset: i + c.len_utf8(),
                needs_feff: false,
            })
            .collect(),
        Target::AllCharacters => text
            .char_indices()
            .map(|(i, c)| Site {
                offset: i + c.len_utf8(),
                needs_feff: false,
            })
            .collect(),
        Target::FirstLetterOfWord => word_boundaries(text, true),
        Target::LastLetterOfWord => word_boundaries(text, false),
        Target::EndOfText => vec![Site {
            offset: text.len(),
            needs_feff: false,
        }],
        Target::EndOfTextWithFeffPrefix => vec![Site {
            offset: text.len(),
            needs_feff: true,
        }],
    }
}

fn word_boundaries(text: &str, first: bool) -> Vec<Site> {
    let mut sites = Vec::new();
    let mut current: Option<(usize, char)> = None; // first letter seen in the current word
    let mut last: Option<(usize, char)> = None; // last letter seen so far in the current word

    let flush = |sites: &mut Vec<Site>, current: &Option<(usize, char)>, last: &Option<(usize, char)>| {
        let chosen = if first { *current } else { *last };
        if let Some((i, c)) = chosen {
            sites.push(Site {
                offset: i + c.len_utf8(),
                needs_feff: false,
            });
        }
    };

    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            if current.is_none() {
                current = Some((i, c));
            }
            last = Some((i, c));
        } else if current.is_some() {
            flush(&mut sites, &current, &last);
            current = None;
            last = None;
        }
    }
    flush(&mut sites, &current, &last);
    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_sites_follow_each_space() {
        let sites = find_sites("a b  c", Target::Whitespace);
        let offsets: Vec<usize> = sites.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![2, 4, 5]);
    }

    #[test]
    fn first_letter_of_word_picks_one_site_per_word() {
        let sites = find_sites("foo bar baz", Target::FirstLetterOfWord);
        assert_eq!(sites.len(), 3);
    }

    #[test]
    fn last_letter_of_word_differs_from_first_for_multi_char_words() {
        let first = find_sites("hello world", Target::FirstLetterOfWord);
        let last = find_sites("hello world", Target::LastLetterOfWord);
        assert_ne!(first, last);
    }

    #[test]
    fn end_of_text_is_a_single_site_at_the_end() {
        let sites = find_sites("abc", Target::EndOfText);
        assert_eq!(sites, vec![Site { offset: 3, needs_feff: false }]);
    }

    #[test]
    fn end_of_text_with_feff_prefix_marks_the_flag() {
        let sites = find_sites("abc", Target::EndOfTextWithFeffPrefix);
        assert_eq!(sites, vec![Site { offset: 3, needs_feff: true }]);
    }

    #[test]
    fn no_whitespace_means_no_sites() {
        assert!(find_sites("nospaceshere", Target::Whitespace).is_empty());
    }
}
