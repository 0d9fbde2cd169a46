//! Word-boundary character classes.
//!
//! Each byte maps to a bitmask; two adjacent bytes belong to the same word
//! iff their masks intersect. The class table groups letters, digits and
//! several punctuation clusters so that one classification satisfies
//! multiple legacy word-boundary conventions at once (assignment operators,
//! brackets, quotes and sentence punctuation each form their own cluster).

/// Class clusters, '!'-separated. Letters collapse to 'A'/'a', digits to
/// '0', whitespace to ' ' before lookup; a byte may appear in several
/// clusters and then carries every matching bit.
const WORD_CLUSTERS: &str = "!=&|<>^~ !:;, !'!`!.?!\"!( !) !{ !} !Aa0 !+-*/= |<> ![ !] !\\#! ";

/// Bitmask of the clusters containing `c`. Bytes outside every cluster get
/// the all-ones mask (they chain with anything, matching the original
/// editor's behavior for high bytes).
pub fn word_class(c: u8) -> u64 {
    if c == 0 {
        return 0;
    }
    if c == b'!' {
        return 2;
    }

    let c = if c.is_ascii_uppercase() {
        b'A'
    } else if c.is_ascii_lowercase() {
        b'a'
    } else if c.is_ascii_digit() {
        b'0'
    } else if c.is_ascii_whitespace() {
        b' '
    } else {
        c
    };

    let table = WORD_CLUSTERS.as_bytes();
    let mut r: u64 = 0;
    let mut found = false;
    for (i, &t) in table.iter().enumerate() {
        if t == c {
            found = true;
            let mut x: u64 = 1;
            for &p in &table[..i] {
                if p == b'!' {
                    x <<= 1;
                }
            }
            r |= x;
        }
    }
    if !found {
        return u64::MAX;
    }
    r
}

/// Whitespace in the word-boundary sense (the original uses `isspace`).
pub fn is_space(c: u8) -> bool {
    c.is_ascii_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_digits_share_a_class() {
        assert_ne!(word_class(b'a') & word_class(b'Z'), 0);
        assert_ne!(word_class(b'a') & word_class(b'5'), 0);
        assert_ne!(word_class(b'X') & word_class(b'0'), 0);
    }

    #[test]
    fn letters_do_not_join_punctuation() {
        assert_eq!(word_class(b'a') & word_class(b','), 0);
        assert_eq!(word_class(b'a') & word_class(b'('), 0);
        assert_eq!(word_class(b'a') & word_class(b'='), 0);
    }

    #[test]
    fn operator_cluster_chains() {
        // = & | < > ^ ~ share the assignment/comparison cluster
        assert_ne!(word_class(b'=') & word_class(b'&'), 0);
        assert_ne!(word_class(b'<') & word_class(b'>'), 0);
        assert_ne!(word_class(b'=') & word_class(b'~'), 0);
    }

    #[test]
    fn multi_cluster_membership() {
        // '=' appears in both the operator and the arithmetic cluster
        assert_ne!(word_class(b'=') & word_class(b'+'), 0);
        // '<' bridges the operator cluster and the shift cluster with '|'
        assert_ne!(word_class(b'<') & word_class(b'|'), 0);
    }

    #[test]
    fn high_bytes_chain_with_anything() {
        assert_eq!(word_class(0xC3), u64::MAX);
        assert_ne!(word_class(0xC3) & word_class(b'a'), 0);
    }

    #[test]
    fn nul_chains_with_nothing() {
        assert_eq!(word_class(0), 0);
    }
}
