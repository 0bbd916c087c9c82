// Culture filtering
//
//  Copyright (C) 2024 wixrs contributors.
//
//  This file is part of wixrs.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Selection of localizations by culture.
//!
//! Two historical conventions are preserved here because tooling depends
//!   on them:
//!
//!   - the token `null` anywhere in the list disables filtering
//!       entirely; and
//!   - the token `neutral` denotes the neutral culture,
//!       whose key is the empty string.
//!
//! The neutral culture always survives filtering and is always consulted
//!   last.

use crate::ir::Localization;

/// Token that disables filtering.
pub const NO_FILTER: &str = "null";

/// Token naming the neutral culture.
pub const NEUTRAL: &str = "neutral";

/// Ordered culture preference.
///
/// [`None`] accepts every culture in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CultureFilter(Option<Vec<String>>);

impl CultureFilter {
    pub fn new<I, S>(cultures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Vec::new();

        for culture in cultures {
            match culture.as_ref() {
                NO_FILTER => return Self(None),
                NEUTRAL => list.push(String::new()),
                other => list.push(other.to_string()),
            }
        }

        if list.is_empty() {
            Self(None)
        } else {
            Self(Some(list))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub fn accepts(&self, culture: &str) -> bool {
        self.rank(culture).is_some()
    }

    /// Position of `culture` in order of preference,
    ///   or [`None`] if it does not survive the filter.
    fn rank(&self, culture: &str) -> Option<usize> {
        if culture.is_empty() {
            return Some(usize::MAX);
        }

        match &self.0 {
            None => Some(0),
            Some(list) => list.iter().position(|c| c == culture),
        }
    }

    /// Drop localizations that do not survive the filter and order the
    ///   remainder by preference.
    ///
    /// The sort is stable,
    ///   so localizations of equal preference keep their input order.
    pub fn apply(&self, localizations: Vec<Localization>) -> Vec<Localization> {
        let mut ranked = localizations
            .into_iter()
            .filter_map(|loc| self.rank(loc.culture()).map(|rank| (rank, loc)))
            .collect::<Vec<_>>();

        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, loc)| loc).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn locs(cultures: &[&str]) -> Vec<Localization> {
        cultures.iter().map(|c| Localization::new(*c, None)).collect()
    }

    fn cultures(locs: &[Localization]) -> Vec<&str> {
        locs.iter().map(Localization::culture).collect()
    }

    #[test]
    fn empty_list_disables_filter() {
        let sut = CultureFilter::new(Vec::<String>::new());

        assert!(!sut.is_enabled());
        assert_eq!(
            vec!["de-DE", "en-US", ""],
            cultures(&sut.apply(locs(&["de-DE", "", "en-US"])))
        );
    }

    #[test]
    fn null_token_disables_filter() {
        let sut = CultureFilter::new(["fr-FR", NO_FILTER]);

        assert_eq!(CultureFilter::new(Vec::<&str>::new()), sut);
        assert!(sut.accepts("ja-JP"));
    }

    #[test]
    fn neutral_token_is_empty_culture() {
        let sut = CultureFilter::new([NEUTRAL]);

        assert_eq!(CultureFilter::new([""]), sut);
        assert!(sut.is_enabled());
        assert!(sut.accepts(""));
        assert!(!sut.accepts("en-US"));
    }

    #[test]
    fn filters_and_orders_by_preference() {
        let sut = CultureFilter::new(["en-US", "de-DE"]);

        assert_eq!(
            vec!["en-US", "de-DE", ""],
            cultures(&sut.apply(locs(&["de-DE", "fr-FR", "", "en-US"])))
        );
    }
}
