//! Mutation replay: the voter set active at each forged block.
//!
//! Walking backward in time inverts every vote mutation. A `+` seen in a
//! newer window means the wallet was not yet voting at the older block, so it
//! is removed from the round set; a `-` means it still was, so it is added
//! back.

use crate::timeline::{BlockTimeline, BlockWindow};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tbw_types::{Address, Height, VoteDirection, VoterMutation};
use tracing::debug;

/// Voter set per forged block height
pub type VotersPerBlock = BTreeMap<Height, BTreeSet<Address>>;

/// Blacklist / whitelist policy applied to the historical voter list.
#[derive(Debug, Clone, Default)]
pub struct VoterFilter {
    blacklist: HashSet<Address>,
    whitelist: HashSet<Address>,
}

impl VoterFilter {
    pub fn new(
        blacklist: impl IntoIterator<Item = Address>,
        whitelist: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            blacklist: blacklist.into_iter().collect(),
            whitelist: whitelist.into_iter().collect(),
        }
    }

    /// Blacklisted addresses never pass; a non-empty whitelist admits only its members.
    pub fn admits(&self, address: &str) -> bool {
        if self.blacklist.contains(address) {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.contains(address)
    }
}

/// Result of replaying the vote mutation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoterHistory {
    pub voters_per_block: VotersPerBlock,
    /// Every address that voted at some point of the window, first-seen order
    pub historical_voters: Vec<Address>,
    /// `historical_voters` after blacklist / whitelist filtering
    pub eligible_voters: Vec<Address>,
}

impl VoterHistory {
    pub fn voters_at(&self, height: Height) -> Option<&BTreeSet<Address>> {
        self.voters_per_block.get(&height)
    }
}

/// Undo one mutation on the round set.
fn undo(mut round: BTreeSet<Address>, mutation: &VoterMutation) -> BTreeSet<Address> {
    match mutation.vote {
        VoteDirection::Vote => {
            round.remove(&mutation.address);
        }
        VoteDirection::Unvote => {
            round.insert(mutation.address.clone());
        }
    }
    round
}

/// Mutations applying to `window`, taken from the front of a newest-first log.
fn take_window<'a>(log: &[&'a VoterMutation], cursor: &mut usize, window: &BlockWindow) -> Vec<&'a VoterMutation> {
    let start = *cursor;
    while *cursor < log.len() && log[*cursor].height >= window.height {
        *cursor += 1;
    }
    log[start..*cursor]
        .iter()
        .copied()
        .filter(|m| window.contains_height(m.height))
        .collect()
}

/// Reconstruct the voter set of every forged block.
///
/// Within a window mutations are undone newest first, ordered by
/// `(height, sequence)` descending, so two mutations of the same wallet in
/// one window cancel in the right order.
pub fn replay_voters(
    timeline: &BlockTimeline,
    current_voters: &[Address],
    mutations: &[VoterMutation],
    filter: &VoterFilter,
) -> VoterHistory {
    let mut log: Vec<&VoterMutation> = mutations.iter().collect();
    log.sort_by_key(|m| Reverse((m.height, m.sequence)));

    let mut historical_voters: Vec<Address> = Vec::new();
    let mut known: HashSet<Address> = HashSet::new();
    for address in current_voters {
        if known.insert(address.clone()) {
            historical_voters.push(address.clone());
        }
    }

    let mut round: BTreeSet<Address> = current_voters.iter().cloned().collect();
    let mut voters_per_block = VotersPerBlock::new();
    let mut cursor = 0;

    for window in timeline.windows() {
        let applied = take_window(&log, &mut cursor, window);

        for mutation in &applied {
            if known.insert(mutation.address.clone()) {
                historical_voters.push(mutation.address.clone());
            }
        }

        round = applied.iter().fold(round, |set, mutation| undo(set, mutation));

        if !applied.is_empty() {
            debug!(
                target: "replay",
                height = window.height,
                mutations = applied.len(),
                voters = round.len(),
                "Undid vote mutations"
            );
        }

        voters_per_block.insert(window.height, round.clone());
    }

    let eligible_voters = historical_voters
        .iter()
        .filter(|address| filter.admits(address))
        .cloned()
        .collect();

    VoterHistory {
        voters_per_block,
        historical_voters,
        eligible_voters,
    }
}
